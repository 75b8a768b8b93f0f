pub mod keygen;
pub mod run;
pub mod snapshot;
pub mod verify;
