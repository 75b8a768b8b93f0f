//! # SolaVia
//!
//! The unified API for SolaVia: a tamper-evident provenance ledger for
//! deterministic pipelines.
//!
//! ## Overview
//!
//! SolaVia records every stage of a computation as a pair of content digests
//! and commits to the outputs with a Merkle root:
//!
//! - **Stages**: name, input digest, output digest and a deterministic timestamp
//! - **Proofs**: exported stage summaries plus the root, verifiable offline
//! - **Signatures**: Ed25519 over the root, checkable with the public key
//! - **Snapshots**: content-addressed captures of runtime state, with rollback
//! - **Agents**: seeded question answerers with a deterministic fallback
//!
//! ## Key Concepts
//!
//! - **Context**: all randomness and timestamps derive from one seed.
//! - **Canonical JSON**: sorted keys, no whitespace. Every hash covers it.
//! - **Fallback**: storage failures degrade to the in-memory store.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use solavia::{Runtime, RuntimeConfig};
//!
//! async fn example() -> solavia::Result<()> {
//!     let runtime = Runtime::open(RuntimeConfig::from_env()?)?;
//!     runtime.start().await?;
//!
//!     runtime.run_example().await?;
//!     let proof = runtime.export_proof();
//!     assert!(proof.verify());
//!
//!     runtime.stop().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `solavia::core` - canonical encoding, hashing, ledger, proofs
//! - `solavia::store` - storage abstraction, memory and SQLite backends

pub mod agent;
pub mod autosave;
pub mod config;
pub mod error;
pub mod keys;
pub mod pipeline;
pub mod runtime;
pub mod snapshot;

pub use solavia_core as core;
pub use solavia_store as store;

pub use agent::{Agent, AgentManager, AgentRecord, AgentStatus, AskOptions, IdFactory, Model};
pub use autosave::AutoSaver;
pub use config::RuntimeConfig;
pub use error::{Result, RuntimeError};
pub use pipeline::{
    example_pipeline, AlgorithmOutcome, AlgorithmRegistry, Pipeline, PipelineFile, StageRecord, Step,
    EXAMPLE_PIPELINE,
};
pub use runtime::Runtime;
pub use snapshot::SnapshotStore;

pub use solavia_core::{
    Context, Digest, Keypair, ProofDocument, PublicKey, Signature, SignatureDocument, Snapshot,
    Stage, StateMap,
};
pub use solavia_store::{Address, Storage, StorageBackend};
