//! # SolaVia Store
//!
//! The storage collaborator for SolaVia. Provides a trait-based interface for
//! content-addressed objects and keyed lists, with SQLite and in-memory
//! implementations.
//!
//! ## Key Types
//!
//! - [`Storage`] - The async trait for all storage operations
//! - [`SqliteStore`] - SQLite-based persistent storage
//! - [`MemoryStore`] - In-memory storage, and the fallback backend
//! - [`Address`] - `solavia:` + 12 hex chars of SHA-256 over canonical JSON
//! - [`StorageBackend`] - Configured backend, opened by [`open_storage`]
//!
//! ## Usage
//!
//! ```rust,no_run
//! use solavia_store::{open_storage, StorageBackend};
//! use serde_json::json;
//!
//! async fn example() {
//!     let store = open_storage(&StorageBackend::Sqlite("solavia.db".into()));
//!
//!     let address = store.save_object(&json!({"type": "note"})).await.unwrap();
//!     let back = store.load_object(&address).await.unwrap();
//!     assert!(back.is_some());
//! }
//! ```

pub mod backend;
pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use backend::{open_storage, try_open_storage, StorageBackend};
pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{Address, Storage, ADDRESS_PREFIX};
