//! Storage trait: the abstract interface to the persistence collaborator.
//!
//! Objects are content-addressed; lists are stored under caller-chosen keys.
//! Backends are chosen once at construction and never swapped while a
//! runtime is alive.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use solavia_core::{canonical_string, Digest};

use crate::error::Result;

/// Prefix of every object address.
pub const ADDRESS_PREFIX: &str = "solavia:";

/// Hex characters of the digest kept in an address.
pub const ADDRESS_HEX_LEN: usize = 12;

/// Content address of a stored object: `solavia:` + 12 hex chars.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    /// Address of a canonically encoded object.
    pub fn of_canonical(canonical: &str) -> Self {
        let digest = Digest::hash(canonical.as_bytes());
        Self(format!("{ADDRESS_PREFIX}{}", digest.hex_prefix(ADDRESS_HEX_LEN)))
    }

    /// Address of a value, via its canonical encoding.
    pub fn of_value(value: &Value) -> Result<Self> {
        Ok(Self::of_canonical(&canonical_string(value)?))
    }

    /// Wrap an address string as given (e.g. from the command line).
    pub fn parse(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// The address text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.0)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Address {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// The Storage trait: async interface to the persistence collaborator.
///
/// All methods are async to support both blocking (SQLite) and in-memory
/// backends. For SQLite, `spawn_blocking` keeps the runtime free.
///
/// # Design Notes
///
/// - **Content addressing**: saving an object twice yields the same address.
/// - **Lists replace**: `save_list` overwrites whatever the key held.
/// - **Absent is not an error**: unknown addresses load as `None`, unknown
///   list keys as an empty list.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Persist an object and return its content address.
    async fn save_object(&self, value: &Value) -> Result<Address>;

    /// Load an object by address.
    async fn load_object(&self, address: &Address) -> Result<Option<Value>>;

    /// Replace the list stored under `key`.
    async fn save_list(&self, key: &str, items: &[Value]) -> Result<()>;

    /// Load the list stored under `key`.
    async fn load_list(&self, key: &str) -> Result<Vec<Value>>;

    /// Short backend name for logs.
    fn backend_name(&self) -> &'static str;
}
