//! Content-addressed snapshots of a state map.
//!
//! `id` is the first 12 hex characters of SHA-256 over `data`, the canonical
//! encoding of the state. Two snapshots of canonically-equal state share an id.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::canonical::canonical_string;
use crate::crypto::Digest;
use crate::error::{CoreError, EncodingError, Result};

/// In-memory state captured by snapshots.
pub type StateMap = Map<String, Value>;

/// Length of a snapshot id in hex characters.
pub const SNAPSHOT_ID_LEN: usize = 12;

/// A captured state map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: String,
    pub name: String,
    /// Canonical encoding of the state. Optional so that incomplete records
    /// still deserialize and are rejected by [`restore`].
    #[serde(default)]
    pub data: Option<String>,
    pub timestamp: i64,
    /// Storage address, attached once persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

/// Derive the snapshot id of canonical state text.
pub fn snapshot_id(data: &str) -> String {
    Digest::hash(data.as_bytes()).hex_prefix(SNAPSHOT_ID_LEN)
}

/// Capture `state` under `name`.
pub fn capture(
    name: impl Into<String>,
    state: &StateMap,
    timestamp: i64,
) -> std::result::Result<Snapshot, EncodingError> {
    let data = canonical_string(&Value::Object(state.clone()))?;
    Ok(Snapshot {
        id: snapshot_id(&data),
        name: name.into(),
        data: Some(data),
        timestamp,
        address: None,
    })
}

/// Decode a snapshot back into a state map.
pub fn restore(snapshot: &Snapshot) -> Result<StateMap> {
    let data = snapshot
        .data
        .as_deref()
        .ok_or_else(|| CoreError::InvalidSnapshot(format!("snapshot {} has no data", snapshot.id)))?;

    match serde_json::from_str::<Value>(data) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(CoreError::InvalidSnapshot(format!(
            "snapshot {} data is not a map",
            snapshot.id
        ))),
        Err(e) => Err(CoreError::InvalidSnapshot(format!(
            "snapshot {} data is unparsable: {e}",
            snapshot.id
        ))),
    }
}
