//! Snapshot store: the runtime's state map plus content-addressed snapshots.
//!
//! Capture holds the read lock while encoding; restore holds the write lock
//! while replacing. Neither lock is held across storage I/O.

use std::sync::{Arc, RwLock};

use serde_json::{json, Value};
use solavia_core::snapshot::{capture, restore};
use solavia_core::{Context, CoreError, Snapshot, StateMap};
use solavia_store::{Address, Storage};

use crate::error::{Result, RuntimeError};

/// `type` tag of persisted snapshot envelopes.
pub const SNAPSHOT_TYPE: &str = "snapshot";

/// Owns the shared state map and persists snapshots of it.
#[derive(Clone)]
pub struct SnapshotStore {
    context: Arc<Context>,
    storage: Arc<dyn Storage>,
    state: Arc<RwLock<StateMap>>,
}

impl SnapshotStore {
    /// Create a store over an empty state map.
    pub fn new(context: Arc<Context>, storage: Arc<dyn Storage>) -> Self {
        Self {
            context,
            storage,
            state: Arc::new(RwLock::new(StateMap::new())),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // State map
    // ─────────────────────────────────────────────────────────────────────────

    /// Insert or replace one state entry.
    pub fn set(&self, key: impl Into<String>, value: Value) {
        self.state.write().unwrap().insert(key.into(), value);
    }

    /// Read one state entry.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.state.read().unwrap().get(key).cloned()
    }

    /// Copy of the whole state map.
    pub fn state(&self) -> StateMap {
        self.state.read().unwrap().clone()
    }

    /// Replace the whole state map.
    pub fn replace(&self, state: StateMap) {
        *self.state.write().unwrap() = state;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Snapshots
    // ─────────────────────────────────────────────────────────────────────────

    /// Capture the current state without persisting it.
    pub fn create(&self, name: &str) -> Result<Snapshot> {
        let state = self.state.read().unwrap();
        Ok(capture(name, &state, self.context.timestamp(0))?)
    }

    /// Capture and persist as `{type: "snapshot", payload}`; the returned
    /// snapshot carries its storage address.
    pub async fn save(&self, name: &str) -> Result<Snapshot> {
        let mut snapshot = self.create(name)?;
        let envelope = json!({
            "type": SNAPSHOT_TYPE,
            "payload": serde_json::to_value(&snapshot)
                .map_err(|e| RuntimeError::InvalidDocument(e.to_string()))?,
        });
        let address = self.storage.save_object(&envelope).await?;
        tracing::debug!(id = %snapshot.id, %address, "snapshot saved");
        snapshot.address = Some(address.to_string());
        Ok(snapshot)
    }

    /// Replace the state map with the snapshot's contents.
    pub fn load(&self, snapshot: &Snapshot) -> Result<()> {
        let restored = restore(snapshot)?;
        *self.state.write().unwrap() = restored;
        Ok(())
    }

    /// Fetch a persisted snapshot by address and load it.
    pub async fn rollback(&self, address: &Address) -> Result<Snapshot> {
        let envelope = self
            .storage
            .load_object(address)
            .await?
            .ok_or_else(|| RuntimeError::NotFound(address.to_string()))?;

        if envelope.get("type").and_then(Value::as_str) != Some(SNAPSHOT_TYPE) {
            return Err(CoreError::InvalidSnapshot(format!("{address} is not a snapshot")).into());
        }

        let payload = envelope.get("payload").cloned().unwrap_or(Value::Null);
        let mut snapshot: Snapshot = serde_json::from_value(payload)
            .map_err(|e| CoreError::InvalidSnapshot(format!("{address}: {e}")))?;

        self.load(&snapshot)?;
        snapshot.address = Some(address.to_string());
        tracing::info!(id = %snapshot.id, %address, "rolled back to snapshot");
        Ok(snapshot)
    }
}

impl std::fmt::Debug for SnapshotStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotStore")
            .field("backend", &self.storage.backend_name())
            .field("entries", &self.state.read().unwrap().len())
            .finish()
    }
}
