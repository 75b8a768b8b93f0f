//! In-memory implementation of the Storage trait.
//!
//! Same semantics as SQLite, no persistence. Also the fallback backend when
//! the configured one cannot be opened.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use serde_json::Value;
use solavia_core::canonical_string;

use crate::error::Result;
use crate::traits::{Address, Storage};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    /// Objects indexed by address.
    objects: HashMap<Address, Value>,

    /// Lists indexed by key.
    lists: HashMap<String, Vec<Value>>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryStoreInner::default()),
        }
    }

    /// Number of stored objects.
    pub fn object_count(&self) -> usize {
        self.inner.read().unwrap().objects.len()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Storage for MemoryStore {
    async fn save_object(&self, value: &Value) -> Result<Address> {
        let address = Address::of_canonical(&canonical_string(value)?);
        let mut inner = self.inner.write().unwrap();
        inner.objects.insert(address.clone(), value.clone());
        tracing::debug!(%address, "object saved (memory)");
        Ok(address)
    }

    async fn load_object(&self, address: &Address) -> Result<Option<Value>> {
        let inner = self.inner.read().unwrap();
        Ok(inner.objects.get(address).cloned())
    }

    async fn save_list(&self, key: &str, items: &[Value]) -> Result<()> {
        let mut inner = self.inner.write().unwrap();
        inner.lists.insert(key.to_string(), items.to_vec());
        Ok(())
    }

    async fn load_list(&self, key: &str) -> Result<Vec<Value>> {
        let inner = self.inner.read().unwrap();
        Ok(inner.lists.get(key).cloned().unwrap_or_default())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_object_roundtrip() {
        let store = MemoryStore::new();
        let value = json!({"type": "snapshot", "payload": {"id": "abc"}});

        let address = store.save_object(&value).await.unwrap();
        assert_eq!(store.load_object(&address).await.unwrap(), Some(value));
    }

    #[tokio::test]
    async fn test_save_is_content_addressed() {
        let store = MemoryStore::new();
        let a = store.save_object(&json!({"x": 1, "y": 2})).await.unwrap();
        let b = store.save_object(&json!({"y": 2, "x": 1})).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(store.object_count(), 1);
    }

    #[tokio::test]
    async fn test_unknown_address_is_none() {
        let store = MemoryStore::new();
        let missing = Address::parse("solavia:000000000000");
        assert_eq!(store.load_object(&missing).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_list_roundtrip_and_replace() {
        let store = MemoryStore::new();
        assert!(store.load_list("agents").await.unwrap().is_empty());

        store.save_list("agents", &[json!({"name": "a"}), json!(2)]).await.unwrap();
        assert_eq!(
            store.load_list("agents").await.unwrap(),
            vec![json!({"name": "a"}), json!(2)]
        );

        store.save_list("agents", &[]).await.unwrap();
        assert!(store.load_list("agents").await.unwrap().is_empty());
    }
}
