//! SQLite implementation of the Storage trait.
//!
//! The local persistent backend. Uses rusqlite with bundled SQLite, wrapped
//! in async via `tokio::task::spawn_blocking`.
//!
//! Objects are stored as canonical JSON text; lists as CBOR arrays.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use solavia_core::canonical_string;

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{Address, Storage};

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
pub struct SqliteStore {
    /// The SQLite connection, protected by a mutex.
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn run_blocking<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().map_err(|e| {
                StoreError::Database(rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_LOCKED),
                    Some(format!("mutex poisoned: {}", e)),
                ))
            })?;
            f(&conn)
        })
        .await
        .map_err(|e| {
            StoreError::Database(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_ERROR),
                Some(format!("spawn_blocking failed: {}", e)),
            ))
        })?
    }
}

fn encode_items(items: &[Value]) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::into_writer(items, &mut buf).map_err(|e| StoreError::Serialization(e.to_string()))?;
    Ok(buf)
}

fn decode_items(bytes: &[u8]) -> Result<Vec<Value>> {
    if bytes.is_empty() {
        return Ok(Vec::new());
    }
    ciborium::from_reader(bytes).map_err(|e| StoreError::InvalidData(e.to_string()))
}

#[async_trait]
impl Storage for SqliteStore {
    async fn save_object(&self, value: &Value) -> Result<Address> {
        let body = canonical_string(value)?;
        let address = Address::of_canonical(&body);
        let key = address.clone();

        self.run_blocking(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO objects (address, body, stored_at) VALUES (?1, ?2, ?3)",
                params![key.as_str(), body, now_millis()],
            )?;
            Ok(())
        })
        .await?;

        tracing::debug!(%address, "object saved (sqlite)");
        Ok(address)
    }

    async fn load_object(&self, address: &Address) -> Result<Option<Value>> {
        let key = address.clone();
        let body: Option<String> = self
            .run_blocking(move |conn| {
                Ok(conn
                    .query_row(
                        "SELECT body FROM objects WHERE address = ?1",
                        params![key.as_str()],
                        |row| row.get(0),
                    )
                    .optional()?)
            })
            .await?;

        body.map(|text| {
            serde_json::from_str(&text).map_err(|e| {
                StoreError::InvalidData(format!("object {address} is not valid JSON: {e}"))
            })
        })
        .transpose()
    }

    async fn save_list(&self, key: &str, items: &[Value]) -> Result<()> {
        let blob = encode_items(items)?;
        let key = key.to_string();

        self.run_blocking(move |conn| {
            conn.execute(
                "INSERT INTO lists (key, items, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET items = excluded.items, updated_at = excluded.updated_at",
                params![key, blob, now_millis()],
            )?;
            Ok(())
        })
        .await
    }

    async fn load_list(&self, key: &str) -> Result<Vec<Value>> {
        let key = key.to_string();
        let blob: Option<Vec<u8>> = self
            .run_blocking(move |conn| {
                Ok(conn
                    .query_row("SELECT items FROM lists WHERE key = ?1", params![key], |row| {
                        row.get(0)
                    })
                    .optional()?)
            })
            .await?;

        match blob {
            Some(bytes) => decode_items(&bytes),
            None => Ok(Vec::new()),
        }
    }

    fn backend_name(&self) -> &'static str {
        "sqlite"
    }
}

/// Get current time in milliseconds.
fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_object_roundtrip() {
        let store = SqliteStore::open_memory().unwrap();
        let value = json!({"type": "snapshot", "payload": {"id": "8f2cf00cf03e", "n": [1, 2.5]}});

        let address = store.save_object(&value).await.unwrap();
        assert!(address.as_str().starts_with("solavia:"));
        assert_eq!(store.load_object(&address).await.unwrap(), Some(value));
    }

    #[tokio::test]
    async fn test_idempotent_save() {
        let store = SqliteStore::open_memory().unwrap();
        let value = json!({"a": 1});
        let first = store.save_object(&value).await.unwrap();
        let second = store.save_object(&value).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_missing_object() {
        let store = SqliteStore::open_memory().unwrap();
        let missing = Address::parse("solavia:ffffffffffff");
        assert_eq!(store.load_object(&missing).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_list_roundtrip() {
        let store = SqliteStore::open_memory().unwrap();
        let items = vec![json!({"name": "analyst", "seed": 42}), json!("x"), json!(null)];

        store.save_list("agents", &items).await.unwrap();
        assert_eq!(store.load_list("agents").await.unwrap(), items);

        store.save_list("agents", &items[..1]).await.unwrap();
        assert_eq!(store.load_list("agents").await.unwrap(), items[..1].to_vec());

        assert!(store.load_list("unknown").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("solavia.db");

        let address = {
            let store = SqliteStore::open(&path).unwrap();
            store.save_list("sv:counter", &[json!(3)]).await.unwrap();
            store.save_object(&json!({"k": "v"})).await.unwrap()
        };

        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.load_object(&address).await.unwrap(), Some(json!({"k": "v"})));
        assert_eq!(store.load_list("sv:counter").await.unwrap(), vec![json!(3)]);
    }
}
