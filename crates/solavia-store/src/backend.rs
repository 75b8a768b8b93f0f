//! Backend selection.
//!
//! The backend is picked once from configuration. A backend that fails to
//! open degrades to [`MemoryStore`] with a warning; data is never written to
//! a half-open backend.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::{Result, StoreError};
use crate::memory::MemoryStore;
use crate::sqlite::SqliteStore;
use crate::traits::Storage;

/// Configured storage backend.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StorageBackend {
    /// Process-local, non-persistent.
    #[default]
    Memory,
    /// SQLite database file.
    Sqlite(PathBuf),
}

impl FromStr for StorageBackend {
    type Err = StoreError;

    /// `memory` selects the in-memory backend; anything else is a SQLite path
    /// (an optional `sqlite:` prefix is stripped).
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(StoreError::Unavailable("empty storage backend".into()));
        }
        if s.eq_ignore_ascii_case("memory") {
            return Ok(Self::Memory);
        }
        let path = s.strip_prefix("sqlite:").unwrap_or(s);
        Ok(Self::Sqlite(PathBuf::from(path)))
    }
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory => f.write_str("memory"),
            Self::Sqlite(path) => write!(f, "sqlite:{}", path.display()),
        }
    }
}

/// Open exactly the configured backend.
pub fn try_open_storage(backend: &StorageBackend) -> Result<Arc<dyn Storage>> {
    match backend {
        StorageBackend::Memory => Ok(Arc::new(MemoryStore::new())),
        StorageBackend::Sqlite(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            Ok(Arc::new(SqliteStore::open(path)?))
        }
    }
}

/// Open the configured backend, falling back to memory on failure.
pub fn open_storage(backend: &StorageBackend) -> Arc<dyn Storage> {
    match try_open_storage(backend) {
        Ok(store) => {
            tracing::debug!(backend = store.backend_name(), "storage opened");
            store
        }
        Err(e) => {
            tracing::warn!(%backend, error = %e, "storage backend unavailable, using in-memory store");
            Arc::new(MemoryStore::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_backend() {
        assert_eq!("memory".parse::<StorageBackend>().unwrap(), StorageBackend::Memory);
        assert_eq!("MEMORY".parse::<StorageBackend>().unwrap(), StorageBackend::Memory);
        assert_eq!(
            "sqlite:data/sv.db".parse::<StorageBackend>().unwrap(),
            StorageBackend::Sqlite(PathBuf::from("data/sv.db"))
        );
        assert_eq!(
            "sv.db".parse::<StorageBackend>().unwrap(),
            StorageBackend::Sqlite(PathBuf::from("sv.db"))
        );
        assert!("  ".parse::<StorageBackend>().is_err());
    }

    #[test]
    fn test_opens_sqlite() {
        let dir = tempfile::tempdir().unwrap();
        let backend = StorageBackend::Sqlite(dir.path().join("nested/sv.db"));
        assert_eq!(open_storage(&backend).backend_name(), "sqlite");
    }

    #[test]
    fn test_falls_back_to_memory() {
        let dir = tempfile::tempdir().unwrap();
        // A directory cannot be opened as a database file.
        let backend = StorageBackend::Sqlite(dir.path().to_path_buf());
        assert!(try_open_storage(&backend).is_err());
        assert_eq!(open_storage(&backend).backend_name(), "memory");
    }
}
