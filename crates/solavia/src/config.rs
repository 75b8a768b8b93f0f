//! Runtime configuration.
//!
//! Defaults, overlaid by environment variables, overlaid by command-line
//! flags (the binary applies the last layer).

use std::path::PathBuf;
use std::time::Duration;

use solavia_store::StorageBackend;

use crate::error::{Result, RuntimeError};

/// Default run seed.
pub const DEFAULT_SEED: u32 = 1337;

/// Default model name handed to the model collaborator.
pub const DEFAULT_MODEL: &str = "llama3.1:70b";

/// SQLite file used inside the output directory when no backend is set.
pub const DEFAULT_DB_FILE: &str = "solavia.db";

/// Configuration for a [`Runtime`](crate::Runtime).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Run seed, recorded in proofs and mixed into agent prompts.
    pub seed: u32,
    /// Number of agent passes.
    pub passes: u32,
    /// Directory for proofs and other artifacts.
    pub output_dir: PathBuf,
    /// Default log filter when `RUST_LOG` is unset.
    pub log_level: String,
    /// Model name, opaque to the runtime.
    pub model: String,
    /// Period between autosave ticks.
    pub autosave_interval: Duration,
    /// Storage backend. `None` selects [`DEFAULT_DB_FILE`] inside
    /// `output_dir`.
    pub storage: Option<StorageBackend>,
    /// Prefix for generated ids.
    pub id_prefix: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            passes: 2,
            output_dir: PathBuf::from("artifacts"),
            log_level: "info".to_string(),
            model: DEFAULT_MODEL.to_string(),
            autosave_interval: Duration::from_secs(30),
            storage: None,
            id_prefix: "sv".to_string(),
        }
    }
}

impl RuntimeConfig {
    /// Defaults overlaid with the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overlaid with values from `lookup`.
    ///
    /// Reads `SEED`, `PASSES`, `LOG_LEVEL`, `OLLAMA_MODEL`,
    /// `SOLAVIA_OUTPUT_DIR` and `SOLAVIA_STORAGE`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(seed) = lookup("SEED") {
            config.seed = parse_u32("SEED", &seed)?;
        }
        if let Some(passes) = lookup("PASSES") {
            config.passes = parse_u32("PASSES", &passes)?;
        }
        if let Some(level) = lookup("LOG_LEVEL").filter(|v| !v.trim().is_empty()) {
            config.log_level = level.trim().to_string();
        }
        if let Some(model) = lookup("OLLAMA_MODEL").filter(|v| !v.trim().is_empty()) {
            config.model = model.trim().to_string();
        }
        if let Some(dir) = lookup("SOLAVIA_OUTPUT_DIR").filter(|v| !v.trim().is_empty()) {
            config.output_dir = PathBuf::from(dir.trim());
        }
        if let Some(storage) = lookup("SOLAVIA_STORAGE") {
            config.storage = Some(
                storage
                    .parse()
                    .map_err(|e| RuntimeError::Config(format!("SOLAVIA_STORAGE: {e}")))?,
            );
        }

        Ok(config)
    }

    /// The backend to open: the configured one, else the SQLite file in the
    /// output directory.
    pub fn storage_backend(&self) -> StorageBackend {
        self.storage
            .clone()
            .unwrap_or_else(|| StorageBackend::Sqlite(self.output_dir.join(DEFAULT_DB_FILE)))
    }
}

fn parse_u32(key: &str, value: &str) -> Result<u32> {
    value
        .trim()
        .parse()
        .map_err(|_| RuntimeError::Config(format!("{key} must be an unsigned 32-bit integer, got {value:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = RuntimeConfig::default();
        assert_eq!(config.seed, 1337);
        assert_eq!(config.passes, 2);
        assert_eq!(config.model, "llama3.1:70b");
        assert_eq!(config.autosave_interval, Duration::from_secs(30));
        assert_eq!(config.storage, None);
        assert_eq!(
            config.storage_backend(),
            StorageBackend::Sqlite(PathBuf::from("artifacts").join("solavia.db"))
        );
        assert_eq!(config.id_prefix, "sv");
    }

    #[test]
    fn test_env_overlay() {
        let config = RuntimeConfig::from_lookup(lookup(&[
            ("SEED", "42"),
            ("PASSES", " 3 "),
            ("LOG_LEVEL", "debug"),
            ("OLLAMA_MODEL", "tiny"),
            ("SOLAVIA_STORAGE", "sqlite:run.db"),
        ]))
        .unwrap();

        assert_eq!(config.seed, 42);
        assert_eq!(config.passes, 3);
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.model, "tiny");
        assert_eq!(config.storage_backend(), StorageBackend::Sqlite(PathBuf::from("run.db")));
        assert_eq!(config.output_dir, PathBuf::from("artifacts"));
    }

    #[test]
    fn test_default_database_follows_output_dir() {
        let config = RuntimeConfig::from_lookup(lookup(&[("SOLAVIA_OUTPUT_DIR", "out")])).unwrap();
        assert_eq!(config.storage_backend(), StorageBackend::Sqlite(PathBuf::from("out").join("solavia.db")));

        let config = RuntimeConfig::from_lookup(lookup(&[("SOLAVIA_STORAGE", "memory")])).unwrap();
        assert_eq!(config.storage_backend(), StorageBackend::Memory);
    }

    #[test]
    fn test_bad_seed_rejected() {
        let err = RuntimeConfig::from_lookup(lookup(&[("SEED", "-1")])).unwrap_err();
        assert!(matches!(err, RuntimeError::Config(_)));
    }

    #[test]
    fn test_empty_values_keep_defaults() {
        let config = RuntimeConfig::from_lookup(lookup(&[("OLLAMA_MODEL", ""), ("LOG_LEVEL", " ")])).unwrap();
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.log_level, "info");
    }
}
