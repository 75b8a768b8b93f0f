//! Command handlers for the `solavia` binary.

pub mod commands;

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::de::DeserializeOwned;
use solavia::{Runtime, RuntimeConfig};

/// Default proof file name, inside the output directory.
pub const DEFAULT_PROOF_FILE: &str = "solavia-proof.json";

/// Default signature file name, inside the output directory.
pub const DEFAULT_SIGNATURE_FILE: &str = "solavia-signature.json";

/// `explicit`, or `name` inside the configured output directory.
pub fn output_path(config: &RuntimeConfig, explicit: Option<PathBuf>, name: &str) -> PathBuf {
    explicit.unwrap_or_else(|| config.output_dir.join(name))
}

/// Read and parse a JSON document.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

/// Open the runtime on the configured backend and load persisted state.
pub async fn open_runtime(config: RuntimeConfig) -> anyhow::Result<Runtime> {
    tracing::debug!(backend = %config.storage_backend(), output_dir = %config.output_dir.display(), "opening runtime");
    let runtime = Runtime::open(config)?;
    runtime.start().await?;
    Ok(runtime)
}
