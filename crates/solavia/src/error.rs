//! Error types for the runtime.

use solavia_core::{CoreError, EncodingError};
use solavia_store::StoreError;
use thiserror::Error;

/// Errors that can occur during runtime operations.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Core error (hash mismatch, signing, snapshot, key material).
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Canonical encoding error.
    #[error("encoding error: {0}")]
    Encoding(#[from] EncodingError),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Invalid configuration value.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Nothing stored at the given address.
    #[error("nothing stored at {0}")]
    NotFound(String),

    /// Agent not found.
    #[error("agent not found: {0}")]
    AgentNotFound(String),

    /// A pipeline step failed.
    #[error("step {step:?} failed: {message}")]
    Step { step: String, message: String },

    /// Model collaborator failed.
    #[error("model error: {0}")]
    Model(String),

    /// Malformed input document.
    #[error("invalid document: {0}")]
    InvalidDocument(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RuntimeError {
    /// Wrap any displayable failure as a step error.
    pub fn step(step: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Step {
            step: step.into(),
            message: message.to_string(),
        }
    }
}

/// Result type for runtime operations.
pub type Result<T> = std::result::Result<T, RuntimeError>;
