//! Error types for SolaVia Core.

use thiserror::Error;

/// Errors produced while canonically encoding a value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodingError {
    /// Nesting exceeded the encoder's depth bound (a cycle in the source value
    /// shows up this way once it has been flattened into a tree).
    #[error("value nested deeper than {max} levels (cyclic reference?)")]
    TooDeep { max: usize },

    /// The value has no JSON representation (e.g. a map with non-string keys).
    #[error("unserializable value: {0}")]
    Unserializable(String),
}

/// Core errors surfaced by ledger, signing, proof and snapshot operations.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("encoding error: {0}")]
    Encoding(#[from] EncodingError),

    #[error("hash mismatch: expected {expected}, got {actual}")]
    HashMismatch { expected: String, actual: String },

    #[error("stage {stage:?} recorded without an output hash")]
    MissingHash { stage: String },

    #[error("invalid signature")]
    InvalidSignature,

    #[error("signing unavailable: {0}")]
    SigningUnavailable(String),

    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("key not found: {0}")]
    KeyNotFound(String),

    #[error("invalid key material: {0}")]
    InvalidKey(String),

    #[error("invalid digest: {0}")]
    InvalidDigest(String),

    #[error("decoding error: {0}")]
    DecodingError(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
