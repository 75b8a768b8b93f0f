//! Deterministic execution context.
//!
//! One [`Context`] is built at startup and shared by every component. It owns
//! the 256-bit seed, the [`ChainedRng`] drawn from it, and the deterministic
//! clock. Nothing else in the workspace may introduce entropy into ledger or
//! snapshot content.

use std::sync::{Mutex, PoisonError};

use crate::crypto::Digest;
use crate::rng::ChainedRng;

/// Hostname used when the host does not expose one.
pub const UNKNOWN_HOST: &str = "unknown-host";

/// Shared seed, generator and clock.
#[derive(Debug)]
pub struct Context {
    seed: Digest,
    epoch: i64,
    rng: Mutex<ChainedRng>,
}

impl Context {
    /// Build a context from an explicit 256-bit seed.
    pub fn from_seed(seed: Digest) -> Self {
        let seed_hex = seed.to_hex();
        Self {
            seed,
            epoch: deterministic_timestamp(&seed_hex, 0),
            rng: Mutex::new(ChainedRng::new(seed_hex.as_bytes())),
        }
    }

    /// Derive the seed as `H(hostname || platform || arch)`.
    pub fn from_host_identity(hostname: &str, platform: &str, arch: &str) -> Self {
        let identity = format!("{hostname}{platform}{arch}");
        Self::from_seed(Digest::hash(identity.as_bytes()))
    }

    /// Derive the seed from the current host.
    ///
    /// Platform and architecture use the names Node.js reports (`linux`,
    /// `darwin`, `win32`; `x64`, `arm64`) so seeds agree across runtimes.
    pub fn from_host() -> Self {
        Self::from_host_identity(&hostname(), node_platform(), node_arch())
    }

    /// The 256-bit seed.
    pub fn seed(&self) -> Digest {
        self.seed
    }

    /// Deterministic timestamp: the seed-derived epoch plus `offset`.
    pub fn timestamp(&self, offset: u64) -> i64 {
        self.epoch.saturating_add(offset as i64)
    }

    /// Draw a `u32` in `0..max` from the shared chained generator.
    pub fn next_int(&self, max: u32) -> u32 {
        self.rng.lock().unwrap_or_else(PoisonError::into_inner).next_int(max)
    }

    /// Draw a UUID from the shared chained generator.
    pub fn uuid(&self) -> String {
        self.rng.lock().unwrap_or_else(PoisonError::into_inner).uuid()
    }

    /// Bytes drawn from the shared generator so far.
    pub fn draws(&self) -> u64 {
        self.rng.lock().unwrap_or_else(PoisonError::into_inner).draws()
    }
}

/// `int(first 12 hex chars of H(seed_text)) + offset`.
pub fn deterministic_timestamp(seed_text: &str, offset: u64) -> i64 {
    let prefix = Digest::hash(seed_text.as_bytes()).hex_prefix(12);
    // 12 hex chars are 48 bits and always fit in an i64.
    let base = i64::from_str_radix(&prefix, 16).unwrap_or(0);
    base.saturating_add(offset as i64)
}

/// Host name as reported by gethostname(2).
pub fn hostname() -> String {
    gethostname::gethostname()
        .into_string()
        .ok()
        .map(|h| h.trim().to_string())
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| UNKNOWN_HOST.to_string())
}

fn node_platform() -> &'static str {
    match std::env::consts::OS {
        "macos" => "darwin",
        "windows" => "win32",
        other => other,
    }
}

fn node_arch() -> &'static str {
    match std::env::consts::ARCH {
        "x86_64" => "x64",
        "x86" => "ia32",
        "aarch64" => "arm64",
        "powerpc64" => "ppc64",
        other => other,
    }
}
