//! Exported proofs and root signatures.
//!
//! A [`ProofDocument`] carries the Merkle root alongside the per-stage digests
//! it was computed from, so a third party can recompute the root offline.
//! A [`SignatureDocument`] binds an Ed25519 signature to that root.
//!
//! The message signed is always the UTF-8 text of the lowercase root hex.

use serde::{Deserialize, Serialize};

use crate::crypto::{Digest, Keypair, PublicKey, Signature};
use crate::error::{CoreError, Result};
use crate::ledger::ProvenanceLedger;
use crate::merkle::verify_root;

/// Proof document format version.
pub const PROOF_VERSION: &str = "8.0.0";

/// Per-stage entry of an exported proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageSummary {
    pub name: String,
    pub input_hash: Digest,
    pub output_hash: Option<Digest>,
    pub ts: i64,
}

/// Exported, self-verifying proof of a ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofDocument {
    /// Merkle root at export time; `null` for an empty ledger.
    pub root: Option<Digest>,
    pub stages: Vec<StageSummary>,
    /// Configured run seed.
    pub seed: u32,
    /// ISO-8601 export time. Informational only, never hashed.
    pub timestamp: String,
    pub version: String,
}

impl ProofDocument {
    /// Snapshot the ledger into a proof document.
    pub fn from_ledger(ledger: &ProvenanceLedger, seed: u32, timestamp: impl Into<String>) -> Self {
        let stages = ledger
            .stages()
            .iter()
            .map(|s| StageSummary {
                name: s.name.clone(),
                input_hash: s.input_hash,
                output_hash: s.output_hash,
                ts: s.timestamp,
            })
            .collect();

        Self {
            root: ledger.merkle_root(),
            stages,
            seed,
            timestamp: timestamp.into(),
            version: PROOF_VERSION.to_string(),
        }
    }

    /// Leaf digests in stage order.
    pub fn leaves(&self) -> Vec<Digest> {
        self.stages.iter().filter_map(|s| s.output_hash).collect()
    }

    /// Recompute the root from the stage list and compare.
    pub fn verify(&self) -> bool {
        verify_root(self.root.as_ref(), &self.leaves())
    }

    /// Like [`verify`](Self::verify), reporting both roots on mismatch.
    pub fn verify_strict(&self) -> Result<()> {
        let computed = crate::merkle::merkle_root(&self.leaves());
        if computed == self.root {
            return Ok(());
        }
        Err(CoreError::HashMismatch {
            expected: root_text(self.root.as_ref()),
            actual: root_text(computed.as_ref()),
        })
    }
}

fn root_text(root: Option<&Digest>) -> String {
    root.map_or_else(|| "null".to_string(), Digest::to_hex)
}

// ─────────────────────────────────────────────────────────────────────────────
// Signing
// ─────────────────────────────────────────────────────────────────────────────

/// Sign a Merkle root.
///
/// Fails with [`CoreError::SigningUnavailable`] when there is no root (empty
/// ledger) or no key.
pub fn sign_root(root: Option<&Digest>, keypair: Option<&Keypair>) -> Result<Signature> {
    let root = root.ok_or_else(|| CoreError::SigningUnavailable("ledger is empty".into()))?;
    let keypair = keypair.ok_or_else(|| CoreError::SigningUnavailable("no signing key".into()))?;
    Ok(keypair.sign(root.to_hex().as_bytes()))
}

/// Check a signature over a Merkle root. Never errors.
pub fn verify_signature(root: &Digest, signature: &Signature, public_key: &PublicKey) -> bool {
    public_key.verify(root.to_hex().as_bytes(), signature).is_ok()
}

/// A signed root, plus the canonical stage list it was taken over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureDocument {
    pub root: Digest,
    /// Hex-encoded Ed25519 signature.
    pub signature: String,
    /// Canonical encoding of the ledger's stages at signing time.
    pub canonical: String,
}

impl SignatureDocument {
    /// Sign the ledger's current root.
    pub fn sign(ledger: &ProvenanceLedger, keypair: Option<&Keypair>) -> Result<Self> {
        let root = ledger.merkle_root();
        let signature = sign_root(root.as_ref(), keypair)?;
        let root = root.ok_or_else(|| CoreError::SigningUnavailable("ledger is empty".into()))?;
        Ok(Self {
            root,
            signature: signature.to_hex(),
            canonical: ledger.canonical()?,
        })
    }

    /// Check the signature against its own root.
    pub fn verify(&self, public_key: &PublicKey) -> bool {
        self.verify_for(&self.root, public_key)
    }

    /// Check the signature against an externally supplied root (e.g. the root
    /// of a proof document). Malformed signatures verify as `false`.
    pub fn verify_for(&self, root: &Digest, public_key: &PublicKey) -> bool {
        match Signature::from_hex(&self.signature) {
            Ok(sig) => verify_signature(root, &sig, public_key),
            Err(_) => false,
        }
    }
}
