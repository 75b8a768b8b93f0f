//! # SolaVia Core
//!
//! Pure primitives for SolaVia provenance tracking: canonical encoding,
//! hashing, Merkle roots, deterministic generators, the provenance ledger,
//! proofs, signatures and snapshots.
//!
//! This crate does no storage and no networking. Everything it produces is a
//! pure function of its inputs and the [`Context`] seed, so independent runs
//! and independent implementations agree bit for bit.
//!
//! ## Key Types
//!
//! - [`Digest`] - SHA-256 output, hex on the wire
//! - [`Context`] - seed, chained generator and deterministic clock
//! - [`ProvenanceLedger`] - append-only stage log whose output digests are Merkle leaves
//! - [`ProofDocument`] / [`SignatureDocument`] - exported, verifiable artifacts
//! - [`Snapshot`] - content-addressed capture of a [`StateMap`]
//!
//! ## Canonicalization
//!
//! Every hash is taken over canonical JSON text. See the [`canonical`] module.

pub mod canonical;
pub mod context;
pub mod crypto;
pub mod error;
pub mod ledger;
pub mod merkle;
pub mod proof;
pub mod rng;
pub mod snapshot;

pub use canonical::{canonical_bytes, canonical_string, encode};
pub use context::Context;
pub use crypto::{digest, digest_hex, digest_value, Digest, Keypair, PublicKey, Signature};
pub use error::{CoreError, EncodingError, Result};
pub use ledger::{AppendResult, ProvenanceLedger, Stage};
pub use merkle::{merkle_root, verify_inclusion, verify_root, MerkleTree, ProofStep, Side};
pub use proof::{sign_root, verify_signature, ProofDocument, SignatureDocument, StageSummary};
pub use rng::{ChainedRng, FastPrng};
pub use snapshot::{Snapshot, StateMap};
