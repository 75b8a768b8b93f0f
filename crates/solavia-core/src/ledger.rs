//! Provenance ledger: an ordered, append-only log of stage digests.
//!
//! Each stage records the digest of its input and of its output. The output
//! digests, in insertion order, are the leaves of the ledger's Merkle tree.
//! There is no deletion or reordering primitive.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::canonical::canonical_string;
use crate::context::Context;
use crate::crypto::{digest_value, Digest};
use crate::error::{CoreError, EncodingError, Result};
use crate::merkle::{merkle_root, MerkleTree, ProofStep};

/// One recorded computation stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stage {
    /// Stage name, as given by the caller.
    pub name: String,

    /// Digest of the stage input.
    pub input_hash: Digest,

    /// Digest of the stage output. `None` when the caller omitted it.
    pub output_hash: Option<Digest>,

    /// Deterministic timestamp (seed epoch + stage index).
    pub timestamp: i64,
}

/// Outcome of appending a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendResult {
    /// Stage recorded with both digests.
    Recorded { index: usize },
    /// Stage recorded, but without an output digest; it adds no Merkle leaf.
    MissingHash { index: usize },
}

impl AppendResult {
    /// Position of the stage in the ledger.
    pub fn index(&self) -> usize {
        match self {
            AppendResult::Recorded { index } | AppendResult::MissingHash { index } => *index,
        }
    }

    /// Check if the stage carried an output digest.
    pub fn is_complete(&self) -> bool {
        matches!(self, AppendResult::Recorded { .. })
    }
}

/// Append-only stage log bound to a [`Context`].
#[derive(Debug)]
pub struct ProvenanceLedger {
    context: Arc<Context>,
    stages: Vec<Stage>,
}

impl ProvenanceLedger {
    /// Create an empty ledger.
    pub fn new(context: Arc<Context>) -> Self {
        Self {
            context,
            stages: Vec::new(),
        }
    }

    /// Append a stage from pre-computed digests.
    ///
    /// A stage without an output digest is still recorded; the omission is
    /// logged and reported as [`AppendResult::MissingHash`].
    pub fn add_stage(
        &mut self,
        name: impl Into<String>,
        input_hash: Digest,
        output_hash: Option<Digest>,
    ) -> AppendResult {
        let name = name.into();
        let index = self.stages.len();

        if output_hash.is_none() {
            tracing::warn!(stage = %name, index, input_hash = %input_hash, "stage recorded without output hash");
        }

        let complete = output_hash.is_some();
        self.stages.push(Stage {
            name,
            input_hash,
            output_hash,
            timestamp: self.context.timestamp(index as u64),
        });

        if complete {
            AppendResult::Recorded { index }
        } else {
            AppendResult::MissingHash { index }
        }
    }

    /// Like [`add_stage`](Self::add_stage), but an omitted output digest comes
    /// back as [`CoreError::MissingHash`]. The stage is recorded either way.
    pub fn add_stage_checked(
        &mut self,
        name: impl Into<String>,
        input_hash: Digest,
        output_hash: Option<Digest>,
    ) -> Result<usize> {
        let name = name.into();
        match self.add_stage(name.clone(), input_hash, output_hash) {
            AppendResult::Recorded { index } => Ok(index),
            AppendResult::MissingHash { .. } => Err(CoreError::MissingHash { stage: name }),
        }
    }

    /// Digest `input` and `output`, then append the stage.
    pub fn record(
        &mut self,
        name: impl Into<String>,
        input: &Value,
        output: &Value,
    ) -> std::result::Result<usize, EncodingError> {
        let input_hash = digest_value(input)?;
        let output_hash = digest_value(output)?;
        Ok(self.add_stage(name, input_hash, Some(output_hash)).index())
    }

    /// Recorded stages, in insertion order.
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Number of recorded stages.
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Check if no stage has been recorded.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// The context this ledger draws timestamps from.
    pub fn context(&self) -> &Arc<Context> {
        &self.context
    }

    /// Merkle leaves: output digests of the stages that have one.
    pub fn leaves(&self) -> Vec<Digest> {
        self.stages.iter().filter_map(|s| s.output_hash).collect()
    }

    /// Recompute the Merkle root from the current leaves.
    pub fn merkle_root(&self) -> Option<Digest> {
        merkle_root(&self.leaves())
    }

    /// Inclusion proof for the `leaf_index`-th leaf.
    pub fn inclusion_proof(&self, leaf_index: usize) -> Option<Vec<ProofStep>> {
        MerkleTree::build(&self.leaves()).proof(leaf_index)
    }

    /// Canonical encoding of the stage list.
    pub fn canonical(&self) -> std::result::Result<String, EncodingError> {
        let value = serde_json::to_value(&self.stages)
            .map_err(|e| EncodingError::Unserializable(e.to_string()))?;
        canonical_string(&value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merkle::verify_inclusion;
    use serde_json::json;

    fn ledger() -> ProvenanceLedger {
        ProvenanceLedger::new(Arc::new(Context::from_host_identity("host", "linux", "x64")))
    }

    #[test]
    fn test_empty_ledger_has_no_root() {
        let l = ledger();
        assert!(l.is_empty());
        assert_eq!(l.merkle_root(), None);
    }

    #[test]
    fn test_two_stage_root() {
        let mut l = ledger();
        let (h1, h2) = (Digest::hash(b"one"), Digest::hash(b"two"));
        let input = Digest::hash(b"in");

        assert!(l.add_stage("A", input, Some(h1)).is_complete());
        assert!(l.add_stage("B", input, Some(h2)).is_complete());

        assert_eq!(l.merkle_root(), Some(Digest::hash_pair(&h1, &h2)));
        assert_eq!(l.len(), 2);
    }

    #[test]
    fn test_root_tracks_appends() {
        let mut l = ledger();
        let input = Digest::hash(b"in");
        l.add_stage("A", input, Some(Digest::hash(b"a")));
        let first = l.merkle_root();
        l.add_stage("B", input, Some(Digest::hash(b"b")));
        assert_ne!(l.merkle_root(), first);
        assert_eq!(l.merkle_root(), l.merkle_root());
    }

    #[test]
    fn test_missing_hash_is_recorded_and_signalled() {
        let mut l = ledger();
        let input = Digest::hash(b"in");
        let result = l.add_stage("NoOutput", input, None);

        assert_eq!(result, AppendResult::MissingHash { index: 0 });
        assert_eq!(l.len(), 1);
        assert!(l.leaves().is_empty());
        assert_eq!(l.merkle_root(), None);

        let err = l.add_stage_checked("Again", input, None).unwrap_err();
        assert!(matches!(err, CoreError::MissingHash { stage } if stage == "Again"));
        assert_eq!(l.len(), 2);
    }

    #[test]
    fn test_record_digests_values() {
        let mut l = ledger();
        let input = json!({"numbers": [1, 2, 3], "seed": 1337});
        let output = json!([2, 4, 6]);
        l.record("DoubleNumbers", &input, &output).unwrap();

        let stage = &l.stages()[0];
        assert_eq!(
            stage.input_hash.to_hex(),
            "f564638d2bdd6f84fbc34bb3f306ad214408e162ded3e36ad0a54116aa68a2ef"
        );
        assert_eq!(
            stage.output_hash.unwrap().to_hex(),
            "5949a6c45fd2fb2baa3e4576d5255e8752a72cf66402c0e141600be6d402675e"
        );
    }

    #[test]
    fn test_timestamps_follow_stage_index() {
        let mut l = ledger();
        let input = Digest::hash(b"in");
        l.add_stage("A", input, Some(input));
        l.add_stage("B", input, Some(input));
        let ts: Vec<i64> = l.stages().iter().map(|s| s.timestamp).collect();
        assert_eq!(ts[1], ts[0] + 1);
        assert_eq!(ts[0], l.context().timestamp(0));
    }

    #[test]
    fn test_inclusion_proof_against_root() {
        let mut l = ledger();
        let input = Digest::hash(b"in");
        for i in 0..5u8 {
            l.add_stage(format!("s{i}"), input, Some(Digest::hash(&[i])));
        }
        let root = l.merkle_root().unwrap();
        for (i, leaf) in l.leaves().iter().enumerate() {
            let proof = l.inclusion_proof(i).unwrap();
            assert!(verify_inclusion(leaf, &proof, &root));
        }
    }

    #[test]
    fn test_canonical_stage_list() {
        let mut l = ledger();
        let h = Digest::hash(b"x");
        l.add_stage("A", h, None);
        let canonical = l.canonical().unwrap();
        assert!(canonical.starts_with(&format!(
            "[{{\"inputHash\":\"{h}\",\"name\":\"A\",\"outputHash\":null,\"timestamp\":"
        )));
    }
}
