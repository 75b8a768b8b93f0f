//! Binary Merkle tree over an ordered sequence of leaf digests.
//!
//! Layout:
//!   level[0]     = leaves, in ledger order
//!   level[k+1]   = H(level[k][2i] || level[k][2i+1])
//!   odd count    = last node paired with itself (duplicate-last, no padding)
//!   root         = the single node of the top level
//!
//! Leaves are used as given: a one-leaf tree's root is the leaf itself, and
//! an empty tree has no root at all (never `H("")`).

use crate::crypto::Digest;

/// Compute the Merkle root of an ordered leaf sequence.
///
/// Returns `None` for an empty sequence.
pub fn merkle_root(leaves: &[Digest]) -> Option<Digest> {
    if leaves.is_empty() {
        return None;
    }

    let mut level = leaves.to_vec();
    while level.len() > 1 {
        level = next_level(&level);
    }
    level.first().copied()
}

/// Recompute the root of `leaves` and compare it with `root`.
///
/// Never errors: any mismatch, including an absent/present disagreement,
/// is simply `false`.
pub fn verify_root(root: Option<&Digest>, leaves: &[Digest]) -> bool {
    merkle_root(leaves).as_ref() == root
}

/// Hash one level into its parent level.
fn next_level(level: &[Digest]) -> Vec<Digest> {
    level
        .chunks(2)
        .map(|pair| {
            let left = &pair[0];
            let right = pair.get(1).unwrap_or(left);
            Digest::hash_pair(left, right)
        })
        .collect()
}

/// Which side of the running hash a sibling sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

/// One step of an inclusion proof.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProofStep {
    pub sibling: Digest,
    pub side: Side,
}

/// A fully materialised Merkle tree, keeping every level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleTree {
    levels: Vec<Vec<Digest>>,
}

impl MerkleTree {
    /// Build the tree bottom-up.
    pub fn build(leaves: &[Digest]) -> Self {
        let mut levels = vec![leaves.to_vec()];
        while levels.last().map_or(false, |l| l.len() > 1) {
            let parent = next_level(&levels[levels.len() - 1]);
            levels.push(parent);
        }
        Self { levels }
    }

    /// Number of leaves.
    pub fn leaf_count(&self) -> usize {
        self.levels[0].len()
    }

    /// The root, or `None` for an empty tree.
    pub fn root(&self) -> Option<Digest> {
        self.levels.last().and_then(|top| {
            if top.len() == 1 {
                top.first().copied()
            } else {
                None
            }
        })
    }

    /// Inclusion proof for the leaf at `index`: sibling steps from leaf to root.
    ///
    /// A node without a right sibling is paired with itself, so its proof step
    /// carries its own digest.
    pub fn proof(&self, index: usize) -> Option<Vec<ProofStep>> {
        if index >= self.leaf_count() {
            return None;
        }

        let mut steps = Vec::with_capacity(self.levels.len().saturating_sub(1));
        let mut i = index;
        for level in &self.levels[..self.levels.len() - 1] {
            let step = if i % 2 == 0 {
                ProofStep {
                    sibling: *level.get(i + 1).unwrap_or(&level[i]),
                    side: Side::Right,
                }
            } else {
                ProofStep {
                    sibling: level[i - 1],
                    side: Side::Left,
                }
            };
            steps.push(step);
            i /= 2;
        }
        Some(steps)
    }
}

/// Check that `leaf` folds through `proof` to `root`.
pub fn verify_inclusion(leaf: &Digest, proof: &[ProofStep], root: &Digest) -> bool {
    let computed = proof.iter().fold(*leaf, |acc, step| match step.side {
        Side::Right => Digest::hash_pair(&acc, &step.sibling),
        Side::Left => Digest::hash_pair(&step.sibling, &acc),
    });
    &computed == root
}
