//! Proptest generators for property-based testing.

use proptest::prelude::*;
use serde_json::Value;

use solavia_core::{Digest, Keypair, StateMap};

/// Generate a random keypair.
pub fn keypair() -> impl Strategy<Value = Keypair> {
    any::<[u8; 32]>().prop_map(|seed| Keypair::from_seed(&seed))
}

/// Generate a random digest.
pub fn digest() -> impl Strategy<Value = Digest> {
    any::<[u8; 32]>().prop_map(Digest::from_bytes)
}

/// Generate between 1 and `max` leaf digests.
pub fn leaves(max: usize) -> impl Strategy<Value = Vec<Digest>> {
    prop::collection::vec(digest(), 1..=max)
}

/// Generate a stage name.
pub fn stage_name() -> impl Strategy<Value = String> {
    "[A-Za-z][A-Za-z0-9_-]{0,23}".prop_map(String::from)
}

/// Generate a JSON value that survives a canonical text round trip.
///
/// Numbers are integers within ±2^53 only; floats and wider integers are
/// pinned by the golden vectors.
pub fn json_value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        (-(1i64 << 53)..=(1i64 << 53)).prop_map(Value::from),
        "\\PC{0,16}".prop_map(Value::from),
    ];
    leaf.prop_recursive(4, 48, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::btree_map("\\PC{0,8}", inner, 0..6)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

/// Generate a runtime state map.
pub fn state_map() -> impl Strategy<Value = StateMap> {
    prop::collection::btree_map("[a-z]{1,8}", json_value(), 0..8).prop_map(|m| m.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use solavia_core::snapshot::{capture, restore};
    use solavia_core::{
        canonical_string, digest_value, merkle_root, sign_root, verify_inclusion, verify_root,
        verify_signature, ChainedRng, MerkleTree,
    };

    /// Rebuild every object with its keys inserted in reverse order.
    fn reversed(value: &Value) -> Value {
        match value {
            Value::Array(items) => Value::Array(items.iter().map(reversed).collect()),
            Value::Object(map) => {
                let mut out = serde_json::Map::new();
                for (k, v) in map.iter().rev() {
                    out.insert(k.clone(), reversed(v));
                }
                Value::Object(out)
            }
            other => other.clone(),
        }
    }

    proptest! {
        #[test]
        fn test_canonical_ignores_key_order(v in json_value()) {
            prop_assert_eq!(canonical_string(&v).unwrap(), canonical_string(&reversed(&v)).unwrap());
            prop_assert_eq!(digest_value(&v).unwrap(), digest_value(&reversed(&v)).unwrap());
        }

        #[test]
        fn test_canonical_text_parses_back(v in json_value()) {
            let text = canonical_string(&v).unwrap();
            let parsed: Value = serde_json::from_str(&text).unwrap();
            prop_assert_eq!(parsed, v);
        }

        #[test]
        fn test_merkle_root_deterministic(l in leaves(17)) {
            prop_assert_eq!(merkle_root(&l), merkle_root(&l));
            prop_assert!(verify_root(merkle_root(&l).as_ref(), &l));
        }

        #[test]
        fn test_single_bit_flip_changes_root(
            l in leaves(17),
            index in any::<prop::sample::Index>(),
            bit in 0usize..256,
        ) {
            let root = merkle_root(&l);
            let mut tampered = l.clone();
            let i = index.index(tampered.len());
            tampered[i].0[bit / 8] ^= 1 << (bit % 8);
            prop_assert!(!verify_root(root.as_ref(), &tampered));
        }

        #[test]
        fn test_inclusion_proofs_verify(l in leaves(17)) {
            let tree = MerkleTree::build(&l);
            let root = tree.root().unwrap();
            for (i, leaf) in l.iter().enumerate() {
                let proof = tree.proof(i).unwrap();
                prop_assert!(verify_inclusion(leaf, &proof, &root));
            }
        }

        #[test]
        fn test_chained_rng_equal_seeds(seed in prop::collection::vec(any::<u8>(), 0..64), n in 0usize..200) {
            let mut a = ChainedRng::new(&seed);
            let mut b = ChainedRng::new(&seed);
            prop_assert_eq!(a.next_bytes(n), b.next_bytes(n));
        }

        #[test]
        fn test_snapshot_restores_state(state in state_map()) {
            let snapshot = capture("prop", &state, 0).unwrap();
            prop_assert_eq!(restore(&snapshot).unwrap(), state);
        }

        #[test]
        fn test_signature_binds_root(kp in keypair(), root in digest(), other in digest()) {
            prop_assume!(root != other);
            let signature = sign_root(Some(&root), Some(&kp)).unwrap();
            prop_assert!(verify_signature(&root, &signature, &kp.public_key()));
            prop_assert!(!verify_signature(&other, &signature, &kp.public_key()));
        }
    }
}
