//! Golden test vectors for deterministic verification.
//!
//! These vectors pin canonical encoding, hashing, the generators and the
//! deterministic clock so that every implementation agrees bit for bit.

use serde_json::json;
use solavia::pipeline::step_id;
use solavia_core::context::deterministic_timestamp;
use solavia_core::snapshot::capture;
use solavia_core::{canonical_string, digest_value, merkle_root, ChainedRng, Digest, FastPrng, StateMap};

/// A golden test vector.
#[derive(Debug, Clone)]
pub struct GoldenVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    /// What the vector pins.
    pub description: &'static str,
    /// Expected output, as text.
    pub expected: &'static str,
    compute: fn() -> String,
}

impl GoldenVector {
    /// Compute the vector's output with this implementation.
    pub fn compute(&self) -> String {
        (self.compute)()
    }

    /// Whether the computed output matches the expected one.
    pub fn check(&self) -> bool {
        self.compute() == self.expected
    }
}

fn join<T: ToString>(values: impl IntoIterator<Item = T>) -> String {
    values.into_iter().map(|v| v.to_string()).collect::<Vec<_>>().join(",")
}

fn fast_prng(seed: u32, count: usize) -> String {
    let mut rng = FastPrng::new(seed);
    join((0..count).map(|_| rng.next()))
}

fn reference_state() -> StateMap {
    match json!({"b": 2, "a": {"x": [1]}}) {
        serde_json::Value::Object(map) => map,
        _ => StateMap::new(),
    }
}

/// Get all golden test vectors.
pub fn all_vectors() -> Vec<GoldenVector> {
    vec![
        GoldenVector {
            name: "canonical_key_order",
            description: "Nested object with unsorted keys",
            expected: r#"{"a":{"x":[1]},"b":2}"#,
            compute: || canonical_string(&json!({"b": 2, "a": {"x": [1]}})).unwrap_or_default(),
        },
        GoldenVector {
            name: "merkle_odd_leaves",
            description: "Root over sha256(a), sha256(b), sha256(c); c is paired with itself",
            expected: "d31a37ef6ac14a2db1470c4316beb5592e6afd4465022339adafda76a18ffabe",
            compute: || {
                let leaves: Vec<Digest> = ["a", "b", "c"].iter().map(|s| Digest::hash(s.as_bytes())).collect();
                merkle_root(&leaves).map(|r| r.to_hex()).unwrap_or_default()
            },
        },
        GoldenVector {
            name: "example_pipeline_root",
            description: "Root over the outputs of the example pipeline with seed 1337",
            expected: "10fee41b9017216dc26c288203884d3d9a359ebe5020c0f8722b7089ab11b503",
            compute: || {
                let outputs = [
                    json!([2, 4, 6]),
                    json!({"count": 3, "sum": 12}),
                    json!({"avg": 4, "seedUsed": 1337}),
                ];
                let leaves: Vec<Digest> = outputs.iter().filter_map(|o| digest_value(o).ok()).collect();
                merkle_root(&leaves).map(|r| r.to_hex()).unwrap_or_default()
            },
        },
        GoldenVector {
            name: "chained_rng_bytes",
            description: "First 8 bytes of ChainedRng(\"seed\")",
            expected: "a7dd071ee58ad9de",
            compute: || hex::encode(ChainedRng::new("seed").next_bytes(8)),
        },
        GoldenVector {
            name: "chained_rng_uuid",
            description: "UUID drawn after the first 8 bytes of ChainedRng(\"seed\")",
            expected: "194ff53d-0742-460b-b8c6-125050a6c045",
            compute: || {
                let mut rng = ChainedRng::new("seed");
                rng.next_bytes(8);
                rng.uuid()
            },
        },
        GoldenVector {
            name: "fast_prng_1337",
            description: "First six outputs of FastPrng(1337)",
            expected: "26630802,3358721743,506475537,2064907408,814506556,1944320075",
            compute: || fast_prng(1337, 6),
        },
        GoldenVector {
            name: "fast_prng_42",
            description: "First six outputs of FastPrng(42)",
            expected: "1705058134,1938743286,1704420370,1915420905,4172106921,510592048",
            compute: || fast_prng(42, 6),
        },
        GoldenVector {
            name: "fast_prng_zero",
            description: "A zero seed stays at zero",
            expected: "0,0,0",
            compute: || fast_prng(0, 3),
        },
        GoldenVector {
            name: "fast_prng_next_int",
            description: "FastPrng(1337).next_int(1000), three draws",
            expected: "6,782,117",
            compute: || {
                let mut rng = FastPrng::new(1337);
                join((0..3).map(|_| rng.next_int(1000)))
            },
        },
        GoldenVector {
            name: "deterministic_timestamp",
            description: "Clock base for the seed text \"seed\"",
            expected: "28253776961985",
            compute: || deterministic_timestamp("seed", 0).to_string(),
        },
        GoldenVector {
            name: "snapshot_id",
            description: "Snapshot id of {b: 2, a: {x: [1]}}",
            expected: "8f2cf00cf03e",
            compute: || capture("golden", &reference_state(), 0).map(|s| s.id).unwrap_or_default(),
        },
        GoldenVector {
            name: "step_id",
            description: "Pipeline step id of \"double\"",
            expected: "2ce06a9e",
            compute: || step_id("double"),
        },
    ]
}

/// Check every vector. Returns `(name, expected, actual)` for each mismatch.
pub fn verify_all_vectors() -> Vec<(&'static str, &'static str, String)> {
    all_vectors()
        .into_iter()
        .filter_map(|v| {
            let actual = v.compute();
            (actual != v.expected).then_some((v.name, v.expected, actual))
        })
        .collect()
}
