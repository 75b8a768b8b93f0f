//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::sync::Arc;

use serde_json::Value;
use solavia::{Runtime, RuntimeConfig};
use solavia_core::{Context, Digest, Keypair, ProofDocument};
use solavia_store::{MemoryStore, Storage};

/// Host identity every fixture is seeded from.
pub const FIXTURE_HOST: (&str, &str, &str) = ("host", "linux", "x64");

/// A runtime on an in-memory store, seeded from a fixed host identity, plus a
/// deterministic signing key.
pub struct TestFixture {
    pub keypair: Keypair,
    pub storage: Arc<dyn Storage>,
    pub runtime: Runtime,
}

impl TestFixture {
    /// Create a fixture with the default signing seed.
    pub fn new() -> Self {
        Self::with_seed([0x42; 32])
    }

    /// Create a fixture whose signing key derives from `seed`.
    pub fn with_seed(seed: [u8; 32]) -> Self {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStore::new());
        Self {
            keypair: Keypair::from_seed(&seed),
            runtime: runtime_on(storage.clone()),
            storage,
        }
    }

    /// A second runtime over the same storage, as after a restart.
    pub fn reopen(&self) -> Runtime {
        runtime_on(self.storage.clone())
    }

    /// Record a stage from raw values.
    pub fn record(&self, name: &str, input: impl Into<Value>, output: impl Into<Value>) -> usize {
        self.runtime
            .record_stage(name, &input.into(), &output.into())
            .unwrap_or_else(|e| panic!("recording {name}: {e}"))
    }

    /// Export a proof of everything recorded so far.
    pub fn proof(&self) -> ProofDocument {
        self.runtime.export_proof()
    }

    /// Current Merkle root; panics on an empty ledger.
    pub fn root(&self) -> Digest {
        self.runtime
            .merkle_root()
            .unwrap_or_else(|| panic!("fixture ledger is empty"))
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

fn runtime_on(storage: Arc<dyn Storage>) -> Runtime {
    let (host, platform, arch) = FIXTURE_HOST;
    Runtime::with_parts(
        RuntimeConfig::default(),
        Arc::new(Context::from_host_identity(host, platform, arch)),
        storage,
        None,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use solavia_core::{digest_value, verify_signature};

    #[test]
    fn test_two_stage_root() {
        let fixture = TestFixture::new();
        fixture.record("A", json!({"in": 1}), "A-out");
        fixture.record("B", json!({"in": 2}), "B-out");

        let h1 = digest_value(&json!("A-out")).unwrap();
        let h2 = digest_value(&json!("B-out")).unwrap();
        assert_eq!(fixture.root(), Digest::hash_pair(&h1, &h2));

        let mut proof = fixture.proof();
        assert!(proof.verify());
        proof.stages[0].output_hash = Some(h2);
        assert!(!proof.verify());
    }

    #[test]
    fn test_fixture_signing() {
        let fixture = TestFixture::new();
        fixture.record("A", 1, "A");
        let document = fixture.runtime.sign(Some(&fixture.keypair)).unwrap();
        let signature = solavia_core::Signature::from_hex(&document.signature).unwrap();
        assert!(verify_signature(&fixture.root(), &signature, &fixture.keypair.public_key()));
    }

    #[tokio::test]
    async fn test_reopen_sees_persisted_state() {
        let fixture = TestFixture::new();
        fixture.runtime.set_state("k", json!("v"));
        fixture.runtime.persist().await.unwrap();

        let reopened = fixture.reopen();
        reopened.start().await.unwrap();
        assert_eq!(reopened.state().get("k"), Some(&json!("v")));
        reopened.stop().await;
    }

    #[test]
    fn test_fixtures_share_context_seed() {
        let a = TestFixture::new();
        let b = TestFixture::with_seed([1; 32]);
        assert_eq!(a.runtime.context().seed(), b.runtime.context().seed());
        assert_ne!(a.keypair.public_key(), b.keypair.public_key());
    }
}
