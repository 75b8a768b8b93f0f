//! The Runtime: unified API for SolaVia.
//!
//! Wires the deterministic context, storage (with fallback), the provenance
//! ledger, the snapshot store, agents, algorithms and autosave together.

use std::path::Path;
use std::sync::{Arc, Mutex, RwLock};

use chrono::{SecondsFormat, Utc};
use serde_json::{json, Value};
use solavia_core::{
    digest_value, AppendResult, Context, Digest, Keypair, ProofDocument, ProvenanceLedger, SignatureDocument,
    Snapshot, Stage, StateMap,
};
use solavia_store::{open_storage, Address, Storage};

use crate::agent::{AgentManager, AgentRecord, AskOptions, Model};
use crate::autosave::AutoSaver;
use crate::config::RuntimeConfig;
use crate::error::{Result, RuntimeError};
use crate::pipeline::{
    example_pipeline, AlgorithmOutcome, AlgorithmRegistry, Pipeline, PipelineFile, Step,
};
use crate::snapshot::SnapshotStore;

/// Storage list holding registered algorithm names.
pub const ALGORITHMS_KEY: &str = "algorithms";

/// Storage list holding ledger metadata.
pub const LEDGER_KEY: &str = "ledger";

/// Storage list holding the state map.
pub const STATE_KEY: &str = "state";

/// The main Runtime struct.
///
/// Provides a unified API for:
/// - Recording stages and running pipelines
/// - Computing, exporting and signing the Merkle root
/// - Snapshotting and rolling back state
/// - Agents and algorithms
/// - Periodic persistence
pub struct Runtime {
    inner: Arc<RuntimeInner>,
    autosave: tokio::sync::Mutex<Option<AutoSaver>>,
}

struct RuntimeInner {
    config: RuntimeConfig,
    context: Arc<Context>,
    storage: Arc<dyn Storage>,
    model: Option<Arc<dyn Model>>,
    ledger: Mutex<ProvenanceLedger>,
    snapshots: SnapshotStore,
    agents: tokio::sync::Mutex<AgentManager>,
    algorithms: RwLock<AlgorithmRegistry>,
}

impl Runtime {
    /// Open a runtime seeded from the host identity, on the configured
    /// storage backend. Creates the output directory.
    pub fn open(config: RuntimeConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.output_dir)?;
        let storage = open_storage(&config.storage_backend());
        Ok(Self::with_parts(config, Arc::new(Context::from_host()), storage, None))
    }

    /// Assemble a runtime from explicit parts.
    pub fn with_parts(
        config: RuntimeConfig,
        context: Arc<Context>,
        storage: Arc<dyn Storage>,
        model: Option<Arc<dyn Model>>,
    ) -> Self {
        let inner = RuntimeInner {
            ledger: Mutex::new(ProvenanceLedger::new(context.clone())),
            snapshots: SnapshotStore::new(context.clone(), storage.clone()),
            agents: tokio::sync::Mutex::new(AgentManager::new(context.clone(), config.id_prefix.clone())),
            algorithms: RwLock::new(AlgorithmRegistry::new()),
            config,
            context,
            storage,
            model,
        };
        Self {
            inner: Arc::new(inner),
            autosave: tokio::sync::Mutex::new(None),
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.inner.config
    }

    pub fn context(&self) -> &Arc<Context> {
        &self.inner.context
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.inner.storage
    }

    pub fn snapshots(&self) -> &SnapshotStore {
        &self.inner.snapshots
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    /// Load agents and state from storage, then start autosave.
    pub async fn start(&self) -> Result<()> {
        let agents = self.inner.agents.lock().await.load(self.inner.storage.as_ref()).await?;

        let stored = self.inner.storage.load_list(STATE_KEY).await?;
        if let Some(Value::Object(state)) = stored.into_iter().next() {
            self.inner.snapshots.replace(state);
        }

        let mut autosave = self.autosave.lock().await;
        if autosave.is_none() {
            let inner = self.inner.clone();
            *autosave = Some(AutoSaver::start(self.inner.config.autosave_interval, move || {
                let inner = inner.clone();
                Box::pin(async move { inner.persist().await })
            }));
        }

        tracing::info!(
            backend = self.inner.storage.backend_name(),
            seed = %self.inner.context.seed(),
            agents,
            "runtime started"
        );
        Ok(())
    }

    /// Persist agents, the algorithm registry, ledger metadata and state.
    pub async fn persist(&self) -> Result<()> {
        self.inner.persist().await
    }

    /// Stop autosave. No autosave tick runs after this returns.
    pub async fn stop(&self) {
        if let Some(saver) = self.autosave.lock().await.take() {
            let ticks = saver.stop().await;
            tracing::debug!(ticks, "autosave stopped");
        }
        tracing::info!("runtime stopped");
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Ledger
    // ─────────────────────────────────────────────────────────────────────────

    /// Append a stage from pre-computed digests.
    pub fn add_stage(&self, name: &str, input_hash: Digest, output_hash: Option<Digest>) -> AppendResult {
        self.inner.ledger.lock().unwrap().add_stage(name, input_hash, output_hash)
    }

    /// Digest `input` and `output` and append the stage.
    pub fn record_stage(&self, name: &str, input: &Value, output: &Value) -> Result<usize> {
        Ok(self.inner.ledger.lock().unwrap().record(name, input, output)?)
    }

    /// Copy of the recorded stages.
    pub fn stages(&self) -> Vec<Stage> {
        self.inner.ledger.lock().unwrap().stages().to_vec()
    }

    /// Current Merkle root.
    pub fn merkle_root(&self) -> Option<Digest> {
        self.inner.ledger.lock().unwrap().merkle_root()
    }

    /// Run a pipeline, recording every step and storing each step's output in
    /// the state map under the step name.
    pub async fn run_pipeline(&self, pipeline: &Pipeline, input: Value) -> Result<Value> {
        let mut value = input;
        for step in pipeline.steps() {
            let output = step.step.run(value.clone()).await?;
            self.record_stage(&step.name, &value, &output)?;
            self.inner.snapshots.set(step.name.clone(), output.clone());
            value = output;
        }
        Ok(value)
    }

    /// Run the built-in example pipeline with the configured seed.
    pub async fn run_example(&self) -> Result<Value> {
        let (pipeline, input) = example_pipeline(self.inner.config.seed);
        self.run_pipeline(&pipeline, input).await
    }

    /// Record the stages of a pipeline file. Stages without an output are
    /// recorded without an output hash.
    pub fn record_file(&self, file: &PipelineFile) -> Result<Vec<AppendResult>> {
        let mut ledger = self.inner.ledger.lock().unwrap();
        let mut results = Vec::with_capacity(file.stages.len());
        for stage in &file.stages {
            let input_hash = digest_value(&stage.input)?;
            let output_hash = match &stage.output {
                Some(output) => Some(digest_value(output)?),
                None => None,
            };
            results.push(ledger.add_stage(stage.name.as_str(), input_hash, output_hash));
        }
        Ok(results)
    }

    /// Export a proof of the current ledger, stamped with the wall clock.
    pub fn export_proof(&self) -> ProofDocument {
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let ledger = self.inner.ledger.lock().unwrap();
        ProofDocument::from_ledger(&ledger, self.inner.config.seed, timestamp)
    }

    /// Export a proof and write it to `path` as pretty JSON.
    pub fn write_proof(&self, path: &Path) -> Result<ProofDocument> {
        let proof = self.export_proof();
        write_json(path, &proof)?;
        tracing::info!(path = %path.display(), root = ?proof.root, "proof written");
        Ok(proof)
    }

    /// Sign the current root.
    pub fn sign(&self, keypair: Option<&Keypair>) -> Result<SignatureDocument> {
        let ledger = self.inner.ledger.lock().unwrap();
        Ok(SignatureDocument::sign(&ledger, keypair)?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // State and snapshots
    // ─────────────────────────────────────────────────────────────────────────

    /// Set one state entry.
    pub fn set_state(&self, key: &str, value: Value) {
        self.inner.snapshots.set(key, value);
    }

    /// Copy of the state map.
    pub fn state(&self) -> StateMap {
        self.inner.snapshots.state()
    }

    /// Capture and persist a snapshot.
    pub async fn snapshot(&self, name: &str) -> Result<Snapshot> {
        self.inner.snapshots.save(name).await
    }

    /// Restore the snapshot stored at `address`.
    pub async fn rollback(&self, address: &Address) -> Result<Snapshot> {
        self.inner.snapshots.rollback(address).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Agents and algorithms
    // ─────────────────────────────────────────────────────────────────────────

    /// Create an agent.
    pub async fn create_agent(&self, name: &str, specialty: &str, seed: Option<u32>) -> AgentRecord {
        self.inner.agents.lock().await.create(name, specialty, seed).record()
    }

    /// Records of all agents.
    pub async fn agents(&self) -> Vec<AgentRecord> {
        self.inner.agents.lock().await.list().iter().map(|a| a.record()).collect()
    }

    /// Ask the named agent.
    pub async fn ask(
        &self,
        agent: &str,
        prompt: &str,
        context: &str,
        pass: u32,
        options: &AskOptions,
    ) -> Result<String> {
        let mut agents = self.inner.agents.lock().await;
        let agent = agents.find_by_name_mut(agent)?;
        Ok(agent
            .ask(
                prompt,
                context,
                pass,
                options,
                self.inner.model.as_deref(),
                &self.inner.config.model,
            )
            .await)
    }

    /// Ask the named agent once per configured pass (`1..=passes`). Each
    /// pass after the first sees the previous answer as its context.
    pub async fn deliberate(&self, agent: &str, prompt: &str, options: &AskOptions) -> Result<Vec<String>> {
        let mut answers: Vec<String> = Vec::with_capacity(self.inner.config.passes as usize);
        for pass in 1..=self.inner.config.passes {
            let context = answers.last().map(String::as_str).unwrap_or("");
            let answer = self.ask(agent, prompt, context, pass, options).await?;
            answers.push(answer);
        }
        Ok(answers)
    }

    /// Register a synchronous algorithm.
    pub fn register_algorithm<F>(&self, name: &str, f: F)
    where
        F: Fn(Value) -> Result<Value> + Send + Sync + 'static,
    {
        self.inner.algorithms.write().unwrap().register(name, f);
    }

    /// Register any [`Step`] as an algorithm.
    pub fn register_algorithm_step(&self, name: &str, step: impl Step + 'static) {
        self.inner.algorithms.write().unwrap().register_step(name, step);
    }

    /// Run every registered algorithm against `input`.
    pub async fn run_algorithms(&self, input: &Value) -> Vec<AlgorithmOutcome> {
        let registry = self.inner.algorithms.read().unwrap().clone();
        registry.run_all(input).await
    }
}

/// Write `value` to `path` as pretty JSON, creating parent directories.
pub fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let text = serde_json::to_string_pretty(value).map_err(|e| RuntimeError::InvalidDocument(e.to_string()))?;
    std::fs::write(path, text)?;
    Ok(())
}

impl RuntimeInner {
    async fn persist(&self) -> Result<()> {
        self.agents.lock().await.save(self.storage.as_ref()).await?;

        let names: Vec<Value> = self
            .algorithms
            .read()
            .unwrap()
            .names()
            .into_iter()
            .map(|name| json!({ "name": name }))
            .collect();
        self.storage.save_list(ALGORITHMS_KEY, &names).await?;

        let metadata = {
            let ledger = self.ledger.lock().unwrap();
            json!({
                "stages": ledger.len(),
                "root": ledger.merkle_root(),
                "seed": self.config.seed,
            })
        };
        self.storage.save_list(LEDGER_KEY, &[metadata]).await?;

        let state = Value::Object(self.snapshots.state());
        self.storage.save_list(STATE_KEY, &[state]).await?;
        Ok(())
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("seed", &self.inner.context.seed())
            .field("backend", &self.inner.storage.backend_name())
            .field("config", &self.inner.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solavia_store::MemoryStore;

    fn runtime_on(storage: Arc<dyn Storage>) -> Runtime {
        Runtime::with_parts(
            RuntimeConfig::default(),
            Arc::new(Context::from_host_identity("host", "linux", "x64")),
            storage,
            None,
        )
    }

    fn runtime() -> Runtime {
        runtime_on(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn test_example_pipeline_root() {
        let rt = runtime();
        let out = rt.run_example().await.unwrap();
        assert_eq!(out, json!({"avg": 4, "seedUsed": 1337}));
        assert_eq!(
            rt.merkle_root().unwrap().to_hex(),
            "10fee41b9017216dc26c288203884d3d9a359ebe5020c0f8722b7089ab11b503"
        );
        assert_eq!(rt.state().get("Summarize"), Some(&json!({"count": 3, "sum": 12})));
    }

    #[tokio::test]
    async fn test_failed_step_keeps_earlier_stages() {
        let rt = runtime();
        let pipeline = Pipeline::new()
            .with_step("ok", |v: Value| Ok(v))
            .with_step("bad", |_: Value| Err(RuntimeError::step("bad", "boom")));
        assert!(rt.run_pipeline(&pipeline, json!(1)).await.is_err());
        assert_eq!(rt.stages().len(), 1);
    }

    #[test]
    fn test_record_file_with_missing_output() {
        let rt = runtime();
        let file = PipelineFile::from_json(
            r#"{"stages": [{"name": "a", "input": 1, "output": 2}, {"name": "b", "input": 2}]}"#,
        )
        .unwrap();
        let results = rt.record_file(&file).unwrap();
        assert!(results[0].is_complete());
        assert!(!results[1].is_complete());
        assert_eq!(rt.merkle_root(), Some(digest_value(&json!(2)).unwrap()));
    }

    #[tokio::test]
    async fn test_proof_and_signature() {
        let rt = runtime();
        rt.run_example().await.unwrap();

        let proof = rt.export_proof();
        assert!(proof.verify());
        assert_eq!(proof.seed, 1337);
        assert!(proof.timestamp.ends_with('Z'));

        let keypair = Keypair::from_seed(&[1; 32]);
        let signed = rt.sign(Some(&keypair)).unwrap();
        assert_eq!(Some(signed.root), proof.root);
        assert!(signed.verify(&keypair.public_key()));
    }

    #[tokio::test]
    async fn test_write_proof() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/proof.json");
        let rt = runtime();
        rt.run_example().await.unwrap();
        rt.write_proof(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let read: ProofDocument = serde_json::from_str(&text).unwrap();
        assert!(read.verify());
        assert_eq!(read.stages.len(), 3);
    }

    #[test]
    fn test_sign_empty_ledger() {
        let rt = runtime();
        let err = rt.sign(Some(&Keypair::from_seed(&[1; 32]))).unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::Core(solavia_core::CoreError::SigningUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_persist_and_restart() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStore::new());

        let rt = runtime_on(storage.clone());
        rt.create_agent("Analyst", "numbers", Some(42)).await;
        rt.register_algorithm("echo", |v: Value| Ok(v));
        rt.set_state("answer", json!(42));
        rt.persist().await.unwrap();

        assert_eq!(storage.load_list(ALGORITHMS_KEY).await.unwrap(), vec![json!({"name": "echo"})]);
        let meta = storage.load_list(LEDGER_KEY).await.unwrap();
        assert_eq!(meta[0]["stages"], json!(0));
        assert!(meta[0]["root"].is_null());

        let restarted = runtime_on(storage);
        restarted.start().await.unwrap();
        assert_eq!(restarted.agents().await[0].name, "Analyst");
        assert_eq!(restarted.state().get("answer"), Some(&json!(42)));
        restarted.stop().await;
    }

    #[tokio::test]
    async fn test_start_with_zero_autosave_interval() {
        let config = RuntimeConfig {
            autosave_interval: std::time::Duration::ZERO,
            ..RuntimeConfig::default()
        };
        let rt = Runtime::with_parts(
            config,
            Arc::new(Context::from_host_identity("host", "linux", "x64")),
            Arc::new(MemoryStore::new()),
            None,
        );
        rt.start().await.unwrap();
        rt.set_state("k", json!(1));
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        rt.stop().await;
        assert_eq!(rt.storage().load_list(STATE_KEY).await.unwrap(), vec![json!({"k": 1})]);
    }

    #[tokio::test]
    async fn test_ask_unknown_agent() {
        let rt = runtime();
        let err = rt.ask("ghost", "hi", "", 1, &AskOptions::default()).await.unwrap_err();
        assert!(matches!(err, RuntimeError::AgentNotFound(_)));
    }

    #[derive(Default)]
    struct Recorder {
        inputs: Mutex<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl Model for Recorder {
        async fn generate(&self, _model: &str, input: &str) -> Result<String> {
            let mut inputs = self.inputs.lock().unwrap();
            inputs.push(input.to_string());
            Ok(format!("answer{}", inputs.len()))
        }
    }

    #[tokio::test]
    async fn test_deliberate_runs_configured_passes() {
        let model = Arc::new(Recorder::default());
        let config = RuntimeConfig {
            passes: 3,
            ..RuntimeConfig::default()
        };
        let rt = Runtime::with_parts(
            config,
            Arc::new(Context::from_host_identity("host", "linux", "x64")),
            Arc::new(MemoryStore::new()),
            Some(model.clone() as Arc<dyn Model>),
        );
        rt.create_agent("Analyst", "numbers", None).await;

        let answers = rt.deliberate("Analyst", "sum?", &AskOptions::default()).await.unwrap();
        assert_eq!(answers, vec!["answer1", "answer2", "answer3"]);

        let inputs = model.inputs.lock().unwrap();
        assert!(inputs[0].starts_with("sum?\nContext:\nSeed:"));
        assert!(inputs[1].starts_with("sum?\nContext:answer1\nSeed:"));
        assert!(inputs[2].starts_with("sum?\nContext:answer2\nSeed:"));
    }

    #[tokio::test]
    async fn test_algorithms_through_runtime() {
        let rt = runtime();
        rt.register_algorithm("len", |v: Value| Ok(json!(v.as_array().map_or(0, Vec::len))));
        rt.register_algorithm("fail", |_: Value| Err(RuntimeError::step("fail", "x")));
        let outcomes = rt.run_algorithms(&json!([1, 2])).await;
        assert_eq!(outcomes[0].output, Some(json!(2)));
        assert!(!outcomes[1].is_ok());
    }
}
