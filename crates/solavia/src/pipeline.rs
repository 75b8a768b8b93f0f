//! Pipelines and the algorithm registry.
//!
//! A [`Pipeline`] threads one value through an ordered list of steps. The
//! runtime records each step into the ledger as it runs (see
//! [`Runtime::run_pipeline`](crate::Runtime::run_pipeline)); the pipeline
//! itself knows nothing about provenance.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use solavia_core::Digest;

use crate::error::{Result, RuntimeError};

/// Hex characters of a step id.
const STEP_ID_LEN: usize = 8;

/// One unit of work.
#[async_trait]
pub trait Step: Send + Sync {
    async fn run(&self, input: Value) -> Result<Value>;
}

#[async_trait]
impl<F> Step for F
where
    F: Fn(Value) -> Result<Value> + Send + Sync,
{
    async fn run(&self, input: Value) -> Result<Value> {
        self(input)
    }
}

/// A registered pipeline step.
#[derive(Clone)]
pub struct PipelineStep {
    pub id: String,
    pub name: String,
    pub step: Arc<dyn Step>,
}

impl std::fmt::Debug for PipelineStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineStep")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish()
    }
}

/// Step id: first 8 hex chars of SHA-256 over the name.
pub fn step_id(name: &str) -> String {
    Digest::hash(name.as_bytes()).hex_prefix(STEP_ID_LEN)
}

/// Ordered list of steps.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    steps: Vec<PipelineStep>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a synchronous step and return its id.
    pub fn register<F>(&mut self, name: impl Into<String>, f: F) -> String
    where
        F: Fn(Value) -> Result<Value> + Send + Sync + 'static,
    {
        self.register_step(name, f)
    }

    /// Append any [`Step`] and return its id.
    pub fn register_step(&mut self, name: impl Into<String>, step: impl Step + 'static) -> String {
        let name = name.into();
        let id = step_id(&name);
        self.steps.push(PipelineStep {
            id: id.clone(),
            name,
            step: Arc::new(step),
        });
        id
    }

    /// Builder form of [`register`](Self::register).
    pub fn with_step<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Value) -> Result<Value> + Send + Sync + 'static,
    {
        self.register(name, f);
        self
    }

    pub fn steps(&self) -> &[PipelineStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Run every step in order, feeding each output to the next step.
    pub async fn execute(&self, input: Value) -> Result<Value> {
        let mut value = input;
        for step in &self.steps {
            value = step.step.run(value).await?;
        }
        Ok(value)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Algorithm registry
// ─────────────────────────────────────────────────────────────────────────────

/// Result of one algorithm in a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlgorithmOutcome {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AlgorithmOutcome {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Named algorithms run side by side against one input.
#[derive(Clone, Default)]
pub struct AlgorithmRegistry {
    algorithms: Vec<(String, Arc<dyn Step>)>,
}

impl AlgorithmRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(Value) -> Result<Value> + Send + Sync + 'static,
    {
        self.register_step(name, f);
    }

    pub fn register_step(&mut self, name: impl Into<String>, algorithm: impl Step + 'static) {
        self.algorithms.push((name.into(), Arc::new(algorithm)));
    }

    /// Registered names, in registration order.
    pub fn names(&self) -> Vec<String> {
        self.algorithms.iter().map(|(name, _)| name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.algorithms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.algorithms.is_empty()
    }

    /// Run every algorithm against `input`. A failure is captured in its
    /// outcome and logged; the remaining algorithms still run.
    pub async fn run_all(&self, input: &Value) -> Vec<AlgorithmOutcome> {
        let mut outcomes = Vec::with_capacity(self.algorithms.len());
        for (name, algorithm) in &self.algorithms {
            match algorithm.run(input.clone()).await {
                Ok(output) => {
                    tracing::info!(algorithm = %name, "algorithm done");
                    outcomes.push(AlgorithmOutcome {
                        name: name.clone(),
                        output: Some(output),
                        error: None,
                    });
                }
                Err(e) => {
                    tracing::error!(algorithm = %name, error = %e, "algorithm failed");
                    outcomes.push(AlgorithmOutcome {
                        name: name.clone(),
                        output: None,
                        error: Some(e.to_string()),
                    });
                }
            }
        }
        outcomes
    }
}

impl std::fmt::Debug for AlgorithmRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlgorithmRegistry")
            .field("names", &self.names())
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Recorded pipelines
// ─────────────────────────────────────────────────────────────────────────────

/// A stage recorded outside the runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageRecord {
    pub name: String,
    #[serde(default)]
    pub input: Value,
    /// Missing output records the stage without an output hash.
    #[serde(default)]
    pub output: Option<Value>,
}

/// A pipeline file: `{"stages": [{"name", "input", "output"}]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineFile {
    pub stages: Vec<StageRecord>,
}

impl PipelineFile {
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| RuntimeError::InvalidDocument(format!("pipeline file: {e}")))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Built-in example
// ─────────────────────────────────────────────────────────────────────────────

/// Name of the built-in pipeline.
pub const EXAMPLE_PIPELINE: &str = "example";

/// DoubleNumbers → Summarize → ModelResult, and its input.
pub fn example_pipeline(seed: u32) -> (Pipeline, Value) {
    let pipeline = Pipeline::new()
        .with_step("DoubleNumbers", |input: Value| {
            let numbers = input
                .get("numbers")
                .and_then(Value::as_array)
                .ok_or_else(|| RuntimeError::step("DoubleNumbers", "input has no numbers array"))?;
            let doubled = numbers
                .iter()
                .map(|n| match (n.as_i64(), n.as_f64()) {
                    (Some(i), _) => Ok(json!(i * 2)),
                    (None, Some(f)) => Ok(json!(f * 2.0)),
                    _ => Err(RuntimeError::step("DoubleNumbers", format!("not a number: {n}"))),
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(Value::Array(doubled))
        })
        .with_step("Summarize", |input: Value| {
            let values = input
                .as_array()
                .ok_or_else(|| RuntimeError::step("Summarize", "input is not an array"))?;
            let sum: f64 = values.iter().filter_map(Value::as_f64).sum();
            Ok(json!({ "count": values.len(), "sum": number(sum) }))
        })
        .with_step("ModelResult", move |input: Value| {
            let count = input.get("count").and_then(Value::as_f64).unwrap_or(0.0);
            let sum = input.get("sum").and_then(Value::as_f64).unwrap_or(0.0);
            if count == 0.0 {
                return Err(RuntimeError::step("ModelResult", "empty summary"));
            }
            Ok(json!({ "avg": number(sum / count), "seedUsed": seed }))
        });

    (pipeline, json!({ "numbers": [1, 2, 3], "seed": seed }))
}

/// Integral floats as integers, so `4.0` is stored as `4`.
fn number(f: f64) -> Value {
    if f.fract() == 0.0 && f.abs() < 9_007_199_254_740_992.0 {
        json!(f as i64)
    } else {
        json!(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_id() {
        assert_eq!(step_id("double"), "2ce06a9e");
    }

    #[tokio::test]
    async fn test_execute_threads_value() {
        let mut pipeline = Pipeline::new();
        let id = pipeline.register("inc", |v: Value| Ok(json!(v.as_i64().unwrap_or(0) + 1)));
        pipeline.register("square", |v: Value| {
            let n = v.as_i64().unwrap_or(0);
            Ok(json!(n * n))
        });

        assert_eq!(id, step_id("inc"));
        assert_eq!(pipeline.len(), 2);
        assert_eq!(pipeline.execute(json!(2)).await.unwrap(), json!(9));
    }

    #[tokio::test]
    async fn test_execute_stops_on_error() {
        let pipeline = Pipeline::new()
            .with_step("fail", |_: Value| Err(RuntimeError::step("fail", "boom")))
            .with_step("never", |_: Value| -> Result<Value> { panic!("must not run") });
        let err = pipeline.execute(Value::Null).await.unwrap_err();
        assert!(matches!(err, RuntimeError::Step { step, .. } if step == "fail"));
    }

    #[tokio::test]
    async fn test_example_pipeline() {
        let (pipeline, input) = example_pipeline(1337);
        let names: Vec<&str> = pipeline.steps().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["DoubleNumbers", "Summarize", "ModelResult"]);

        let out = pipeline.execute(input).await.unwrap();
        assert_eq!(out, json!({"avg": 4, "seedUsed": 1337}));
    }

    #[tokio::test]
    async fn test_registry_captures_failures() {
        let mut registry = AlgorithmRegistry::new();
        registry.register("echo", |v: Value| Ok(v));
        registry.register("broken", |_: Value| Err(RuntimeError::step("broken", "nope")));
        registry.register("const", |_: Value| Ok(json!(1)));

        let outcomes = registry.run_all(&json!({"x": 1})).await;
        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes[0].output, Some(json!({"x": 1})));
        assert!(!outcomes[1].is_ok());
        assert!(outcomes[1].error.as_deref().unwrap().contains("nope"));
        assert_eq!(outcomes[2].output, Some(json!(1)));
        assert_eq!(registry.names(), ["echo", "broken", "const"]);
    }

    #[test]
    fn test_pipeline_file() {
        let file = PipelineFile::from_json(
            r#"{"stages": [{"name": "a", "input": {"q": 1}, "output": [1]}, {"name": "b"}]}"#,
        )
        .unwrap();
        assert_eq!(file.stages.len(), 2);
        assert_eq!(file.stages[1].output, None);
        assert_eq!(file.stages[1].input, Value::Null);

        assert!(PipelineFile::from_json("{}").is_err());
    }
}
