//! Agents, their deterministic ids, and the model collaborator.
//!
//! Each agent owns a [`FastPrng`] seeded once at creation. An agent's answer
//! is whatever the [`Model`] returns; when no model is available (or it
//! fails) the agent answers with a deterministic placeholder drawn from its
//! own generator, so runs without a model are still reproducible.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use solavia_core::{Context, FastPrng};
use solavia_store::Storage;

use crate::config::DEFAULT_SEED;
use crate::error::{Result, RuntimeError};

/// Storage list holding agent records.
pub const AGENTS_KEY: &str = "agents";

/// Characters of the prompt kept in a placeholder answer.
const PLACEHOLDER_PROMPT_CHARS: usize = 120;

// ─────────────────────────────────────────────────────────────────────────────
// Model collaborator
// ─────────────────────────────────────────────────────────────────────────────

/// An opaque text generator.
#[async_trait]
pub trait Model: Send + Sync {
    /// Generate a completion for `input` with the named model.
    async fn generate(&self, model: &str, input: &str) -> Result<String>;
}

/// Options for [`Agent::ask`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AskOptions {
    /// Whether the model collaborator may be called.
    pub allow_external: bool,
    /// Model name; the runtime's configured model when `None`.
    pub model: Option<String>,
    /// Base seed mixed into the prompt; zero means the default seed.
    pub seed: u32,
}

impl Default for AskOptions {
    fn default() -> Self {
        Self {
            allow_external: true,
            model: None,
            seed: DEFAULT_SEED,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Ids
// ─────────────────────────────────────────────────────────────────────────────

/// Deterministic id factory: `{prefix}-{uuid}-{counter base36}{suffix}`.
///
/// The uuid comes from the context's chained generator; the counter survives
/// restarts through storage.
#[derive(Debug, Clone)]
pub struct IdFactory {
    prefix: String,
    counter: u64,
}

impl IdFactory {
    /// A factory starting at counter zero.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: 0,
        }
    }

    /// Storage list holding the counter.
    pub fn counter_key(&self) -> String {
        format!("{}:counter", self.prefix)
    }

    /// Current counter value.
    pub fn counter(&self) -> u64 {
        self.counter
    }

    /// Produce the next id.
    pub fn generate(&mut self, context: &Context, suffix: &str) -> String {
        let id = format!(
            "{}-{}-{}{}",
            self.prefix,
            context.uuid(),
            to_base36(self.counter),
            suffix
        );
        self.counter += 1;
        id
    }

    /// Restore the counter from storage. A missing or malformed counter
    /// starts from zero.
    pub async fn load(&mut self, storage: &dyn Storage) -> Result<()> {
        let stored = storage.load_list(&self.counter_key()).await?;
        self.counter = stored
            .first()
            .and_then(Value::as_str)
            .and_then(|s| u64::from_str_radix(s, 36).ok())
            .unwrap_or(0);
        Ok(())
    }

    /// Persist the counter.
    pub async fn save(&self, storage: &dyn Storage) -> Result<()> {
        let key = self.counter_key();
        storage
            .save_list(&key, &[Value::String(to_base36(self.counter))])
            .await?;
        Ok(())
    }
}

/// Lowercase base-36 rendering.
pub fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}

/// Lowercase `name` and replace each whitespace run with one `-`, leading
/// and trailing runs included.
fn slug(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_space = false;
    for ch in name.to_lowercase().chars() {
        if ch.is_whitespace() {
            if !in_space {
                out.push('-');
            }
            in_space = true;
        } else {
            out.push(ch);
            in_space = false;
        }
    }
    out
}

// ─────────────────────────────────────────────────────────────────────────────
// Agents
// ─────────────────────────────────────────────────────────────────────────────

/// Agent activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Idle,
    Busy,
}

/// Persisted form of an agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentRecord {
    pub name: String,
    pub specialty: String,
    pub id: Option<String>,
    pub status: AgentStatus,
    pub seed: u32,
}

/// A named agent with its own generator.
#[derive(Debug, Clone)]
pub struct Agent {
    name: String,
    specialty: String,
    id: Option<String>,
    status: AgentStatus,
    seed: u32,
    rng: FastPrng,
}

impl Agent {
    /// Create an agent whose generator is seeded with `seed`.
    pub fn new(name: impl Into<String>, specialty: impl Into<String>, seed: u32) -> Self {
        Self {
            name: name.into(),
            specialty: specialty.into(),
            id: None,
            status: AgentStatus::Idle,
            seed,
            rng: FastPrng::new(seed),
        }
    }

    /// Rebuild an agent from its record. The generator restarts from the seed.
    pub fn from_record(record: AgentRecord) -> Self {
        Self {
            rng: FastPrng::new(record.seed),
            name: record.name,
            specialty: record.specialty,
            id: record.id,
            status: AgentStatus::Idle,
            seed: record.seed,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn specialty(&self) -> &str {
        &self.specialty
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn status(&self) -> AgentStatus {
        self.status
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    /// Persisted form.
    pub fn record(&self) -> AgentRecord {
        AgentRecord {
            name: self.name.clone(),
            specialty: self.specialty.clone(),
            id: self.id.clone(),
            status: self.status,
            seed: self.seed,
        }
    }

    /// Ask the agent a question.
    ///
    /// The model sees `{prompt}\nContext:{context}\nSeed:{seed_adj}\n`, where
    /// `seed_adj = options.seed + pass + rng.next_int(1000)`.
    pub async fn ask(
        &mut self,
        prompt: &str,
        context: &str,
        pass: u32,
        options: &AskOptions,
        model: Option<&dyn Model>,
        default_model: &str,
    ) -> String {
        let base = if options.seed == 0 { DEFAULT_SEED } else { options.seed };
        let seed_adj = u64::from(base) + u64::from(pass) + u64::from(self.rng.next_int(1000));

        if let (true, Some(model)) = (options.allow_external, model) {
            let model_name = options.model.as_deref().unwrap_or(default_model);
            let input = format!("{prompt}\nContext:{context}\nSeed:{seed_adj}\n");

            self.status = AgentStatus::Busy;
            let answer = model.generate(model_name, &input).await;
            self.status = AgentStatus::Idle;

            match answer {
                Ok(text) => return text.trim().to_string(),
                Err(e) => {
                    tracing::warn!(agent = %self.name, model = model_name, error = %e, "model failed, answering deterministically");
                }
            }
        }

        let choice = self.rng.next_int(1000);
        let head: String = prompt.chars().take(PLACEHOLDER_PROMPT_CHARS).collect();
        format!("[[deterministic:{}:{}]] {}", self.name, choice, head)
    }
}

/// Owns the agents of a runtime and assigns their ids.
#[derive(Debug)]
pub struct AgentManager {
    context: Arc<Context>,
    ids: IdFactory,
    agents: Vec<Agent>,
}

impl AgentManager {
    /// Create an empty manager.
    pub fn new(context: Arc<Context>, id_prefix: impl Into<String>) -> Self {
        Self {
            context,
            ids: IdFactory::new(id_prefix),
            agents: Vec::new(),
        }
    }

    /// Create and register an agent.
    ///
    /// Without an explicit seed the agent's generator is seeded from the
    /// context's chained generator.
    pub fn create(&mut self, name: &str, specialty: &str, seed: Option<u32>) -> &Agent {
        let seed = seed.unwrap_or_else(|| self.context.next_int(u32::MAX));
        let mut agent = Agent::new(name, specialty, seed);
        agent.id = Some(self.ids.generate(&self.context, &format!("-{}", slug(name))));
        self.agents.push(agent);
        &self.agents[self.agents.len() - 1]
    }

    /// All agents, in creation order.
    pub fn list(&self) -> &[Agent] {
        &self.agents
    }

    /// First agent with the given name.
    pub fn find_by_name(&self, name: &str) -> Option<&Agent> {
        self.agents.iter().find(|a| a.name == name)
    }

    /// First agent with the given name, mutably.
    pub fn find_by_name_mut(&mut self, name: &str) -> Result<&mut Agent> {
        self.agents
            .iter_mut()
            .find(|a| a.name == name)
            .ok_or_else(|| RuntimeError::AgentNotFound(name.to_string()))
    }

    /// Id factory (for its counter).
    pub fn ids(&self) -> &IdFactory {
        &self.ids
    }

    /// Persist agent records and the id counter.
    pub async fn save(&self, storage: &dyn Storage) -> Result<()> {
        let records = self
            .agents
            .iter()
            .map(|a| serde_json::to_value(a.record()))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| RuntimeError::InvalidDocument(e.to_string()))?;
        storage.save_list(AGENTS_KEY, &records).await?;
        self.ids.save(storage).await
    }

    /// Replace the agents with the stored records and restore the id counter.
    ///
    /// Records that do not parse are skipped with a warning.
    pub async fn load(&mut self, storage: &dyn Storage) -> Result<usize> {
        let stored = storage.load_list(AGENTS_KEY).await?;
        self.agents = stored
            .into_iter()
            .filter_map(|v| match serde_json::from_value::<AgentRecord>(v) {
                Ok(record) => Some(Agent::from_record(record)),
                Err(e) => {
                    tracing::warn!(error = %e, "skipping malformed agent record");
                    None
                }
            })
            .collect();
        self.ids.load(storage).await?;
        Ok(self.agents.len())
    }
}
