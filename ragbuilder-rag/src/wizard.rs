//! Persisted wizard state.
//!
//! The configuration wizard saves one free-form JSON object per phase in a
//! single blob. Updates merge keys into the phase object rather than
//! replacing it. The engine only reads a few fields: the provider API key,
//! the collection name and the retrieval settings.
//!
//! The blob is owned by a [`WizardStore`] and passed explicitly; there is no
//! process-wide state. Writes are last-writer-wins with no locking.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::config::RagConfig;
use crate::error::{RagError, Result};

/// Default file name, after the storage key of the wizard blob.
pub const DEFAULT_WIZARD_FILE: &str = "ragbuilder-data.json";

/// A wizard phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Needs analysis: company, API keys.
    Analyse,
    /// Document preparation: chunk size, overlap.
    Dataprep,
    /// Indexing: embedding model, collection name.
    Indexation,
    /// Engine tuning: LLM, top-k, threshold, prompts.
    Moteur,
    /// Chat interface look and feel.
    Interface,
    /// Final summary.
    Recap,
}

impl Phase {
    /// Every phase in wizard order.
    pub const ALL: [Phase; 6] = [
        Phase::Analyse,
        Phase::Dataprep,
        Phase::Indexation,
        Phase::Moteur,
        Phase::Interface,
        Phase::Recap,
    ];

    /// Key of the phase in the persisted blob.
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Analyse => "analyse",
            Phase::Dataprep => "dataprep",
            Phase::Indexation => "indexation",
            Phase::Moteur => "moteur",
            Phase::Interface => "interface",
            Phase::Recap => "recap",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self> {
        Phase::ALL
            .into_iter()
            .find(|phase| phase.as_str() == s)
            .ok_or_else(|| RagError::InvalidArgument(format!("unknown wizard phase '{s}'")))
    }
}

/// The whole wizard blob: one JSON object per phase.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WizardState {
    analyse: Map<String, Value>,
    dataprep: Map<String, Value>,
    indexation: Map<String, Value>,
    moteur: Map<String, Value>,
    interface: Map<String, Value>,
    recap: Map<String, Value>,
}

impl WizardState {
    /// Fields saved for `phase` (empty if never saved).
    pub fn phase(&self, phase: Phase) -> &Map<String, Value> {
        match phase {
            Phase::Analyse => &self.analyse,
            Phase::Dataprep => &self.dataprep,
            Phase::Indexation => &self.indexation,
            Phase::Moteur => &self.moteur,
            Phase::Interface => &self.interface,
            Phase::Recap => &self.recap,
        }
    }

    fn phase_mut(&mut self, phase: Phase) -> &mut Map<String, Value> {
        match phase {
            Phase::Analyse => &mut self.analyse,
            Phase::Dataprep => &mut self.dataprep,
            Phase::Indexation => &mut self.indexation,
            Phase::Moteur => &mut self.moteur,
            Phase::Interface => &mut self.interface,
            Phase::Recap => &mut self.recap,
        }
    }

    /// Merge `patch` into the phase: keys in `patch` win, others are kept.
    pub fn update_phase(&mut self, phase: Phase, patch: Map<String, Value>) {
        self.phase_mut(phase).extend(patch);
    }

    /// Set one field of a phase.
    pub fn set(&mut self, phase: Phase, key: impl Into<String>, value: Value) {
        self.phase_mut(phase).insert(key.into(), value);
    }

    /// Reset every phase.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    fn str_field(&self, phase: Phase, key: &str) -> Option<&str> {
        self.phase(phase).get(key).and_then(Value::as_str).map(str::trim).filter(|s| !s.is_empty())
    }

    /// Numbers may be saved as JSON numbers or as form strings.
    fn number_field(&self, phase: Phase, key: &str) -> Option<f64> {
        match self.phase(phase).get(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Provider API key (`analyse.openaiKey`, else `analyse.apiKey`).
    pub fn api_key(&self) -> Option<&str> {
        self.str_field(Phase::Analyse, "openaiKey")
            .or_else(|| self.str_field(Phase::Analyse, "apiKey"))
    }

    /// Anthropic API key (`analyse.anthropicKey`).
    pub fn anthropic_key(&self) -> Option<&str> {
        self.str_field(Phase::Analyse, "anthropicKey")
    }

    /// Collection / store name (`indexation.collectionName`, else
    /// `dataprep.collectionName`).
    pub fn collection_name(&self) -> Option<&str> {
        self.str_field(Phase::Indexation, "collectionName")
            .or_else(|| self.str_field(Phase::Dataprep, "collectionName"))
    }

    /// Apply the retrieval settings saved by the wizard on top of `base`.
    ///
    /// Reads `dataprep.chunkSize`, `dataprep.overlap`,
    /// `indexation.embeddingModel` and the `moteur` settings (`llmModel`,
    /// `topK`, `similarityThreshold`, `userPromptTemplate`, `systemPrompt`,
    /// `temperature`, `maxTokens`). Unset or unparsable fields leave `base`
    /// untouched.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if the merged config is invalid.
    pub fn rag_config_overrides(&self, base: RagConfig) -> Result<RagConfig> {
        let mut config = base;
        let as_count = |v: f64| (v.is_finite() && v >= 0.0).then_some(v as usize);

        if let Some(tokens) = self.number_field(Phase::Dataprep, "chunkSize").and_then(as_count) {
            config.chunk_tokens = tokens;
        }
        if let Some(overlap) = self.number_field(Phase::Dataprep, "overlap").and_then(as_count) {
            config.chunk_overlap_tokens = overlap;
        }
        if let Some(k) = self.number_field(Phase::Moteur, "topK").and_then(as_count) {
            config.top_k = k;
        }
        if let Some(threshold) = self.number_field(Phase::Moteur, "similarityThreshold") {
            config.similarity_threshold = Some(threshold as f32);
        }
        if let Some(model) = self.str_field(Phase::Indexation, "embeddingModel") {
            config.embedding_model = model.to_string();
        }
        if let Some(model) = self.str_field(Phase::Moteur, "llmModel") {
            config.generation_model = model.to_string();
        }
        if let Some(template) = self.str_field(Phase::Moteur, "userPromptTemplate") {
            config.prompt_template = Some(template.to_string());
        }
        if let Some(system) = self.str_field(Phase::Moteur, "systemPrompt") {
            config.system_prompt = Some(system.to_string());
        }
        if let Some(temperature) = self.number_field(Phase::Moteur, "temperature") {
            config.temperature = Some(temperature as f32);
        }
        if let Some(max_tokens) = self.number_field(Phase::Moteur, "maxTokens").and_then(as_count) {
            config.max_tokens = u32::try_from(max_tokens).ok();
        }

        config.validate()?;
        Ok(config)
    }
}

/// Collection name the wizard proposes for a company: `<slug>-documents-<year>`.
pub fn default_collection_name(company: &str, year: i32) -> String {
    let mut slug = String::new();
    for c in company.trim().chars().flat_map(char::to_lowercase) {
        if c.is_ascii_alphanumeric() {
            slug.push(c);
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    let slug = slug.trim_end_matches('-');
    if slug.is_empty() {
        format!("documents-{year}")
    } else {
        format!("{slug}-documents-{year}")
    }
}

/// File-backed persistence for a [`WizardState`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WizardStore {
    path: PathBuf,
}

impl WizardStore {
    /// Create a store at `path`. Nothing is read until [`WizardStore::load`].
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the state; a missing file yields the empty default state.
    pub async fn load(&self) -> Result<WizardState> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(body) => Ok(serde_json::from_str(&body)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no wizard state yet");
                Ok(WizardState::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Write the whole state as pretty JSON.
    pub async fn save(&self, state: &WizardState) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, serde_json::to_string_pretty(state)?).await?;
        debug!(path = %self.path.display(), "saved wizard state");
        Ok(())
    }

    /// Load, merge `patch` into `phase`, save, and return the new state.
    pub async fn update_phase(&self, phase: Phase, patch: Map<String, Value>) -> Result<WizardState> {
        let mut state = self.load().await?;
        state.update_phase(phase, patch);
        self.save(&state).await?;
        Ok(state)
    }

    /// Remove the backing file.
    pub async fn clear(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}
