//! Configuration for the RAG pipeline.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::chunking::{DEFAULT_TARGET_TOKENS, FixedSizeChunker};
use crate::error::{RagError, Result};
use crate::prompt::PromptTemplate;
use crate::vectorstore::DEFAULT_STORE_PATH;

/// Default number of passages used as context.
pub const DEFAULT_TOP_K: usize = 3;

/// Configuration parameters for the RAG pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RagConfig {
    /// Chunk window size in tokens (6 characters each).
    pub chunk_tokens: usize,
    /// Tokens shared by consecutive chunks.
    pub chunk_overlap_tokens: usize,
    /// Number of passages retrieved per question.
    pub top_k: usize,
    /// Passages scoring below this are dropped after ranking.
    pub similarity_threshold: Option<f32>,
    /// Model used to embed chunks and questions.
    pub embedding_model: String,
    /// Model used to generate answers.
    pub generation_model: String,
    /// Where the vector store file is read from and written to.
    pub store_path: String,
    /// Custom prompt with `{context}` and `{question}` placeholders.
    pub prompt_template: Option<String>,
    /// System message for chat-style generators.
    pub system_prompt: Option<String>,
    /// Sampling temperature for chat-style generators.
    pub temperature: Option<f32>,
    /// Completion length cap for chat-style generators.
    pub max_tokens: Option<u32>,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_tokens: DEFAULT_TARGET_TOKENS,
            chunk_overlap_tokens: 0,
            top_k: DEFAULT_TOP_K,
            similarity_threshold: None,
            embedding_model: "nomic-embed-text".to_string(),
            generation_model: "mistral".to_string(),
            store_path: DEFAULT_STORE_PATH.to_string(),
            prompt_template: None,
            system_prompt: None,
            temperature: None,
            max_tokens: None,
        }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }

    /// Read a JSON config file; missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Io`] or [`RagError::Json`] if the file cannot be
    /// read or parsed, and [`RagError::ConfigError`] if it fails validation.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let body = std::fs::read_to_string(path)?;
        let config: RagConfig = serde_json::from_str(&body)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if:
    /// - `chunk_tokens == 0`
    /// - `chunk_overlap_tokens >= chunk_tokens`
    /// - `top_k == 0`
    /// - `prompt_template` lacks a `{question}` placeholder
    pub fn validate(&self) -> Result<()> {
        if self.chunk_tokens == 0 {
            return Err(RagError::ConfigError("chunk_tokens must be greater than zero".into()));
        }
        if self.chunk_overlap_tokens >= self.chunk_tokens {
            return Err(RagError::ConfigError(format!(
                "chunk_overlap_tokens ({}) must be less than chunk_tokens ({})",
                self.chunk_overlap_tokens, self.chunk_tokens
            )));
        }
        if self.top_k == 0 {
            return Err(RagError::ConfigError("top_k must be greater than zero".to_string()));
        }
        self.template()?;
        Ok(())
    }

    /// The custom prompt template if one is set, else the default one.
    pub fn template(&self) -> Result<PromptTemplate> {
        match &self.prompt_template {
            Some(template) => PromptTemplate::custom(template.clone()),
            None => Ok(PromptTemplate::new()),
        }
    }

    /// The chunker these settings describe.
    pub fn chunker(&self) -> Result<FixedSizeChunker> {
        FixedSizeChunker::new(self.chunk_tokens)?.with_overlap(self.chunk_overlap_tokens)
    }
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Start from an existing configuration.
    pub fn from_config(config: RagConfig) -> Self {
        Self { config }
    }

    /// Set the chunk window size in tokens.
    pub fn chunk_tokens(mut self, tokens: usize) -> Self {
        self.config.chunk_tokens = tokens;
        self
    }

    /// Set the overlap between consecutive chunks in tokens.
    pub fn chunk_overlap_tokens(mut self, tokens: usize) -> Self {
        self.config.chunk_overlap_tokens = tokens;
        self
    }

    /// Set the number of passages retrieved per question.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Drop passages scoring below `threshold`.
    pub fn similarity_threshold(mut self, threshold: f32) -> Self {
        self.config.similarity_threshold = Some(threshold);
        self
    }

    /// Set the embedding model name.
    pub fn embedding_model(mut self, model: impl Into<String>) -> Self {
        self.config.embedding_model = model.into();
        self
    }

    /// Set the generation model name.
    pub fn generation_model(mut self, model: impl Into<String>) -> Self {
        self.config.generation_model = model.into();
        self
    }

    /// Set the vector store path.
    pub fn store_path(mut self, path: impl Into<String>) -> Self {
        self.config.store_path = path.into();
        self
    }

    /// Use a custom prompt template.
    pub fn prompt_template(mut self, template: impl Into<String>) -> Self {
        self.config.prompt_template = Some(template.into());
        self
    }

    /// Set the system message for chat-style generators.
    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    /// Set the sampling temperature for chat-style generators.
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.config.temperature = Some(temperature);
        self
    }

    /// Cap the completion length for chat-style generators.
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.config.max_tokens = Some(max_tokens);
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// See [`RagConfig::validate`].
    pub fn build(self) -> Result<RagConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = RagConfig::default();
        assert_eq!(config.chunk_tokens, 500);
        assert_eq!(config.chunk_overlap_tokens, 0);
        assert_eq!(config.top_k, 3);
        assert_eq!(config.similarity_threshold, None);
        assert_eq!(config.embedding_model, "nomic-embed-text");
        assert_eq!(config.generation_model, "mistral");
        assert_eq!(config.store_path, "../data/vectors.json");
        assert_eq!(config.chunker().unwrap().window(), 3000);
    }

    #[test]
    fn builder_validates() {
        assert!(RagConfig::builder().top_k(0).build().is_err());
        assert!(RagConfig::builder().chunk_tokens(0).build().is_err());
        assert!(RagConfig::builder().chunk_tokens(10).chunk_overlap_tokens(10).build().is_err());

        let config = RagConfig::builder()
            .chunk_tokens(100)
            .chunk_overlap_tokens(10)
            .top_k(5)
            .similarity_threshold(0.4)
            .build()
            .unwrap();
        assert_eq!(config.top_k, 5);
        assert_eq!(config.similarity_threshold, Some(0.4));
    }

    #[test]
    fn custom_template_must_name_the_question() {
        assert!(matches!(
            RagConfig::builder().prompt_template("{context} only").build(),
            Err(RagError::ConfigError(_))
        ));

        let config = RagConfig::builder()
            .prompt_template("Q: {question}")
            .system_prompt("Tu es un assistant.")
            .temperature(0.3)
            .max_tokens(256)
            .build()
            .unwrap();
        assert_eq!(config.template().unwrap(), PromptTemplate::custom("Q: {question}").unwrap());
        assert_eq!(RagConfig::default().template().unwrap(), PromptTemplate::new());
    }

    #[test]
    fn partial_json_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rag.json");
        std::fs::write(&path, r#"{"top_k": 7, "generation_model": "llama3"}"#).unwrap();

        let config = RagConfig::from_json_file(&path).unwrap();
        assert_eq!(config.top_k, 7);
        assert_eq!(config.generation_model, "llama3");
        assert_eq!(config.chunk_tokens, 500);
    }

    #[test]
    fn invalid_json_config_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rag.json");
        std::fs::write(&path, r#"{"top_k": 0}"#).unwrap();
        assert!(matches!(RagConfig::from_json_file(&path), Err(RagError::ConfigError(_))));
    }
}
