//! RAG pipeline orchestrator.
//!
//! The [`RagPipeline`] runs the offline write path (chunk → embed → store)
//! and the query path (embed question → load store → rank → assemble prompt
//! → generate) by composing an [`Embedder`], a [`Generator`], a
//! [`VectorStore`] and a [`Chunker`].
//!
//! # Example
//!
//! ```rust,ignore
//! use ragbuilder_rag::{FileVectorStore, RagConfig, RagPipeline};
//!
//! let pipeline = RagPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedder(Arc::new(client.embedder("nomic-embed-text")))
//!     .generator(Arc::new(client.generator("mistral")))
//!     .vector_store(Arc::new(FileVectorStore::new("data/vectors.json")))
//!     .build()?;
//!
//! let result = pipeline.answer_question("Quels sont les horaires ?").await?;
//! println!("{}", result.response);
//! ```

use std::fmt;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, error, info};

use crate::cancel::CancellationToken;
use crate::chunking::Chunker;
use crate::config::RagConfig;
use crate::document::{RagResult, VectorRecord};
use crate::embedding::Embedder;
use crate::error::{RagError, Result};
use crate::generation::Generator;
use crate::prompt::PromptTemplate;
use crate::similarity::{filter_by_threshold, top_k};
use crate::vectorstore::{VectorStore, save_records};

/// A step of a pipeline run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Split the source text (write path).
    Chunk,
    /// Embed one chunk (write path).
    EmbedChunk,
    /// Embed the user question.
    EmbedQuestion,
    /// Load the vector store.
    LoadStore,
    /// Score and select passages.
    Rank,
    /// Build the generation prompt.
    AssemblePrompt,
    /// Call the generator.
    Generate,
}

impl Stage {
    /// Stable lowercase name used in logs and errors.
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Chunk => "chunk",
            Stage::EmbedChunk => "embed_chunk",
            Stage::EmbedQuestion => "embed_question",
            Stage::LoadStore => "load_store",
            Stage::Rank => "rank",
            Stage::AssemblePrompt => "assemble_prompt",
            Stage::Generate => "generate",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The RAG pipeline orchestrator.
///
/// Runs are strictly sequential: one network call at a time, no retries. Any
/// stage failure ends the run with that stage's error and no partial result.
/// Construct one via [`RagPipeline::builder()`].
pub struct RagPipeline {
    config: RagConfig,
    embedder: Arc<dyn Embedder>,
    generator: Arc<dyn Generator>,
    vector_store: Arc<dyn VectorStore>,
    chunker: Arc<dyn Chunker>,
    prompt_template: PromptTemplate,
    cancellation: CancellationToken,
}

impl RagPipeline {
    /// Create a new [`RagPipelineBuilder`].
    pub fn builder() -> RagPipelineBuilder {
        RagPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Return a reference to the embedder.
    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    /// Return a reference to the vector store.
    pub fn vector_store(&self) -> &Arc<dyn VectorStore> {
        &self.vector_store
    }

    /// The token checked between stages; cancel it to stop a run.
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation
    }

    fn checkpoint(&self, stage: Stage) -> Result<()> {
        self.cancellation.check(stage.as_str()).inspect_err(|_| {
            info!(%stage, "run cancelled");
        })?;
        debug!(%stage, "entering stage");
        Ok(())
    }

    /// Run one stage, abandoning `work` as soon as the token is cancelled.
    async fn guarded<T>(&self, stage: Stage, work: impl Future<Output = Result<T>>) -> Result<T> {
        self.checkpoint(stage)?;
        tokio::select! {
            biased;
            () = self.cancellation.cancelled() => {
                info!(%stage, "run cancelled while in flight");
                Err(RagError::Cancelled { stage: stage.as_str().to_string() })
            }
            result = work => result,
        }
    }

    /// Answer `question` using the configured `top_k`.
    ///
    /// # Errors
    ///
    /// Returns the error of the first failing stage unchanged, for example
    /// [`RagError::EmbeddingService`] or [`RagError::StoreUnavailable`].
    pub async fn answer_question(&self, question: &str) -> Result<RagResult> {
        self.answer_question_with(question, self.config.top_k).await
    }

    /// Answer `question` with an explicit number of context passages.
    ///
    /// # Errors
    ///
    /// - [`RagError::InvalidArgument`] if `question` is blank or `top_k` is zero.
    /// - Any component error, unchanged.
    pub async fn answer_question_with(&self, question: &str, top_k: usize) -> Result<RagResult> {
        if question.trim().is_empty() {
            return Err(RagError::InvalidArgument("question must not be empty".to_string()));
        }
        if top_k == 0 {
            return Err(RagError::InvalidArgument("top_k must be at least 1".to_string()));
        }

        let result = self.run_query(question, top_k).await;
        if let Err(e) = &result {
            error!(error = %e, "question failed");
        }
        result
    }

    async fn run_query(&self, question: &str, k: usize) -> Result<RagResult> {
        let query = self.guarded(Stage::EmbedQuestion, self.embedder.embed(question)).await?;
        let records = self.guarded(Stage::LoadStore, self.vector_store.load()).await?;
        debug!(
            location = %self.vector_store.location(),
            record_count = records.len(),
            "store loaded"
        );

        self.checkpoint(Stage::Rank)?;
        let mut passages = top_k(&records, &query, k)?;
        if let Some(threshold) = self.config.similarity_threshold {
            passages = filter_by_threshold(passages, threshold);
        }

        self.checkpoint(Stage::AssemblePrompt)?;
        let prompt = self.prompt_template.render(&passages, question);

        let response = self.guarded(Stage::Generate, self.generator.generate(&prompt)).await?;

        info!(
            passage_count = passages.len(),
            model = self.generator.model(),
            "question answered"
        );
        Ok(RagResult { response, passages, prompt })
    }

    /// Index `text`: chunk it, embed every chunk one at a time, number the
    /// records 1..N.
    ///
    /// Empty text yields an empty store.
    ///
    /// # Errors
    ///
    /// Returns the first embedding failure unchanged; chunks embedded before
    /// it are discarded.
    pub async fn index_text(&self, text: &str) -> Result<Vec<VectorRecord>> {
        self.checkpoint(Stage::Chunk)?;
        let chunks = self.chunker.chunk(text);
        let chunk_count = chunks.len();

        let mut records = Vec::with_capacity(chunk_count);
        for (i, chunk) in chunks.into_iter().enumerate() {
            let vector =
                self.guarded(Stage::EmbedChunk, self.embedder.embed(&chunk)).await.inspect_err(
                    |e| error!(chunk_index = i, chunk_count, error = %e, "embedding failed during indexing"),
                )?;
            records.push(VectorRecord::new(i as u64 + 1, chunk, vector));
        }

        info!(chunk_count, model = self.embedder.model(), "indexed text");
        Ok(records)
    }

    /// Index `text` and write the resulting store to `path`.
    pub async fn index_to_file(
        &self,
        text: &str,
        path: impl AsRef<Path>,
    ) -> Result<Vec<VectorRecord>> {
        let records = self.index_text(text).await?;
        save_records(&records, path).await?;
        Ok(records)
    }
}

/// Builder for constructing a [`RagPipeline`].
///
/// `embedder`, `generator` and `vector_store` are required. Without an
/// explicit chunker or prompt template the ones described by the config are
/// used.
///
/// # Example
///
/// ```rust,ignore
/// let pipeline = RagPipeline::builder()
///     .embedder(Arc::new(embedder))
///     .generator(Arc::new(generator))
///     .vector_store(Arc::new(store))
///     .prompt_template(PromptTemplate::custom("{context}\n\n{question}")?) // optional
///     .build()?;
/// ```
#[derive(Default)]
pub struct RagPipelineBuilder {
    config: Option<RagConfig>,
    embedder: Option<Arc<dyn Embedder>>,
    generator: Option<Arc<dyn Generator>>,
    vector_store: Option<Arc<dyn VectorStore>>,
    chunker: Option<Arc<dyn Chunker>>,
    prompt_template: Option<PromptTemplate>,
    cancellation: Option<CancellationToken>,
}

impl RagPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedder.
    pub fn embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// Set the generator.
    pub fn generator(mut self, generator: Arc<dyn Generator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Set the vector store.
    pub fn vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.vector_store = Some(store);
        self
    }

    /// Override the chunker derived from the config.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Override the prompt template derived from the config.
    pub fn prompt_template(mut self, template: PromptTemplate) -> Self {
        self.prompt_template = Some(template);
        self
    }

    /// Share an existing cancellation token with the pipeline.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Build the [`RagPipeline`], validating that all required fields are set.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if a required field is missing or
    /// the config is invalid.
    pub fn build(self) -> Result<RagPipeline> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let embedder =
            self.embedder.ok_or_else(|| RagError::ConfigError("embedder is required".into()))?;
        let generator =
            self.generator.ok_or_else(|| RagError::ConfigError("generator is required".into()))?;
        let vector_store = self
            .vector_store
            .ok_or_else(|| RagError::ConfigError("vector_store is required".to_string()))?;
        let chunker = match self.chunker {
            Some(chunker) => chunker,
            None => Arc::new(config.chunker()?),
        };
        let prompt_template = match self.prompt_template {
            Some(template) => template,
            None => config.template()?,
        };

        Ok(RagPipeline {
            config,
            embedder,
            generator,
            vector_store,
            chunker,
            prompt_template,
            cancellation: self.cancellation.unwrap_or_default(),
        })
    }
}
