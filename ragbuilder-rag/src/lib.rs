//! Retrieval engine for RAGBuilder chatbots.
//!
//! # Architecture
//!
//! ```text
//! Text -> Chunker -> Embedder -> vectors.json          (indexing)
//!                                     |
//! Question -> Embedder -> top_k <-----+
//!                           |
//!                     PromptTemplate -> Generator -> RagResult
//! ```
//!
//! The engine is a linear scan over a flat JSON store. Network services sit
//! behind the [`Embedder`] and [`Generator`] traits so they can be swapped
//! for stubs in tests.
//!
//! # Features
//!
//! - `ollama` (default): [`ollama::OllamaClient`] for `/api/embeddings` and
//!   `/api/generate`.
//! - `openai`: [`openai::OpenAiClient`] for `/v1/embeddings` and
//!   `/v1/chat/completions`.
//! - `anthropic`: [`anthropic::AnthropicClient`] for `/v1/messages`
//!   (generation only).
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ragbuilder_rag::{FileVectorStore, RagConfig, RagPipeline, ollama::OllamaClient};
//!
//! let client = OllamaClient::new()?;
//! let pipeline = RagPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedder(Arc::new(client.embedder("nomic-embed-text")))
//!     .generator(Arc::new(client.generator("mistral")))
//!     .vector_store(Arc::new(FileVectorStore::new("data/vectors.json")))
//!     .build()?;
//!
//! pipeline.index_to_file(&text, "data/vectors.json").await?;
//! let result = pipeline.answer_question("Who is on call?").await?;
//! ```

pub mod cancel;
pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod inmemory;
pub mod pipeline;
pub mod prompt;
pub mod similarity;
pub mod transcript;
pub mod vectorstore;
pub mod wizard;

#[cfg(feature = "anthropic")]
pub mod anthropic;
#[cfg(feature = "http")]
mod http;
#[cfg(feature = "ollama")]
pub mod ollama;
#[cfg(feature = "openai")]
pub mod openai;

pub use cancel::CancellationToken;
pub use chunking::{CHARS_PER_TOKEN, Chunker, FixedSizeChunker, chunk};
pub use config::{RagConfig, RagConfigBuilder};
pub use document::{RagResult, ScoredPassage, VectorRecord};
pub use embedding::Embedder;
pub use error::{RagError, Result};
pub use generation::Generator;
pub use inmemory::InMemoryVectorStore;
pub use pipeline::{RagPipeline, RagPipelineBuilder, Stage};
pub use prompt::{PromptTemplate, assemble};
pub use similarity::{cosine_similarity, filter_by_threshold, top_k};
pub use transcript::{ChatMessage, ChatTranscript, Interaction, Sender, SessionLog};
#[cfg(feature = "http")]
pub use vectorstore::HttpVectorStore;
pub use vectorstore::{FileVectorStore, VectorStore, load_records, save_records, to_json};
pub use wizard::{Phase, WizardState, WizardStore, default_collection_name};
