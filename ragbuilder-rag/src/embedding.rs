//! Embedding capability used by indexing and querying.

use async_trait::async_trait;

use crate::error::Result;

/// A service that turns text into a vector embedding.
///
/// Implementations wrap specific backends (Ollama, OpenAI) behind one async
/// interface so tests can substitute a deterministic stub. Every call is one
/// request: no batching, retry or caching happens at this layer.
///
/// # Example
///
/// ```rust,ignore
/// use ragbuilder_rag::{Embedder, ollama::OllamaClient};
///
/// let embedder = OllamaClient::new()?.embedder("nomic-embed-text");
/// let vector = embedder.embed("hello world").await?;
/// ```
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate an embedding vector for a single text input.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed several texts strictly one after another.
    ///
    /// Stops at the first failure; embeddings computed before it are dropped.
    async fn embed_all(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    /// Name of the embedding model.
    fn model(&self) -> &str;
}
