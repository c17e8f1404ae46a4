//! Text generation capability used to answer questions.

use async_trait::async_trait;

use crate::error::Result;

/// A service that completes a prompt into answer text.
///
/// # Example
///
/// ```rust,ignore
/// use ragbuilder_rag::Generator;
///
/// let answer = generator.generate("Contexte 1: ...\n\nQuestion : ...").await?;
/// ```
#[async_trait]
pub trait Generator: Send + Sync {
    /// Generate a completion for `prompt`.
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Name of the generation model.
    fn model(&self) -> &str;
}
