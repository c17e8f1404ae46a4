//! Ollama embedding and generation clients.
//!
//! This module is only available when the `ollama` feature is enabled.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::embedding::Embedder;
use crate::error::{RagError, Result};
use crate::generation::Generator;
use crate::http::{CallFailure, build_client, join_url, post_json};

/// The default local Ollama endpoint.
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// The default embedding model.
pub const DEFAULT_EMBEDDING_MODEL: &str = "nomic-embed-text";

/// The default generation model.
pub const DEFAULT_GENERATION_MODEL: &str = "mistral";

const PROVIDER: &str = "Ollama";

/// Connection settings shared by [`OllamaEmbedder`] and [`OllamaGenerator`].
///
/// # Example
///
/// ```rust,ignore
/// use ragbuilder_rag::ollama::OllamaClient;
///
/// let client = OllamaClient::new()?.with_base_url("http://gpu-box:11434");
/// let embedder = client.embedder("nomic-embed-text");
/// let generator = client.generator("mistral");
/// ```
#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl OllamaClient {
    /// Create a client for [`DEFAULT_BASE_URL`] with no timeout.
    pub fn new() -> Result<Self> {
        Ok(Self { client: build_client(None)?, base_url: DEFAULT_BASE_URL.into(), api_key: None })
    }

    /// Point the client at another Ollama (or Ollama-compatible) server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Send `Authorization: Bearer <key>` with every request.
    ///
    /// Empty keys are ignored.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        let api_key = api_key.into();
        self.api_key = (!api_key.is_empty()).then_some(api_key);
        self
    }

    /// Abort requests that take longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.client = build_client(Some(timeout))?;
        Ok(self)
    }

    /// Base URL requests are sent to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// An [`Embedder`] for `model` using this connection.
    pub fn embedder(&self, model: impl Into<String>) -> OllamaEmbedder {
        OllamaEmbedder { client: self.clone(), model: model.into() }
    }

    /// A [`Generator`] for `model` using this connection.
    pub fn generator(&self, model: impl Into<String>) -> OllamaGenerator {
        OllamaGenerator { client: self.clone(), model: model.into() }
    }

    async fn post(
        &self,
        path: &str,
        body: &OllamaRequest<'_>,
    ) -> std::result::Result<Value, CallFailure> {
        let url = join_url(&self.base_url, path);
        post_json(&self.client, PROVIDER, &url, self.api_key.as_deref(), body).await
    }
}

// ── Ollama API request types ───────────────────────────────────────

#[derive(Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

/// An [`Embedder`] backed by `POST /api/embeddings`.
#[derive(Debug, Clone)]
pub struct OllamaEmbedder {
    client: OllamaClient,
    model: String,
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(provider = PROVIDER, model = %self.model, text_len = text.len(), "embedding text");

        let body = OllamaRequest { model: &self.model, prompt: text, stream: None };
        let value = self
            .client
            .post("/api/embeddings", &body)
            .await
            .map_err(|failure| failure.embedding(PROVIDER))?;

        parse_embedding(value)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

fn parse_embedding(mut value: Value) -> Result<Vec<f32>> {
    let embedding = value.get_mut("embedding").map(Value::take);
    match embedding {
        Some(embedding @ Value::Array(_)) => serde_json::from_value(embedding).map_err(|e| {
            RagError::EmbeddingService {
                provider: PROVIDER.into(),
                status: None,
                message: format!("malformed embedding array: {e}"),
            }
        }),
        _ => Err(RagError::EmbeddingService {
            provider: PROVIDER.into(),
            status: None,
            message: "response has no embedding array".into(),
        }),
    }
}

/// A [`Generator`] backed by `POST /api/generate` (non-streaming).
#[derive(Debug, Clone)]
pub struct OllamaGenerator {
    client: OllamaClient,
    model: String,
}

#[async_trait]
impl Generator for OllamaGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        debug!(provider = PROVIDER, model = %self.model, prompt_len = prompt.len(), "generating");

        let body = OllamaRequest { model: &self.model, prompt, stream: Some(false) };
        let value = self
            .client
            .post("/api/generate", &body)
            .await
            .map_err(|failure| failure.generation(PROVIDER))?;

        Ok(extract_generated_text(&value))
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Read `response`, then `generated`; fall back to the serialized body.
///
/// Empty strings count as absent.
pub(crate) fn extract_generated_text(value: &Value) -> String {
    ["response", "generated"]
        .iter()
        .find_map(|field| value.get(*field).and_then(Value::as_str).filter(|s| !s.is_empty()))
        .map(str::to_string)
        .unwrap_or_else(|| value.to_string())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn prefers_response_then_generated() {
        assert_eq!(extract_generated_text(&json!({"response": "a", "generated": "b"})), "a");
        assert_eq!(extract_generated_text(&json!({"generated": "b"})), "b");
        assert_eq!(extract_generated_text(&json!({"response": "", "generated": "b"})), "b");
    }

    #[test]
    fn falls_back_to_raw_json() {
        assert_eq!(extract_generated_text(&json!({"done": true})), r#"{"done":true}"#);
    }

    #[test]
    fn parses_embedding_array() {
        assert_eq!(parse_embedding(json!({"embedding": [0.5, -1.0]})).unwrap(), vec![0.5, -1.0]);
        assert!(parse_embedding(json!({"embeddings": [[0.5]]})).is_err());
        assert!(parse_embedding(json!({"embedding": ["x"]})).is_err());
    }

    #[test]
    fn empty_api_key_is_ignored() {
        let client = OllamaClient::new().unwrap().with_api_key("");
        assert!(client.api_key.is_none());
    }
}
