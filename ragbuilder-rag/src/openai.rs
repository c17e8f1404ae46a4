//! OpenAI embedding and chat-completion clients.
//!
//! This module is only available when the `openai` feature is enabled.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::embedding::Embedder;
use crate::error::{RagError, Result};
use crate::generation::Generator;
use crate::http::{CallFailure, build_client, join_url, post_json};

/// The default OpenAI API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// The default model for OpenAI embeddings.
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

const PROVIDER: &str = "OpenAI";

/// Connection settings shared by [`OpenAiEmbedder`] and [`OpenAiGenerator`].
///
/// # Example
///
/// ```rust,ignore
/// use ragbuilder_rag::openai::OpenAiClient;
///
/// let client = OpenAiClient::new(wizard.api_key().unwrap_or_default())?;
/// let embedder = client.embedder("text-embedding-3-small");
/// let generator = client.generator("gpt-4o-mini").with_temperature(0.2);
/// ```
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl OpenAiClient {
    /// Create a new client with the given API key.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if the key is empty.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(RagError::ConfigError("OpenAI API key must not be empty".into()));
        }
        Ok(Self { client: build_client(None)?, base_url: DEFAULT_BASE_URL.into(), api_key })
    }

    /// Create a new client using the `OPENAI_API_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| {
            RagError::ConfigError("OPENAI_API_KEY environment variable not set".into())
        })?;
        Self::new(api_key)
    }

    /// Point the client at an OpenAI-compatible server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Abort requests that take longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.client = build_client(Some(timeout))?;
        Ok(self)
    }

    /// An [`Embedder`] for `model` using this connection.
    pub fn embedder(&self, model: impl Into<String>) -> OpenAiEmbedder {
        OpenAiEmbedder { client: self.clone(), model: model.into() }
    }

    /// A [`Generator`] for `model` using this connection.
    pub fn generator(&self, model: impl Into<String>) -> OpenAiGenerator {
        OpenAiGenerator {
            client: self.clone(),
            model: model.into(),
            system_prompt: None,
            temperature: None,
            max_tokens: None,
        }
    }

    async fn post<B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> std::result::Result<Value, CallFailure> {
        let url = join_url(&self.base_url, path);
        post_json(&self.client, PROVIDER, &url, Some(self.api_key.as_str()), body).await
    }
}

// ── OpenAI API request types ───────────────────────────────────────

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

/// An [`Embedder`] backed by `POST /v1/embeddings`.
#[derive(Debug, Clone)]
pub struct OpenAiEmbedder {
    client: OpenAiClient,
    model: String,
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(provider = PROVIDER, model = %self.model, text_len = text.len(), "embedding text");

        let body = EmbeddingRequest { model: &self.model, input: text };
        let value = self
            .client
            .post("/v1/embeddings", &body)
            .await
            .map_err(|failure| failure.embedding(PROVIDER))?;

        let embedding = value.pointer("/data/0/embedding").cloned().ok_or_else(|| {
            RagError::EmbeddingService {
                provider: PROVIDER.into(),
                status: None,
                message: "API returned empty response".into(),
            }
        })?;
        serde_json::from_value(embedding).map_err(|e| RagError::EmbeddingService {
            provider: PROVIDER.into(),
            status: None,
            message: format!("malformed embedding array: {e}"),
        })
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// A [`Generator`] backed by `POST /v1/chat/completions`.
///
/// The prompt is sent as a single user message, preceded by an optional
/// system message.
#[derive(Debug, Clone)]
pub struct OpenAiGenerator {
    client: OpenAiClient,
    model: String,
    system_prompt: Option<String>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
}

impl OpenAiGenerator {
    /// Prepend a system message to every request.
    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Cap the completion length.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

#[async_trait]
impl Generator for OpenAiGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        debug!(provider = PROVIDER, model = %self.model, prompt_len = prompt.len(), "generating");

        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &self.system_prompt {
            messages.push(ChatMessage { role: "system", content: system });
        }
        messages.push(ChatMessage { role: "user", content: prompt });

        let body = ChatRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };
        let value = self
            .client
            .post("/v1/chat/completions", &body)
            .await
            .map_err(|failure| failure.generation(PROVIDER))?;

        Ok(extract_message_content(&value))
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Read `choices[0].message.content`; fall back to the serialized body.
fn extract_message_content(value: &Value) -> String {
    value
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| value.to_string())
}
