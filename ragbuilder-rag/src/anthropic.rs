//! Anthropic Messages API generation client.
//!
//! Anthropic has no embedding endpoint, so this module only provides a
//! [`Generator`]; pair it with an Ollama or OpenAI embedder.
//!
//! This module is only available when the `anthropic` feature is enabled.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{RagError, Result};
use crate::generation::Generator;
use crate::http::{build_client, join_url, send_json};

/// The default Anthropic API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

/// Value sent in the `anthropic-version` header.
pub const API_VERSION: &str = "2023-06-01";

/// Completion cap used when none is configured; the API requires one.
pub const DEFAULT_MAX_TOKENS: u32 = 1024;

const PROVIDER: &str = "Anthropic";

/// Connection settings for [`AnthropicGenerator`].
///
/// # Example
///
/// ```rust,ignore
/// use ragbuilder_rag::anthropic::AnthropicClient;
///
/// let generator = AnthropicClient::new(key)?
///     .generator("claude-3-5-haiku-latest")
///     .with_system_prompt("Vous êtes un assistant IA utile.");
/// ```
#[derive(Debug, Clone)]
pub struct AnthropicClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl AnthropicClient {
    /// Create a new client with the given API key.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if the key is empty.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(RagError::ConfigError("Anthropic API key must not be empty".into()));
        }
        Ok(Self { client: build_client(None)?, base_url: DEFAULT_BASE_URL.into(), api_key })
    }

    /// Create a new client using the `ANTHROPIC_API_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("ANTHROPIC_API_KEY").map_err(|_| {
            RagError::ConfigError("ANTHROPIC_API_KEY environment variable not set".into())
        })?;
        Self::new(api_key)
    }

    /// Point the client at another server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Abort requests that take longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.client = build_client(Some(timeout))?;
        Ok(self)
    }

    /// A [`Generator`] for `model` using this connection.
    pub fn generator(&self, model: impl Into<String>) -> AnthropicGenerator {
        AnthropicGenerator {
            client: self.clone(),
            model: model.into(),
            system_prompt: None,
            temperature: None,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

// ── Anthropic API request types ────────────────────────────────────

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    messages: [Message<'a>; 1],
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

/// A [`Generator`] backed by `POST /v1/messages`.
///
/// The prompt is sent as a single user message; the system prompt goes in
/// the top-level `system` field.
#[derive(Debug, Clone)]
pub struct AnthropicGenerator {
    client: AnthropicClient,
    model: String,
    system_prompt: Option<String>,
    temperature: Option<f32>,
    max_tokens: u32,
}

impl AnthropicGenerator {
    /// Send a system prompt with every request.
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
        self.max_tokens = max_tokens;
        self
    }
}

#[async_trait]
impl Generator for AnthropicGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        debug!(provider = PROVIDER, model = %self.model, prompt_len = prompt.len(), "generating");

        let url = join_url(&self.client.base_url, "/v1/messages");
        let body = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            system: self.system_prompt.as_deref(),
            temperature: self.temperature,
            messages: [Message { role: "user", content: prompt }],
        };
        let request = self
            .client
            .client
            .post(&url)
            .header("x-api-key", &self.client.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body);
        let value = send_json(PROVIDER, &url, request)
            .await
            .map_err(|failure| failure.generation(PROVIDER))?;

        Ok(extract_text(&value))
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Read `content[0].text`; fall back to the serialized body.
fn extract_text(value: &Value) -> String {
    value
        .pointer("/content/0/text")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| value.to_string())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn empty_key_is_rejected() {
        assert!(matches!(AnthropicClient::new(""), Err(RagError::ConfigError(_))));
    }

    #[test]
    fn reads_first_text_block() {
        let value = json!({"content": [{"type": "text", "text": "Bonjour"}], "usage": {}});
        assert_eq!(extract_text(&value), "Bonjour");
        assert_eq!(extract_text(&json!({"content": []})), r#"{"content":[]}"#);
    }

    #[test]
    fn request_omits_unset_options() {
        let body = MessagesRequest {
            model: "claude",
            max_tokens: DEFAULT_MAX_TOKENS,
            system: None,
            temperature: None,
            messages: [Message { role: "user", content: "p" }],
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({"model": "claude", "max_tokens": 1024, "messages": [{"role": "user", "content": "p"}]})
        );
    }
}
