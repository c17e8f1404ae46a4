//! Shared JSON-over-HTTP plumbing for the service clients.

use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tracing::error;

use crate::error::{RagError, Result};

/// A failed call, before it is mapped to a service-specific error.
#[derive(Debug)]
pub(crate) struct CallFailure {
    pub status: Option<u16>,
    pub message: String,
}

impl CallFailure {
    pub(crate) fn embedding(self, provider: &str) -> RagError {
        RagError::EmbeddingService {
            provider: provider.to_string(),
            status: self.status,
            message: self.message,
        }
    }

    pub(crate) fn generation(self, provider: &str) -> RagError {
        RagError::GenerationService {
            provider: provider.to_string(),
            status: self.status,
            message: self.message,
        }
    }
}

/// Build a `reqwest` client, optionally with a request timeout.
pub(crate) fn build_client(timeout: Option<Duration>) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder();
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder.build().map_err(|e| RagError::ConfigError(format!("failed to build HTTP client: {e}")))
}

/// Join a base URL and an absolute API path without doubling slashes.
pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// POST `body` as JSON and return the parsed JSON response.
///
/// Transport errors, non-2xx statuses and unparsable bodies all become a
/// [`CallFailure`]; the status is kept when a response arrived.
pub(crate) async fn post_json<B: Serialize + ?Sized>(
    client: &reqwest::Client,
    provider: &str,
    url: &str,
    api_key: Option<&str>,
    body: &B,
) -> std::result::Result<Value, CallFailure> {
    let mut request = client.post(url).json(body);
    if let Some(key) = api_key {
        request = request.bearer_auth(key);
    }
    send_json(provider, url, request).await
}

/// Send a prepared request and return the parsed JSON response.
pub(crate) async fn send_json(
    provider: &str,
    url: &str,
    request: reqwest::RequestBuilder,
) -> std::result::Result<Value, CallFailure> {
    let response = request.send().await.map_err(|e| {
        error!(provider, url, error = %e, "request failed");
        CallFailure { status: None, message: format!("request failed: {e}") }
    })?;

    let status = response.status();
    if !status.is_success() {
        let detail = response.text().await.unwrap_or_default();
        let detail = error_detail(&detail);
        error!(provider, url, %status, "API error");
        return Err(CallFailure {
            status: Some(status.as_u16()),
            message: format!("API returned {status}: {detail}"),
        });
    }

    response.json::<Value>().await.map_err(|e| {
        error!(provider, url, error = %e, "failed to parse response");
        CallFailure {
            status: Some(status.as_u16()),
            message: format!("failed to parse response: {e}"),
        }
    })
}

/// Pull a readable message out of an error body (`{"error": "..."}` from
/// Ollama, `{"error": {"message": "..."}}` from OpenAI and Anthropic), else
/// the raw body.
fn error_detail(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return body.to_string();
    };
    match value.get("error") {
        Some(Value::String(message)) => message.clone(),
        Some(Value::Object(obj)) => obj
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| body.to_string()),
        _ => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_urls_with_single_slash() {
        assert_eq!(
            join_url("http://localhost:11434/", "/api/embeddings"),
            "http://localhost:11434/api/embeddings"
        );
        assert_eq!(join_url("http://h", "v1/embeddings"), "http://h/v1/embeddings");
    }

    #[test]
    fn extracts_error_messages() {
        assert_eq!(error_detail(r#"{"error":"model not found"}"#), "model not found");
        assert_eq!(error_detail(r#"{"error":{"message":"bad key"}}"#), "bad key");
        assert_eq!(error_detail("plain text"), "plain text");
    }
}
