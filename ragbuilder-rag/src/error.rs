//! Error types for the `ragbuilder-rag` crate.

use thiserror::Error;

/// Errors that can occur in RAG operations.
#[derive(Debug, Error)]
pub enum RagError {
    /// A caller-supplied argument is outside its valid range.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The embedding service returned a non-success response or could not be reached.
    #[error("Embedding service error ({provider}): {message}")]
    EmbeddingService {
        /// The embedding provider that produced the error.
        provider: String,
        /// HTTP status code, if a response was received at all.
        status: Option<u16>,
        /// A description of the failure.
        message: String,
    },

    /// The generation service returned a non-success response or could not be reached.
    #[error("Generation service error ({provider}): {message}")]
    GenerationService {
        /// The generation provider that produced the error.
        provider: String,
        /// HTTP status code, if a response was received at all.
        status: Option<u16>,
        /// A description of the failure.
        message: String,
    },

    /// The vector store file is missing or could not be parsed.
    #[error("Vector store unavailable ({location}): {message}")]
    StoreUnavailable {
        /// Path or URL of the store.
        location: String,
        /// A description of the failure.
        message: String,
    },

    /// A stored vector and the query vector have different lengths.
    #[error("Dimension mismatch for record {record_id}: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Id of the offending record (0 when comparing bare vectors).
        record_id: u64,
        /// Length of the query (or reference) vector.
        expected: usize,
        /// Length of the offending vector.
        actual: usize,
    },

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The operation was cancelled through its cancellation token.
    #[error("Cancelled during {stage}")]
    Cancelled {
        /// The stage that was about to run.
        stage: String,
    },

    /// Local file I/O failed (wizard state, transcript).
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Local JSON (de)serialization failed (wizard state, transcript).
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl RagError {
    /// HTTP status carried by a service error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::EmbeddingService { status, .. } | Self::GenerationService { status, .. } => {
                *status
            }
            _ => None,
        }
    }
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_errors_name_the_provider() {
        let err = RagError::EmbeddingService {
            provider: "Ollama".into(),
            status: Some(500),
            message: "API returned 500 Internal Server Error: boom".into(),
        };
        assert_eq!(err.status(), Some(500));
        assert_eq!(
            err.to_string(),
            "Embedding service error (Ollama): API returned 500 Internal Server Error: boom"
        );

        let err = RagError::GenerationService {
            provider: "Ollama".into(),
            status: None,
            message: "connection refused".into(),
        };
        assert_eq!(err.status(), None);
        assert_eq!(err.to_string(), "Generation service error (Ollama): connection refused");
    }
}
