//! Flat-file vector store: a JSON array of `{id, text, vector}` records.
//!
//! A store has two lifecycle events only: it is written whole at the end of
//! an indexing run, and it is loaded whole for every query. There is no
//! update, delete or deduplication.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, error, info};

use crate::document::VectorRecord;
use crate::error::{RagError, Result};

/// Default file name written by an indexing run.
pub const DEFAULT_STORE_FILE: &str = "vectors.json";

/// Conventional location of the store relative to the chatbot page.
pub const DEFAULT_STORE_PATH: &str = "../data/vectors.json";

/// A source of vector records for retrieval.
///
/// # Example
///
/// ```rust,ignore
/// use ragbuilder_rag::{FileVectorStore, VectorStore};
///
/// let store = FileVectorStore::new("data/vectors.json");
/// let records = store.load().await?;
/// ```
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Load every record, in store order.
    async fn load(&self) -> Result<Vec<VectorRecord>>;

    /// Human-readable location, used in logs and errors.
    fn location(&self) -> String;
}

/// A [`VectorStore`] read from a JSON file on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileVectorStore {
    path: PathBuf,
}

impl FileVectorStore {
    /// Create a store reading from `path`. Nothing is read until [`VectorStore::load`].
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl VectorStore for FileVectorStore {
    async fn load(&self) -> Result<Vec<VectorRecord>> {
        load_records(&self.path).await
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

/// A [`VectorStore`] fetched over HTTP, like the chatbot page fetching
/// `../data/vectors.json` from its own origin.
///
/// Only available with an HTTP-enabled feature (`ollama` or `openai`).
#[cfg(feature = "http")]
#[derive(Debug, Clone)]
pub struct HttpVectorStore {
    client: reqwest::Client,
    url: String,
}

#[cfg(feature = "http")]
impl HttpVectorStore {
    /// Create a store fetched from `url`.
    pub fn new(url: impl Into<String>) -> Result<Self> {
        Ok(Self { client: crate::http::build_client(None)?, url: url.into() })
    }

    fn unavailable(&self, message: String) -> RagError {
        error!(location = %self.url, %message, "vector store unavailable");
        RagError::StoreUnavailable { location: self.url.clone(), message }
    }
}

#[cfg(feature = "http")]
#[async_trait]
impl VectorStore for HttpVectorStore {
    async fn load(&self) -> Result<Vec<VectorRecord>> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| self.unavailable(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(self.unavailable(format!("server returned {status}")));
        }

        let body =
            response.text().await.map_err(|e| self.unavailable(format!("read failed: {e}")))?;
        let records = parse_records(&body, &self.url)?;
        debug!(location = %self.url, record_count = records.len(), "loaded vector store");
        Ok(records)
    }

    fn location(&self) -> String {
        self.url.clone()
    }
}

/// Renumber `records` 1..N by position.
pub fn renumber(records: &mut [VectorRecord]) {
    for (i, record) in records.iter_mut().enumerate() {
        record.id = i as u64 + 1;
    }
}

/// Serialize records as the pretty-printed store document, ids renumbered 1..N.
pub fn to_json(records: &[VectorRecord]) -> Result<String> {
    let mut records = records.to_vec();
    renumber(&mut records);
    Ok(serde_json::to_string_pretty(&records)?)
}

/// Write `records` to `path` as a pretty-printed JSON array.
///
/// Ids are renumbered 1..N by position; parent directories are created.
pub async fn save_records(records: &[VectorRecord], path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let json = to_json(records)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, json).await?;

    info!(path = %path.display(), record_count = records.len(), "saved vector store");
    Ok(())
}

/// Read and parse a store file.
///
/// # Errors
///
/// - [`RagError::StoreUnavailable`] if the file cannot be read or parsed.
/// - [`RagError::DimensionMismatch`] if the records disagree on vector length.
pub async fn load_records(path: impl AsRef<Path>) -> Result<Vec<VectorRecord>> {
    let path = path.as_ref();
    let location = path.display().to_string();

    let body = tokio::fs::read_to_string(path).await.map_err(|e| {
        error!(location = %location, error = %e, "vector store unavailable");
        RagError::StoreUnavailable { location: location.clone(), message: e.to_string() }
    })?;

    let records = parse_records(&body, &location)?;
    debug!(location = %location, record_count = records.len(), "loaded vector store");
    Ok(records)
}

/// Parse a store document and check that all vectors share one length.
pub fn parse_records(body: &str, location: &str) -> Result<Vec<VectorRecord>> {
    let records: Vec<VectorRecord> = serde_json::from_str(body).map_err(|e| {
        error!(location, error = %e, "vector store is not valid JSON");
        RagError::StoreUnavailable { location: location.to_string(), message: e.to_string() }
    })?;
    check_dimensions(&records)?;
    Ok(records)
}

/// Verify every record has the same vector length as the first one.
pub fn check_dimensions(records: &[VectorRecord]) -> Result<()> {
    let Some(first) = records.first() else {
        return Ok(());
    };
    let expected = first.vector.len();
    match records.iter().find(|r| r.vector.len() != expected) {
        Some(bad) => Err(RagError::DimensionMismatch {
            record_id: bad.id,
            expected,
            actual: bad.vector.len(),
        }),
        None => Ok(()),
    }
}
