//! In-memory vector store.
//!
//! [`InMemoryVectorStore`] keeps records in a `Vec` behind a
//! `tokio::sync::RwLock`. It suits tests and callers that index and query in
//! the same process without writing a file.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::document::VectorRecord;
use crate::error::Result;
use crate::vectorstore::{VectorStore, check_dimensions, renumber};

/// A [`VectorStore`] held in memory.
///
/// `replace` swaps the whole content, mirroring how a store file is only ever
/// rewritten whole.
///
/// # Example
///
/// ```rust,ignore
/// use ragbuilder_rag::{InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new();
/// store.replace(pipeline.index_text(&text).await?).await?;
/// let records = store.load().await?;
/// ```
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    records: RwLock<Vec<VectorRecord>>,
}

impl InMemoryVectorStore {
    /// Create a new empty in-memory vector store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding `records`, ids renumbered 1..N.
    pub fn with_records(mut records: Vec<VectorRecord>) -> Result<Self> {
        check_dimensions(&records)?;
        renumber(&mut records);
        Ok(Self { records: RwLock::new(records) })
    }

    /// Replace the whole content, renumbering ids 1..N.
    pub async fn replace(&self, mut records: Vec<VectorRecord>) -> Result<()> {
        check_dimensions(&records)?;
        renumber(&mut records);
        *self.records.write().await = records;
        Ok(())
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Whether the store is empty.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn load(&self) -> Result<Vec<VectorRecord>> {
        Ok(self.records.read().await.clone())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RagError;

    #[tokio::test]
    async fn replace_renumbers_and_loads_in_order() {
        let store = InMemoryVectorStore::new();
        assert!(store.is_empty().await);

        store
            .replace(vec![VectorRecord::new(5, "x", vec![1.0]), VectorRecord::new(5, "y", vec![2.0])])
            .await
            .unwrap();

        let records = store.load().await.unwrap();
        assert_eq!(records.iter().map(|r| (r.id, r.text.as_str())).collect::<Vec<_>>(), vec![
            (1, "x"),
            (2, "y")
        ]);
        assert_eq!(store.len().await, 2);
    }

    #[test]
    fn rejects_mixed_dimensions() {
        let result = InMemoryVectorStore::with_records(vec![
            VectorRecord::new(1, "x", vec![1.0]),
            VectorRecord::new(2, "y", vec![1.0, 2.0]),
        ]);
        assert!(matches!(result, Err(RagError::DimensionMismatch { .. })));
    }
}
