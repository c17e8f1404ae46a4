//! Data types for stored records, scored passages and query results.

use serde::{Deserialize, Serialize};

/// The persisted unit of a vector store: one embedded chunk.
///
/// `id` is 1-based and assigned by position when the store is written, so it
/// does not survive a reorder or a merge of two stores.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VectorRecord {
    /// Position of the record in its store, starting at 1.
    pub id: u64,
    /// The original chunk text.
    pub text: String,
    /// The chunk embedding.
    pub vector: Vec<f32>,
}

impl VectorRecord {
    /// Create a record.
    pub fn new(id: u64, text: impl Into<String>, vector: Vec<f32>) -> Self {
        Self { id, text: text.into(), vector }
    }
}

/// A [`VectorRecord`] paired with its cosine similarity to a query.
///
/// Serializes flat (`{id, text, vector, score}`), never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredPassage {
    /// The retrieved record.
    #[serde(flatten)]
    pub record: VectorRecord,
    /// Cosine similarity to the query (higher is more relevant).
    pub score: f32,
}

impl ScoredPassage {
    /// Id of the underlying record.
    pub fn id(&self) -> u64 {
        self.record.id
    }

    /// Text of the underlying record.
    pub fn text(&self) -> &str {
        &self.record.text
    }
}

/// The outcome of one end-to-end question.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RagResult {
    /// The generated answer.
    #[serde(rename = "reponse")]
    pub response: String,
    /// Passages used as context, in descending score order.
    pub passages: Vec<ScoredPassage>,
    /// The exact prompt sent to the generator.
    pub prompt: String,
}
