//! Cosine similarity ranking over a flat list of records.

use crate::document::{ScoredPassage, VectorRecord};
use crate::error::{RagError, Result};

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude.
///
/// # Errors
///
/// Returns [`RagError::DimensionMismatch`] if the vectors differ in length.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(RagError::DimensionMismatch { record_id: 0, expected: a.len(), actual: b.len() });
    }
    Ok(cosine_unchecked(a, b))
}

fn cosine_unchecked(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Score every record against `query` and keep the `k` best.
///
/// Results are ordered by descending score; records with equal scores keep
/// their original relative order. An empty `records` slice yields an empty
/// result, and `k` larger than the store returns every record.
///
/// # Errors
///
/// - [`RagError::InvalidArgument`] if `k` is zero.
/// - [`RagError::DimensionMismatch`] if a record's vector length differs from
///   the query's.
pub fn top_k(records: &[VectorRecord], query: &[f32], k: usize) -> Result<Vec<ScoredPassage>> {
    if k == 0 {
        return Err(RagError::InvalidArgument("k must be at least 1".to_string()));
    }

    let mut scored = records
        .iter()
        .map(|record| {
            if record.vector.len() != query.len() {
                return Err(RagError::DimensionMismatch {
                    record_id: record.id,
                    expected: query.len(),
                    actual: record.vector.len(),
                });
            }
            let score = cosine_unchecked(&record.vector, query);
            Ok(ScoredPassage { record: record.clone(), score })
        })
        .collect::<Result<Vec<_>>>()?;

    // `sort_by` is stable, so ties keep store order.
    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    scored.truncate(k);
    Ok(scored)
}

/// Drop passages scoring strictly below `threshold`, keeping order.
pub fn filter_by_threshold(passages: Vec<ScoredPassage>, threshold: f32) -> Vec<ScoredPassage> {
    passages.into_iter().filter(|p| p.score >= threshold).collect()
}
