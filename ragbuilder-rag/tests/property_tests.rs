//! Property tests for chunking, cosine similarity and top-K ranking.

use std::collections::HashSet;

use proptest::prelude::*;
use ragbuilder_rag::document::VectorRecord;
use ragbuilder_rag::vectorstore::{load_records, save_records};
use ragbuilder_rag::{Chunker, FixedSizeChunker, chunk, cosine_similarity, top_k};

/// Generate a non-zero embedding of the given dimension.
fn arb_nonzero_embedding(dim: usize) -> impl Strategy<Value = Vec<f32>> {
    proptest::collection::vec(-1.0f32..1.0f32, dim).prop_filter("non-zero embedding", |v| {
        v.iter().map(|x| x * x).sum::<f32>().sqrt() > 1e-3
    })
}

/// Generate a store of `1..max` records with consecutive ids.
fn arb_records(dim: usize, max: usize) -> impl Strategy<Value = Vec<VectorRecord>> {
    proptest::collection::vec(("[a-z ]{1,20}", arb_nonzero_embedding(dim)), 0..max).prop_map(
        |items| {
            items
                .into_iter()
                .enumerate()
                .map(|(i, (text, vector))| VectorRecord::new(i as u64 + 1, text, vector))
                .collect()
        },
    )
}

/// Concatenating the chunks reproduces the input exactly.
mod prop_chunking_is_lossless {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn concatenation_reproduces_text(text in "\\PC{1,400}", tokens in 1usize..20) {
            let chunks = chunk(&text, tokens).unwrap();
            prop_assert_eq!(chunks.concat(), text.clone());

            let window = tokens * 6;
            for c in &chunks[..chunks.len() - 1] {
                prop_assert_eq!(c.chars().count(), window);
            }
            prop_assert!(chunks.last().unwrap().chars().count() <= window);
        }

        #[test]
        fn overlapping_windows_cover_the_text(
            text in "[a-z]{1,300}",
            window in 2usize..40,
            overlap_seed in 0usize..40,
        ) {
            let overlap = overlap_seed % window;
            let chunker = FixedSizeChunker::from_chars(window)
                .unwrap()
                .with_overlap_chars(overlap)
                .unwrap();
            let chunks = chunker.chunk(&text);

            // Dropping each window's overlap prefix rebuilds the text.
            let mut rebuilt = chunks[0].clone();
            for c in &chunks[1..] {
                rebuilt.push_str(&c[overlap..]);
            }
            prop_assert_eq!(rebuilt, text);
        }
    }
}

/// Cosine similarity of a vector with itself is 1, with zero is 0.
mod prop_cosine {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn self_similarity_is_one(v in arb_nonzero_embedding(16)) {
            let score = cosine_similarity(&v, &v).unwrap();
            prop_assert!((score - 1.0).abs() < 1e-4, "score was {}", score);
        }

        #[test]
        fn similarity_with_zero_is_zero(v in arb_nonzero_embedding(16)) {
            prop_assert_eq!(cosine_similarity(&v, &[0.0; 16]).unwrap(), 0.0);
        }
    }
}

/// top_k returns min(k, n) records, sorted non-increasing, drawn from the input.
mod prop_top_k {
    use super::*;

    const DIM: usize = 8;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn bounded_ordered_subset(
            records in arb_records(DIM, 20),
            query in arb_nonzero_embedding(DIM),
            k in 1usize..25,
        ) {
            let results = top_k(&records, &query, k).unwrap();

            prop_assert_eq!(results.len(), k.min(records.len()));

            for window in results.windows(2) {
                prop_assert!(
                    window[0].score >= window[1].score,
                    "results not in descending order: {} < {}",
                    window[0].score,
                    window[1].score,
                );
            }

            let input_ids: HashSet<u64> = records.iter().map(|r| r.id).collect();
            let mut seen = HashSet::new();
            for passage in &results {
                prop_assert!(input_ids.contains(&passage.id()));
                prop_assert!(seen.insert(passage.id()), "duplicate id {}", passage.id());
                let original = &records[passage.id() as usize - 1];
                prop_assert_eq!(&passage.record, original);
            }
        }
    }
}

/// Saving then loading returns the records renumbered 1..N by position.
mod prop_store_round_trip {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(30))]

        #[test]
        fn load_after_save_renumbers(records in arb_records(4, 10), offset in 1u64..100) {
            let shuffled_ids: Vec<VectorRecord> = records
                .iter()
                .rev()
                .map(|r| VectorRecord::new(r.id + offset, r.text.clone(), r.vector.clone()))
                .collect();

            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("vectors.json");
            let rt = tokio::runtime::Runtime::new().unwrap();
            let loaded = rt.block_on(async {
                save_records(&shuffled_ids, &path).await.unwrap();
                load_records(&path).await.unwrap()
            });

            prop_assert_eq!(loaded.len(), shuffled_ids.len());
            for (i, (got, sent)) in loaded.iter().zip(&shuffled_ids).enumerate() {
                prop_assert_eq!(got.id, i as u64 + 1);
                prop_assert_eq!(&got.text, &sent.text);
                prop_assert_eq!(&got.vector, &sent.vector);
            }
        }
    }
}
