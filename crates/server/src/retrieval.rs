//! Page-level retrieval: score every stored page of a document against a
//! query embedding and keep the best matches.
//!
//! The scan is exhaustive — every chunk of the document is scored on each
//! query. At the expected scale (documents of low hundreds of pages) this
//! costs O(pages × dimensions) per query, which is cheap enough that no
//! approximate index is kept.

use serde::Serialize;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use lesesaal_ingest::embedding::{Embedder, EmbeddingError};

use crate::page_store::{self, StoredPage};

/// Pages handed to the LLM per chat turn.
pub const DEFAULT_TOP_K: usize = 8;

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),
    #[error("embedding error: {0}")]
    Embedding(#[from] EmbeddingError),
}

/// One retrieved page with its similarity score. Transient, per query.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct RetrievedPage {
    pub page_number: i32,
    pub content: String,
    pub score: f32,
}

/// Cosine similarity of two vectors.
///
/// Returns 0.0 when either vector has zero magnitude — a defined edge case
/// (blank pages embed near-zero with some models), not an error. Vectors of
/// different lengths also score 0.0; that only happens when stored chunks
/// predate an embedding-model change.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        tracing::warn!(
            "embedding length mismatch ({} vs {}) — scoring 0",
            a.len(),
            b.len()
        );
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let magnitude = norm_a.sqrt() * norm_b.sqrt();
    if magnitude == 0.0 {
        return 0.0;
    }
    dot / magnitude
}

/// Score pages against the query embedding and keep the `top_k` best.
///
/// The sort is stable and the input arrives in page order, so equal scores
/// resolve to ascending page number — deterministic for identical inputs.
pub fn rank_pages(pages: Vec<StoredPage>, query_embedding: &[f32], top_k: usize) -> Vec<RetrievedPage> {
    let mut scored: Vec<RetrievedPage> = pages
        .into_iter()
        .map(|page| RetrievedPage {
            score: cosine_similarity(query_embedding, &page.embedding),
            page_number: page.page_number,
            content: page.content,
        })
        .collect();

    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(top_k);
    scored
}

/// Find the pages of `document_id` most relevant to `query`.
///
/// Zero stored chunks yields an empty result — the caller falls back to the
/// document's full extracted text; this is not a failure. An embedding or
/// store error, by contrast, propagates: a broken pipeline must fail the
/// request rather than silently answer without context.
pub async fn search(
    pool: &PgPool,
    embedder: &dyn Embedder,
    document_id: Uuid,
    query: &str,
    top_k: usize,
) -> Result<Vec<RetrievedPage>, RetrievalError> {
    let pages = page_store::list_pages(pool, document_id).await?;
    if pages.is_empty() {
        return Ok(Vec::new());
    }

    let query_embedding = embedder.embed(query).await?;

    Ok(rank_pages(pages, &query_embedding, top_k))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(n: i32, embedding: Vec<f32>) -> StoredPage {
        StoredPage {
            page_number: n,
            content: format!("page {n}"),
            embedding,
        }
    }

    #[test]
    fn self_similarity_is_one() {
        let v = vec![0.3, -1.2, 4.5, 0.01];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn zero_vector_scores_zero() {
        let v = vec![1.0, 2.0, 3.0];
        let zero = vec![0.0, 0.0, 0.0];
        assert_eq!(cosine_similarity(&v, &zero), 0.0);
        assert_eq!(cosine_similarity(&zero, &zero), 0.0);
    }

    #[test]
    fn orthogonal_vectors_score_zero() {
        assert!((cosine_similarity(&[1.0, 0.0], &[0.0, 1.0])).abs() < 1e-6);
    }

    #[test]
    fn opposite_vectors_score_minus_one() {
        let score = cosine_similarity(&[1.0, 1.0], &[-1.0, -1.0]);
        assert!((score + 1.0).abs() < 1e-6);
    }

    #[test]
    fn similarity_is_magnitude_independent() {
        let a = vec![1.0, 2.0, 3.0];
        let scaled: Vec<f32> = a.iter().map(|x| x * 10.0).collect();
        assert!((cosine_similarity(&a, &scaled) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn mismatched_lengths_score_zero() {
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0, 2.0, 3.0]), 0.0);
    }

    #[test]
    fn top_k_picks_the_closest_pages() {
        // Query points along the x-axis; pages 3 and 7 are closest.
        let query = vec![1.0, 0.0];
        let pages = vec![
            page(1, vec![0.0, 1.0]),
            page(2, vec![0.1, 1.0]),
            page(3, vec![1.0, 0.05]),
            page(4, vec![-1.0, 0.0]),
            page(5, vec![0.2, 0.9]),
            page(6, vec![0.0, -1.0]),
            page(7, vec![0.9, 0.1]),
            page(8, vec![0.3, 0.8]),
            page(9, vec![0.0, 0.5]),
            page(10, vec![-0.5, 0.5]),
        ];

        let top = rank_pages(pages, &query, 2);

        let mut numbers: Vec<i32> = top.iter().map(|p| p.page_number).collect();
        numbers.sort();
        assert_eq!(numbers, vec![3, 7]);
    }

    #[test]
    fn results_are_sorted_by_score_descending() {
        let query = vec![1.0, 0.0];
        let pages = vec![
            page(1, vec![0.5, 0.5]),
            page(2, vec![1.0, 0.0]),
            page(3, vec![0.0, 1.0]),
        ];

        let ranked = rank_pages(pages, &query, 3);

        assert_eq!(ranked[0].page_number, 2);
        assert_eq!(ranked[1].page_number, 1);
        assert_eq!(ranked[2].page_number, 3);
        assert!(ranked[0].score >= ranked[1].score);
        assert!(ranked[1].score >= ranked[2].score);
    }

    #[test]
    fn ranking_is_independent_of_storage_order() {
        let query = vec![0.6, 0.8];
        let pages = vec![
            page(1, vec![0.9, 0.1]),
            page(2, vec![0.5, 0.8]),
            page(3, vec![0.1, 0.9]),
            page(4, vec![0.7, 0.7]),
            page(5, vec![-0.2, 0.4]),
        ];
        let mut shuffled = pages.clone();
        shuffled.reverse();
        shuffled.swap(0, 2);

        let from_ordered: Vec<i32> = rank_pages(pages, &query, 3)
            .iter()
            .map(|p| p.page_number)
            .collect();
        let from_shuffled: Vec<i32> = rank_pages(shuffled, &query, 3)
            .iter()
            .map(|p| p.page_number)
            .collect();

        assert_eq!(from_ordered, from_shuffled);
    }

    #[test]
    fn equal_scores_resolve_to_page_order() {
        let query = vec![1.0, 0.0];
        // Pages 2 and 4 have identical embeddings, so identical scores.
        let pages = vec![
            page(1, vec![0.0, 1.0]),
            page(2, vec![0.5, 0.5]),
            page(3, vec![1.0, 0.0]),
            page(4, vec![0.5, 0.5]),
        ];

        let ranked = rank_pages(pages, &query, 4);

        assert_eq!(ranked[0].page_number, 3);
        assert_eq!(ranked[1].page_number, 2);
        assert_eq!(ranked[2].page_number, 4);
    }

    #[test]
    fn top_k_larger_than_page_count_returns_everything() {
        let pages = vec![page(1, vec![1.0, 0.0]), page(2, vec![0.0, 1.0])];
        let ranked = rank_pages(pages, &[1.0, 0.0], 8);
        assert_eq!(ranked.len(), 2);
    }

    #[test]
    fn blank_page_with_zero_embedding_ranks_last() {
        let query = vec![1.0, 0.0];
        let pages = vec![
            page(1, vec![0.0, 0.0]),
            page(2, vec![0.8, 0.2]),
        ];

        let ranked = rank_pages(pages, &query, 2);

        assert_eq!(ranked[0].page_number, 2);
        assert_eq!(ranked[1].score, 0.0);
    }
}
