//! Vector storage abstraction.
//!
//! The [`VectorStore`] trait is the only thing the vector index needs from
//! persistence: append vectors, rank them against a query vector, and wipe
//! everything. Two backends are provided:
//!
//! - [`InMemoryStore`]: `RwLock`-backed, for tests and throwaway sessions.
//! - [`SqliteStore`]: one SQLite file via `sqlx`, vectors stored as BLOBs.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;
pub mod sqlite;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{IndexedVector, RetrievalResult};

pub use memory::InMemoryStore;
pub use sqlite::SqliteStore;

/// Abstract vector storage backend.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`insert`](VectorStore::insert) | Append vectors with their chunk text and metadata |
/// | [`search`](VectorStore::search) | Top-`k` by cosine similarity, optionally floored |
/// | [`clear`](VectorStore::clear) | Delete every stored vector |
/// | [`count`](VectorStore::count) | Number of stored vectors |
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Append vectors. Either all of them are written or none are.
    ///
    /// Returns the number of rows written.
    async fn insert(&self, vectors: &[IndexedVector]) -> Result<usize>;

    /// Return at most `k` entries ordered by descending similarity to
    /// `query`. With `Some(threshold)`, entries scoring below it are dropped;
    /// `None` ranks everything.
    async fn search(
        &self,
        query: &[f32],
        k: usize,
        threshold: Option<f32>,
    ) -> Result<Vec<RetrievalResult>>;

    /// Delete every stored vector, returning how many were removed.
    async fn clear(&self) -> Result<u64>;

    async fn count(&self) -> Result<usize>;
}

/// Sort by descending score (stable, so ties keep insertion order),
/// drop results under `threshold` if one is set and keep the first `k`.
pub(crate) fn rank(
    mut results: Vec<RetrievalResult>,
    k: usize,
    threshold: Option<f32>,
) -> Vec<RetrievalResult> {
    if let Some(threshold) = threshold {
        results.retain(|r| r.score >= threshold);
    }
    results.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    results.truncate(k);
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChunkMetadata;

    fn result(index: usize, score: f32) -> RetrievalResult {
        RetrievalResult {
            content: format!("chunk {}", index),
            metadata: ChunkMetadata {
                file_path: "a.py".to_string(),
                chunk_index: index,
            },
            score,
        }
    }

    #[test]
    fn test_rank_orders_filters_and_truncates() {
        let ranked = rank(
            vec![result(0, 0.2), result(1, 0.9), result(2, -0.5), result(3, 0.5)],
            2,
            Some(0.0),
        );
        let indices: Vec<usize> = ranked.iter().map(|r| r.metadata.chunk_index).collect();
        assert_eq!(indices, vec![1, 3]);
    }

    #[test]
    fn test_rank_without_floor_keeps_negative_scores() {
        let ranked = rank(vec![result(0, -0.9), result(1, 0.1), result(2, -0.2)], 8, None);
        let indices: Vec<usize> = ranked.iter().map(|r| r.metadata.chunk_index).collect();
        assert_eq!(indices, vec![1, 2, 0]);
    }

    #[test]
    fn test_rank_ties_keep_insertion_order() {
        let ranked = rank(vec![result(0, 0.5), result(1, 0.5), result(2, 0.5)], 8, None);
        let indices: Vec<usize> = ranked.iter().map(|r| r.metadata.chunk_index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }
}
