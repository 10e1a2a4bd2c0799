//! In-memory [`VectorStore`] implementation for tests and ephemeral use.
//!
//! Vectors live in a `Vec` behind `std::sync::RwLock`. Search is
//! brute-force cosine similarity over everything stored.

use std::sync::RwLock;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::embedding::cosine_similarity;
use crate::models::{IndexedVector, RetrievalResult};

use super::{rank, VectorStore};

pub struct InMemoryStore {
    vectors: RwLock<Vec<IndexedVector>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            vectors: RwLock::new(Vec::new()),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned<T>(_: T) -> anyhow::Error {
    anyhow!("in-memory store lock poisoned")
}

#[async_trait]
impl VectorStore for InMemoryStore {
    async fn insert(&self, vectors: &[IndexedVector]) -> Result<usize> {
        let mut stored = self.vectors.write().map_err(poisoned)?;
        stored.extend_from_slice(vectors);
        Ok(vectors.len())
    }

    async fn search(
        &self,
        query: &[f32],
        k: usize,
        threshold: Option<f32>,
    ) -> Result<Vec<RetrievalResult>> {
        let stored = self.vectors.read().map_err(poisoned)?;
        let scored = stored
            .iter()
            .map(|v| RetrievalResult {
                content: v.content.clone(),
                metadata: v.metadata.clone(),
                score: cosine_similarity(query, &v.embedding),
            })
            .collect();
        Ok(rank(scored, k, threshold))
    }

    async fn clear(&self) -> Result<u64> {
        let mut stored = self.vectors.write().map_err(poisoned)?;
        let removed = stored.len() as u64;
        stored.clear();
        Ok(removed)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.vectors.read().map_err(poisoned)?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChunkMetadata;

    fn vector(path: &str, index: usize, embedding: Vec<f32>) -> IndexedVector {
        IndexedVector {
            content: format!("{}#{}", path, index),
            metadata: ChunkMetadata {
                file_path: path.to_string(),
                chunk_index: index,
            },
            embedding,
        }
    }

    #[tokio::test]
    async fn test_search_ranks_by_similarity() {
        let store = InMemoryStore::new();
        store
            .insert(&[
                vector("a.rs", 0, vec![1.0, 0.0]),
                vector("b.rs", 0, vec![0.7, 0.7]),
                vector("c.rs", 0, vec![-1.0, 0.0]),
            ])
            .await
            .unwrap();

        let results = store.search(&[1.0, 0.0], 8, Some(0.0)).await.unwrap();
        let paths: Vec<&str> = results.iter().map(|r| r.metadata.file_path.as_str()).collect();
        assert_eq!(paths, vec!["a.rs", "b.rs"]);
        assert!((results[0].score - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_no_floor_returns_dissimilar() {
        let store = InMemoryStore::new();
        store
            .insert(&[
                vector("a.rs", 0, vec![1.0, 0.0]),
                vector("c.rs", 0, vec![-1.0, 0.0]),
            ])
            .await
            .unwrap();

        let all = store.search(&[1.0, 0.0], 8, None).await.unwrap();
        let paths: Vec<&str> = all.iter().map(|r| r.metadata.file_path.as_str()).collect();
        assert_eq!(paths, vec!["a.rs", "c.rs"]);
        assert!((all[1].score + 1.0).abs() < 1e-6);

        let floored = store.search(&[1.0, 0.0], 8, Some(0.0)).await.unwrap();
        assert_eq!(floored.len(), 1);
    }

    #[tokio::test]
    async fn test_clear_and_count() {
        let store = InMemoryStore::new();
        store
            .insert(&[vector("a.rs", 0, vec![1.0]), vector("a.rs", 1, vec![1.0])])
            .await
            .unwrap();
        assert_eq!(store.count().await.unwrap(), 2);
        assert_eq!(store.clear().await.unwrap(), 2);
        assert_eq!(store.count().await.unwrap(), 0);
        assert!(store.search(&[1.0], 8, None).await.unwrap().is_empty());
        assert_eq!(store.clear().await.unwrap(), 0);
    }
}
