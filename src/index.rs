//! Vector index: embed chunks in batches, store them, and query by similarity.
//!
//! [`VectorIndex`] owns no state of its own. It drives an injected
//! [`EmbeddingProvider`] and [`VectorStore`], so the same code runs against
//! OpenAI + SQLite in production and scripted doubles in tests.
//!
//! Ingestion is best-effort: a batch whose embedding call fails, returns the
//! wrong number of vectors, or cannot be written is logged and skipped, and
//! the remaining batches still run. [`IngestStats`] reports how many chunks
//! were attempted and how many actually landed.

use anyhow::Result;
use std::sync::Arc;

use crate::embedding::EmbeddingProvider;
use crate::models::{Chunk, IndexedVector, IngestStats, RetrievalResult};
use crate::store::VectorStore;

/// Tuning knobs for [`VectorIndex`].
#[derive(Debug, Clone, Copy)]
pub struct IndexConfig {
    /// Chunks per embedding request.
    pub batch_size: usize,
    /// Minimum similarity for a query result. `None` keeps every match.
    pub match_threshold: Option<f32>,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            match_threshold: None,
        }
    }
}

pub struct VectorIndex {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    config: IndexConfig,
}

impl VectorIndex {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        config: IndexConfig,
    ) -> Self {
        Self {
            embedder,
            store,
            config: IndexConfig {
                batch_size: config.batch_size.max(1),
                ..config
            },
        }
    }

    /// Embed and store `chunks` in sequential batches.
    pub async fn ingest(&self, chunks: &[Chunk]) -> IngestStats {
        let mut stats = IngestStats {
            attempted: chunks.len(),
            ..IngestStats::default()
        };
        let total_batches = chunks.len().div_ceil(self.config.batch_size);

        for (batch_no, batch) in chunks.chunks(self.config.batch_size).enumerate() {
            let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();

            let vectors = match self.embedder.embed(&texts).await {
                Ok(vectors) => vectors,
                Err(e) => {
                    tracing::warn!(
                        batch = batch_no + 1,
                        total_batches,
                        "embedding failed, skipping batch: {:#}",
                        e
                    );
                    stats.failed_batches += 1;
                    continue;
                }
            };

            if vectors.len() != batch.len() {
                tracing::warn!(
                    batch = batch_no + 1,
                    total_batches,
                    expected = batch.len(),
                    got = vectors.len(),
                    "embedding count mismatch, skipping batch"
                );
                stats.failed_batches += 1;
                continue;
            }

            let records: Vec<IndexedVector> = batch
                .iter()
                .zip(vectors)
                .map(|(chunk, embedding)| IndexedVector {
                    content: chunk.content.clone(),
                    metadata: chunk.metadata(),
                    embedding,
                })
                .collect();

            match self.store.insert(&records).await {
                Ok(written) => {
                    stats.stored += written;
                    tracing::debug!(batch = batch_no + 1, total_batches, written, "stored batch");
                }
                Err(e) => {
                    tracing::warn!(
                        batch = batch_no + 1,
                        total_batches,
                        "store insert failed, skipping batch: {:#}",
                        e
                    );
                    stats.failed_batches += 1;
                }
            }
        }

        tracing::info!(
            attempted = stats.attempted,
            stored = stats.stored,
            failed_batches = stats.failed_batches,
            "ingest finished"
        );
        stats
    }

    /// Return up to `k` stored chunks most similar to `text`.
    ///
    /// Blank text matches nothing and never reaches the embedder.
    pub async fn query(&self, text: &str, k: usize) -> Result<Vec<RetrievalResult>> {
        if text.trim().is_empty() {
            tracing::debug!("blank query, skipping retrieval");
            return Ok(Vec::new());
        }
        let query_vec = self.embedder.embed_query(text).await?;
        self.store
            .search(&query_vec, k, self.config.match_threshold)
            .await
    }

    /// Delete every stored vector. Safe to call on an empty store.
    pub async fn clear(&self) -> Result<u64> {
        let removed = self.store.clear().await?;
        tracing::info!(removed, "cleared vector store");
        Ok(removed)
    }
}
