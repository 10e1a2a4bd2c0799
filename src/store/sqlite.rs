//! SQLite-backed [`VectorStore`] implementation.
//!
//! Each stored vector is one row of the `documents` table created by
//! [`migrate::ensure_schema`](crate::migrate::ensure_schema). Embeddings are
//! kept as little-endian `f32` BLOBs and ranked in Rust with cosine
//! similarity, so no SQLite extension is needed.
//!
//! Citation metadata is read back from `metadata_json`. The `file_path` and
//! `chunk_index` columns exist for indexing and as a fallback for rows whose
//! JSON is missing or unreadable.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use crate::embedding::{blob_to_vec, cosine_similarity, vec_to_blob};
use crate::models::{ChunkMetadata, IndexedVector, RetrievalResult};

use super::{rank, VectorStore};

/// SQLite implementation of the [`VectorStore`] trait.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Wrap an open pool. The schema must already exist.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl VectorStore for SqliteStore {
    async fn insert(&self, vectors: &[IndexedVector]) -> Result<usize> {
        if vectors.is_empty() {
            return Ok(0);
        }

        let now = chrono::Utc::now().timestamp();
        let mut tx = self.pool.begin().await?;

        for vector in vectors {
            let metadata_json = serde_json::to_string(&vector.metadata)?;
            sqlx::query(
                r#"
                INSERT INTO documents (id, content, file_path, chunk_index,
                                       metadata_json, embedding, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(uuid::Uuid::new_v4().to_string())
            .bind(&vector.content)
            .bind(&vector.metadata.file_path)
            .bind(vector.metadata.chunk_index as i64)
            .bind(&metadata_json)
            .bind(vec_to_blob(&vector.embedding))
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(vectors.len())
    }

    async fn search(
        &self,
        query: &[f32],
        k: usize,
        threshold: Option<f32>,
    ) -> Result<Vec<RetrievalResult>> {
        let rows = sqlx::query(
            r#"
            SELECT content, file_path, chunk_index, metadata_json, embedding
            FROM documents
            ORDER BY rowid
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let scored = rows
            .iter()
            .map(|row| {
                let blob: Vec<u8> = row.get("embedding");
                RetrievalResult {
                    content: row.get("content"),
                    metadata: row_metadata(row),
                    score: cosine_similarity(query, &blob_to_vec(&blob)),
                }
            })
            .collect();

        Ok(rank(scored, k, threshold))
    }

    async fn clear(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM documents")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn count(&self) -> Result<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as usize)
    }
}

fn row_metadata(row: &sqlx::sqlite::SqliteRow) -> ChunkMetadata {
    let json: String = row.get("metadata_json");
    match serde_json::from_str::<ChunkMetadata>(&json) {
        Ok(metadata) => metadata,
        Err(e) => {
            let chunk_index: i64 = row.get("chunk_index");
            let metadata = ChunkMetadata {
                file_path: row.get("file_path"),
                chunk_index: chunk_index.max(0) as usize,
            };
            tracing::debug!(
                file_path = %metadata.file_path,
                "unreadable metadata_json, using columns: {}",
                e
            );
            metadata
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db, migrate};
    use tempfile::TempDir;

    async fn open(tmp: &TempDir) -> SqliteStore {
        let pool = db::connect_path(&tmp.path().join("data/codetalk.sqlite"))
            .await
            .unwrap();
        migrate::ensure_schema(&pool).await.unwrap();
        SqliteStore::new(pool)
    }

    fn vector(path: &str, index: usize, embedding: Vec<f32>) -> IndexedVector {
        IndexedVector {
            content: format!("content of {} #{}", path, index),
            metadata: ChunkMetadata {
                file_path: path.to_string(),
                chunk_index: index,
            },
            embedding,
        }
    }

    #[tokio::test]
    async fn test_insert_search_clear() {
        let tmp = TempDir::new().unwrap();
        let store = open(&tmp).await;

        let written = store
            .insert(&[
                vector("src/lib.rs", 0, vec![1.0, 0.0, 0.0]),
                vector("src/lib.rs", 1, vec![0.0, 1.0, 0.0]),
                vector("README.md", 0, vec![0.6, 0.8, 0.0]),
            ])
            .await
            .unwrap();
        assert_eq!(written, 3);
        assert_eq!(store.count().await.unwrap(), 3);

        let results = store.search(&[1.0, 0.0, 0.0], 2, None).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].metadata.file_path, "src/lib.rs");
        assert_eq!(results[0].metadata.chunk_index, 0);
        assert_eq!(results[0].content, "content of src/lib.rs #0");
        assert_eq!(results[1].metadata.file_path, "README.md");

        assert_eq!(store.clear().await.unwrap(), 3);
        assert_eq!(store.count().await.unwrap(), 0);
        assert!(store.search(&[1.0, 0.0, 0.0], 8, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_reads_metadata_json() {
        let tmp = TempDir::new().unwrap();
        let store = open(&tmp).await;
        store
            .insert(&[
                vector("src/old.rs", 3, vec![1.0, 0.0]),
                vector("src/legacy.rs", 4, vec![0.5, 0.5]),
            ])
            .await
            .unwrap();

        sqlx::query(
            r#"UPDATE documents SET metadata_json = '{"file_path":"src/new.rs","chunk_index":7}'
               WHERE file_path = 'src/old.rs'"#,
        )
        .execute(store.pool())
        .await
        .unwrap();
        sqlx::query("UPDATE documents SET metadata_json = '{}' WHERE file_path = 'src/legacy.rs'")
            .execute(store.pool())
            .await
            .unwrap();

        let results = store.search(&[1.0, 0.0], 8, None).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].metadata.file_path, "src/new.rs");
        assert_eq!(results[0].metadata.chunk_index, 7);
        assert_eq!(results[1].metadata.file_path, "src/legacy.rs");
        assert_eq!(results[1].metadata.chunk_index, 4);
    }

    #[tokio::test]
    async fn test_schema_is_idempotent_and_data_persists() {
        let tmp = TempDir::new().unwrap();
        {
            let store = open(&tmp).await;
            store
                .insert(&[vector("a.py", 0, vec![1.0, 1.0])])
                .await
                .unwrap();
            store.pool().close().await;
        }
        let store = open(&tmp).await;
        assert_eq!(store.count().await.unwrap(), 1);
    }
}
