//! The four-stage pipeline behind every boundary operation.
//!
//! ```text
//! ingest:  clone ─▶ collect ─▶ chunk ─▶ embed + store
//! ask:     embed question ─▶ similarity search ─▶ prompt ─▶ language model
//! clear:   delete every stored vector
//! ```
//!
//! [`Pipeline`] wires the stages together once and is shared by the CLI and
//! the HTTP server. Failures are classified into [`PipelineError`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::answer::{AnswerComposer, AnswerConfig};
use crate::chunk::Chunker;
use crate::collector;
use crate::config::{Config, ReposConfig};
use crate::db;
use crate::embedding::{create_provider, EmbeddingProvider};
use crate::error::{chain, PipelineError, PipelineResult};
use crate::index::{IndexConfig, VectorIndex};
use crate::llm::{create_language_model, LanguageModel};
use crate::migrate;
use crate::models::{Answer, ConversationTurn, IngestReport};
use crate::repo;
use crate::store::{SqliteStore, VectorStore};

pub struct Pipeline {
    chunker: Chunker,
    index: Arc<VectorIndex>,
    composer: AnswerComposer,
    repos: ReposConfig,
    exclude_globs: Vec<String>,
}

impl Pipeline {
    /// Build a pipeline from configuration: SQLite store at `db.path`
    /// (schema created if missing) and the configured providers.
    pub async fn from_config(config: &Config) -> anyhow::Result<Self> {
        let pool = db::connect(config).await?;
        migrate::ensure_schema(&pool).await?;
        let store: Arc<dyn VectorStore> = Arc::new(SqliteStore::new(pool));
        let embedder = create_provider(&config.embedding)?;
        let llm = create_language_model(&config.llm)?;
        Ok(Self::new(config, embedder, store, llm))
    }

    /// Build a pipeline around injected collaborators.
    pub fn new(
        config: &Config,
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        llm: Arc<dyn LanguageModel>,
    ) -> Self {
        let index = Arc::new(VectorIndex::new(
            embedder,
            store,
            IndexConfig {
                batch_size: config.embedding.batch_size,
                match_threshold: config.retrieval.match_threshold,
            },
        ));
        let composer = AnswerComposer::new(
            index.clone(),
            llm,
            AnswerConfig {
                top_k: config.retrieval.top_k,
                history_turns: config.retrieval.history_turns,
            },
        );

        Self {
            chunker: Chunker::new(config.chunking),
            index,
            composer,
            repos: config.repos.clone(),
            exclude_globs: config.collector.exclude_globs.clone(),
        }
    }

    /// Clone `url` and ingest the checkout.
    ///
    /// The URL is validated before anything touches the filesystem.
    pub async fn ingest_repository(&self, url: &str) -> PipelineResult<IngestReport> {
        repo::validate_repo_url(url, &self.repos.allowed_prefixes)
            .map_err(|e| PipelineError::InvalidInput(chain(&e)))?;

        let checkout = self.clone_checkout(url).await?;
        self.ingest_path(&checkout).await
    }

    async fn clone_checkout(&self, url: &str) -> PipelineResult<PathBuf> {
        let url = url.to_string();
        let repos = self.repos.clone();
        tokio::task::spawn_blocking(move || repo::clone_repository(&url, &repos))
            .await
            .map_err(|e| PipelineError::Acquisition(e.to_string()))?
            .map_err(|e| PipelineError::Acquisition(chain(&e)))
    }

    /// Collect, chunk, embed and store every allowed file under `root`.
    pub async fn ingest_path(&self, root: &Path) -> PipelineResult<IngestReport> {
        let files = collector::collect_files_excluding(root, &self.exclude_globs)
            .map_err(|e| PipelineError::Collect(chain(&e)))?;
        let chunks = self.chunker.chunk_files(&files);
        let stats = self.index.ingest(&chunks).await;

        Ok(IngestReport {
            files_processed: files.len(),
            chunks_attempted: stats.attempted,
            chunks_stored: stats.stored,
        })
    }

    /// Answer `question` from the indexed code, using `history` to resolve references.
    pub async fn ask(
        &self,
        question: &str,
        history: &[ConversationTurn],
    ) -> PipelineResult<Answer> {
        self.composer.ask(question, history).await
    }

    /// Delete every stored vector, returning how many were removed.
    pub async fn clear(&self) -> PipelineResult<u64> {
        self.index
            .clear()
            .await
            .map_err(|e| PipelineError::Index(chain(&e)))
    }
}
