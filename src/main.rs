//! # codetalk CLI
//!
//! Ingest a code repository into a vector store and ask questions about it.
//!
//! ## Usage
//!
//! ```bash
//! codetalk --config ./config/codetalk.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `codetalk init` | Create the SQLite database and schema |
//! | `codetalk ingest <url>` | Clone a GitHub repository and index it |
//! | `codetalk ingest --path <dir>` | Index a local checkout |
//! | `codetalk ask "<question>"` | Answer a question from the indexed code |
//! | `codetalk clear` | Delete every stored vector |
//! | `codetalk serve` | Start the HTTP API server |
//!
//! Log verbosity is controlled with `RUST_LOG` (default `codetalk=info`).
//! Logs go to stderr; command output goes to stdout.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use codetalk::config::{self, Config};
use codetalk::migrate;
use codetalk::models::ConversationTurn;
use codetalk::pipeline::Pipeline;
use codetalk::server;

/// codetalk: chat with a code repository.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/codetalk.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "codetalk",
    about = "codetalk: ask questions about a code repository",
    version,
    long_about = "codetalk clones a repository, splits its source files into language-aware \
    chunks, embeds and stores them, and answers questions with a language model grounded on \
    the most similar chunks."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/codetalk.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Idempotent: running it multiple times is safe.
    Init,

    /// Ingest a repository into the vector store.
    ///
    /// Clones `<url>` (which must match `repos.allowed_prefixes`) or walks a
    /// local directory given with `--path`, then chunks, embeds and stores
    /// every indexable file.
    Ingest {
        /// Repository URL, e.g. `https://github.com/owner/repo`.
        #[arg(required_unless_present = "path", conflicts_with = "path")]
        url: Option<String>,

        /// Index a local directory instead of cloning.
        #[arg(long)]
        path: Option<PathBuf>,
    },

    /// Ask a question about the ingested code.
    Ask {
        question: String,

        /// JSON file holding prior turns: `[{"role": "user", "content": "..."}]`.
        #[arg(long)]
        history: Option<PathBuf>,
    },

    /// Delete every stored vector.
    Clear,

    /// Start the HTTP API server on `[server].bind`.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("codetalk=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Ingest { url, path } => {
            run_ingest(&cfg, url.as_deref(), path.as_deref()).await?;
        }
        Commands::Ask { question, history } => {
            run_ask(&cfg, &question, history.as_deref()).await?;
        }
        Commands::Clear => {
            let pipeline = Pipeline::from_config(&cfg).await?;
            let deleted = pipeline.clear().await?;
            println!("Database cleared ({} vectors deleted).", deleted);
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}

async fn run_ingest(cfg: &Config, url: Option<&str>, path: Option<&Path>) -> anyhow::Result<()> {
    let pipeline = Pipeline::from_config(cfg).await?;

    let report = match (url, path) {
        (_, Some(path)) => pipeline.ingest_path(path).await?,
        (Some(url), None) => pipeline.ingest_repository(url).await?,
        (None, None) => bail!("either a repository URL or --path is required"),
    };

    println!("Ingest completed.");
    println!("  files processed:  {}", report.files_processed);
    println!("  chunks attempted: {}", report.chunks_attempted);
    println!("  chunks stored:    {}", report.chunks_stored);
    Ok(())
}

async fn run_ask(cfg: &Config, question: &str, history: Option<&Path>) -> anyhow::Result<()> {
    let history = match history {
        Some(path) => load_history(path)?,
        None => Vec::new(),
    };

    let pipeline = Pipeline::from_config(cfg).await?;
    let answer = pipeline.ask(question, &history).await?;

    println!("{}", answer.answer);
    if !answer.sources.is_empty() {
        println!();
        println!("Sources:");
        for source in &answer.sources {
            println!("  {}#{}", source.file_path, source.chunk_index);
        }
    }
    Ok(())
}

fn load_history(path: &Path) -> anyhow::Result<Vec<ConversationTurn>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read history file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse history file: {}", path.display()))
}
