//! # codetalk
//!
//! Retrieval-augmented question answering over a code repository.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌───────────┐   ┌──────────────┐   ┌──────────┐
//! │ repo clone │──▶│ collector │──▶│   chunker    │──▶│  index   │
//! │   (git)    │   │ allow-list│   │ per language │   │ embed+db │
//! └────────────┘   └───────────┘   └──────────────┘   └────┬─────┘
//!                                                          │
//!                                      ┌───────────────────┤
//!                                      ▼                   ▼
//!                                 ┌──────────┐       ┌──────────┐
//!                                 │  answer  │──────▶│   LLM    │
//!                                 │ composer │       │  (chat)  │
//!                                 └──────────┘       └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! codetalk init
//! codetalk ingest https://github.com/owner/repo
//! codetalk ask "Where is the config parsed?"
//! codetalk serve
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`repo`] | Repository URL validation and cloning |
//! | [`collector`] | Allow-listed file discovery |
//! | [`chunk`] | Language-aware recursive text splitting |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`store`] | Vector store trait, in-memory and SQLite backends |
//! | [`index`] | Batched embed-and-store, similarity query |
//! | [`llm`] | Chat-completion language models |
//! | [`answer`] | Prompt assembly and answer generation |
//! | [`pipeline`] | Boundary operations: ingest, ask, clear |
//! | [`server`] | HTTP API |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema creation |

pub mod answer;
pub mod chunk;
pub mod collector;
pub mod config;
pub mod db;
pub mod embedding;
pub mod error;
mod http;
pub mod index;
pub mod llm;
pub mod migrate;
pub mod models;
pub mod pipeline;
pub mod repo;
pub mod server;
pub mod store;
