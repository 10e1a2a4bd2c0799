//! HTTP API server.
//!
//! Exposes the pipeline's boundary operations as a small JSON API for the
//! chat frontend or any other HTTP client.
//!
//! # Endpoints
//!
//! | Method   | Path      | Description |
//! |----------|-----------|-------------|
//! | `GET`    | `/`       | Liveness message |
//! | `GET`    | `/health` | Health check (returns version) |
//! | `POST`   | `/ingest` | Clone and index a repository: `{ "url": "https://github.com/owner/repo" }` |
//! | `POST`   | `/chat`   | Ask a question: `{ "question": "...", "history": [{ "role": "user", "content": "..." }] }` |
//! | `DELETE` | `/delete` | Remove every stored vector |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "invalid input: ..." } }
//! ```
//!
//! Invalid input, unparseable request bodies and failed clones answer `400`;
//! index and generation failures answer `500`.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so a browser frontend on
//! another port can call the API.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::error::PipelineError;
use crate::models::{ChunkMetadata, ConversationTurn};
use crate::pipeline::Pipeline;
use crate::repo;

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
struct AppState {
    pipeline: Arc<Pipeline>,
}

/// Starts the HTTP server on `[server].bind` with a pipeline built from `config`.
///
/// Runs until the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let pipeline = Arc::new(Pipeline::from_config(config).await?);
    run_server_with_pipeline(&config.server.bind, pipeline).await
}

/// Starts the HTTP server around an already-built pipeline.
pub async fn run_server_with_pipeline(
    bind_addr: &str,
    pipeline: Arc<Pipeline>,
) -> anyhow::Result<()> {
    let app = router(pipeline);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!("codetalk API listening on http://{}", bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the API router.
pub fn router(pipeline: Arc<Pipeline>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handle_root))
        .route("/health", get(handle_health))
        .route("/ingest", post(handle_ingest))
        .route("/chat", post(handle_chat))
        .route("/delete", delete(handle_delete))
        .layer(cors)
        .with_state(AppState { pipeline })
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        let status = if err.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        if status.is_server_error() {
            tracing::error!("request failed: {}", err);
        } else {
            tracing::warn!("request rejected: {}", err);
        }
        AppError {
            status,
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::warn!("request body rejected: {}", rejection.body_text());
        AppError {
            status: StatusCode::BAD_REQUEST,
            code: "bad_request".to_string(),
            message: rejection.body_text(),
        }
    }
}

// ============ GET / and GET /health ============

#[derive(Serialize)]
struct RootResponse {
    message: String,
}

async fn handle_root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "codetalk API is running".to_string(),
    })
}

#[derive(Serialize)]
struct HealthResponse {
    /// Always `"ok"` when the server is running.
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST /ingest ============

#[derive(Deserialize)]
struct IngestRequest {
    url: String,
}

#[derive(Serialize)]
struct IngestResponse {
    status: String,
    repo: String,
    files_processed: usize,
    chunks_attempted: usize,
    chunks_stored: usize,
}

async fn handle_ingest(
    State(state): State<AppState>,
    payload: Result<Json<IngestRequest>, JsonRejection>,
) -> Result<Json<IngestResponse>, AppError> {
    let Json(req) = payload?;
    let url = req.url.trim();
    let report = state.pipeline.ingest_repository(url).await?;
    let repo = repo::repo_name(url).unwrap_or_else(|_| url.to_string());

    Ok(Json(IngestResponse {
        status: "completed".to_string(),
        repo,
        files_processed: report.files_processed,
        chunks_attempted: report.chunks_attempted,
        chunks_stored: report.chunks_stored,
    }))
}

// ============ POST /chat ============

#[derive(Deserialize)]
struct ChatRequest {
    question: String,
    #[serde(default)]
    history: Vec<ConversationTurn>,
}

#[derive(Serialize)]
struct ChatResponse {
    status: String,
    answer: String,
    sources: Vec<ChunkMetadata>,
}

async fn handle_chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, AppError> {
    let Json(req) = payload?;
    let answer = state.pipeline.ask(&req.question, &req.history).await?;

    Ok(Json(ChatResponse {
        status: "success".to_string(),
        answer: answer.answer,
        sources: answer.sources,
    }))
}

// ============ DELETE /delete ============

#[derive(Serialize)]
struct DeleteResponse {
    status: String,
    message: String,
    deleted: u64,
}

async fn handle_delete(State(state): State<AppState>) -> Result<Json<DeleteResponse>, AppError> {
    let deleted = state.pipeline.clear().await?;

    Ok(Json(DeleteResponse {
        status: "success".to_string(),
        message: "Database cleared".to_string(),
        deleted,
    }))
}
