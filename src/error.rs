//! Error kinds surfaced at the pipeline boundary.
//!
//! Components return `anyhow::Result` internally; [`Pipeline`](crate::pipeline::Pipeline)
//! classifies failures into a [`PipelineError`] so callers (CLI, HTTP server)
//! can tell bad input apart from failures of the collaborators it drives.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// The caller supplied something unusable, such as a malformed repository URL.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The repository could not be cloned or fetched.
    #[error("repository acquisition failed: {0}")]
    Acquisition(String),

    /// The checkout could not be walked.
    #[error("file collection failed: {0}")]
    Collect(String),

    /// The vector index or its store failed.
    #[error("index error: {0}")]
    Index(String),

    /// Retrieval succeeded but the language model call failed.
    #[error("answer generation failed: {0}")]
    Generation(String),
}

impl PipelineError {
    /// Whether the failure was caused by the request rather than the system.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidInput(_) | Self::Acquisition(_))
    }

    /// Machine-readable code used in HTTP error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "bad_request",
            Self::Acquisition(_) => "acquisition_failed",
            Self::Collect(_) => "collect_failed",
            Self::Index(_) => "index_error",
            Self::Generation(_) => "generation_failed",
        }
    }
}

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

/// Render an `anyhow` error with its cause chain on one line.
pub(crate) fn chain(err: &anyhow::Error) -> String {
    format!("{:#}", err)
}
