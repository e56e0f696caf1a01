//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service, and how pipeline
//! failures map onto HTTP status codes.

use crate::config::ConfigError;
use axum::http::StatusCode;
use flashcards_core::{PipelineError, PortError};

/// The primary error type for the `api` service's startup path.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// The HTTP status reported for a failed upload.
pub fn pipeline_status(err: &PipelineError) -> StatusCode {
    match err {
        PipelineError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        PipelineError::Decode(_) | PipelineError::ExtractionFailed(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        PipelineError::GenerationTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
        PipelineError::ModelCallFailed(_)
        | PipelineError::MalformedModelOutput { .. }
        | PipelineError::MalformedFlashcardBatch(_) => StatusCode::BAD_GATEWAY,
        PipelineError::MissingCredential(_) | PipelineError::PersistenceFailed(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// The HTTP status reported for a failed port call outside the pipeline.
pub fn port_status(err: &PortError) -> StatusCode {
    match err {
        PortError::NotFound(_) => StatusCode::NOT_FOUND,
        PortError::Rejected(_) => StatusCode::BAD_REQUEST,
        PortError::MissingCredential(_) | PortError::Unexpected(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
