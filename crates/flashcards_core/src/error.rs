//! crates/flashcards_core/src/error.rs
//!
//! The error taxonomy of the upload-to-flashcards pipeline.

use std::error::Error as StdError;
use std::string::FromUtf8Error;
use std::time::Duration;

use crate::ports::PortError;

/// Every way an upload can fail between the request boundary and storage.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The declared MIME type is not one the extractor reads.
    #[error("Invalid file type '{0}'. Only text and PDF files are allowed.")]
    UnsupportedMediaType(String),

    #[error("Uploaded text is not valid UTF-8: {0}")]
    Decode(#[source] FromUtf8Error),

    #[error("Failed to extract text from the document: {0}")]
    ExtractionFailed(#[source] Box<dyn StdError + Send + Sync>),

    #[error("Missing credential: {0}")]
    MissingCredential(String),

    #[error("The model did not finish responding within {0:?}")]
    GenerationTimeout(Duration),

    #[error("The model call failed: {0}")]
    ModelCallFailed(String),

    /// The model answered, but not with a JSON array. `raw` is the full response.
    #[error("Failed to parse the model response: {reason}. Raw response:\n{raw}")]
    MalformedModelOutput { reason: String, raw: String },

    #[error("Malformed flashcards format: {0}")]
    MalformedFlashcardBatch(String),

    #[error("Failed to save flashcards: {0}")]
    PersistenceFailed(String),
}

impl PipelineError {
    pub(crate) fn extraction<E>(err: E) -> Self
    where
        E: Into<Box<dyn StdError + Send + Sync>>,
    {
        Self::ExtractionFailed(err.into())
    }

    pub(crate) fn malformed_output(reason: impl Into<String>, raw: &str) -> Self {
        Self::MalformedModelOutput {
            reason: reason.into(),
            raw: raw.to_string(),
        }
    }

    /// Maps a failure of the completion port onto the taxonomy.
    pub(crate) fn from_model_port(err: PortError) -> Self {
        match err {
            PortError::MissingCredential(name) => Self::MissingCredential(name),
            other => Self::ModelCallFailed(other.to_string()),
        }
    }

    pub(crate) fn persistence(err: PortError) -> Self {
        Self::PersistenceFailed(err.to_string())
    }
}
