//! services/api/src/web/protocol.rs
//!
//! Defines the JSON bodies exchanged between HTTP clients and the API server.

use chrono::NaiveDate;
use flashcards_core::domain::{CardMetadata, FlashcardRecord};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

//=========================================================================================
// Bodies Sent FROM the Server TO the Client
//=========================================================================================

/// Whether a request succeeded, as reported in the `status` field.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    Success,
    Error,
}

/// Review metadata attached to every stored flashcard.
#[derive(Serialize, Debug, Clone, ToSchema)]
pub struct CardMetadataResponse {
    pub interval: i32,
    pub next_review: NaiveDate,
    pub ease_factor: f64,
}

impl From<CardMetadata> for CardMetadataResponse {
    fn from(metadata: CardMetadata) -> Self {
        Self {
            interval: metadata.interval,
            next_review: metadata.next_review,
            ease_factor: metadata.ease_factor,
        }
    }
}

/// A stored flashcard. Clients address cards by `cardId`.
#[derive(Serialize, Debug, Clone, ToSchema)]
pub struct FlashcardResponse {
    #[serde(rename = "cardId")]
    pub card_id: i32,
    pub question: String,
    pub answer: String,
    pub metadata: CardMetadataResponse,
}

impl From<FlashcardRecord> for FlashcardResponse {
    fn from(record: FlashcardRecord) -> Self {
        Self {
            card_id: record.card_id,
            question: record.question,
            answer: record.answer,
            metadata: record.metadata.into(),
        }
    }
}

/// The body returned after an upload has been turned into flashcards.
#[derive(Serialize, Debug, ToSchema)]
pub struct UploadResponse {
    pub flashcards: Vec<FlashcardResponse>,
    pub status: ResponseStatus,
}

impl UploadResponse {
    pub fn success(records: Vec<FlashcardRecord>) -> Self {
        Self {
            flashcards: records.into_iter().map(FlashcardResponse::from).collect(),
            status: ResponseStatus::Success,
        }
    }
}

/// The body of every failed request.
#[derive(Serialize, Debug, ToSchema)]
pub struct ErrorResponse {
    pub message: String,
    pub status: ResponseStatus,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: ResponseStatus::Error,
        }
    }
}

/// A plain acknowledgement.
#[derive(Serialize, Debug, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

//=========================================================================================
// Bodies Sent FROM the Client TO the Server
//=========================================================================================

/// The payload for creating or replacing a single card.
#[derive(Deserialize, Debug, ToSchema)]
pub struct CardPayload {
    pub question: Option<String>,
    pub answer: Option<String>,
}
