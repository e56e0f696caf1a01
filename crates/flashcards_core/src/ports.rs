//! crates/flashcards_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or APIs.

use async_trait::async_trait;
use chrono::NaiveDate;
use futures::Stream;
use std::pin::Pin;

use crate::domain::{CardId, FlashcardRecord, NewFlashcard};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    /// A credential the adapter needs was never configured.
    #[error("Missing credential: {0}")]
    MissingCredential(String),
    /// The adapter refused an item it was handed.
    #[error("Rejected: {0}")]
    Rejected(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

/// Text fragments of a model response, in arrival order.
pub type CompletionStream = Pin<Box<dyn Stream<Item = PortResult<String>> + Send>>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait TextCompletionService: Send + Sync {
    /// Sends a single prompt and returns the response as a stream of text fragments.
    ///
    /// Must fail with `PortError::MissingCredential` before any network call when
    /// the adapter has no credential to authenticate with.
    async fn stream_completion(&self, prompt: &str) -> PortResult<CompletionStream>;
}

pub trait PdfTextService: Send + Sync {
    /// Extracts the text of every page in page order. Pages without a text layer
    /// yield an empty string.
    fn extract_pages(&self, pdf_bytes: &[u8]) -> PortResult<Vec<String>>;
}

#[async_trait]
pub trait FlashcardStore: Send + Sync {
    /// Opens a new unit of work. Each request gets its own session.
    async fn begin(&self) -> PortResult<Box<dyn FlashcardSession>>;

    async fn list_flashcards(&self) -> PortResult<Vec<FlashcardRecord>>;

    /// Cards whose next review falls on or before `day`.
    async fn list_due_flashcards(&self, day: NaiveDate) -> PortResult<Vec<FlashcardRecord>>;

    async fn get_flashcard(&self, card_id: CardId) -> PortResult<FlashcardRecord>;

    async fn update_flashcard(
        &self,
        card_id: CardId,
        card: &NewFlashcard,
    ) -> PortResult<FlashcardRecord>;

    /// Deletes a card. Its metadata goes with it.
    async fn delete_flashcard(&self, card_id: CardId) -> PortResult<()>;
}

/// A storage session: cards are staged in memory, then written in one transaction.
#[async_trait]
pub trait FlashcardSession: Send {
    /// Marks a card and its default metadata for insertion.
    fn stage(&mut self, card: NewFlashcard) -> PortResult<()>;

    fn staged_len(&self) -> usize;

    /// Writes every staged card atomically and returns the assigned identifiers in
    /// staging order. On failure nothing is written.
    async fn commit(&mut self) -> PortResult<Vec<CardId>>;

    /// Discards everything staged and releases the session.
    async fn rollback(&mut self) -> PortResult<()>;

    /// Re-reads committed cards, including storage-assigned defaults.
    async fn refresh(&mut self, card_ids: &[CardId]) -> PortResult<Vec<FlashcardRecord>>;
}
