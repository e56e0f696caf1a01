//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use flashcards_core::ports::FlashcardStore;
use flashcards_core::FlashcardPipeline;
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Turns uploads into stored flashcards.
    pub pipeline: Arc<FlashcardPipeline>,
    /// Direct access to stored cards for the management endpoints.
    pub store: Arc<dyn FlashcardStore>,
}
