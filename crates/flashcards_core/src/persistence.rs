//! crates/flashcards_core/src/persistence.rs
//!
//! Writes validated flashcards and their metadata through a `FlashcardStore`.
//!
//! Staging is tolerant: an item that cannot be turned into a flashcard is logged
//! and skipped. Committing is atomic: if the transaction fails, it is rolled back
//! and nothing from the batch is kept.

use std::sync::Arc;
use tracing::{error, info, warn};

use crate::domain::{FlashcardDraft, FlashcardRecord, NewFlashcard};
use crate::error::PipelineError;
use crate::ports::{FlashcardSession, FlashcardStore};

#[derive(Clone)]
pub struct FlashcardGateway {
    store: Arc<dyn FlashcardStore>,
}

impl FlashcardGateway {
    pub fn new(store: Arc<dyn FlashcardStore>) -> Self {
        Self { store }
    }

    /// Persists a validated batch and returns the stored records.
    ///
    /// An empty batch never opens a storage session.
    pub async fn save(
        &self,
        drafts: Vec<FlashcardDraft>,
    ) -> Result<Vec<FlashcardRecord>, PipelineError> {
        if drafts.is_empty() {
            info!("No flashcards to save.");
            return Ok(Vec::new());
        }

        let mut session = self.store.begin().await.map_err(PipelineError::persistence)?;
        let total = drafts.len();
        for (index, draft) in drafts.into_iter().enumerate() {
            let card = match NewFlashcard::try_from(draft) {
                Ok(card) => card,
                Err(reason) => {
                    warn!(index, %reason, "Skipping flashcard that cannot be staged");
                    continue;
                }
            };
            if let Err(e) = session.stage(card) {
                warn!(index, error = %e, "Skipping flashcard rejected by the session");
            }
        }

        let staged = session.staged_len();
        if staged < total {
            warn!(staged, total, "Some flashcards were skipped during staging");
        }
        commit_and_refresh(session).await
    }

    /// Persists a single card through the same staging and commit path.
    pub async fn create(&self, card: NewFlashcard) -> Result<FlashcardRecord, PipelineError> {
        let mut session = self.store.begin().await.map_err(PipelineError::persistence)?;
        session.stage(card).map_err(PipelineError::persistence)?;

        commit_and_refresh(session)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| {
                PipelineError::PersistenceFailed("the stored card could not be read back".to_string())
            })
    }
}

async fn commit_and_refresh(
    mut session: Box<dyn FlashcardSession>,
) -> Result<Vec<FlashcardRecord>, PipelineError> {
    let card_ids = match session.commit().await {
        Ok(card_ids) => card_ids,
        Err(e) => {
            error!(error = %e, "Error committing flashcards to the database, rolling back");
            if let Err(rollback_err) = session.rollback().await {
                error!(error = %rollback_err, "Rollback failed");
            }
            return Err(PipelineError::persistence(e));
        }
    };
    info!(count = card_ids.len(), "Successfully saved flashcards to the database");

    session
        .refresh(&card_ids)
        .await
        .map_err(PipelineError::persistence)
}
