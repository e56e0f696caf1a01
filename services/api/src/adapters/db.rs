//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `FlashcardStore` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::NaiveDate;
use flashcards_core::domain::{CardId, CardMetadata, FlashcardRecord, NewFlashcard};
use flashcards_core::ports::{FlashcardSession, FlashcardStore, PortError, PortResult};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use tracing::{debug, error};

const SELECT_CARDS: &str = r#"
    SELECT f.card_id, f.question, f.answer, m."interval", m.next_review, m.ease_factor
    FROM flashcards f
    JOIN card_metadata m ON m.card_id = f.card_id
"#;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `FlashcardStore` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct FlashcardRow {
    card_id: i32,
    question: String,
    answer: String,
    interval: i32,
    next_review: NaiveDate,
    ease_factor: f64,
}
impl FlashcardRow {
    fn to_domain(self) -> FlashcardRecord {
        FlashcardRecord {
            card_id: self.card_id,
            question: self.question,
            answer: self.answer,
            metadata: CardMetadata {
                card_id: self.card_id,
                interval: self.interval,
                next_review: self.next_review,
                ease_factor: self.ease_factor,
            },
        }
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

fn not_found_or_unexpected(card_id: CardId) -> impl FnOnce(sqlx::Error) -> PortError {
    move |e| match e {
        sqlx::Error::RowNotFound => PortError::NotFound(format!("Card {} not found", card_id)),
        _ => PortError::Unexpected(e.to_string()),
    }
}

//=========================================================================================
// `FlashcardStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl FlashcardStore for DbAdapter {
    async fn begin(&self) -> PortResult<Box<dyn FlashcardSession>> {
        Ok(Box::new(PgFlashcardSession {
            pool: self.pool.clone(),
            staged: Vec::new(),
        }))
    }

    async fn list_flashcards(&self) -> PortResult<Vec<FlashcardRecord>> {
        let records = sqlx::query_as::<_, FlashcardRow>(&format!(
            "{SELECT_CARDS} ORDER BY f.card_id ASC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn list_due_flashcards(&self, day: NaiveDate) -> PortResult<Vec<FlashcardRecord>> {
        let records = sqlx::query_as::<_, FlashcardRow>(&format!(
            "{SELECT_CARDS} WHERE m.next_review <= $1 ORDER BY m.next_review ASC, f.card_id ASC"
        ))
        .bind(day)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn get_flashcard(&self, card_id: CardId) -> PortResult<FlashcardRecord> {
        let record = sqlx::query_as::<_, FlashcardRow>(&format!(
            "{SELECT_CARDS} WHERE f.card_id = $1"
        ))
        .bind(card_id)
        .fetch_one(&self.pool)
        .await
        .map_err(not_found_or_unexpected(card_id))?;

        Ok(record.to_domain())
    }

    async fn update_flashcard(
        &self,
        card_id: CardId,
        card: &NewFlashcard,
    ) -> PortResult<FlashcardRecord> {
        let result = sqlx::query("UPDATE flashcards SET question = $1, answer = $2 WHERE card_id = $3")
            .bind(&card.question)
            .bind(&card.answer)
            .bind(card_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;

        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Card {} not found", card_id)));
        }
        self.get_flashcard(card_id).await
    }

    async fn delete_flashcard(&self, card_id: CardId) -> PortResult<()> {
        // card_metadata rows go with it through ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM flashcards WHERE card_id = $1")
            .bind(card_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;

        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Card {} not found", card_id)));
        }
        Ok(())
    }
}

//=========================================================================================
// The Per-Request Session
//=========================================================================================

/// Holds staged cards in memory; `commit` writes all of them in one transaction.
pub struct PgFlashcardSession {
    pool: PgPool,
    staged: Vec<NewFlashcard>,
}

impl PgFlashcardSession {
    async fn insert_staged(
        tx: &mut Transaction<'static, Postgres>,
        staged: &[NewFlashcard],
    ) -> Result<Vec<CardId>, sqlx::Error> {
        let mut card_ids = Vec::with_capacity(staged.len());
        for card in staged {
            let card_id: i32 = sqlx::query_scalar(
                "INSERT INTO flashcards (question, answer) VALUES ($1, $2) RETURNING card_id",
            )
            .bind(&card.question)
            .bind(&card.answer)
            .fetch_one(&mut **tx)
            .await?;

            // interval, next_review and ease_factor take their column defaults.
            sqlx::query("INSERT INTO card_metadata (card_id) VALUES ($1)")
                .bind(card_id)
                .execute(&mut **tx)
                .await?;

            card_ids.push(card_id);
        }
        Ok(card_ids)
    }
}

#[async_trait]
impl FlashcardSession for PgFlashcardSession {
    fn stage(&mut self, card: NewFlashcard) -> PortResult<()> {
        self.staged.push(card);
        Ok(())
    }

    fn staged_len(&self) -> usize {
        self.staged.len()
    }

    async fn commit(&mut self) -> PortResult<Vec<CardId>> {
        let staged = std::mem::take(&mut self.staged);
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        match Self::insert_staged(&mut tx, &staged).await {
            Ok(card_ids) => {
                tx.commit().await.map_err(unexpected)?;
                debug!(count = card_ids.len(), "Flashcard transaction committed");
                Ok(card_ids)
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    error!(error = %rollback_err, "Failed to roll back flashcard transaction");
                }
                Err(unexpected(e))
            }
        }
    }

    async fn rollback(&mut self) -> PortResult<()> {
        // Nothing reaches the database before commit, so only the staged cards go.
        self.staged.clear();
        Ok(())
    }

    async fn refresh(&mut self, card_ids: &[CardId]) -> PortResult<Vec<FlashcardRecord>> {
        if card_ids.is_empty() {
            return Ok(Vec::new());
        }

        let records = sqlx::query_as::<_, FlashcardRow>(&format!(
            "{SELECT_CARDS} WHERE f.card_id = ANY($1) ORDER BY f.card_id ASC"
        ))
        .bind(card_ids.to_vec())
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }
}
