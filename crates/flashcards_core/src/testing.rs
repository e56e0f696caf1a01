//! crates/flashcards_core/src/testing.rs
//!
//! In-memory implementations of the ports, for tests in this crate and in the
//! API service (enable the `test-util` feature).

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use futures::{stream, StreamExt};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::domain::{CardId, CardMetadata, FlashcardRecord, NewFlashcard};
use crate::ports::{
    CompletionStream, FlashcardSession, FlashcardStore, PdfTextService, PortError, PortResult,
    TextCompletionService,
};

//=========================================================================================
// Completion
//=========================================================================================

enum Script {
    Chunks(Vec<String>),
    FailAfter(Vec<String>, String),
    Stalled(Vec<String>),
    MissingCredential(String),
}

/// A completion service that replays a fixed script and records every prompt.
pub struct ScriptedCompletion {
    script: Script,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl ScriptedCompletion {
    fn new(script: Script) -> Self {
        Self {
            script,
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Streams `chunks` in order, then ends.
    pub fn chunks(chunks: Vec<&str>) -> Self {
        Self::new(Script::Chunks(owned(chunks)))
    }

    /// Streams `chunks`, then yields an error.
    pub fn fail_after(chunks: Vec<&str>, message: &str) -> Self {
        Self::new(Script::FailAfter(owned(chunks), message.to_string()))
    }

    /// Streams `chunks` and then never ends.
    pub fn stalled(chunks: Vec<&str>) -> Self {
        Self::new(Script::Stalled(owned(chunks)))
    }

    pub fn missing_credential(name: &str) -> Self {
        Self::new(Script::MissingCredential(name.to_string()))
    }

    /// Prompts received so far.
    pub fn prompts(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.prompts)
    }
}

fn owned(chunks: Vec<&str>) -> Vec<String> {
    chunks.into_iter().map(str::to_string).collect()
}

fn ok_chunks(chunks: &[String]) -> Vec<PortResult<String>> {
    chunks.iter().cloned().map(Ok).collect()
}

#[async_trait]
impl TextCompletionService for ScriptedCompletion {
    async fn stream_completion(&self, prompt: &str) -> PortResult<CompletionStream> {
        let stream: CompletionStream = match &self.script {
            Script::MissingCredential(name) => {
                return Err(PortError::MissingCredential(name.clone()));
            }
            Script::Chunks(chunks) => Box::pin(stream::iter(ok_chunks(chunks))),
            Script::FailAfter(chunks, message) => {
                let mut items = ok_chunks(chunks);
                items.push(Err(PortError::Unexpected(message.clone())));
                Box::pin(stream::iter(items))
            }
            Script::Stalled(chunks) => {
                Box::pin(stream::iter(ok_chunks(chunks)).chain(stream::pending()))
            }
        };
        lock(&self.prompts).push(prompt.to_string());
        Ok(stream)
    }
}

//=========================================================================================
// PDF text
//=========================================================================================

/// A PDF backend that returns canned pages regardless of input.
pub struct StaticPdfText {
    result: Result<Vec<String>, String>,
}

impl StaticPdfText {
    pub fn pages(pages: Vec<&str>) -> Self {
        Self {
            result: Ok(owned(pages)),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            result: Err(message.to_string()),
        }
    }
}

impl PdfTextService for StaticPdfText {
    fn extract_pages(&self, _pdf_bytes: &[u8]) -> PortResult<Vec<String>> {
        self.result.clone().map_err(PortError::Unexpected)
    }
}

//=========================================================================================
// Flashcard store
//=========================================================================================

#[derive(Default)]
struct MemoryState {
    next_id: CardId,
    cards: BTreeMap<CardId, (String, String)>,
    metadata: BTreeMap<CardId, CardMetadata>,
    sessions_opened: usize,
    rollbacks: usize,
}

impl MemoryState {
    fn record(&self, card_id: CardId) -> Option<FlashcardRecord> {
        let (question, answer) = self.cards.get(&card_id)?;
        let metadata = self.metadata.get(&card_id)?;
        Some(FlashcardRecord {
            card_id,
            question: question.clone(),
            answer: answer.clone(),
            metadata: metadata.clone(),
        })
    }

    fn records(&self) -> Vec<FlashcardRecord> {
        self.cards.keys().filter_map(|id| self.record(*id)).collect()
    }
}

/// A transactional store kept in memory, with switches for injecting faults.
#[derive(Default, Clone)]
pub struct InMemoryFlashcardStore {
    state: Arc<Mutex<MemoryState>>,
    fail_commits: bool,
    rejected_question: Option<String>,
}

impl InMemoryFlashcardStore {
    /// Every commit fails, as if the database went away mid-transaction.
    pub fn failing_commits(mut self) -> Self {
        self.fail_commits = true;
        self
    }

    /// Sessions refuse to stage a card with this exact question.
    pub fn rejecting_question(mut self, question: &str) -> Self {
        self.rejected_question = Some(question.to_string());
        self
    }

    pub fn sessions_opened(&self) -> usize {
        lock(&self.state).sessions_opened
    }

    pub fn rollbacks(&self) -> usize {
        lock(&self.state).rollbacks
    }

    pub fn card_count(&self) -> usize {
        lock(&self.state).cards.len()
    }

    pub fn metadata_count(&self) -> usize {
        lock(&self.state).metadata.len()
    }

    pub fn get(&self, card_id: CardId) -> Option<FlashcardRecord> {
        lock(&self.state).record(card_id)
    }

    /// Moves a card's next review date, to set up due-card scenarios.
    pub fn set_next_review(&self, card_id: CardId, day: NaiveDate) {
        if let Some(metadata) = lock(&self.state).metadata.get_mut(&card_id) {
            metadata.next_review = day;
        }
    }
}

fn not_found(card_id: CardId) -> PortError {
    PortError::NotFound(format!("Card {} not found", card_id))
}

#[async_trait]
impl FlashcardStore for InMemoryFlashcardStore {
    async fn begin(&self) -> PortResult<Box<dyn FlashcardSession>> {
        lock(&self.state).sessions_opened += 1;
        Ok(Box::new(InMemorySession {
            store: self.clone(),
            staged: Vec::new(),
        }))
    }

    async fn list_flashcards(&self) -> PortResult<Vec<FlashcardRecord>> {
        Ok(lock(&self.state).records())
    }

    async fn list_due_flashcards(&self, day: NaiveDate) -> PortResult<Vec<FlashcardRecord>> {
        Ok(lock(&self.state)
            .records()
            .into_iter()
            .filter(|r| r.metadata.next_review <= day)
            .collect())
    }

    async fn get_flashcard(&self, card_id: CardId) -> PortResult<FlashcardRecord> {
        lock(&self.state)
            .record(card_id)
            .ok_or_else(|| not_found(card_id))
    }

    async fn update_flashcard(
        &self,
        card_id: CardId,
        card: &NewFlashcard,
    ) -> PortResult<FlashcardRecord> {
        let mut state = lock(&self.state);
        let entry = state.cards.get_mut(&card_id).ok_or_else(|| not_found(card_id))?;
        *entry = (card.question.clone(), card.answer.clone());
        state.record(card_id).ok_or_else(|| not_found(card_id))
    }

    async fn delete_flashcard(&self, card_id: CardId) -> PortResult<()> {
        let mut state = lock(&self.state);
        state.cards.remove(&card_id).ok_or_else(|| not_found(card_id))?;
        state.metadata.remove(&card_id);
        Ok(())
    }
}

struct InMemorySession {
    store: InMemoryFlashcardStore,
    staged: Vec<NewFlashcard>,
}

#[async_trait]
impl FlashcardSession for InMemorySession {
    fn stage(&mut self, card: NewFlashcard) -> PortResult<()> {
        if self.store.rejected_question.as_deref() == Some(card.question.as_str()) {
            return Err(PortError::Rejected(format!(
                "question '{}' is not accepted",
                card.question
            )));
        }
        self.staged.push(card);
        Ok(())
    }

    fn staged_len(&self) -> usize {
        self.staged.len()
    }

    async fn commit(&mut self) -> PortResult<Vec<CardId>> {
        let staged = std::mem::take(&mut self.staged);
        if self.store.fail_commits {
            return Err(PortError::Unexpected("simulated commit failure".to_string()));
        }

        let today = Utc::now().date_naive();
        let mut state = lock(&self.store.state);
        let mut card_ids = Vec::with_capacity(staged.len());
        for card in staged {
            state.next_id += 1;
            let card_id = state.next_id;
            state.cards.insert(card_id, (card.question, card.answer));
            state
                .metadata
                .insert(card_id, CardMetadata::initial(card_id, today));
            card_ids.push(card_id);
        }
        Ok(card_ids)
    }

    async fn rollback(&mut self) -> PortResult<()> {
        self.staged.clear();
        lock(&self.store.state).rollbacks += 1;
        Ok(())
    }

    async fn refresh(&mut self, card_ids: &[CardId]) -> PortResult<Vec<FlashcardRecord>> {
        let state = lock(&self.store.state);
        card_ids
            .iter()
            .map(|id| state.record(*id).ok_or_else(|| not_found(*id)))
            .collect()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
