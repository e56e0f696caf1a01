//! crates/flashcards_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::NaiveDate;
use serde_json::Value;

/// Identifier assigned to a flashcard by storage.
pub type CardId = i32;

/// Default spacing interval (in days) for a freshly created card.
pub const DEFAULT_INTERVAL: i32 = 0;

/// Default ease factor for a freshly created card.
pub const DEFAULT_EASE_FACTOR: f64 = 2.5;

/// The MIME types the extractor knows how to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    PlainText,
    Pdf,
}

impl MediaType {
    /// Matches a declared content type, ignoring parameters such as `charset`.
    pub fn from_declared(declared: &str) -> Option<Self> {
        let essence = declared.split(';').next().unwrap_or_default().trim();
        if essence.eq_ignore_ascii_case("text/plain") {
            Some(Self::PlainText)
        } else if essence.eq_ignore_ascii_case("application/pdf") {
            Some(Self::Pdf)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PlainText => "text/plain",
            Self::Pdf => "application/pdf",
        }
    }
}

/// A file handed to the extractor: a declared MIME type and a byte stream that
/// is read at most once.
pub struct UploadedDocument<S> {
    pub declared_type: String,
    pub body: S,
}

impl<S> UploadedDocument<S> {
    pub fn new(declared_type: impl Into<String>, body: S) -> Self {
        Self {
            declared_type: declared_type.into(),
            body,
        }
    }
}

/// An untrusted item parsed out of the model response.
pub type RawFlashcardCandidate = Value;

/// A candidate that passed shape validation: both keys are present and non-null.
/// The values have not yet been checked to be text.
#[derive(Debug, Clone, PartialEq)]
pub struct FlashcardDraft {
    pub question: Value,
    pub answer: Value,
}

/// A flashcard ready to be staged for insertion. Both fields are non-blank text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFlashcard {
    pub question: String,
    pub answer: String,
}

/// Why a draft could not become a `NewFlashcard`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidFlashcard {
    #[error("the '{0}' value is not text")]
    NotText(&'static str),
    #[error("the '{0}' value is blank")]
    Blank(&'static str),
}

impl NewFlashcard {
    pub fn new(
        question: impl Into<String>,
        answer: impl Into<String>,
    ) -> Result<Self, InvalidFlashcard> {
        let question = question.into();
        let answer = answer.into();
        if question.trim().is_empty() {
            return Err(InvalidFlashcard::Blank("question"));
        }
        if answer.trim().is_empty() {
            return Err(InvalidFlashcard::Blank("answer"));
        }
        Ok(Self { question, answer })
    }
}

impl TryFrom<FlashcardDraft> for NewFlashcard {
    type Error = InvalidFlashcard;

    fn try_from(draft: FlashcardDraft) -> Result<Self, Self::Error> {
        let question = match draft.question {
            Value::String(text) => text,
            _ => return Err(InvalidFlashcard::NotText("question")),
        };
        let answer = match draft.answer {
            Value::String(text) => text,
            _ => return Err(InvalidFlashcard::NotText("answer")),
        };
        Self::new(question, answer)
    }
}

/// Review metadata owned by exactly one flashcard.
#[derive(Debug, Clone, PartialEq)]
pub struct CardMetadata {
    pub card_id: CardId,
    pub interval: i32,
    pub next_review: NaiveDate,
    pub ease_factor: f64,
}

impl CardMetadata {
    /// The metadata a new card receives when it is created on `today`.
    pub fn initial(card_id: CardId, today: NaiveDate) -> Self {
        Self {
            card_id,
            interval: DEFAULT_INTERVAL,
            next_review: today,
            ease_factor: DEFAULT_EASE_FACTOR,
        }
    }
}

/// A persisted flashcard together with its metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct FlashcardRecord {
    pub card_id: CardId,
    pub question: String,
    pub answer: String,
    pub metadata: CardMetadata,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_type_ignores_parameters_and_case() {
        assert_eq!(
            MediaType::from_declared("text/plain; charset=utf-8"),
            Some(MediaType::PlainText)
        );
        assert_eq!(
            MediaType::from_declared("Application/PDF"),
            Some(MediaType::Pdf)
        );
        assert_eq!(MediaType::from_declared("image/png"), None);
        assert_eq!(MediaType::from_declared(""), None);
    }

    #[test]
    fn drafts_need_text_values() {
        let draft = FlashcardDraft {
            question: Value::from("What is Rust?"),
            answer: Value::from(42),
        };
        assert_eq!(
            NewFlashcard::try_from(draft),
            Err(InvalidFlashcard::NotText("answer"))
        );
    }

    #[test]
    fn blank_text_is_refused() {
        assert_eq!(
            NewFlashcard::new("  ", "answer"),
            Err(InvalidFlashcard::Blank("question"))
        );
        assert!(NewFlashcard::new("Q", "A").is_ok());
    }

    #[test]
    fn initial_metadata_uses_defaults() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let metadata = CardMetadata::initial(7, today);
        assert_eq!(metadata.interval, 0);
        assert_eq!(metadata.ease_factor, 2.5);
        assert_eq!(metadata.next_review, today);
        assert_eq!(metadata.card_id, 7);
    }
}
