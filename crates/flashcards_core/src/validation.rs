//! crates/flashcards_core/src/validation.rs
//!
//! Structural checks on model candidates before anything is persisted.

use serde_json::Value;
use std::str::FromStr;
use tracing::warn;

use crate::domain::{FlashcardDraft, RawFlashcardCandidate};
use crate::error::PipelineError;

/// How a batch with some invalid candidates is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationMode {
    /// Any invalid candidate rejects the whole batch.
    #[default]
    AllOrNothing,
    /// Invalid candidates are logged and dropped.
    SkipInvalid,
}

impl FromStr for ValidationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all_or_nothing" | "strict" => Ok(Self::AllOrNothing),
            "skip_invalid" | "lenient" => Ok(Self::SkipInvalid),
            other => Err(format!(
                "'{other}' is not a validation mode (expected all_or_nothing or skip_invalid)"
            )),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ResponseValidator {
    mode: ValidationMode,
}

impl ResponseValidator {
    pub fn new(mode: ValidationMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> ValidationMode {
        self.mode
    }

    /// Checks that every candidate is an object with non-null `question` and
    /// `answer` values. Empty strings pass; only the keys are required.
    pub fn validate(
        &self,
        candidates: Vec<RawFlashcardCandidate>,
    ) -> Result<Vec<FlashcardDraft>, PipelineError> {
        let mut drafts = Vec::with_capacity(candidates.len());
        for (index, candidate) in candidates.into_iter().enumerate() {
            match into_draft(candidate) {
                Ok(draft) => drafts.push(draft),
                Err(reason) => match self.mode {
                    ValidationMode::AllOrNothing => {
                        return Err(PipelineError::MalformedFlashcardBatch(format!(
                            "item {index} {reason}"
                        )));
                    }
                    ValidationMode::SkipInvalid => {
                        warn!(index, %reason, "Skipping invalid flashcard candidate");
                    }
                },
            }
        }
        Ok(drafts)
    }
}

fn into_draft(candidate: Value) -> Result<FlashcardDraft, String> {
    let Value::Object(mut fields) = candidate else {
        return Err("is not a JSON object".to_string());
    };

    let mut take = |key: &str| match fields.remove(key) {
        None => Err(format!("is missing the '{key}' key")),
        Some(Value::Null) => Err(format!("has a null '{key}' value")),
        Some(value) => Ok(value),
    };
    let question = take("question")?;
    let answer = take("answer")?;

    Ok(FlashcardDraft { question, answer })
}
