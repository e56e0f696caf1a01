//! crates/flashcards_core/src/generation.rs
//!
//! Asks the language model for flashcards and turns its streamed answer into
//! untrusted JSON candidates.

use futures::StreamExt;
use regex::Regex;
use serde_json::Value;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tracing::{debug, error, info};

use crate::domain::RawFlashcardCandidate;
use crate::error::PipelineError;
use crate::ports::TextCompletionService;

const PROMPT_TEMPLATE: &str = r#"Generate a list of flashcards (question and answer pairs) based on the following text.
Respond with ONLY a JSON array. Each element must be an object with exactly two keys, "question" and "answer", whose values are double-quoted strings.
Do not wrap the array in an object, do not use Markdown, and do not add any text before or after the array.
Generate at least 3-5 flashcards if possible, and no more than 10. Keep questions concise and answers informative.

Text: "{text}""#;

/// Builds the prompt sent to the model for `text`.
pub fn build_prompt(text: &str) -> String {
    PROMPT_TEMPLATE.replace("{text}", text)
}

fn fence_pattern() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| {
        Regex::new(r"(?s)\A\s*```[\w-]*[ \t]*\r?\n(?P<body>.*?)\s*```\s*\z")
            .expect("fence pattern is a valid regex")
    })
}

/// Removes a Markdown code fence around the response, if there is one.
pub fn strip_code_fence(raw: &str) -> &str {
    match fence_pattern().captures(raw).and_then(|c| c.name("body")) {
        Some(body) => body.as_str(),
        None => raw.trim(),
    }
}

/// Parses a complete model response into candidates. The top-level value must be
/// a JSON array; the raw text is carried on every failure.
pub fn parse_candidates(raw: &str) -> Result<Vec<RawFlashcardCandidate>, PipelineError> {
    let cleaned = strip_code_fence(raw);
    if cleaned.trim().is_empty() {
        return Err(PipelineError::malformed_output(
            "the model returned an empty response",
            raw,
        ));
    }

    let value: Value = serde_json::from_str(cleaned).map_err(|e| {
        error!(error = %e, raw_response = %raw, "Failed to decode model response as JSON");
        PipelineError::malformed_output(format!("failed to decode JSON: {e}"), raw)
    })?;

    match value {
        Value::Array(items) => Ok(items),
        other => {
            error!(raw_response = %raw, "Model response is not a JSON array");
            Err(PipelineError::malformed_output(
                format!("expected a JSON array, got {}", json_kind(&other)),
                raw,
            ))
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

//=========================================================================================
// The Generator
//=========================================================================================

pub struct FlashcardGenerator {
    completion: Arc<dyn TextCompletionService>,
    timeout: Duration,
}

impl FlashcardGenerator {
    pub fn new(completion: Arc<dyn TextCompletionService>, timeout: Duration) -> Self {
        Self {
            completion,
            timeout,
        }
    }

    /// Streams a completion for `text` and parses it once the stream has ended.
    /// No retry is attempted.
    pub async fn generate(&self, text: &str) -> Result<Vec<RawFlashcardCandidate>, PipelineError> {
        let prompt = build_prompt(text);

        let raw = tokio::time::timeout(self.timeout, self.collect_response(&prompt))
            .await
            .map_err(|_| {
                error!(timeout = ?self.timeout, "Model response timed out");
                PipelineError::GenerationTimeout(self.timeout)
            })??;
        debug!(raw_response = %raw, "Model response received");

        let candidates = parse_candidates(&raw)?;
        info!(count = candidates.len(), "Parsed flashcard candidates");
        Ok(candidates)
    }

    async fn collect_response(&self, prompt: &str) -> Result<String, PipelineError> {
        let mut stream = self
            .completion
            .stream_completion(prompt)
            .await
            .map_err(PipelineError::from_model_port)?;

        let mut buffer = String::new();
        while let Some(chunk) = stream.next().await {
            match chunk {
                Ok(text) => buffer.push_str(&text),
                Err(e) => {
                    error!(error = %e, partial_response = %buffer, "Model stream failed");
                    return Err(PipelineError::from_model_port(e));
                }
            }
        }
        Ok(buffer)
    }
}
