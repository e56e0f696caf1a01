//! services/api/src/adapters/completion_llm.rs
//!
//! This module contains the adapter for the flashcard-generating LLM.
//! It implements the `TextCompletionService` port from the `core` crate against
//! any OpenAI-compatible chat completions endpoint (Gemini exposes one).

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use flashcards_core::ports::{CompletionStream, PortError, PortResult, TextCompletionService};
use futures::StreamExt;
use tracing::debug;

/// The environment variable holding the credential, named in error messages.
const CREDENTIAL_NAME: &str = "GEMINI_API_KEY";

/// Low temperature keeps the output close to the requested JSON shape.
const TEMPERATURE: f32 = 0.3;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `TextCompletionService` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiCompletionAdapter {
    client: Option<Client<OpenAIConfig>>,
    model: String,
}

impl OpenAiCompletionAdapter {
    /// Creates a new `OpenAiCompletionAdapter`.
    ///
    /// Without an API key the adapter is still constructed, but every call fails
    /// with `PortError::MissingCredential` before touching the network.
    pub fn new(api_key: Option<&str>, api_base: &str, model: String) -> Self {
        let client = api_key.map(|key| {
            Client::with_config(
                OpenAIConfig::new()
                    .with_api_key(key)
                    .with_api_base(api_base),
            )
        });
        Self { client, model }
    }
}

//=========================================================================================
// `TextCompletionService` Trait Implementation
//=========================================================================================

#[async_trait]
impl TextCompletionService for OpenAiCompletionAdapter {
    /// Streams the model's answer to `prompt` as text fragments.
    async fn stream_completion(&self, prompt: &str) -> PortResult<CompletionStream> {
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| PortError::MissingCredential(CREDENTIAL_NAME.to_string()))?;

        let messages: Vec<ChatCompletionRequestMessage> = vec![ChatCompletionRequestUserMessageArgs::default()
            .content(prompt)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?
            .into()];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(TEMPERATURE)
            .stream(true)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        debug!(model = %self.model, "Requesting streamed completion");
        // Call the API and manually map the error if it occurs, which respects the orphan rule.
        let upstream = client
            .chat()
            .create_stream(request)
            .await
            .map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))?;

        // Each event may carry text in several choices; keep them in order.
        let fragments = upstream.map(|event| {
            event
                .map(|response| {
                    response
                        .choices
                        .into_iter()
                        .filter_map(|choice| choice.delta.content)
                        .collect::<String>()
                })
                .map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))
        });

        Ok(Box::pin(fragments))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_key_fails_before_any_request() {
        let adapter = OpenAiCompletionAdapter::new(
            None,
            "http://127.0.0.1:9/unreachable",
            "gemini-2.5-flash".to_string(),
        );
        match adapter.stream_completion("prompt").await {
            Err(PortError::MissingCredential(name)) => assert_eq!(name, "GEMINI_API_KEY"),
            Err(other) => panic!("expected MissingCredential, got {other:?}"),
            Ok(_) => panic!("expected MissingCredential, got a stream"),
        }
    }
}
