//! crates/flashcards_core/src/pipeline.rs
//!
//! Composes the four stages: extract, generate, validate, persist.

use bytes::Bytes;
use futures::Stream;
use std::error::Error as StdError;
use tracing::info;

use crate::domain::{FlashcardRecord, UploadedDocument};
use crate::error::PipelineError;
use crate::extraction::ContentExtractor;
use crate::generation::FlashcardGenerator;
use crate::persistence::FlashcardGateway;
use crate::validation::ResponseValidator;

pub struct FlashcardPipeline {
    extractor: ContentExtractor,
    generator: FlashcardGenerator,
    validator: ResponseValidator,
    gateway: FlashcardGateway,
}

impl FlashcardPipeline {
    pub fn new(
        extractor: ContentExtractor,
        generator: FlashcardGenerator,
        validator: ResponseValidator,
        gateway: FlashcardGateway,
    ) -> Self {
        Self {
            extractor,
            generator,
            validator,
            gateway,
        }
    }

    pub fn gateway(&self) -> &FlashcardGateway {
        &self.gateway
    }

    /// Runs one upload through every stage. The first failing stage ends the run.
    pub async fn run<S, E>(
        &self,
        document: UploadedDocument<S>,
    ) -> Result<Vec<FlashcardRecord>, PipelineError>
    where
        S: Stream<Item = Result<Bytes, E>> + Send,
        E: StdError + Send + Sync + 'static,
    {
        let text = self.extractor.extract(document).await?;
        let candidates = self.generator.generate(&text).await?;
        let drafts = self.validator.validate(candidates)?;
        let records = self.gateway.save(drafts).await?;
        info!(count = records.len(), "Flashcards saved to database");
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{InMemoryFlashcardStore, ScriptedCompletion, StaticPdfText};
    use crate::validation::ValidationMode;
    use futures::stream;
    use std::io;
    use std::sync::Arc;
    use std::time::Duration;

    fn pipeline(
        script: ScriptedCompletion,
        store: Arc<InMemoryFlashcardStore>,
    ) -> FlashcardPipeline {
        FlashcardPipeline::new(
            ContentExtractor::new(Arc::new(StaticPdfText::pages(vec!["unused"]))),
            FlashcardGenerator::new(Arc::new(script), Duration::from_secs(5)),
            ResponseValidator::new(ValidationMode::AllOrNothing),
            FlashcardGateway::new(store),
        )
    }

    fn text_upload(text: &'static str) -> UploadedDocument<impl Stream<Item = Result<Bytes, io::Error>> + Send> {
        UploadedDocument::new(
            "text/plain",
            stream::iter(vec![Ok(Bytes::from_static(text.as_bytes()))]),
        )
    }

    #[tokio::test]
    async fn upload_becomes_persisted_flashcards() {
        let store = Arc::new(InMemoryFlashcardStore::default());
        let script = ScriptedCompletion::chunks(vec![
            "```json\n[{\"question\": \"What do plants absorb?\", ",
            "\"answer\": \"Carbon dioxide\"}]\n```",
        ]);

        let records = pipeline(script, store.clone())
            .run(text_upload("Plants absorb carbon dioxide."))
            .await
            .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].answer, "Carbon dioxide");
        assert_eq!(store.card_count(), 1);
    }

    #[tokio::test]
    async fn malformed_batch_writes_nothing() {
        let store = Arc::new(InMemoryFlashcardStore::default());
        let script = ScriptedCompletion::chunks(vec![
            r#"[{"question": "Q1", "answer": "A1"}, {"question": "Q2"}]"#,
        ]);

        let err = pipeline(script, store.clone())
            .run(text_upload("anything"))
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::MalformedFlashcardBatch(_)));
        assert_eq!(store.sessions_opened(), 0);
    }

    #[tokio::test]
    async fn unsupported_upload_never_reaches_the_model() {
        let store = Arc::new(InMemoryFlashcardStore::default());
        let script = ScriptedCompletion::chunks(vec!["[]"]);
        let prompts = script.prompts();

        let upload = UploadedDocument::new(
            "image/jpeg",
            stream::iter(vec![Ok::<_, io::Error>(Bytes::from_static(b"\xff\xd8"))]),
        );
        let err = pipeline(script, store).run(upload).await.unwrap_err();

        assert!(matches!(err, PipelineError::UnsupportedMediaType(_)));
        assert!(prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_model_batch_saves_nothing_and_succeeds() {
        let store = Arc::new(InMemoryFlashcardStore::default());
        let records = pipeline(ScriptedCompletion::chunks(vec!["[]"]), store.clone())
            .run(text_upload(""))
            .await
            .unwrap();

        assert!(records.is_empty());
        assert_eq!(store.sessions_opened(), 0);
    }
}
