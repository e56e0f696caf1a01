pub mod domain;
pub mod error;
pub mod extraction;
pub mod generation;
pub mod persistence;
pub mod pipeline;
pub mod ports;
pub mod validation;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use domain::{
    CardId, CardMetadata, FlashcardDraft, FlashcardRecord, InvalidFlashcard, MediaType,
    NewFlashcard, RawFlashcardCandidate, UploadedDocument,
};
pub use error::PipelineError;
pub use extraction::ContentExtractor;
pub use generation::FlashcardGenerator;
pub use persistence::FlashcardGateway;
pub use pipeline::FlashcardPipeline;
pub use ports::{
    CompletionStream, FlashcardSession, FlashcardStore, PdfTextService, PortError, PortResult,
    TextCompletionService,
};
pub use validation::{ResponseValidator, ValidationMode};
