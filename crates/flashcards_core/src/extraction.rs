//! crates/flashcards_core/src/extraction.rs
//!
//! Turns an uploaded file into plain text, dispatching on its declared MIME type.

use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::error::Error as StdError;
use std::sync::Arc;
use tracing::{debug, info};

use crate::domain::{MediaType, UploadedDocument};
use crate::error::PipelineError;
use crate::ports::PdfTextService;

/// Reads plain-text and PDF uploads. PDF parsing is delegated to a `PdfTextService`.
#[derive(Clone)]
pub struct ContentExtractor {
    pdf: Arc<dyn PdfTextService>,
}

impl ContentExtractor {
    pub fn new(pdf: Arc<dyn PdfTextService>) -> Self {
        Self { pdf }
    }

    /// Extracts the full text of `document`.
    ///
    /// The media type is checked before the body is polled, so an unsupported
    /// upload is rejected without reading any of its bytes. The body is read once.
    pub async fn extract<S, E>(&self, document: UploadedDocument<S>) -> Result<String, PipelineError>
    where
        S: Stream<Item = Result<Bytes, E>> + Send,
        E: StdError + Send + Sync + 'static,
    {
        let media_type = MediaType::from_declared(&document.declared_type)
            .ok_or_else(|| PipelineError::UnsupportedMediaType(document.declared_type.clone()))?;

        let bytes = read_body(document.body).await?;
        debug!(
            media_type = media_type.as_str(),
            bytes = bytes.len(),
            "Upload body read"
        );

        let text = match media_type {
            MediaType::PlainText => String::from_utf8(bytes).map_err(PipelineError::Decode)?,
            MediaType::Pdf => self.extract_pdf(bytes).await?,
        };
        info!(
            media_type = media_type.as_str(),
            chars = text.chars().count(),
            "Extracted text from upload"
        );
        Ok(text)
    }

    async fn extract_pdf(&self, bytes: Vec<u8>) -> Result<String, PipelineError> {
        // A zero-byte PDF has no pages, and no text.
        if bytes.is_empty() {
            return Ok(String::new());
        }

        let pdf = Arc::clone(&self.pdf);
        let pages = tokio::task::spawn_blocking(move || pdf.extract_pages(&bytes))
            .await
            .map_err(PipelineError::extraction)?
            .map_err(PipelineError::extraction)?;

        debug!(pages = pages.len(), "PDF pages extracted");
        Ok(pages.concat())
    }
}

async fn read_body<S, E>(body: S) -> Result<Vec<u8>, PipelineError>
where
    S: Stream<Item = Result<Bytes, E>> + Send,
    E: StdError + Send + Sync + 'static,
{
    let mut body = Box::pin(body);
    let mut buffer = Vec::new();
    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(PipelineError::extraction)?;
        buffer.extend_from_slice(&chunk);
    }
    Ok(buffer)
}
