//! services/api/src/adapters/pdf.rs
//!
//! This module contains the PDF text adapter.
//! It implements the `PdfTextService` port from the `core` crate with `pdf-extract`.

use flashcards_core::ports::{PdfTextService, PortError, PortResult};

/// Reads the embedded text layer of a PDF, one string per page.
///
/// Scanned pages have no text layer and come back as empty strings.
#[derive(Clone, Copy, Debug, Default)]
pub struct PdfExtractAdapter;

impl PdfTextService for PdfExtractAdapter {
    fn extract_pages(&self, pdf_bytes: &[u8]) -> PortResult<Vec<String>> {
        pdf_extract::extract_text_from_mem_by_pages(pdf_bytes)
            .map_err(|e| PortError::Unexpected(format!("PDF parsing failed: {}", e)))
    }
}
