//! Plain-text extraction for uploaded PDF and DOCX documents.
//!
//! Extraction returns a typed result so the pipeline decides what to do with unreadable files.
//! [`extract_or_fallback`] applies the default substitution: an unreadable PDF becomes empty
//! text and an unreadable DOCX becomes [`DOCX_FAILURE_SENTINEL`].

mod docx;
mod pdf;

use std::path::Path;
use thiserror::Error;

pub use docx::extract_docx_text;
pub use pdf::extract_pdf_text;

/// Default number of leading PDF pages read during extraction.
pub const DEFAULT_PDF_MAX_PAGES: usize = 5;

/// Text substituted for a DOCX document that could not be parsed.
pub const DOCX_FAILURE_SENTINEL: &str = "[Error: the DOCX file could not be read]";

/// Document formats accepted by the intake pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// Portable Document Format.
    Pdf,
    /// Office Open XML word-processing document.
    Docx,
}

impl DocumentKind {
    /// Infer the kind from a file name's extension, ignoring case.
    pub fn from_file_name(name: &str) -> Option<Self> {
        let extension = Path::new(name).extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            _ => None,
        }
    }

    /// Lowercase label used in logs and error messages.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
        }
    }
}

/// Errors produced while reading text out of a document.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The bytes could not be loaded as a PDF.
    #[error("Failed to read PDF: {0}")]
    Pdf(String),
    /// The bytes are not a readable DOCX container.
    #[error("Failed to read DOCX: {0}")]
    Docx(String),
}

impl ExtractionError {
    /// Error of the variant matching `kind`.
    pub fn for_kind(kind: DocumentKind, message: impl Into<String>) -> Self {
        match kind {
            DocumentKind::Pdf => Self::Pdf(message.into()),
            DocumentKind::Docx => Self::Docx(message.into()),
        }
    }

    /// Text that stands in for the document when the pipeline keeps going after this failure.
    pub fn fallback_text(&self) -> &'static str {
        match self {
            Self::Pdf(_) => "",
            Self::Docx(_) => DOCX_FAILURE_SENTINEL,
        }
    }
}

/// Extract plain text from `bytes` according to `kind`.
///
/// `pdf_max_pages` caps the number of PDF pages read; it has no effect on DOCX input.
pub fn extract(
    bytes: &[u8],
    kind: DocumentKind,
    pdf_max_pages: usize,
) -> Result<String, ExtractionError> {
    match kind {
        DocumentKind::Pdf => extract_pdf_text(bytes, pdf_max_pages),
        DocumentKind::Docx => extract_docx_text(bytes),
    }
}

/// Extract plain text, substituting the failure's fallback text instead of returning an error.
pub fn extract_or_fallback(bytes: &[u8], kind: DocumentKind, pdf_max_pages: usize) -> String {
    match extract(bytes, kind, pdf_max_pages) {
        Ok(text) => text,
        Err(error) => {
            tracing::warn!(
                kind = kind.as_str(),
                error = %error,
                "Extraction failed; using fallback text"
            );
            error.fallback_text().to_string()
        }
    }
}
