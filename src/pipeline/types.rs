//! Request, document, and error types shared by the intake pipeline.

use crate::{
    assembly::AssemblyError,
    config::{Config, ExtractionFailurePolicy},
    extraction::{DEFAULT_PDF_MAX_PAGES, DocumentKind, ExtractionError},
    summarization::SummarizationClientError,
};
use std::sync::Arc;
use thiserror::Error;

/// Lowest accepted BIM maturity level.
pub const MIN_BIM_LEVEL: u8 = 1;
/// Highest accepted BIM maturity level.
pub const MAX_BIM_LEVEL: u8 = 3;
/// Lowest accepted desired page count.
pub const MIN_PAGE_COUNT: u32 = 1;
/// Highest accepted desired page count.
pub const MAX_PAGE_COUNT: u32 = 50;

/// A file as received from the caller, before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    /// File name supplied by the caller.
    pub name: String,
    /// Raw contents.
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    /// Pair a file name with its contents.
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }
}

/// A validated document whose kind is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputDocument {
    /// Original file name, used verbatim inside the archive.
    pub name: String,
    /// Raw contents, shared with the blocking extraction and assembly tasks.
    pub bytes: Arc<[u8]>,
    /// Format declared by the file extension.
    pub kind: DocumentKind,
}

/// Free-form project details collected alongside the uploads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectForm {
    /// Client commissioning the project.
    pub client: String,
    /// Kind of project (hospital, housing, ...).
    pub project_type: String,
    /// Project location.
    pub location: String,
    /// BIM maturity level, 1 to 3.
    pub bim_level: u8,
    /// Comma-separated BIM uses.
    pub bim_uses: String,
    /// Desired page count of the Pre-BEP, 1 to 50.
    pub page_count: u32,
}

impl Default for ProjectForm {
    fn default() -> Self {
        Self {
            client: String::new(),
            project_type: String::new(),
            location: String::new(),
            bim_level: MIN_BIM_LEVEL,
            bim_uses: String::new(),
            page_count: 6,
        }
    }
}

/// Everything needed for one intake run.
#[derive(Debug, Clone, Default)]
pub struct ProjectRequest {
    /// Project identifier; names the staging directory and the archive.
    pub project_name: String,
    /// Form details written at the top of the metadata file.
    pub form: ProjectForm,
    /// Input documents in upload order.
    pub inputs: Vec<UploadedFile>,
    /// Final Pre-BEP deliverable (`.docx`).
    pub output: Option<UploadedFile>,
}

/// A request that passed validation.
#[derive(Debug, Clone)]
pub struct ValidatedProject {
    /// Trimmed project identifier.
    pub project_name: String,
    /// Form details.
    pub form: ProjectForm,
    /// Input documents in upload order.
    pub inputs: Vec<InputDocument>,
    /// Final deliverable, always DOCX.
    pub output: InputDocument,
}

/// Knobs that shape a run, independent of the oracle and storage locations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineSettings {
    /// Number of leading PDF pages read per document.
    pub pdf_max_pages: usize,
    /// Maximum number of documents summarized at the same time.
    pub concurrency: usize,
    /// What to do when a document cannot be parsed.
    pub failure_policy: ExtractionFailurePolicy,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            pdf_max_pages: DEFAULT_PDF_MAX_PAGES,
            concurrency: 1,
            failure_policy: ExtractionFailurePolicy::Fallback,
        }
    }
}

impl From<&Config> for PipelineSettings {
    fn from(config: &Config) -> Self {
        Self {
            pdf_max_pages: config.pdf_max_pages,
            concurrency: config.summary_concurrency.max(1),
            failure_policy: config.extraction_failure_policy,
        }
    }
}

/// Request problems detected before anything is processed or written.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// Project name was empty or whitespace.
    #[error("Project name is required")]
    MissingProjectName,
    /// Project name cannot be used as a directory name.
    #[error("Project name '{0}' must be a single path component without separators or quotes")]
    InvalidProjectName(String),
    /// No input documents were supplied.
    #[error("At least one input document is required")]
    NoInputDocuments,
    /// The final deliverable was not supplied.
    #[error("The final output document is required")]
    MissingOutputDocument,
    /// A file name cannot be stored safely under the staging tree.
    #[error("File name '{0}' is not a plain file name")]
    InvalidFileName(String),
    /// An input is neither `.pdf` nor `.docx`.
    #[error("Input '{0}' must be a .pdf or .docx file")]
    UnsupportedInput(String),
    /// Two inputs share a file name and would overwrite each other.
    #[error("Input file name '{0}' was supplied more than once")]
    DuplicateInputName(String),
    /// The final deliverable is not a `.docx` file.
    #[error("Output document '{0}' must be a .docx file")]
    OutputNotDocx(String),
    /// BIM level outside 1..=3.
    #[error("BIM level must be between 1 and 3, got {0}")]
    BimLevelOutOfRange(u8),
    /// Desired page count outside 1..=50.
    #[error("Desired page count must be between 1 and 50, got {0}")]
    PageCountOutOfRange(u32),
}

/// Pipeline stage in which a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Request validation.
    Validation,
    /// Text extraction.
    Extraction,
    /// Remote summarization.
    Summarization,
    /// Staging and archiving.
    Assembly,
}

impl Stage {
    /// Lowercase stage label.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Extraction => "extraction",
            Self::Summarization => "summarization",
            Self::Assembly => "assembly",
        }
    }
}

/// Errors that end an intake run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The request was rejected before any processing.
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),
    /// A document could not be parsed and the abort policy is active.
    #[error("Extraction failed for '{document}': {source}")]
    Extraction {
        /// Document being read.
        document: String,
        /// Underlying extraction error.
        #[source]
        source: ExtractionError,
    },
    /// The summarization oracle failed; no archive was produced.
    #[error("Summarization failed for '{document}': {source}")]
    Summarization {
        /// Document being summarized.
        document: String,
        /// Underlying provider error.
        #[source]
        source: SummarizationClientError,
    },
    /// Writing the staging tree or archive failed.
    #[error("Assembly failed: {0}")]
    Assembly(#[from] AssemblyError),
}

impl PipelineError {
    /// Stage in which the run stopped.
    pub fn stage(&self) -> Stage {
        match self {
            Self::Validation(_) => Stage::Validation,
            Self::Extraction { .. } => Stage::Extraction,
            Self::Summarization { .. } => Stage::Summarization,
            Self::Assembly(_) => Stage::Assembly,
        }
    }
}
