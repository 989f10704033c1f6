//! Intake pipeline: validation, per-document summaries, metadata, and packaging.
//!
//! A run moves through four stages in a fixed order. Validation rejects a request before any
//! side effect. Extraction and summarization happen entirely in memory. Only once every summary
//! is in hand does assembly touch the filesystem, so a failed run never leaves a half-written
//! archive behind.

mod metadata;
mod service;
mod types;
mod validate;

pub use metadata::{FINAL_SUMMARY_LABEL, ProjectMetadata};
pub use service::{IntakeApi, IntakePipeline};
pub use types::{
    InputDocument, MAX_BIM_LEVEL, MAX_PAGE_COUNT, MIN_BIM_LEVEL, MIN_PAGE_COUNT, PipelineError,
    PipelineSettings, ProjectForm, ProjectRequest, Stage, UploadedFile, ValidatedProject,
    ValidationError,
};
pub use validate::{sanitize_project_name, validate_request};
