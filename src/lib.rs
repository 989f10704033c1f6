#![deny(missing_docs)]

//! Core library for the Pre-BEP project intake service.

/// HTTP routing and REST handlers.
pub mod api;
/// Staging tree and zip archive assembly.
pub mod assembly;
/// Environment-driven configuration management.
pub mod config;
/// Plain-text extraction from PDF and DOCX documents.
pub mod extraction;
/// Structured logging and tracing setup.
pub mod logging;
/// Intake metrics helpers.
pub mod metrics;
/// End-to-end intake pipeline.
pub mod pipeline;
/// Summarization client abstraction and adapters.
pub mod summarization;
