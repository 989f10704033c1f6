//! Builder for the `resumen.txt` metadata block.

use super::types::ProjectForm;
use std::fmt::Write as _;

/// Label introducing the final deliverable's summary.
pub const FINAL_SUMMARY_LABEL: &str = "resumen_prebep_final";

/// Append-only metadata text for one run.
///
/// Form fields come first, then one line per input document in the order pushed. The final
/// deliverable's summary is appended by [`ProjectMetadata::finish`], which consumes the builder
/// so nothing can follow it.
#[derive(Debug, Clone)]
pub struct ProjectMetadata {
    text: String,
}

impl ProjectMetadata {
    /// Start a metadata block with the form fields.
    pub fn new(form: &ProjectForm) -> Self {
        let mut text = String::new();
        let _ = writeln!(text, "cliente: {}", form.client);
        let _ = writeln!(text, "tipo: {}", form.project_type);
        let _ = writeln!(text, "ubicacion: {}", form.location);
        let _ = writeln!(text, "nivel_bim: {}", form.bim_level);
        let _ = writeln!(text, "usos_bim: {}", form.bim_uses);
        let _ = writeln!(text, "n_paginas_deseadas: {}", form.page_count);
        text.push_str("archivos:\n");
        Self { text }
    }

    /// Append the summary line for one input document.
    pub fn push_document(&mut self, name: &str, summary: &str) {
        let _ = writeln!(self.text, "  - {name}: {summary}");
    }

    /// Append the final deliverable's summary and return the finished text.
    pub fn finish(mut self, final_summary: &str) -> String {
        let _ = writeln!(self.text, "{FINAL_SUMMARY_LABEL}:");
        let _ = writeln!(self.text, "{final_summary}");
        self.text
    }
}
