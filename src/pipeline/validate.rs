//! Request validation. Runs before any extraction, network call, or filesystem write.

use super::types::{
    InputDocument, MAX_BIM_LEVEL, MAX_PAGE_COUNT, MIN_BIM_LEVEL, MIN_PAGE_COUNT, ProjectForm,
    ProjectRequest, UploadedFile, ValidatedProject, ValidationError,
};
use crate::extraction::DocumentKind;
use std::collections::HashSet;

/// Check a request and resolve the kind of every document.
pub fn validate_request(request: ProjectRequest) -> Result<ValidatedProject, ValidationError> {
    let ProjectRequest {
        project_name,
        form,
        inputs,
        output,
    } = request;

    let project_name = sanitize_project_name(&project_name)?;
    if inputs.is_empty() {
        return Err(ValidationError::NoInputDocuments);
    }
    let output = output.ok_or(ValidationError::MissingOutputDocument)?;

    let mut seen = HashSet::new();
    let mut documents = Vec::with_capacity(inputs.len());
    for UploadedFile { name, bytes } in inputs {
        ensure_plain_file_name(&name)?;
        let kind = DocumentKind::from_file_name(&name)
            .ok_or_else(|| ValidationError::UnsupportedInput(name.clone()))?;
        if !seen.insert(name.clone()) {
            return Err(ValidationError::DuplicateInputName(name));
        }
        documents.push(InputDocument {
            name,
            bytes: bytes.into(),
            kind,
        });
    }

    ensure_plain_file_name(&output.name)?;
    if DocumentKind::from_file_name(&output.name) != Some(DocumentKind::Docx) {
        return Err(ValidationError::OutputNotDocx(output.name));
    }

    validate_form(&form)?;

    Ok(ValidatedProject {
        project_name,
        form,
        inputs: documents,
        output: InputDocument {
            name: output.name,
            bytes: output.bytes.into(),
            kind: DocumentKind::Docx,
        },
    })
}

/// Trim the project name and ensure it can name a single directory.
pub fn sanitize_project_name(value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::MissingProjectName);
    }
    if !is_plain_component(trimmed) {
        return Err(ValidationError::InvalidProjectName(trimmed.to_string()));
    }
    Ok(trimmed.to_string())
}

fn ensure_plain_file_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() || !is_plain_component(name) {
        return Err(ValidationError::InvalidFileName(name.to_string()));
    }
    Ok(())
}

fn is_plain_component(value: &str) -> bool {
    !value.starts_with('.')
        && !value
            .chars()
            .any(|c| matches!(c, '/' | '\\' | ':' | '"') || c.is_control())
}

fn validate_form(form: &ProjectForm) -> Result<(), ValidationError> {
    if !(MIN_BIM_LEVEL..=MAX_BIM_LEVEL).contains(&form.bim_level) {
        return Err(ValidationError::BimLevelOutOfRange(form.bim_level));
    }
    if !(MIN_PAGE_COUNT..=MAX_PAGE_COUNT).contains(&form.page_count) {
        return Err(ValidationError::PageCountOutOfRange(form.page_count));
    }
    Ok(())
}
