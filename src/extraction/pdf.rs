use super::ExtractionError;
use lopdf::Document;

/// Extract text from the first `max_pages` pages of a PDF held in memory.
///
/// Each page's text is followed by a blank line and the combined result is trimmed. Pages that
/// yield no text, or whose content stream cannot be decoded, contribute an empty string.
pub fn extract_pdf_text(bytes: &[u8], max_pages: usize) -> Result<String, ExtractionError> {
    let doc = Document::load_mem(bytes).map_err(|e| ExtractionError::Pdf(e.to_string()))?;

    let mut text = String::new();
    for page_number in doc.get_pages().into_keys().take(max_pages) {
        let page_text = match doc.extract_text(&[page_number]) {
            Ok(content) => content,
            Err(error) => {
                tracing::debug!(page = page_number, error = %error, "No extractable text on page");
                String::new()
            }
        };
        text.push_str(page_text.trim_end());
        text.push_str("\n\n");
    }

    Ok(text.trim().to_string())
}
