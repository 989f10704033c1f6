//! DOCX files are ZIP archives; the body text lives in `word/document.xml`.

use super::ExtractionError;
use quick_xml::Reader;
use quick_xml::events::Event;
use std::io::{Cursor, Read};

/// Extract the non-empty body paragraphs of a DOCX held in memory, one per line.
pub fn extract_docx_text(bytes: &[u8]) -> Result<String, ExtractionError> {
    let xml = read_document_xml(bytes)?;
    let paragraphs = parse_paragraphs(&xml)?;
    Ok(paragraphs
        .into_iter()
        .filter(|paragraph| !paragraph.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n"))
}

fn read_document_xml(bytes: &[u8]) -> Result<String, ExtractionError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| ExtractionError::Docx(format!("not a zip container: {e}")))?;
    let mut entry = archive
        .by_name("word/document.xml")
        .map_err(|e| ExtractionError::Docx(format!("cannot find word/document.xml: {e}")))?;

    let mut xml = String::new();
    entry
        .read_to_string(&mut xml)
        .map_err(|e| ExtractionError::Docx(e.to_string()))?;
    Ok(xml)
}

/// Containers whose paragraphs are not body paragraphs.
const SKIPPED_CONTAINERS: [&[u8]; 3] = [b"w:tbl", b"w:txbxContent", b"mc:Fallback"];

/// Collect the text of every body paragraph in document order.
///
/// Only top-level paragraphs count. Paragraphs inside tables or text boxes are skipped, and text
/// belonging to a paragraph nested in another one never leaks into the outer paragraph.
fn parse_paragraphs(xml: &str) -> Result<Vec<String>, ExtractionError> {
    let mut reader = Reader::from_str(xml);

    let mut paragraphs = Vec::new();
    let mut current = String::new();
    let mut skipped = 0usize;
    let mut paragraph_depth = 0usize;
    let mut in_text = false;

    loop {
        let collecting = skipped == 0 && paragraph_depth == 1;
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                name if is_skipped_container(name) => skipped += 1,
                b"w:p" if skipped == 0 => {
                    paragraph_depth += 1;
                    if paragraph_depth == 1 {
                        current.clear();
                    }
                }
                b"w:t" => in_text = true,
                _ => {}
            },
            Ok(Event::Empty(e)) if collecting => match e.name().as_ref() {
                b"w:tab" => current.push('\t'),
                b"w:br" | b"w:cr" => current.push('\n'),
                _ => {}
            },
            Ok(Event::End(e)) => match e.name().as_ref() {
                name if is_skipped_container(name) => {
                    skipped = skipped.saturating_sub(1);
                }
                b"w:p" if skipped == 0 => {
                    if paragraph_depth == 1 {
                        paragraphs.push(std::mem::take(&mut current));
                    }
                    paragraph_depth = paragraph_depth.saturating_sub(1);
                }
                b"w:t" => in_text = false,
                _ => {}
            },
            Ok(Event::Text(e)) if in_text && collecting => {
                let text = e
                    .unescape()
                    .map_err(|e| ExtractionError::Docx(e.to_string()))?;
                current.push_str(&text);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(ExtractionError::Docx(format!(
                    "malformed XML at position {}: {e}",
                    reader.buffer_position()
                )));
            }
            _ => {}
        }
    }

    Ok(paragraphs)
}

fn is_skipped_container(name: &[u8]) -> bool {
    SKIPPED_CONTAINERS.iter().any(|container| *container == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::fixtures::{docx_from_body, docx_with_paragraphs};

    #[test]
    fn joins_non_empty_paragraphs_in_order() {
        let docx = docx_with_paragraphs(&["Cliente: Ayuntamiento", "   ", "", "Uso BIM: 4D"]);
        let text = extract_docx_text(&docx).expect("docx text");
        assert_eq!(text, "Cliente: Ayuntamiento\nUso BIM: 4D");
    }

    #[test]
    fn concatenates_runs_and_keeps_inner_spacing() {
        let body = r#"<w:p><w:r><w:t>Nivel </w:t></w:r><w:r><w:t xml:space="preserve">BIM </w:t></w:r><w:r><w:tab/><w:t>2</w:t></w:r></w:p>"#;
        let text = extract_docx_text(&docx_from_body(body)).expect("docx text");
        assert_eq!(text, "Nivel BIM \t2");
    }

    #[test]
    fn unescapes_entities() {
        let docx = docx_with_paragraphs(&["Estructuras &amp; instalaciones"]);
        let text = extract_docx_text(&docx).expect("docx text");
        assert_eq!(text, "Estructuras & instalaciones");
    }

    #[test]
    fn skips_table_paragraphs() {
        let body = concat!(
            r#"<w:p><w:r><w:t>Intro</w:t></w:r></w:p>"#,
            r#"<w:tbl><w:tr><w:tc><w:p><w:r><w:t>Cell</w:t></w:r></w:p></w:tc></w:tr></w:tbl>"#,
            r#"<w:p><w:r><w:t>Outro</w:t></w:r></w:p>"#,
        );
        let text = extract_docx_text(&docx_from_body(body)).expect("docx text");
        assert_eq!(text, "Intro\nOutro");
    }

    #[test]
    fn text_box_inside_a_paragraph_keeps_the_outer_text() {
        let body = concat!(
            r#"<w:p><w:r><w:t xml:space="preserve">Portada </w:t></w:r>"#,
            r#"<w:r><w:pict><v:shape><v:textbox><w:txbxContent>"#,
            r#"<w:p><w:r><w:t>Caja</w:t></w:r></w:p>"#,
            r#"</w:txbxContent></v:textbox></v:shape></w:pict></w:r>"#,
            r#"<w:r><w:t>del proyecto</w:t></w:r></w:p>"#,
            r#"<w:p><w:r><w:t>Segundo</w:t></w:r></w:p>"#,
        );
        let text = extract_docx_text(&docx_from_body(body)).expect("docx text");
        assert_eq!(text, "Portada del proyecto\nSegundo");
    }

    #[test]
    fn nested_paragraph_does_not_split_its_parent() {
        let body = concat!(
            r#"<w:p><w:r><w:t xml:space="preserve">Antes </w:t></w:r>"#,
            r#"<w:p><w:r><w:t>Dentro</w:t></w:r></w:p>"#,
            r#"<w:r><w:t>despues</w:t></w:r></w:p>"#,
            r#"<mc:AlternateContent><mc:Choice/><mc:Fallback>"#,
            r#"<w:p><w:r><w:t>Alternativa</w:t></w:r></w:p>"#,
            r#"</mc:Fallback></mc:AlternateContent>"#,
            r#"<w:p><w:r><w:t>Final</w:t></w:r></w:p>"#,
        );
        let text = extract_docx_text(&docx_from_body(body)).expect("docx text");
        assert_eq!(text, "Antes despues\nFinal");
    }

    #[test]
    fn rejects_non_zip_bytes() {
        let error = extract_docx_text(b"not a docx").expect_err("invalid docx");
        assert!(matches!(error, ExtractionError::Docx(_)));
    }

    #[test]
    fn rejects_zip_without_document_part() {
        let mut cursor = std::io::Cursor::new(Vec::new());
        {
            let mut zip = zip::ZipWriter::new(&mut cursor);
            zip.start_file("readme.txt", zip::write::SimpleFileOptions::default())
                .expect("entry");
            std::io::Write::write_all(&mut zip, b"hello").expect("write");
            zip.finish().expect("finish");
        }
        let error = extract_docx_text(&cursor.into_inner()).expect_err("missing document.xml");
        assert!(error.to_string().contains("word/document.xml"));
    }
}
