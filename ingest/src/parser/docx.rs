//! Word-processor (`.docx`) paragraph reader.
//!
//! Only `word/document.xml` is read. Each `w:p` becomes a [`Paragraph`] with
//! its visible text and, for list items, the numbering depth (`w:ilvl`).

use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::Read;
use std::path::Path;

use crate::error::{SourceError, SourceResult};

const DOCUMENT_PART: &str = "word/document.xml";

/// A document paragraph.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Paragraph {
    pub text: String,
    /// List depth, `None` for paragraphs outside any numbered/bulleted list.
    pub depth: Option<u8>,
}

impl Paragraph {
    pub fn plain(text: impl Into<String>) -> Self {
        Self { text: text.into(), depth: None }
    }

    pub fn list_item(text: impl Into<String>, depth: u8) -> Self {
        Self { text: text.into(), depth: Some(depth) }
    }
}

/// Read every paragraph of a `.docx` file.
pub fn read_docx(path: &Path) -> SourceResult<Vec<Paragraph>> {
    if !path.exists() {
        return Err(SourceError::MissingInput(path.to_path_buf()));
    }
    let file = std::fs::File::open(path)?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| SourceError::corrupt(path, e))?;
    let mut part = archive
        .by_name(DOCUMENT_PART)
        .map_err(|e| SourceError::corrupt(path, format!("{}: {}", DOCUMENT_PART, e)))?;

    let mut xml = String::new();
    part.read_to_string(&mut xml)?;

    parse_document_xml(&xml).map_err(|e| SourceError::corrupt(path, e))
}

/// Extract paragraphs from the main document part.
pub fn parse_document_xml(xml: &str) -> Result<Vec<Paragraph>, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(false);

    let mut paragraphs = Vec::new();
    let mut current: Option<Paragraph> = None;
    let mut in_num_pr = false;
    let mut in_text = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.name().as_ref() {
                b"w:p" => current = Some(Paragraph::default()),
                b"w:numPr" => {
                    in_num_pr = true;
                    if let Some(p) = current.as_mut() {
                        p.depth.get_or_insert(0);
                    }
                }
                b"w:t" => in_text = true,
                _ => {}
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"w:p" => paragraphs.push(Paragraph::default()),
                b"w:ilvl" if in_num_pr => {
                    let level = match e.try_get_attribute("w:val")? {
                        Some(attr) => attr.decode_and_unescape_value(&reader)?.trim().parse::<u8>().unwrap_or(0),
                        None => 0,
                    };
                    if let Some(p) = current.as_mut() {
                        p.depth = Some(level);
                    }
                }
                b"w:numPr" => {
                    if let Some(p) = current.as_mut() {
                        p.depth.get_or_insert(0);
                    }
                }
                b"w:tab" => {
                    if let Some(p) = current.as_mut() {
                        p.text.push('\t');
                    }
                }
                b"w:br" | b"w:cr" => {
                    if let Some(p) = current.as_mut() {
                        p.text.push(' ');
                    }
                }
                _ => {}
            },
            Event::Text(t) if in_text => {
                if let Some(p) = current.as_mut() {
                    p.text.push_str(&t.unescape()?);
                }
            }
            Event::End(e) => match e.name().as_ref() {
                b"w:p" => {
                    if let Some(p) = current.take() {
                        paragraphs.push(p);
                    }
                }
                b"w:numPr" => in_num_pr = false,
                b"w:t" => in_text = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(paragraphs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document(body: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}</w:body></w:document>"#,
            body
        )
    }

    #[test]
    fn test_plain_and_list_paragraphs() {
        let xml = document(
            r#"<w:p><w:r><w:t>MINISTÈRE DES FINANCES</w:t></w:r></w:p>
<w:p><w:pPr><w:numPr><w:ilvl w:val="0"/><w:numId w:val="3"/></w:numPr></w:pPr><w:r><w:t>Direction générale du Budget</w:t></w:r></w:p>
<w:p><w:pPr><w:numPr><w:ilvl w:val="1"/><w:numId w:val="3"/></w:numPr></w:pPr><w:r><w:t xml:space="preserve">Bureau </w:t></w:r><w:r><w:t>du courrier &amp; archives</w:t></w:r></w:p>"#,
        );
        let paragraphs = parse_document_xml(&xml).unwrap();

        assert_eq!(
            paragraphs,
            vec![
                Paragraph::plain("MINISTÈRE DES FINANCES"),
                Paragraph::list_item("Direction générale du Budget", 0),
                Paragraph::list_item("Bureau du courrier & archives", 1),
            ]
        );
    }

    #[test]
    fn test_num_pr_without_ilvl_is_depth_zero() {
        let xml = document(
            r#"<w:p><w:pPr><w:numPr><w:numId w:val="7"/></w:numPr></w:pPr><w:r><w:t>Cabinet</w:t></w:r></w:p>"#,
        );
        let paragraphs = parse_document_xml(&xml).unwrap();
        assert_eq!(paragraphs, vec![Paragraph::list_item("Cabinet", 0)]);
    }

    #[test]
    fn test_tabs_breaks_and_empty_paragraphs() {
        let xml = document(
            r#"<w:p/><w:p><w:r><w:t>Service</w:t><w:tab/><w:t>A</w:t><w:br/><w:t>B</w:t></w:r></w:p>"#,
        );
        let paragraphs = parse_document_xml(&xml).unwrap();

        assert_eq!(paragraphs.len(), 2);
        assert_eq!(paragraphs[0].text, "");
        assert_eq!(paragraphs[1].text, "Service\tA B");
    }

    #[test]
    fn test_missing_and_corrupt_files() {
        let dir = tempfile::tempdir().unwrap();
        let missing = read_docx(&dir.path().join("absent.docx")).unwrap_err();
        assert!(matches!(missing, SourceError::MissingInput(_)));

        let bogus = dir.path().join("bogus.docx");
        std::fs::write(&bogus, b"not a zip archive").unwrap();
        let corrupt = read_docx(&bogus).unwrap_err();
        assert!(matches!(corrupt, SourceError::Corrupt { .. }));
    }
}
