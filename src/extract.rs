//! Best-effort plain-text extraction for uploaded documents.
//!
//! Uploads carry a format hint (file extension or MIME type); this module
//! turns the raw bytes into UTF-8 text or fails. Unrecognized hints fail
//! with [`QaError::UnsupportedFormat`]; recognized formats whose bytes
//! cannot be parsed abort the upload with an external-capability error.

use std::io::Read;

use crate::error::QaError;

pub const MIME_PDF: &str = "application/pdf";
pub const MIME_DOCX: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Maximum decompressed bytes to read from a DOCX ZIP entry (zip-bomb
/// protection).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

/// Extract plain text from `bytes` according to `format_hint`.
///
/// Recognized hints (case-insensitive): `pdf`, `docx`, `txt`, `md`,
/// `markdown`, and the equivalent MIME types.
pub fn extract_text(bytes: &[u8], format_hint: &str) -> Result<String, QaError> {
    match format_hint.to_ascii_lowercase().as_str() {
        "pdf" | MIME_PDF => extract_pdf(bytes),
        "docx" | MIME_DOCX => extract_docx(bytes),
        "txt" | "text/plain" | "md" | "markdown" | "text/markdown" => {
            Ok(String::from_utf8_lossy(bytes).into_owned())
        }
        other => Err(QaError::UnsupportedFormat(other.to_string())),
    }
}

fn extract_pdf(bytes: &[u8]) -> Result<String, QaError> {
    pdf_extract::extract_text_from_mem(bytes)
        .map_err(|e| QaError::ExternalCapability(format!("PDF extraction failed: {}", e)))
}

fn extract_docx(bytes: &[u8]) -> Result<String, QaError> {
    let ooxml_err = |e: String| QaError::ExternalCapability(format!("DOCX extraction failed: {}", e));

    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
        .map_err(|e| ooxml_err(e.to_string()))?;

    let mut doc_xml = Vec::new();
    let mut found = false;
    for i in 0..archive.len() {
        let entry = archive.by_index(i).map_err(|e| ooxml_err(e.to_string()))?;
        if entry.name() == "word/document.xml" {
            entry
                .take(MAX_XML_ENTRY_BYTES)
                .read_to_end(&mut doc_xml)
                .map_err(|e| ooxml_err(e.to_string()))?;
            if doc_xml.len() as u64 >= MAX_XML_ENTRY_BYTES {
                return Err(ooxml_err("word/document.xml exceeds size limit".to_string()));
            }
            found = true;
            break;
        }
    }
    if !found {
        return Err(ooxml_err("word/document.xml not found".to_string()));
    }

    extract_w_t_elements(&doc_xml).map_err(ooxml_err)
}

/// Collect the text of every `<w:t>` run in a WordprocessingML body.
fn extract_w_t_elements(xml: &[u8]) -> Result<String, String> {
    use quick_xml::events::Event;

    let mut out = String::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut in_text_run = false;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"t" => in_text_run = true,
            Ok(Event::End(e)) if e.local_name().as_ref() == b"t" => in_text_run = false,
            Ok(Event::Text(te)) if in_text_run => {
                out.push_str(te.unescape().unwrap_or_default().as_ref());
                out.push(' ');
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(e.to_string()),
            _ => {}
        }
        buf.clear();
    }
    Ok(out.trim_end().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unrecognized_hint_is_unsupported_format() {
        let err = extract_text(b"foo", "epub").unwrap_err();
        assert!(matches!(err, QaError::UnsupportedFormat(_)));
    }

    #[test]
    fn plain_text_passes_through() {
        let text = extract_text(b"hello world", "txt").unwrap();
        assert_eq!(text, "hello world");
    }

    #[test]
    fn markdown_passes_through() {
        let text = extract_text("# Title\n\nBody".as_bytes(), "md").unwrap();
        assert!(text.contains("# Title"));
    }

    #[test]
    fn hint_matching_is_case_insensitive() {
        assert!(extract_text(b"x", "TXT").is_ok());
        assert!(extract_text(b"x", "Md").is_ok());
    }

    #[test]
    fn mime_hints_are_accepted() {
        assert!(extract_text(b"x", "text/plain").is_ok());
        let err = extract_text(b"not a zip", MIME_DOCX).unwrap_err();
        assert!(matches!(err, QaError::ExternalCapability(_)));
    }

    fn docx_bytes(document_xml: &str) -> Vec<u8> {
        use std::io::Write;
        let mut cursor = std::io::Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut cursor);
            let options = zip::write::SimpleFileOptions::default();
            writer.start_file("word/document.xml", options).unwrap();
            writer.write_all(document_xml.as_bytes()).unwrap();
            writer.finish().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn docx_text_runs_are_extracted() {
        let xml = r#"<?xml version="1.0"?>
            <w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
              <w:body>
                <w:p><w:r><w:t>Hello</w:t></w:r><w:r><w:t>world</w:t></w:r></w:p>
              </w:body>
            </w:document>"#;
        let text = extract_text(&docx_bytes(xml), "docx").unwrap();
        assert_eq!(text, "Hello world");
    }

    #[test]
    fn docx_without_document_xml_fails() {
        use std::io::Write;
        let mut cursor = std::io::Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut cursor);
            let options = zip::write::SimpleFileOptions::default();
            writer.start_file("word/other.xml", options).unwrap();
            writer.write_all(b"<x/>").unwrap();
            writer.finish().unwrap();
        }
        let err = extract_text(&cursor.into_inner(), "docx").unwrap_err();
        assert!(matches!(err, QaError::ExternalCapability(_)));
    }

    #[test]
    fn invalid_pdf_bytes_fail() {
        let err = extract_text(b"not a pdf", "pdf").unwrap_err();
        assert!(matches!(err, QaError::ExternalCapability(_)));
    }
}
