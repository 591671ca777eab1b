//! Document extraction: plain text from uploaded resumes (PDF, DOCX, TXT).

pub mod handlers;

use std::io::{Cursor, Read, Seek};

use bytes::Bytes;
use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Unsupported file type: {0}")]
    Unsupported(String),

    #[error("Failed to parse PDF: {0}")]
    Pdf(String),

    #[error("Failed to parse DOCX: {0}")]
    Docx(String),

    #[error("Document worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Pdf,
    Docx,
    Txt,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedDocument {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_count: Option<usize>,
    pub file_name: String,
    pub file_type: DocumentKind,
}

/// Picks the extractor from the file extension (case-insensitive).
pub fn detect_kind(file_name: &str) -> Result<DocumentKind, ExtractError> {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "pdf" => Ok(DocumentKind::Pdf),
        "docx" | "doc" => Ok(DocumentKind::Docx),
        "txt" => Ok(DocumentKind::Txt),
        _ => Err(ExtractError::Unsupported(extension)),
    }
}

/// Extracts trimmed text. PDF and DOCX work runs on the blocking pool.
pub async fn extract_document(
    bytes: Bytes,
    file_name: &str,
) -> Result<ParsedDocument, ExtractError> {
    let kind = detect_kind(file_name)?;

    let (text, page_count) = match kind {
        DocumentKind::Txt => (String::from_utf8_lossy(&bytes).into_owned(), None),
        DocumentKind::Pdf => match tokio::task::spawn_blocking(move || extract_pdf(&bytes)).await {
            // pdf-extract panics on some malformed inputs
            Err(e) if e.is_panic() => return Err(ExtractError::Pdf("malformed document".into())),
            joined => joined??,
        },
        DocumentKind::Docx => {
            let text =
                tokio::task::spawn_blocking(move || extract_docx(Cursor::new(bytes))).await??;
            (text, None)
        }
    };

    Ok(ParsedDocument {
        text: text.trim().to_string(),
        page_count,
        file_name: file_name.to_string(),
        file_type: kind,
    })
}

fn extract_pdf(bytes: &[u8]) -> Result<(String, Option<usize>), ExtractError> {
    let text =
        pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))?;
    let page_count = lopdf::Document::load_mem(bytes)
        .ok()
        .map(|doc| doc.get_pages().len());
    Ok((text, page_count))
}

fn extract_docx<R: Read + Seek>(reader: R) -> Result<String, ExtractError> {
    let mut archive =
        zip::ZipArchive::new(reader).map_err(|e| ExtractError::Docx(e.to_string()))?;

    let mut document_xml = archive
        .by_name("word/document.xml")
        .map_err(|e| ExtractError::Docx(format!("missing document.xml: {e}")))?;

    let mut xml = String::new();
    document_xml
        .read_to_string(&mut xml)
        .map_err(|e| ExtractError::Docx(e.to_string()))?;

    docx_text(&xml)
}

/// Text runs (`w:t`) joined per paragraph (`w:p`), one paragraph per line.
fn docx_text(xml: &str) -> Result<String, ExtractError> {
    let mut reader = Reader::from_str(xml);

    let mut text = String::new();
    let mut in_text_run = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) if e.local_name().as_ref() == b"t" => in_text_run = true,
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"t" => in_text_run = false,
                b"p" => text.push('\n'),
                _ => {}
            },
            Ok(Event::Empty(ref e)) => match e.local_name().as_ref() {
                b"tab" => text.push('\t'),
                b"br" => text.push('\n'),
                _ => {}
            },
            Ok(Event::Text(e)) if in_text_run => {
                let decoded = e
                    .decode()
                    .map_err(|e| ExtractError::Docx(format!("XML decoding error: {e}")))?;
                text.push_str(&decoded);
            }
            // entity and character references arrive as their own events
            Ok(Event::GeneralRef(e)) if in_text_run => {
                let resolved = e
                    .resolve_char_ref()
                    .map_err(|e| ExtractError::Docx(format!("XML parsing error: {e}")))?;
                match resolved {
                    Some(ch) => text.push(ch),
                    None => {
                        let name = e
                            .decode()
                            .map_err(|e| ExtractError::Docx(format!("XML decoding error: {e}")))?;
                        match resolve_predefined_entity(&name) {
                            Some(value) => text.push_str(value),
                            None => {
                                return Err(ExtractError::Docx(format!(
                                    "unknown entity reference &{name};"
                                )))
                            }
                        }
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ExtractError::Docx(format!("XML parsing error: {e}"))),
            _ => {}
        }
    }

    Ok(text)
}
