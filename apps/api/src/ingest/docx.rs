use std::io::{Cursor, Read};

use anyhow::anyhow;
use bytes::Bytes;
use quick_xml::events::Event;
use quick_xml::Reader;

use crate::errors::AppError;

/// Extracts plain text from a DOCX document.
///
/// A DOCX file is a zip container; the visible text lives in `<w:t>` runs
/// inside `word/document.xml`. Paragraph boundaries become newlines so the
/// extracted text keeps its rough shape.
pub(crate) async fn extract_text(bytes: Bytes) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || extract_sync(&bytes))
        .await
        .map_err(|e| AppError::Internal(anyhow!("DOCX extraction task failed: {e}")))?
        .map_err(AppError::ExtractionFailed)
}

fn extract_sync(bytes: &[u8]) -> Result<String, String> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| format!("not a valid DOCX container: {e}"))?;
    let mut document = archive
        .by_name("word/document.xml")
        .map_err(|e| format!("document body missing: {e}"))?;
    let mut xml = String::new();
    document
        .read_to_string(&mut xml)
        .map_err(|e| format!("document body unreadable: {e}"))?;

    text_from_document_xml(&xml)
}

fn text_from_document_xml(xml: &str) -> Result<String, String> {
    let mut reader = Reader::from_str(xml);
    let mut out = String::new();
    let mut in_text_run = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"t" => in_text_run = true,
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text_run = false,
                b"p" => out.push('\n'),
                _ => {}
            },
            Ok(Event::Text(t)) if in_text_run => {
                let run = t
                    .unescape()
                    .map_err(|e| format!("malformed document XML: {e}"))?;
                out.push_str(&run);
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(format!("malformed document XML: {e}")),
        }
    }

    Ok(out)
}
