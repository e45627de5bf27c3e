//! Resume ingestion — turns an uploaded document or pasted text into the
//! normalized plain text every downstream question generator consumes.
//!
//! Dispatch is by declared MIME type, with the filename extension as a
//! fallback for generic `application/octet-stream` uploads. Unsupported
//! types fail before any extraction is attempted, and an empty document is
//! terminal for session creation.

mod docx;
mod pdf;

use bytes::Bytes;

use crate::errors::AppError;

const PDF_MIME: &str = "application/pdf";
const DOCX_MIME: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
const TEXT_MIME: &str = "text/plain";

/// The two resume forms a candidate can provide at session start.
#[derive(Debug, Clone)]
pub enum ResumeSource {
    Upload {
        bytes: Bytes,
        content_type: String,
        filename: String,
    },
    Pasted(String),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum DocumentKind {
    Pdf,
    Docx,
    PlainText,
}

/// Produces trimmed plain text from a resume source, or fails with the
/// terminal ingestion conditions (`unsupported_file_type`,
/// `extraction_failed`, `empty_document`).
pub async fn extract_resume_text(source: ResumeSource) -> Result<String, AppError> {
    let text = match source {
        ResumeSource::Pasted(text) => text,
        ResumeSource::Upload {
            bytes,
            content_type,
            filename,
        } => match detect_kind(&content_type, &filename)? {
            DocumentKind::Pdf => pdf::extract_text(bytes).await?,
            DocumentKind::Docx => docx::extract_text(bytes).await?,
            DocumentKind::PlainText => String::from_utf8(bytes.to_vec())
                .map_err(|_| AppError::ExtractionFailed("file is not valid UTF-8 text".into()))?,
        },
    };

    let text = text.trim();
    if text.is_empty() {
        return Err(AppError::EmptyDocument);
    }
    Ok(text.to_string())
}

fn detect_kind(content_type: &str, filename: &str) -> Result<DocumentKind, AppError> {
    // MIME parameters (charset etc.) are irrelevant for dispatch.
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    match mime.as_str() {
        PDF_MIME => return Ok(DocumentKind::Pdf),
        DOCX_MIME => return Ok(DocumentKind::Docx),
        TEXT_MIME => return Ok(DocumentKind::PlainText),
        "" | "application/octet-stream" => {}
        other => {
            return Err(AppError::UnsupportedFileType(format!(
                "cannot extract text from '{other}'"
            )))
        }
    }

    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "pdf" => Ok(DocumentKind::Pdf),
        "docx" => Ok(DocumentKind::Docx),
        "txt" => Ok(DocumentKind::PlainText),
        _ => Err(AppError::UnsupportedFileType(format!(
            "cannot determine a supported document type for '{filename}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_by_mime() {
        assert_eq!(detect_kind(PDF_MIME, "whatever").unwrap(), DocumentKind::Pdf);
        assert_eq!(detect_kind(DOCX_MIME, "whatever").unwrap(), DocumentKind::Docx);
        assert_eq!(
            detect_kind("text/plain; charset=utf-8", "whatever").unwrap(),
            DocumentKind::PlainText
        );
    }

    #[test]
    fn test_detect_falls_back_to_extension_for_octet_stream() {
        assert_eq!(
            detect_kind("application/octet-stream", "resume.PDF").unwrap(),
            DocumentKind::Pdf
        );
        assert_eq!(
            detect_kind("", "resume.docx").unwrap(),
            DocumentKind::Docx
        );
    }

    #[test]
    fn test_unsupported_mime_fails_fast() {
        let err = detect_kind("image/png", "resume.png").unwrap_err();
        assert!(matches!(err, AppError::UnsupportedFileType(_)));
    }

    #[test]
    fn test_unknown_extension_fails() {
        let err = detect_kind("application/octet-stream", "resume.xyz").unwrap_err();
        assert!(matches!(err, AppError::UnsupportedFileType(_)));
    }

    #[tokio::test]
    async fn test_pasted_text_is_trimmed() {
        let text = extract_resume_text(ResumeSource::Pasted(
            "  5 years Go, distributed systems\n".to_string(),
        ))
        .await
        .unwrap();
        assert_eq!(text, "5 years Go, distributed systems");
    }

    #[tokio::test]
    async fn test_whitespace_only_paste_is_empty_document() {
        let err = extract_resume_text(ResumeSource::Pasted("   \n\t ".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::EmptyDocument));
    }

    #[tokio::test]
    async fn test_plain_text_upload_round_trips() {
        let text = extract_resume_text(ResumeSource::Upload {
            bytes: Bytes::from_static(b"Backend engineer, Rust and Postgres"),
            content_type: "text/plain".to_string(),
            filename: "resume.txt".to_string(),
        })
        .await
        .unwrap();
        assert_eq!(text, "Backend engineer, Rust and Postgres");
    }

    #[tokio::test]
    async fn test_invalid_utf8_text_upload_fails_extraction() {
        let err = extract_resume_text(ResumeSource::Upload {
            bytes: Bytes::from_static(&[0xff, 0xfe, 0x00]),
            content_type: "text/plain".to_string(),
            filename: "resume.txt".to_string(),
        })
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::ExtractionFailed(_)));
    }
}
