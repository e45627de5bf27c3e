use anyhow::anyhow;
use bytes::Bytes;

use crate::errors::AppError;

/// Extracts plain text from a PDF document.
///
/// `pdf-extract` is CPU-bound, so the work runs on the blocking pool rather
/// than a runtime worker.
pub(crate) async fn extract_text(bytes: Bytes) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
        .await
        .map_err(|e| AppError::Internal(anyhow!("PDF extraction task failed: {e}")))?
        .map_err(|e| AppError::ExtractionFailed(format!("could not read PDF: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_garbage_bytes_fail_extraction() {
        let err = extract_text(Bytes::from_static(b"not a pdf at all"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ExtractionFailed(_)));
    }
}
