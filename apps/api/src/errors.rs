use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::assessment::models::Stage;
use crate::storage::StorageError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
///
/// Ordering errors (`InvalidStageTransition`, `StageAlreadyCompleted`) are
/// deliberately distinct from validation errors: the former mean the call was
/// well-formed but arrived at the wrong point in the pipeline.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("Document contained no extractable text")]
    EmptyDocument,

    #[error("Text extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("Session {0} not found")]
    SessionNotFound(Uuid),

    #[error("Cannot {operation} while the session is in the {current} stage")]
    InvalidStageTransition {
        operation: &'static str,
        current: Stage,
    },

    #[error("The {stage} stage already has a recorded result")]
    StageAlreadyCompleted { stage: &'static str },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Question generation failed: {0}")]
    Generation(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::UnsupportedFileType(msg) => (
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                "UNSUPPORTED_FILE_TYPE",
                msg.clone(),
            ),
            AppError::EmptyDocument => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "EMPTY_DOCUMENT",
                self.to_string(),
            ),
            AppError::ExtractionFailed(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "EXTRACTION_FAILED",
                msg.clone(),
            ),
            AppError::SessionNotFound(_) => {
                (StatusCode::NOT_FOUND, "SESSION_NOT_FOUND", self.to_string())
            }
            AppError::InvalidStageTransition { .. } => (
                StatusCode::CONFLICT,
                "INVALID_STAGE_TRANSITION",
                self.to_string(),
            ),
            AppError::StageAlreadyCompleted { .. } => (
                StatusCode::CONFLICT,
                "STAGE_ALREADY_COMPLETED",
                self.to_string(),
            ),
            AppError::Storage(err) => {
                let (status, code) = match err {
                    StorageError::Upload(_) => (StatusCode::BAD_GATEWAY, "UPLOAD_FAILED"),
                    StorageError::Delete(_) => (StatusCode::BAD_GATEWAY, "DELETE_FAILED"),
                    StorageError::Sign(_) => (StatusCode::BAD_GATEWAY, "SIGNING_FAILED"),
                    StorageError::SigningUnsupported(_) => {
                        (StatusCode::BAD_REQUEST, "SIGNING_UNSUPPORTED")
                    }
                    StorageError::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, "STORAGE_TIMEOUT"),
                };
                if status.is_server_error() {
                    tracing::error!("Storage error: {err}");
                }
                (status, code, err.to_string())
            }
            AppError::Generation(msg) => {
                tracing::error!("Generation error: {msg}");
                (
                    StatusCode::BAD_GATEWAY,
                    "GENERATION_ERROR",
                    "Question generation failed".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
