use std::collections::BTreeMap;

use axum::{
    extract::{Multipart, Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::ingest::ResumeSource;
use crate::state::AppState;

use super::service::{
    self, CodeChallengeResponse, McqSetResponse, ResultsResponse, SignedUrlResponse,
    StageResponse, StartSessionResponse, StatusResponse,
};

fn multipart_error(e: axum::extract::multipart::MultipartError) -> AppError {
    AppError::Validation(format!("invalid multipart body: {e}"))
}

/// POST /api/v1/sessions
///
/// Multipart form: `candidate_name`, `job_title`, and either a `resume`
/// file part or a `resume_text` field. A file wins when both are present.
pub async fn handle_start_session(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<StartSessionResponse>, AppError> {
    let mut candidate_name = String::new();
    let mut job_title = String::new();
    let mut resume_text: Option<String> = None;
    let mut resume_file: Option<ResumeSource> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "candidate_name" => candidate_name = field.text().await.map_err(multipart_error)?,
            "job_title" => job_title = field.text().await.map_err(multipart_error)?,
            "resume_text" => resume_text = Some(field.text().await.map_err(multipart_error)?),
            "resume" => {
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let filename = field.file_name().unwrap_or("resume").to_string();
                let bytes = field.bytes().await.map_err(multipart_error)?;
                resume_file = Some(ResumeSource::Upload {
                    bytes,
                    content_type,
                    filename,
                });
            }
            _ => {}
        }
    }

    let source = resume_file.or(resume_text
        .filter(|t| !t.trim().is_empty())
        .map(ResumeSource::Pasted));
    let response = service::start_session(&state, candidate_name, job_title, source).await?;
    Ok(Json(response))
}

/// GET /api/v1/sessions/:id
pub async fn handle_get_status(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<StatusResponse>, AppError> {
    Ok(Json(service::get_status(&state, session_id).await?))
}

/// POST /api/v1/sessions/:id/mcq/generate
pub async fn handle_generate_mcq(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<McqSetResponse>, AppError> {
    Ok(Json(service::generate_mcq(&state, session_id).await?))
}

#[derive(Deserialize)]
pub struct SubmitMcqRequest {
    pub answers: BTreeMap<String, String>,
}

/// POST /api/v1/sessions/:id/mcq/submit
pub async fn handle_submit_mcq(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(req): Json<SubmitMcqRequest>,
) -> Result<Json<StageResponse>, AppError> {
    Ok(Json(
        service::submit_mcq(&state, session_id, req.answers).await?,
    ))
}

/// POST /api/v1/sessions/:id/code/generate
pub async fn handle_generate_code(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<CodeChallengeResponse>, AppError> {
    Ok(Json(service::generate_code(&state, session_id).await?))
}

#[derive(Deserialize)]
pub struct SaveDraftRequest {
    pub draft: String,
}

/// PATCH /api/v1/sessions/:id/code/draft
pub async fn handle_save_code_draft(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(req): Json<SaveDraftRequest>,
) -> Result<Json<StageResponse>, AppError> {
    Ok(Json(
        service::save_code_draft(&state, session_id, req.draft).await?,
    ))
}

#[derive(Deserialize)]
pub struct SubmitCodeRequest {
    pub solution: String,
}

/// POST /api/v1/sessions/:id/code/submit
pub async fn handle_submit_code(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(req): Json<SubmitCodeRequest>,
) -> Result<Json<StageResponse>, AppError> {
    Ok(Json(
        service::submit_code(&state, session_id, req.solution).await?,
    ))
}

#[derive(Deserialize)]
pub struct LinkVoiceRequest {
    pub voice_session_ref: String,
}

/// POST /api/v1/sessions/:id/voice/link
pub async fn handle_link_voice(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(req): Json<LinkVoiceRequest>,
) -> Result<Json<StageResponse>, AppError> {
    Ok(Json(
        service::link_voice(&state, session_id, req.voice_session_ref).await?,
    ))
}

/// POST /api/v1/sessions/:id/complete
pub async fn handle_complete(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<ResultsResponse>, AppError> {
    Ok(Json(service::complete_session(&state, session_id).await?))
}

#[derive(Deserialize)]
pub struct SignedUrlQuery {
    pub ttl_secs: Option<u64>,
}

/// GET /api/v1/sessions/:id/resume/url
pub async fn handle_resume_url(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Query(query): Query<SignedUrlQuery>,
) -> Result<Json<SignedUrlResponse>, AppError> {
    Ok(Json(
        service::resume_artifact_url(&state, session_id, query.ttl_secs).await?,
    ))
}
