//! Session pipeline orchestration.
//!
//! Handlers stay thin; this module owns lock discipline (write lock for
//! anything that can mutate `stage`/`stage_results`, read lock for status)
//! and the wiring between ingestion, storage, generation and the state
//! machine.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::ingest::{self, ResumeSource};
use crate::state::AppState;

use super::machine;
use super::models::{CodeChallenge, McqQuestion, Session, Stage, StageResults};
use super::timer;

/// Folder segment for stored resume artifacts.
const RESUME_FOLDER: &str = "resumes";

/// Default TTL for signed resume-artifact URLs.
const DEFAULT_SIGNED_URL_TTL_SECS: u64 = 300;

#[derive(Debug, Serialize)]
pub struct StartSessionResponse {
    pub session_id: Uuid,
    pub stage: Stage,
    pub resume_artifact: Option<crate::storage::StorageObject>,
}

#[derive(Debug, Serialize)]
pub struct StageResponse {
    pub session_id: Uuid,
    pub stage: Stage,
}

#[derive(Debug, Serialize)]
pub struct McqSetResponse {
    pub session_id: Uuid,
    pub questions: Vec<McqQuestion>,
}

#[derive(Debug, Serialize)]
pub struct CodeChallengeResponse {
    pub session_id: Uuid,
    pub challenge: CodeChallenge,
    pub deadline: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct McqSummary {
    pub submitted_at: DateTime<Utc>,
    pub answer_count: usize,
}

#[derive(Debug, Serialize)]
pub struct CodeSummary {
    pub submitted_at: DateTime<Utc>,
    pub forced: bool,
}

#[derive(Debug, Serialize)]
pub struct VoiceSummary {
    pub linked_at: DateTime<Utc>,
}

/// Per-stage completion markers without the submitted payloads.
#[derive(Debug, Serialize)]
pub struct ResultsSummary {
    pub mcq: Option<McqSummary>,
    pub code: Option<CodeSummary>,
    pub voice: Option<VoiceSummary>,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub session_id: Uuid,
    pub candidate_name: String,
    pub job_title: String,
    pub stage: Stage,
    pub created_at: DateTime<Utc>,
    pub stage_deadlines: BTreeMap<Stage, DateTime<Utc>>,
    pub resume_artifact: Option<crate::storage::StorageObject>,
    pub results: ResultsSummary,
}

/// Full payloads, handed to the external certificate/scoring component.
#[derive(Debug, Serialize)]
pub struct ResultsResponse {
    pub session_id: Uuid,
    pub candidate_name: String,
    pub job_title: String,
    pub stage: Stage,
    pub completed_at: Option<DateTime<Utc>>,
    pub stage_results: StageResults,
}

#[derive(Debug, Serialize)]
pub struct SignedUrlResponse {
    pub url: String,
    pub expires_in_secs: u64,
}

pub async fn start_session(
    state: &AppState,
    candidate_name: String,
    job_title: String,
    source: Option<ResumeSource>,
) -> Result<StartSessionResponse, AppError> {
    let candidate_name = candidate_name.trim().to_string();
    let job_title = job_title.trim().to_string();
    if candidate_name.is_empty() {
        return Err(AppError::Validation("candidate_name is required".into()));
    }
    if job_title.is_empty() {
        return Err(AppError::Validation("job_title is required".into()));
    }
    let Some(source) = source else {
        return Err(AppError::Validation(
            "either a resume file or resume_text must be provided".into(),
        ));
    };

    // Extraction runs before any storage I/O so validation failures never
    // leave an orphaned artifact, and a failed upload aborts session
    // creation entirely (retrying is safe; every attempt gets a new key).
    let (resume_text, resume_artifact) = match source {
        ResumeSource::Pasted(text) => (
            ingest::extract_resume_text(ResumeSource::Pasted(text)).await?,
            None,
        ),
        ResumeSource::Upload {
            bytes,
            content_type,
            filename,
        } => {
            let text = ingest::extract_resume_text(ResumeSource::Upload {
                bytes: bytes.clone(),
                content_type: content_type.clone(),
                filename: filename.clone(),
            })
            .await?;
            let artifact = state
                .storage
                .upload(bytes, &content_type, &filename, RESUME_FOLDER)
                .await?;
            (text, Some(artifact))
        }
    };

    let mut session = Session::new(candidate_name, job_title, resume_text, resume_artifact);
    machine::activate(&mut session)?;
    let session_id = session.session_id;
    let stage = session.stage;
    let resume_artifact = session.resume_artifact.clone();
    state.sessions.insert(session).await;

    info!("Session {session_id} started (stage: {stage})");
    Ok(StartSessionResponse {
        session_id,
        stage,
        resume_artifact,
    })
}

pub async fn get_status(state: &AppState, session_id: Uuid) -> Result<StatusResponse, AppError> {
    let slot = state.sessions.get(session_id).await?;
    let session = slot.read().await;
    Ok(StatusResponse {
        session_id: session.session_id,
        candidate_name: session.candidate_name.clone(),
        job_title: session.job_title.clone(),
        stage: session.stage,
        created_at: session.created_at,
        stage_deadlines: session.stage_deadlines.clone(),
        resume_artifact: session.resume_artifact.clone(),
        results: ResultsSummary {
            mcq: session.stage_results.mcq.as_ref().map(|r| McqSummary {
                submitted_at: r.submitted_at,
                answer_count: r.answers.len(),
            }),
            code: session.stage_results.code.as_ref().map(|r| CodeSummary {
                submitted_at: r.submitted_at,
                forced: r.forced,
            }),
            voice: session.stage_results.voice.as_ref().map(|r| VoiceSummary {
                linked_at: r.linked_at,
            }),
        },
    })
}

pub async fn generate_mcq(state: &AppState, session_id: Uuid) -> Result<McqSetResponse, AppError> {
    let slot = state.sessions.get(session_id).await?;
    // The write lock is held across generation: a concurrent retry blocks
    // here, then finds the stored set, so a question set is generated at
    // most once per stage.
    let mut session = slot.write().await;
    machine::ensure_generate_allowed(&session, Stage::AwaitingMcq, "generate MCQ questions")?;

    if let Some(existing) = &session.mcq_questions {
        return Ok(McqSetResponse {
            session_id,
            questions: existing.clone(),
        });
    }

    let questions = state
        .generator
        .mcq_set(&session.resume_text, &session.job_title)
        .await?;
    session.mcq_questions = Some(questions.clone());
    info!("Session {session_id}: generated {} MCQ questions", questions.len());
    Ok(McqSetResponse {
        session_id,
        questions,
    })
}

pub async fn submit_mcq(
    state: &AppState,
    session_id: Uuid,
    answers: BTreeMap<String, String>,
) -> Result<StageResponse, AppError> {
    let slot = state.sessions.get(session_id).await?;
    let mut session = slot.write().await;
    machine::record_mcq(&mut session, answers, Utc::now())?;
    info!("Session {session_id}: MCQ submitted (stage: {})", session.stage);
    Ok(StageResponse {
        session_id,
        stage: session.stage,
    })
}

pub async fn generate_code(
    state: &AppState,
    session_id: Uuid,
) -> Result<CodeChallengeResponse, AppError> {
    let slot = state.sessions.get(session_id).await?;

    let (challenge, deadline, newly_generated) = {
        let mut session = slot.write().await;
        machine::ensure_generate_allowed(
            &session,
            Stage::AwaitingCode,
            "generate the code challenge",
        )?;

        let existing = session
            .code_challenge
            .clone()
            .zip(session.stage_deadlines.get(&Stage::AwaitingCode).copied());
        match existing {
            Some((challenge, deadline)) => (challenge, deadline, false),
            None => {
                let challenge = state
                    .generator
                    .code_challenge(&session.resume_text, &session.job_title)
                    .await?;
                let deadline =
                    Utc::now() + chrono::Duration::seconds(state.config.code_stage_seconds as i64);
                session.code_challenge = Some(challenge.clone());
                session.stage_deadlines.insert(Stage::AwaitingCode, deadline);
                (challenge, deadline, true)
            }
        }
    };

    // The countdown is armed only on first generation, outside the lock.
    if newly_generated {
        timer::spawn_code_countdown(state.sessions.clone(), session_id, deadline);
        info!("Session {session_id}: code challenge generated, deadline {deadline}");
    }

    Ok(CodeChallengeResponse {
        session_id,
        challenge,
        deadline,
    })
}

pub async fn save_code_draft(
    state: &AppState,
    session_id: Uuid,
    draft: String,
) -> Result<StageResponse, AppError> {
    let slot = state.sessions.get(session_id).await?;
    let mut session = slot.write().await;
    machine::save_code_draft(&mut session, draft)?;
    Ok(StageResponse {
        session_id,
        stage: session.stage,
    })
}

pub async fn submit_code(
    state: &AppState,
    session_id: Uuid,
    solution: String,
) -> Result<StageResponse, AppError> {
    let slot = state.sessions.get(session_id).await?;
    let stage = {
        let mut session = slot.write().await;
        machine::record_code_submission(&mut session, solution, Utc::now())?;
        session.stage
    };
    // Submission won the race; the countdown must never fire.
    state.sessions.disarm_timer(session_id);
    info!("Session {session_id}: code submitted (stage: {stage})");
    Ok(StageResponse { session_id, stage })
}

pub async fn link_voice(
    state: &AppState,
    session_id: Uuid,
    voice_session_ref: String,
) -> Result<StageResponse, AppError> {
    let voice_session_ref = voice_session_ref.trim().to_string();
    if voice_session_ref.is_empty() {
        return Err(AppError::Validation("voice_session_ref is required".into()));
    }
    let slot = state.sessions.get(session_id).await?;
    let mut session = slot.write().await;
    machine::record_voice_link(&mut session, voice_session_ref, Utc::now())?;
    Ok(StageResponse {
        session_id,
        stage: session.stage,
    })
}

pub async fn complete_session(
    state: &AppState,
    session_id: Uuid,
) -> Result<ResultsResponse, AppError> {
    let slot = state.sessions.get(session_id).await?;
    let mut session = slot.write().await;
    machine::complete(&mut session, Utc::now())?;
    info!("Session {session_id} completed");
    Ok(ResultsResponse {
        session_id,
        candidate_name: session.candidate_name.clone(),
        job_title: session.job_title.clone(),
        stage: session.stage,
        completed_at: session.completed_at,
        stage_results: session.stage_results.clone(),
    })
}

pub async fn resume_artifact_url(
    state: &AppState,
    session_id: Uuid,
    ttl_secs: Option<u64>,
) -> Result<SignedUrlResponse, AppError> {
    let key = {
        let slot = state.sessions.get(session_id).await?;
        let session = slot.read().await;
        session
            .resume_artifact
            .as_ref()
            .map(|artifact| artifact.key.clone())
            .ok_or_else(|| {
                AppError::Validation("session has no stored resume artifact".into())
            })?
    };
    let ttl_secs = ttl_secs.unwrap_or(DEFAULT_SIGNED_URL_TTL_SECS);
    let url = state
        .storage
        .signed_url(&key, Duration::from_secs(ttl_secs))
        .await?;
    Ok(SignedUrlResponse {
        url,
        expires_in_secs: ttl_secs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::questions::KeywordQuestionGenerator;
    use crate::storage::{StorageError, StorageRouter};
    use bytes::Bytes;
    use std::sync::Arc;

    async fn test_state(dir: &tempfile::TempDir) -> AppState {
        let config = Config {
            gcs: None,
            s3: None,
            upload_dir: dir.path().to_path_buf(),
            public_base_url: "http://localhost:8080".to_string(),
            code_stage_seconds: 1800,
            anthropic_api_key: None,
            port: 8080,
            rust_log: "info".to_string(),
        };
        AppState {
            storage: Arc::new(StorageRouter::from_config(&config).await),
            sessions: Arc::new(crate::assessment::store::SessionStore::new()),
            generator: Arc::new(KeywordQuestionGenerator),
            config,
        }
    }

    fn pasted(text: &str) -> Option<ResumeSource> {
        Some(ResumeSource::Pasted(text.to_string()))
    }

    async fn started(state: &AppState) -> Uuid {
        start_session(
            state,
            "Jane Doe".to_string(),
            "Backend Engineer".to_string(),
            pasted("5 years Go, distributed systems"),
        )
        .await
        .unwrap()
        .session_id
    }

    fn answers() -> BTreeMap<String, String> {
        BTreeMap::from([("q1".to_string(), "Option A".to_string())])
    }

    #[tokio::test]
    async fn test_start_with_pasted_text_enters_awaiting_mcq() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir).await;

        let response = start_session(
            &state,
            "Jane Doe".to_string(),
            "Backend Engineer".to_string(),
            pasted("5 years Go, distributed systems"),
        )
        .await
        .unwrap();

        assert_eq!(response.stage, Stage::AwaitingMcq);
        assert!(response.resume_artifact.is_none());

        let status = get_status(&state, response.session_id).await.unwrap();
        assert_eq!(status.stage, Stage::AwaitingMcq);
        assert_eq!(status.candidate_name, "Jane Doe");
        assert!(status.results.mcq.is_none());
    }

    #[tokio::test]
    async fn test_start_requires_name_title_and_resume() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir).await;

        let err = start_session(&state, "".into(), "Engineer".into(), pasted("resume"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = start_session(&state, "Jane".into(), "  ".into(), pasted("resume"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = start_session(&state, "Jane".into(), "Engineer".into(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_start_with_upload_stores_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir).await;

        let response = start_session(
            &state,
            "Jane Doe".to_string(),
            "Backend Engineer".to_string(),
            Some(ResumeSource::Upload {
                bytes: Bytes::from_static(b"Five years of Go and Postgres"),
                content_type: "text/plain".to_string(),
                filename: "resume".to_string(),
            }),
        )
        .await
        .unwrap();

        let artifact = response.resume_artifact.expect("artifact stored");
        assert!(artifact.key.starts_with("resumes/"));
        assert!(artifact.key.ends_with(".bin"));
        assert_eq!(artifact.provider, "local");
    }

    #[tokio::test]
    async fn test_empty_resume_never_creates_a_session() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir).await;

        let err = start_session(
            &state,
            "Jane Doe".to_string(),
            "Backend Engineer".to_string(),
            pasted("   \n  "),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::EmptyDocument));
    }

    #[tokio::test]
    async fn test_generate_mcq_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir).await;
        let id = started(&state).await;

        let first = generate_mcq(&state, id).await.unwrap();
        let second = generate_mcq(&state, id).await.unwrap();
        assert_eq!(first.questions, second.questions);
        assert!(!first.questions.is_empty());
    }

    #[tokio::test]
    async fn test_submit_code_out_of_order_is_invalid_transition() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir).await;
        let id = started(&state).await;

        let err = submit_code(&state, id, "fn main() {}".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidStageTransition { .. }));
        assert_eq!(get_status(&state, id).await.unwrap().stage, Stage::AwaitingMcq);
    }

    #[tokio::test]
    async fn test_full_pipeline_reaches_completed() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir).await;
        let id = started(&state).await;

        generate_mcq(&state, id).await.unwrap();
        assert_eq!(
            submit_mcq(&state, id, answers()).await.unwrap().stage,
            Stage::AwaitingCode
        );

        let code = generate_code(&state, id).await.unwrap();
        assert!(code.deadline > Utc::now());

        save_code_draft(&state, id, "partial".to_string()).await.unwrap();
        assert_eq!(
            submit_code(&state, id, "fn main() {}".to_string())
                .await
                .unwrap()
                .stage,
            Stage::AwaitingVoice
        );

        link_voice(&state, id, "voice-abc".to_string()).await.unwrap();
        let results = complete_session(&state, id).await.unwrap();
        assert_eq!(results.stage, Stage::Completed);
        assert!(results.completed_at.is_some());
        let code_result = results.stage_results.code.unwrap();
        assert!(!code_result.forced);
        assert_eq!(code_result.solution, "fn main() {}");
    }

    #[tokio::test]
    async fn test_generate_code_is_idempotent_and_keeps_deadline() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir).await;
        let id = started(&state).await;

        generate_mcq(&state, id).await.unwrap();
        submit_mcq(&state, id, answers()).await.unwrap();

        let first = generate_code(&state, id).await.unwrap();
        let second = generate_code(&state, id).await.unwrap();
        assert_eq!(first.challenge, second.challenge);
        assert_eq!(first.deadline, second.deadline);
    }

    #[tokio::test]
    async fn test_double_code_submit_keeps_first_solution() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir).await;
        let id = started(&state).await;

        generate_mcq(&state, id).await.unwrap();
        submit_mcq(&state, id, answers()).await.unwrap();
        generate_code(&state, id).await.unwrap();
        submit_code(&state, id, "first".to_string()).await.unwrap();

        let err = submit_code(&state, id, "second".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::StageAlreadyCompleted { stage: "code" }));

        link_voice(&state, id, "voice-abc".to_string()).await.unwrap();
        let results = complete_session(&state, id).await.unwrap();
        assert_eq!(results.stage_results.code.unwrap().solution, "first");
    }

    #[tokio::test]
    async fn test_status_of_unknown_session_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir).await;
        let err = get_status(&state, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::SessionNotFound(_)));
    }

    #[tokio::test]
    async fn test_signed_url_without_artifact_is_validation_error() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir).await;
        let id = started(&state).await;

        let err = resume_artifact_url(&state, id, None).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_signed_url_on_local_provider_is_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir).await;

        let response = start_session(
            &state,
            "Jane Doe".to_string(),
            "Backend Engineer".to_string(),
            Some(ResumeSource::Upload {
                bytes: Bytes::from_static(b"Five years of Go"),
                content_type: "text/plain".to_string(),
                filename: "resume.txt".to_string(),
            }),
        )
        .await
        .unwrap();

        let err = resume_artifact_url(&state, response.session_id, Some(60))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Storage(StorageError::SigningUnsupported("local"))
        ));
    }
}
