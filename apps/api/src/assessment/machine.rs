//! Session state machine.
//!
//! Canonical order: `created → awaiting_mcq → awaiting_code →
//! awaiting_voice → completed`. Every transition here is a pure function
//! over `&mut Session`; callers hold the session's write lock, so at-most-
//! once stage completion is a property of these checks, not of timer
//! bookkeeping.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::errors::AppError;

use super::models::{CodeResult, McqResult, Session, Stage, VoiceResult};

/// Moves a freshly created session into the pipeline. Only valid once,
/// immediately after ingestion succeeds.
pub fn activate(session: &mut Session) -> Result<(), AppError> {
    if session.stage != Stage::Created {
        return Err(AppError::InvalidStageTransition {
            operation: "activate the session",
            current: session.stage,
        });
    }
    session.stage = Stage::AwaitingMcq;
    Ok(())
}

/// Stage check for submit-style calls.
///
/// A call for a stage the session has already moved past is a duplicate
/// completion attempt; a call for a stage not yet reached is an ordering
/// violation. Both leave the session unchanged.
fn ensure_submittable(
    session: &Session,
    expected: Stage,
    stage_name: &'static str,
    operation: &'static str,
) -> Result<(), AppError> {
    if session.stage == expected {
        Ok(())
    } else if session.stage > expected {
        Err(AppError::StageAlreadyCompleted { stage: stage_name })
    } else {
        Err(AppError::InvalidStageTransition {
            operation,
            current: session.stage,
        })
    }
}

/// Stage check for generate-style calls: valid only while in the stage.
pub fn ensure_generate_allowed(
    session: &Session,
    expected: Stage,
    operation: &'static str,
) -> Result<(), AppError> {
    if session.stage == expected {
        Ok(())
    } else {
        Err(AppError::InvalidStageTransition {
            operation,
            current: session.stage,
        })
    }
}

/// Records the MCQ submission and advances to the coding stage.
/// Write-once: a second submission is rejected, never overwritten.
pub fn record_mcq(
    session: &mut Session,
    answers: BTreeMap<String, String>,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    ensure_submittable(session, Stage::AwaitingMcq, "mcq", "submit MCQ answers")?;
    session.stage_results.mcq = Some(McqResult {
        answers,
        submitted_at: now,
    });
    session.stage = Stage::AwaitingCode;
    Ok(())
}

/// Records a client-initiated code submission and advances to the voice
/// stage. Loses the race against a forced expiry that already fired: the
/// session is then past `awaiting_code` and the call is rejected.
pub fn record_code_submission(
    session: &mut Session,
    solution: String,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    ensure_submittable(session, Stage::AwaitingCode, "code", "submit a code solution")?;
    session.stage_results.code = Some(CodeResult {
        solution,
        forced: false,
        submitted_at: now,
    });
    session.stage = Stage::AwaitingVoice;
    Ok(())
}

/// The forced-submission path invoked by the countdown on expiry.
///
/// Submits whatever draft the client last saved (empty if none) and
/// advances the stage. Returns `false` as a no-op when the client already
/// submitted; firing after a client submission is a normal outcome of the
/// race, not an error.
pub fn force_expire_code(session: &mut Session, now: DateTime<Utc>) -> bool {
    if session.stage != Stage::AwaitingCode {
        return false;
    }
    session.stage_results.code = Some(CodeResult {
        solution: session.code_draft.clone(),
        forced: true,
        submitted_at: now,
    });
    session.stage = Stage::AwaitingVoice;
    true
}

/// Records the partial answer the forced path would submit on expiry.
pub fn save_code_draft(session: &mut Session, draft: String) -> Result<(), AppError> {
    if session.stage != Stage::AwaitingCode {
        return Err(AppError::InvalidStageTransition {
            operation: "save a code draft",
            current: session.stage,
        });
    }
    session.code_draft = draft;
    Ok(())
}

/// Attaches the external voice-interview reference. Does not advance the
/// stage; an explicit complete call is still required.
pub fn record_voice_link(
    session: &mut Session,
    voice_session_ref: String,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    ensure_submittable(
        session,
        Stage::AwaitingVoice,
        "voice",
        "link a voice interview",
    )?;
    if session.stage_results.voice.is_some() {
        return Err(AppError::StageAlreadyCompleted { stage: "voice" });
    }
    session.stage_results.voice = Some(VoiceResult {
        voice_session_ref,
        linked_at: now,
    });
    Ok(())
}

/// Terminal transition. Requires the voice interview to be linked first.
pub fn complete(session: &mut Session, now: DateTime<Utc>) -> Result<(), AppError> {
    ensure_submittable(
        session,
        Stage::AwaitingVoice,
        "completion",
        "complete the session",
    )?;
    if session.stage_results.voice.is_none() {
        return Err(AppError::InvalidStageTransition {
            operation: "complete the session before linking a voice interview",
            current: session.stage,
        });
    }
    session.stage = Stage::Completed;
    session.completed_at = Some(now);
    Ok(())
}
