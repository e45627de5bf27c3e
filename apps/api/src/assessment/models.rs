use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::storage::StorageObject;

/// Pipeline position of a session. Declaration order is the canonical stage
/// order, so derived `Ord` gives before/after comparisons directly.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Created,
    AwaitingMcq,
    AwaitingCode,
    AwaitingVoice,
    Completed,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Created => "created",
            Stage::AwaitingMcq => "awaiting_mcq",
            Stage::AwaitingCode => "awaiting_code",
            Stage::AwaitingVoice => "awaiting_voice",
            Stage::Completed => "completed",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single multiple-choice question presented to the candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McqQuestion {
    pub id: String,
    pub prompt: String,
    pub options: Vec<String>,
}

/// The time-boxed coding exercise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeChallenge {
    pub id: String,
    pub title: String,
    pub prompt: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McqResult {
    /// Question id to selected option.
    pub answers: BTreeMap<String, String>,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeResult {
    pub solution: String,
    /// True when the time box expired and the saved draft was submitted on
    /// the candidate's behalf. Preserved for audit and scoring fairness.
    pub forced: bool,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceResult {
    /// Reference into the external voice-interview system.
    pub voice_session_ref: String,
    pub linked_at: DateTime<Utc>,
}

/// Per-stage submitted payloads. Entries are write-once; the invariant that
/// they form a prefix of the canonical stage order is maintained by the
/// state machine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StageResults {
    pub mcq: Option<McqResult>,
    pub code: Option<CodeResult>,
    pub voice: Option<VoiceResult>,
}

/// One candidate's end-to-end assessment attempt.
///
/// Mutated exclusively through state-machine transitions while holding the
/// session's write lock; never deleted by this core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub session_id: Uuid,
    pub candidate_name: String,
    pub job_title: String,
    /// Normalized plain text; the single source for question generation.
    pub resume_text: String,
    /// Reference to the stored original file; absent when text was pasted.
    pub resume_artifact: Option<StorageObject>,
    pub stage: Stage,
    pub stage_results: StageResults,
    /// Retained so repeated generate calls return the identical set.
    pub mcq_questions: Option<Vec<McqQuestion>>,
    pub code_challenge: Option<CodeChallenge>,
    /// Last partial answer saved by the client; the forced-submission
    /// payload when the time box expires.
    pub code_draft: String,
    pub stage_deadlines: BTreeMap<Stage, DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn new(
        candidate_name: String,
        job_title: String,
        resume_text: String,
        resume_artifact: Option<StorageObject>,
    ) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            candidate_name,
            job_title,
            resume_text,
            resume_artifact,
            stage: Stage::Created,
            stage_results: StageResults::default(),
            mcq_questions: None,
            code_challenge: None,
            code_draft: String::new(),
            stage_deadlines: BTreeMap::new(),
            created_at: Utc::now(),
            completed_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_order_matches_pipeline() {
        assert!(Stage::Created < Stage::AwaitingMcq);
        assert!(Stage::AwaitingMcq < Stage::AwaitingCode);
        assert!(Stage::AwaitingCode < Stage::AwaitingVoice);
        assert!(Stage::AwaitingVoice < Stage::Completed);
    }

    #[test]
    fn test_stage_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&Stage::AwaitingMcq).unwrap(),
            "\"awaiting_mcq\""
        );
    }

    #[test]
    fn test_new_session_starts_in_created() {
        let session = Session::new(
            "Jane Doe".to_string(),
            "Backend Engineer".to_string(),
            "5 years Go".to_string(),
            None,
        );
        assert_eq!(session.stage, Stage::Created);
        assert!(session.stage_results.mcq.is_none());
        assert!(session.code_draft.is_empty());
    }
}
