//! Question generation — pluggable, trait-based, one generator per backend.
//!
//! Default: `KeywordQuestionGenerator` (pure-Rust, deterministic, fully
//! testable). With `ANTHROPIC_API_KEY` set, `LlmQuestionGenerator` takes
//! over at startup. `AppState` holds an `Arc<dyn QuestionGenerator>`.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::assessment::models::{CodeChallenge, McqQuestion};
use crate::errors::AppError;
use crate::llm::LlmClient;
use crate::questions::prompts::{CODE_PROMPT_TEMPLATE, CODE_SYSTEM, MCQ_PROMPT_TEMPLATE, MCQ_SYSTEM};

/// Questions per MCQ set, identical across backends.
pub const MCQ_COUNT: usize = 5;

/// The generator trait. Implement this to swap backends without touching
/// the session pipeline.
#[async_trait]
pub trait QuestionGenerator: Send + Sync {
    async fn mcq_set(
        &self,
        resume_text: &str,
        job_title: &str,
    ) -> Result<Vec<McqQuestion>, AppError>;

    async fn code_challenge(
        &self,
        resume_text: &str,
        job_title: &str,
    ) -> Result<CodeChallenge, AppError>;
}

// ────────────────────────────────────────────────────────────────────────────
// KeywordQuestionGenerator — deterministic default
// ────────────────────────────────────────────────────────────────────────────

/// Builds question sets from the resume's most frequent technical terms.
/// Same resume text in, identical questions out, which makes the stage
/// idempotence properties directly testable without an LLM.
pub struct KeywordQuestionGenerator;

const STOPWORDS: &[&str] = &[
    "of", "in", "to", "is", "at", "on", "as", "by", "an", "or", "we", "it", "my", "if", "be",
    "do", "so", "no", "up", "us", "am", "the", "and", "with", "for", "from", "that", "this",
    "have", "has", "was", "were", "are", "been", "over", "into", "using", "used", "use", "work",
    "worked", "working", "years", "year", "months", "team", "teams", "experience", "experienced",
    "skills", "skilled", "including", "developed", "built", "build", "designed", "design", "led",
    "managed", "various", "other", "across", "within", "also", "etc", "per", "all", "our",
    "their",
];

const SELF_RATING_OPTIONS: [&str; 4] = [
    "Used it in production for multiple years",
    "Shipped at least one project with it",
    "Explored it in side projects only",
    "Familiar with the concepts, little hands-on use",
];

fn extract_keywords(text: &str) -> Vec<String> {
    let mut frequency: HashMap<String, usize> = HashMap::new();
    // '+' and '#' stay word characters so "c++" and "c#" survive.
    for raw in text.split(|c: char| !c.is_ascii_alphanumeric() && c != '+' && c != '#') {
        let token = raw.to_ascii_lowercase();
        if token.len() < 2 {
            continue;
        }
        let bare = token.trim_matches(|c| c == '+' || c == '#');
        if bare.is_empty() || bare.chars().all(|c| c.is_ascii_digit()) {
            continue;
        }
        if STOPWORDS.contains(&token.as_str()) {
            continue;
        }
        *frequency.entry(token).or_default() += 1;
    }

    let mut ranked: Vec<(String, usize)> = frequency.into_iter().collect();
    // Frequency first, then alphabetical, so the ranking is total and the
    // output deterministic for a given resume.
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.into_iter().take(12).map(|(word, _)| word).collect()
}

#[async_trait]
impl QuestionGenerator for KeywordQuestionGenerator {
    async fn mcq_set(
        &self,
        resume_text: &str,
        job_title: &str,
    ) -> Result<Vec<McqQuestion>, AppError> {
        let keywords = extract_keywords(resume_text);
        let mut questions = Vec::with_capacity(MCQ_COUNT);

        for i in 0..MCQ_COUNT {
            let prompt = match keywords.get(i % keywords.len().max(1)) {
                Some(keyword) => format!(
                    "Your resume mentions \"{keyword}\". Which statement best describes \
                     your hands-on depth with it?"
                ),
                None => format!(
                    "Which statement best describes your overall readiness for a \
                     {job_title} role?"
                ),
            };
            questions.push(McqQuestion {
                id: format!("q{}", i + 1),
                prompt,
                options: SELF_RATING_OPTIONS.iter().map(|s| s.to_string()).collect(),
            });
        }
        Ok(questions)
    }

    async fn code_challenge(
        &self,
        resume_text: &str,
        job_title: &str,
    ) -> Result<CodeChallenge, AppError> {
        let keywords = extract_keywords(resume_text);
        let focus = keywords
            .first()
            .cloned()
            .unwrap_or_else(|| job_title.to_ascii_lowercase());
        Ok(CodeChallenge {
            id: "code-1".to_string(),
            title: format!("Practical exercise: {focus}"),
            prompt: format!(
                "In any mainstream language, implement a small, self-contained program \
                 that demonstrates your working knowledge of {focus} as applied to a \
                 {job_title} role. State your assumptions as comments, favor clarity \
                 over completeness, and submit whatever you have when time runs out."
            ),
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// LlmQuestionGenerator — resume-aware generation via Claude
// ────────────────────────────────────────────────────────────────────────────

pub struct LlmQuestionGenerator {
    llm: LlmClient,
}

impl LlmQuestionGenerator {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl QuestionGenerator for LlmQuestionGenerator {
    async fn mcq_set(
        &self,
        resume_text: &str,
        job_title: &str,
    ) -> Result<Vec<McqQuestion>, AppError> {
        let prompt = MCQ_PROMPT_TEMPLATE
            .replace("{count}", &MCQ_COUNT.to_string())
            .replace("{job_title}", job_title)
            .replace("{resume_text}", resume_text);
        let questions: Vec<McqQuestion> = self
            .llm
            .call_json(&prompt, MCQ_SYSTEM)
            .await
            .map_err(|e| AppError::Generation(format!("MCQ generation failed: {e}")))?;
        if questions.is_empty() {
            return Err(AppError::Generation(
                "MCQ generation returned no questions".to_string(),
            ));
        }
        Ok(questions)
    }

    async fn code_challenge(
        &self,
        resume_text: &str,
        job_title: &str,
    ) -> Result<CodeChallenge, AppError> {
        let prompt = CODE_PROMPT_TEMPLATE
            .replace("{job_title}", job_title)
            .replace("{resume_text}", resume_text);
        self.llm
            .call_json(&prompt, CODE_SYSTEM)
            .await
            .map_err(|e| AppError::Generation(format!("challenge generation failed: {e}")))
    }
}
