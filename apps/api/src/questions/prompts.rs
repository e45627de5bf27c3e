// All LLM prompt constants for the question-generation module.

/// System prompt for MCQ generation — enforces JSON-only output.
pub const MCQ_SYSTEM: &str =
    "You are an expert technical interviewer designing a skills assessment. \
    Generate multiple-choice questions grounded in the candidate's resume. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON array. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// MCQ generation prompt template.
/// Replace `{count}`, `{job_title}` and `{resume_text}` before sending.
pub const MCQ_PROMPT_TEMPLATE: &str = r#"Generate exactly {count} multiple-choice questions to assess a candidate
for the role of "{job_title}", based on the resume below.

Return a JSON array with this EXACT schema (no extra fields):
[
  {
    "id": "q1",
    "prompt": "Which consistency model does a quorum read/write system provide?",
    "options": ["Strong consistency", "Eventual consistency", "Causal consistency", "No consistency"]
  }
]

Rules:
- Ids are "q1" through "q{count}" in order.
- Every question must test a skill or technology the resume actually mentions.
- Exactly four options per question, one clearly best answer.
- Questions probe understanding, not trivia about the resume's wording.

RESUME:
{resume_text}"#;

/// System prompt for coding-challenge generation — enforces JSON-only output.
pub const CODE_SYSTEM: &str =
    "You are an expert technical interviewer designing a timed coding exercise. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences.";

/// Coding-challenge prompt template.
/// Replace `{job_title}` and `{resume_text}` before sending.
pub const CODE_PROMPT_TEMPLATE: &str = r#"Design one self-contained coding exercise for a candidate applying as
"{job_title}", grounded in the strongest technical area of the resume below.
It must be solvable in under 30 minutes in any mainstream language.

Return a JSON object with this EXACT schema (no extra fields):
{
  "id": "code-1",
  "title": "Rate limiter",
  "prompt": "Implement a sliding-window rate limiter..."
}

RESUME:
{resume_text}"#;
