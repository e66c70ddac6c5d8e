//! Grading prompt assembly.
//!
//! The instruction block names every key the validator checks, so the
//! prompt and [`crate::validate`] always agree on one schema.

use serde::{Deserialize, Serialize};

/// Role instruction sent as the system prompt.
pub const SYSTEM_PROMPT: &str = "You are an expert teacher's assistant. Grade the student submission based strictly on the rubric and standards. Respond only with the required JSON.";

/// Prompt pair sent to the inference endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradingPrompt {
    pub user: String,
    pub system: String,
}

/// Build the user and system prompts for one submission.
///
/// Deterministic: the same inputs always produce byte-identical prompts.
pub fn build_grading_prompt(
    submission_text: &str,
    rubric: &str,
    standards: &[String],
) -> GradingPrompt {
    let standards_block = if standards.is_empty() {
        "(none provided)".to_string()
    } else {
        standards.join("\n")
    };

    let user = format!(
        r#"STANDARDS:
{standards_block}

RUBRIC:
{rubric}

STUDENT ESSAY:
"""{submission_text}"""

INSTRUCTIONS:
Return a JSON object with:
- inferred_scale_min: number (minimum possible overall score based on rubric. Use 0 if not specified)
- inferred_scale_max: number (maximum possible overall score based on rubric. Use 100 if not specified)
- category_scores: array of objects of the form {{"category": category, "score": score}}
- overall_score: number (between inferred_scale_min and inferred_scale_max. Equals the sum of category scores)
- feedback: short paragraph for the teacher summarizing why the essay received this score
- evidence: array of objects of the form {{"quote": quote, "explanation": explanation}}, with a direct quote from the essay and explanation of how it relates to a student's performance on a standard.

Do not include any conversational text, just the JSON.
"#
    );

    GradingPrompt {
        user,
        system: SYSTEM_PROMPT.to_string(),
    }
}
