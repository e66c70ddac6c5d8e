//! Grade records produced by the validator.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A named sub-score contributing to the overall score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryScore {
    pub category: String,
    pub score: f64,
}

/// A validated grade.
///
/// The inferred scale bounds used during validation are not part of this
/// record. Keys the model added beyond the schema are kept in `extra`.
/// Evidence entries are usually `{quote, explanation}` objects but are kept
/// verbatim, whatever their shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeRecord {
    pub category_scores: Vec<CategoryScore>,
    pub overall_score: f64,
    pub feedback: String,
    pub evidence: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A completion that could not be turned into a [`GradeRecord`].
///
/// `raw_output` is always the unmodified completion text, so the same input
/// can be re-validated or repaired by hand without calling the model again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradeError {
    pub raw_output: String,
    pub error: String,
}

impl GradeError {
    pub fn new(raw_output: impl Into<String>, error: impl Into<String>) -> Self {
        GradeError {
            raw_output: raw_output.into(),
            error: error.into(),
        }
    }
}

/// The result of grading one submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GradeOutcome {
    Graded(GradeRecord),
    Rejected(GradeError),
}

impl GradeOutcome {
    /// HTTP-style status for this outcome: 200 graded, 500 rejected.
    pub fn status_code(&self) -> u16 {
        match self {
            GradeOutcome::Graded(_) => 200,
            GradeOutcome::Rejected(_) => 500,
        }
    }

    pub fn is_graded(&self) -> bool {
        matches!(self, GradeOutcome::Graded(_))
    }

    pub fn record(&self) -> Option<&GradeRecord> {
        match self {
            GradeOutcome::Graded(record) => Some(record),
            GradeOutcome::Rejected(_) => None,
        }
    }

    pub fn error(&self) -> Option<&GradeError> {
        match self {
            GradeOutcome::Graded(_) => None,
            GradeOutcome::Rejected(err) => Some(err),
        }
    }
}

impl From<GradeRecord> for GradeOutcome {
    fn from(record: GradeRecord) -> Self {
        GradeOutcome::Graded(record)
    }
}

impl From<GradeError> for GradeOutcome {
    fn from(err: GradeError) -> Self {
        GradeOutcome::Rejected(err)
    }
}
