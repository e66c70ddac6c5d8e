//! Grade validation and normalization.
//!
//! Turns an untrusted completion into a [`GradeOutcome`]:
//!
//! 1. Extract the JSON object (see [`crate::extract`]) and parse it.
//! 2. Require an object. A `{raw_output, error}` object is the inference
//!    client's transport failure and is surfaced as-is.
//! 3. Check the top-level fields in order: `inferred_scale_min`,
//!    `inferred_scale_max`, `category_scores`, `overall_score`, `feedback`
//!    (a non-empty string), `evidence`.
//! 4. Check every `category_scores` entry and sum the scores.
//! 5. `overall_score` must match the sum or the mean within the tolerance.
//!    With no categories only the sum (zero) can match.
//! 6. Drop the scale bounds and return the record. Evidence entries are
//!    kept as the model wrote them.
//!
//! The first failing check wins. Every [`GradeError`] carries the full raw
//! completion, so re-validating its `raw_output` gives the same error.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::config::DEFAULT_SCORE_TOLERANCE;
use crate::domain::{CategoryScore, GradeError, GradeOutcome, GradeRecord};
use crate::extract::{extract_json_object, ExtractionMode};

pub const PARSE_FAILURE: &str = "Failed to parse JSON from model output";
pub const NOT_AN_OBJECT: &str = "Grade response is not a JSON object.";
pub const SCORE_MISMATCH: &str = "'overall_score' does not equal the sum of 'category_scores'.";

/// Knobs for [`validate_completion`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValidationPolicy {
    /// Maximum gap between `overall_score` and the category sum or mean
    pub tolerance: f64,
    pub extraction: ExtractionMode,
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        ValidationPolicy {
            tolerance: DEFAULT_SCORE_TOLERANCE,
            extraction: ExtractionMode::Greedy,
        }
    }
}

#[derive(Clone, Copy)]
enum FieldKind {
    Number,
    Array,
    NonEmptyText,
}

impl FieldKind {
    fn check(self, field: &str, value: &Value) -> Result<(), String> {
        let (matches, expected) = match self {
            FieldKind::Number => (value.is_number(), "a number"),
            FieldKind::Array => (value.is_array(), "an array"),
            FieldKind::NonEmptyText => (value.is_string(), "a string"),
        };
        if !matches {
            return Err(format!("'{field}' must be {expected}."));
        }
        if matches!(self, FieldKind::NonEmptyText) && value.as_str().is_some_and(str::is_empty) {
            return Err(format!("'{field}' must not be empty."));
        }
        Ok(())
    }
}

const REQUIRED_FIELDS: [(&str, FieldKind); 6] = [
    ("inferred_scale_min", FieldKind::Number),
    ("inferred_scale_max", FieldKind::Number),
    ("category_scores", FieldKind::Array),
    ("overall_score", FieldKind::Number),
    ("feedback", FieldKind::NonEmptyText),
    ("evidence", FieldKind::Array),
];

/// Validate a raw completion.
pub fn validate_completion(raw: &str, policy: &ValidationPolicy) -> GradeOutcome {
    match check_completion(raw, policy) {
        Ok(record) => GradeOutcome::Graded(record),
        Err(message) => GradeOutcome::Rejected(GradeError::new(raw, message)),
    }
}

fn check_completion(raw: &str, policy: &ValidationPolicy) -> Result<GradeRecord, String> {
    let candidate = extract_json_object(raw, policy.extraction).map_err(|e| e.to_string())?;
    let parsed: Value = serde_json::from_str(candidate).map_err(|_| PARSE_FAILURE.to_string())?;

    let Value::Object(mut obj) = parsed else {
        return Err(NOT_AN_OBJECT.to_string());
    };

    if let Some(message) = transport_failure(&obj) {
        return Err(message);
    }

    for (field, kind) in REQUIRED_FIELDS {
        match obj.get(field) {
            None => return Err(format!("Missing '{field}' in grade response.")),
            Some(value) => kind.check(field, value)?,
        }
    }

    let feedback = obj
        .get("feedback")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let category_scores = check_category_scores(obj.get("category_scores"))?;
    let overall_score = obj
        .get("overall_score")
        .and_then(Value::as_f64)
        .unwrap_or(f64::NAN);
    check_consistency(&category_scores, overall_score, policy.tolerance)?;
    let evidence = take_evidence(obj.remove("evidence"));

    let scale_min = obj.remove("inferred_scale_min").and_then(|v| v.as_f64());
    let scale_max = obj.remove("inferred_scale_max").and_then(|v| v.as_f64());
    if let (Some(min), Some(max)) = (scale_min, scale_max) {
        if overall_score < min || overall_score > max {
            warn!(
                overall_score = overall_score,
                scale_min = min,
                scale_max = max,
                "overall score outside the inferred scale"
            );
        }
    }

    for key in ["category_scores", "overall_score", "feedback"] {
        obj.remove(key);
    }

    Ok(GradeRecord {
        category_scores,
        overall_score,
        feedback,
        evidence,
        extra: obj,
    })
}

/// The inference client reports transport failures as an object with
/// exactly `raw_output` and `error`.
fn transport_failure(obj: &Map<String, Value>) -> Option<String> {
    if obj.len() != 2 {
        return None;
    }
    match (obj.get("raw_output"), obj.get("error")) {
        (Some(Value::String(_)), Some(Value::String(error))) => Some(error.clone()),
        _ => None,
    }
}

fn check_category_scores(value: Option<&Value>) -> Result<Vec<CategoryScore>, String> {
    let items = value
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let mut scores = Vec::with_capacity(items.len());
    for item in items {
        let Some(entry) = item.as_object() else {
            return Err("Each item in 'category_scores' must be an object.".to_string());
        };
        if entry.len() != 2 {
            return Err(
                "Each item in 'category_scores' must have exactly 2 key-value pairs.".to_string(),
            );
        }
        let (Some(category), Some(score)) = (entry.get("category"), entry.get("score")) else {
            return Err(
                "Each item in 'category_scores' must have 'category' and 'score' keys."
                    .to_string(),
            );
        };
        let category = match category.as_str() {
            Some(name) if !name.is_empty() => name,
            _ => {
                return Err(
                    "Category names in 'category_scores' must be non-empty strings.".to_string(),
                )
            }
        };
        let Some(score) = score.as_f64() else {
            return Err(format!("Score for category '{category}' must be a number."));
        };
        scores.push(CategoryScore {
            category: category.to_string(),
            score,
        });
    }
    Ok(scores)
}

/// An empty list has no mean, so only the sum branch can accept it.
fn check_consistency(scores: &[CategoryScore], overall: f64, tolerance: f64) -> Result<(), String> {
    let sum: f64 = scores.iter().map(|c| c.score).sum();
    let mean = sum / scores.len() as f64;
    if (sum - overall).abs() <= tolerance || (mean - overall).abs() <= tolerance {
        Ok(())
    } else {
        Err(SCORE_MISMATCH.to_string())
    }
}

fn take_evidence(value: Option<Value>) -> Vec<Value> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };
    let irregular = items
        .iter()
        .filter(|item| {
            item.get("quote").and_then(Value::as_str).is_none()
                || item.get("explanation").and_then(Value::as_str).is_none()
        })
        .count();
    if irregular > 0 {
        warn!(
            irregular,
            total = items.len(),
            "evidence entries without string quote and explanation"
        );
    }
    items
}
