//! Grading requests after verification.

use serde::{Deserialize, Serialize};

/// Rubric applied when the caller does not supply one.
pub const DEFAULT_RUBRIC: &str = "Grade on clarity (25 pts), organization (25 pts), grammar (25 pts), and argument strength (25 pts) for a total of 0–100 pts.";

/// Writing standards applied when the caller does not supply any.
pub const DEFAULT_STANDARDS: [&str; 3] = [
    "1. Write arguments to support claims with logical reasoning, relevant evidence from accurate and credible sources, and provide a conclusion that follows from and supports the argument presented.",
    "2. Write informative/explanatory texts to examine a topic and convey ideas and information through the selection, organization, and analysis of relevant content, and provide a conclusion that supports the information or explanation presented.",
    "3. Write narrative texts to develop real or imagined experiences or events using effective technique, well-structured event sequences, descriptive details, and provide a logical resolution.",
];

/// The default standards as owned strings.
pub fn default_standards() -> Vec<String> {
    DEFAULT_STANDARDS.iter().map(|s| s.to_string()).collect()
}

/// A single submission to grade.
///
/// # Invariants
///
/// `submission_text` is non-blank. [`crate::verify`] enforces this for
/// inbound requests; `GradeRequest::new` does not re-check it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradeRequest {
    pub submission_text: String,
    pub rubric: String,
    pub standards: Vec<String>,
}

impl GradeRequest {
    /// Request with the default rubric and standards.
    pub fn new(submission_text: impl Into<String>) -> Self {
        GradeRequest {
            submission_text: submission_text.into(),
            rubric: DEFAULT_RUBRIC.to_string(),
            standards: default_standards(),
        }
    }

    pub fn with_rubric(mut self, rubric: impl Into<String>) -> Self {
        self.rubric = rubric.into();
        self
    }

    pub fn with_standards(mut self, standards: Vec<String>) -> Self {
        self.standards = standards;
        self
    }
}

/// One document of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchDocument {
    /// Caller's identifier for the student; `unknown` when absent
    pub student_id: String,
    pub text: String,
}

/// Several documents graded against one rubric.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchRequest {
    pub rubric: String,
    pub standards: Vec<String>,
    pub documents: Vec<BatchDocument>,
}

impl BatchRequest {
    /// The per-document grading request for `doc`.
    pub fn request_for(&self, doc: &BatchDocument) -> GradeRequest {
        GradeRequest {
            submission_text: doc.text.clone(),
            rubric: self.rubric.clone(),
            standards: self.standards.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_applies_defaults() {
        let req = GradeRequest::new("An essay.");
        assert_eq!(req.rubric, DEFAULT_RUBRIC);
        assert_eq!(req.standards.len(), 3);
        assert!(req.standards[0].starts_with("1. Write arguments"));
    }

    #[test]
    fn test_builder_overrides() {
        let req = GradeRequest::new("An essay.")
            .with_rubric("Grade on voice (10 pts).")
            .with_standards(vec![]);
        assert_eq!(req.rubric, "Grade on voice (10 pts).");
        assert!(req.standards.is_empty());
    }

    #[test]
    fn test_batch_request_for_document() {
        let batch = BatchRequest {
            rubric: "Grade on clarity.".to_string(),
            standards: vec!["S1".to_string()],
            documents: vec![BatchDocument {
                student_id: "s-1".to_string(),
                text: "Essay one.".to_string(),
            }],
        };
        let req = batch.request_for(&batch.documents[0]);
        assert_eq!(req.submission_text, "Essay one.");
        assert_eq!(req.rubric, "Grade on clarity.");
        assert_eq!(req.standards, vec!["S1".to_string()]);
    }
}
