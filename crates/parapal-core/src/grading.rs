//! The grading pipeline.
//!
//! `Grader` owns the inference capability and the validation policy and
//! runs: verify → prompt → inference → extract/validate → envelope.
//! Documents are graded one at a time; nothing is shared between requests
//! except the client handle.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::Instrument;
use uuid::Uuid;

use crate::domain::{BatchRequest, GradeError, GradeOutcome, GradeRecord, GradeRequest};
use crate::envelope::{build_response, Envelope};
use crate::inference::InferenceClient;
use crate::obs;
use crate::prompt::build_grading_prompt;
use crate::store::{ResultRecord, ResultStore};
use crate::validate::{validate_completion, ValidationPolicy};
use crate::verify::{verify_batch_request, verify_request};

/// Failure recorded for a batch document with no text.
pub const BLANK_DOCUMENT: &str = "Document text cannot be blank.";

/// Response body of a single grading call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeResponse {
    pub id: Uuid,
    pub grade: GradeOutcome,
}

/// One entry of a batch response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchItem {
    pub student_id: String,
    pub result_id: Uuid,
    pub error: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grade: Option<GradeRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<GradeError>,
}

impl BatchItem {
    fn new(student_id: &str, result_id: Uuid, outcome: GradeOutcome) -> Self {
        let (grade, failure) = match outcome {
            GradeOutcome::Graded(record) => (Some(record), None),
            GradeOutcome::Rejected(err) => (None, Some(err)),
        };
        BatchItem {
            student_id: student_id.to_string(),
            result_id,
            error: failure.is_some(),
            grade,
            failure,
        }
    }
}

/// Response body of a batch grading call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResponse {
    pub results: Vec<BatchItem>,
}

/// Grades submissions with an injected inference client.
#[derive(Clone)]
pub struct Grader {
    client: Arc<dyn InferenceClient>,
    policy: ValidationPolicy,
}

impl Grader {
    pub fn new(client: Arc<dyn InferenceClient>, policy: ValidationPolicy) -> Self {
        Grader { client, policy }
    }

    pub fn policy(&self) -> &ValidationPolicy {
        &self.policy
    }

    pub fn model_id(&self) -> &str {
        self.client.model_id()
    }

    /// Grade one verified request. Never fails: problems become
    /// [`GradeOutcome::Rejected`].
    pub async fn grade_submission(&self, request: &GradeRequest) -> GradeOutcome {
        obs::emit_grade_started(
            self.client.model_id(),
            request.submission_text.chars().count(),
            request.standards.len(),
        );

        let prompt = build_grading_prompt(
            &request.submission_text,
            &request.rubric,
            &request.standards,
        );
        let raw = self.client.complete(&prompt).await;
        let outcome = validate_completion(&raw, &self.policy);

        match &outcome {
            GradeOutcome::Graded(record) => {
                obs::emit_grade_validated(record.overall_score, record.category_scores.len())
            }
            GradeOutcome::Rejected(err) => obs::emit_grade_rejected(&err.error),
        }
        outcome
    }

    /// Handle a single-grade event: 400 on bad input, otherwise
    /// `{id, grade}` with 200 or 500.
    pub async fn handle_event(&self, event: &Value) -> Envelope {
        let id = Uuid::new_v4();
        async {
            let request = match verify_request(event) {
                Ok(request) => request,
                Err(rejection) => return rejection,
            };

            let grade = self.grade_submission(&request).await;
            build_response(grade.status_code(), &GradeResponse { id, grade })
        }
        .instrument(obs::grade_span(&id.to_string()))
        .await
    }

    /// Grade every document of a batch in order.
    ///
    /// A failing document is recorded and the batch moves on. Results are
    /// saved to `store` when given; save failures are only logged.
    pub async fn grade_batch(
        &self,
        batch: &BatchRequest,
        store: Option<&dyn ResultStore>,
    ) -> BatchResponse {
        let mut results = Vec::with_capacity(batch.documents.len());

        for (index, doc) in batch.documents.iter().enumerate() {
            let outcome = if doc.text.trim().is_empty() {
                GradeOutcome::Rejected(GradeError::new(doc.text.clone(), BLANK_DOCUMENT))
            } else {
                self.grade_submission(&batch.request_for(doc)).await
            };
            obs::emit_batch_document_graded(&doc.student_id, index, outcome.is_graded());

            let record = ResultRecord::new(&doc.student_id, self.client.model_id(), outcome);
            if let Some(store) = store {
                match store.save_result(&record) {
                    Ok(()) => obs::emit_result_persisted(&record.id.to_string()),
                    Err(e) => obs::emit_result_persist_failed(&record.id.to_string(), &e),
                }
            }

            results.push(BatchItem::new(&doc.student_id, record.id, record.outcome));
        }

        BatchResponse { results }
    }

    /// Handle a batch event: 400 listing every input issue, otherwise 200
    /// with one entry per document.
    pub async fn handle_batch_event(
        &self,
        event: &Value,
        store: Option<&dyn ResultStore>,
    ) -> Envelope {
        let id = Uuid::new_v4();
        async {
            let batch = match verify_batch_request(event) {
                Ok(batch) => batch,
                Err(rejection) => return rejection,
            };

            let response = self.grade_batch(&batch, store).await;
            build_response(200, &response)
        }
        .instrument(obs::grade_span(&id.to_string()))
        .await
    }
}
