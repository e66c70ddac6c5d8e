//! Structured observability hooks for grading requests.
//!
//! This module provides:
//! - Request-scoped tracing spans via [`grade_span`]
//! - Emission functions for key lifecycle events: grading start, inference,
//!   validation verdict, batch progress and result persistence
//!
//! Events are emitted at `info!` (failures at `warn!`). Filter with
//! `RUST_LOG`; pass `--json` to the binaries for JSON lines.

use tracing::{info, warn, Span};

/// Request-scoped span for one grading call.
///
/// Attach it to the request future with [`tracing::Instrument`]:
///
/// ```ignore
/// handle(event).instrument(grade_span("3f1c...")).await
/// // every event inside carries request_id = "3f1c..."
/// ```
pub fn grade_span(request_id: &str) -> Span {
    tracing::info_span!("parapal.grade", request_id = %request_id)
}

/// Emit event: grading started.
pub fn emit_grade_started(model_id: &str, submission_chars: usize, standards: usize) {
    info!(
        event = "grade.started",
        model_id = %model_id,
        submission_chars = submission_chars,
        standards = standards,
    );
}

/// Emit event: inference call returned a completion.
pub fn emit_inference_completed(model_id: &str, duration_ms: u64, completion_chars: usize) {
    info!(
        event = "inference.completed",
        model_id = %model_id,
        duration_ms = duration_ms,
        completion_chars = completion_chars,
    );
}

/// Emit event: inference call failed and was turned into a synthetic completion.
pub fn emit_inference_failed(model_id: &str, synthetic: &str) {
    warn!(event = "inference.failed", model_id = %model_id, detail = %synthetic);
}

/// Emit event: completion validated into a grade.
pub fn emit_grade_validated(overall_score: f64, categories: usize) {
    info!(
        event = "grade.validated",
        overall_score = overall_score,
        categories = categories,
    );
}

/// Emit event: completion rejected by the validator.
pub fn emit_grade_rejected(error: &str) {
    warn!(event = "grade.rejected", error = %error);
}

/// Emit event: request failed verification.
pub fn emit_request_rejected(reason: &str) {
    info!(event = "request.rejected", reason = %reason);
}

/// Emit event: one batch document finished.
pub fn emit_batch_document_graded(student_id: &str, index: usize, graded: bool) {
    info!(
        event = "batch.document_graded",
        student_id = %student_id,
        index = index,
        graded = graded,
    );
}

/// Emit event: result record persisted.
pub fn emit_result_persisted(result_id: &str) {
    info!(event = "result.persisted", result_id = %result_id);
}

/// Emit event: result record could not be persisted (warning level).
pub fn emit_result_persist_failed(result_id: &str, error: &dyn std::fmt::Display) {
    warn!(event = "result.persist_failed", result_id = %result_id, error = %error);
}
