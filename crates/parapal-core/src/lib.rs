//! Parapal Core Library
//!
//! Grades a student submission against a rubric with a hosted LLM and turns
//! the untrusted completion into a validated, arithmetically consistent
//! grade record.
//!
//! ## Pipeline
//!
//! - `verify`: inbound request checks
//! - `prompt`: deterministic prompt assembly
//! - `inference`: the remote completion call (the only side effect)
//! - `extract`: cut the JSON object out of the completion
//! - `validate`: schema and score-consistency checks
//! - `envelope`: status + CORS headers + JSON body

pub mod config;
pub mod domain;
pub mod envelope;
mod error;
pub mod extract;
pub mod grading;
pub mod inference;
pub mod obs;
pub mod prompt;
pub mod store;
pub mod telemetry;
pub mod validate;
pub mod verify;

pub use config::{GraderConfig, DEFAULT_MODEL_ID, DEFAULT_SCORE_TOLERANCE};
pub use domain::{
    BatchDocument, BatchRequest, CategoryScore, GradeError, GradeOutcome, GradeRecord,
    GradeRequest, DEFAULT_RUBRIC, DEFAULT_STANDARDS,
};
pub use envelope::{build_response, error_response, Envelope, RESPONSE_HEADERS};
pub use error::{ParapalError, Result};
pub use extract::{extract_json_object, ExtractionMode, NoJsonObject};
pub use grading::{BatchItem, BatchResponse, GradeResponse, Grader};
pub use inference::{ConverseClient, InferenceClient, ScriptedInference};
pub use obs::grade_span;
pub use prompt::{build_grading_prompt, GradingPrompt, SYSTEM_PROMPT};
pub use store::{FsResultStore, MemoryResultStore, ResultRecord, ResultStore};
pub use telemetry::{init_tracing, LOG_ENV};
pub use validate::{validate_completion, ValidationPolicy};
pub use verify::{verify_batch_request, verify_request};

/// Parapal version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
