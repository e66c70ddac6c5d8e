//! Domain models for Parapal.
//!
//! - `GradeRequest` / `BatchRequest`: verified inbound requests
//! - `GradeRecord`: a validated grade
//! - `GradeError`: an untrusted completion with the reason it was rejected
//! - `GradeOutcome`: one of the two

pub mod grade;
pub mod request;

pub use grade::{CategoryScore, GradeError, GradeOutcome, GradeRecord};
pub use request::{
    default_standards, BatchDocument, BatchRequest, GradeRequest, DEFAULT_RUBRIC,
    DEFAULT_STANDARDS,
};
