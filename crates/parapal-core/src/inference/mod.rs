//! Inference endpoint access.
//!
//! [`InferenceClient`] is the only side-effecting seam of the pipeline. Its
//! `complete` never fails: transport problems come back as a synthetic
//! `{"raw_output": ..., "error": ...}` string that the validator recognises,
//! so downstream code has a single failure channel.

pub mod converse;
pub mod fakes;

use async_trait::async_trait;

use crate::prompt::GradingPrompt;

pub use converse::{ConverseClient, UNEXPECTED_FORMAT};
pub use fakes::ScriptedInference;

/// Remote text generation.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    /// Send `prompt` and return the completion text.
    async fn complete(&self, prompt: &GradingPrompt) -> String;

    /// Identifier of the model serving completions, for records and logs.
    fn model_id(&self) -> &str;
}

/// Build the synthetic completion used to report a transport failure.
pub fn transport_failure(raw_output: impl Into<String>, error: impl Into<String>) -> String {
    serde_json::json!({
        "raw_output": raw_output.into(),
        "error": error.into(),
    })
    .to_string()
}
