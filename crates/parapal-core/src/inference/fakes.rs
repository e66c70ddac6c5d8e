//! In-memory inference fake (testing and offline runs)
//!
//! `ScriptedInference` hands out queued completions in order and records
//! every prompt it receives.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{transport_failure, InferenceClient};
use crate::prompt::GradingPrompt;

/// Returns pre-recorded completions, one per call.
#[derive(Debug, Default)]
pub struct ScriptedInference {
    model_id: String,
    completions: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<GradingPrompt>>,
}

impl ScriptedInference {
    pub fn new<I, S>(completions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ScriptedInference {
            model_id: "scripted".to_string(),
            completions: Mutex::new(completions.into_iter().map(Into::into).collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Prompts received so far.
    pub fn prompts(&self) -> Vec<GradingPrompt> {
        self.prompts.lock().unwrap().clone()
    }

    /// Number of `complete` calls so far.
    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl InferenceClient for ScriptedInference {
    async fn complete(&self, prompt: &GradingPrompt) -> String {
        self.prompts.lock().unwrap().push(prompt.clone());
        self.completions
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| transport_failure("", "No scripted completion left"))
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}
