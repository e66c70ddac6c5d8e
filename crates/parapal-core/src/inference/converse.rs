//! Converse-style HTTP inference client.
//!
//! Sends `POST {endpoint}/model/{model_id}/converse` and reads the text
//! blocks at `output.message.content[*].text`.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{transport_failure, InferenceClient};
use crate::config::GraderConfig;
use crate::error::{ParapalError, Result};
use crate::obs;
use crate::prompt::GradingPrompt;

/// Error text used when the response body does not have the Converse shape.
pub const UNEXPECTED_FORMAT: &str = "Received unexpected format from Converse API";

#[derive(Debug, Serialize)]
struct TextBlock<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: Vec<TextBlock<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InferenceConfig {
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ConverseRequest<'a> {
    messages: Vec<Message<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    system: Vec<TextBlock<'a>>,
    inference_config: InferenceConfig,
}

#[derive(Debug, Deserialize)]
struct ConverseResponse {
    output: ConverseOutput,
}

#[derive(Debug, Deserialize)]
struct ConverseOutput {
    message: ConverseMessage,
}

#[derive(Debug, Deserialize)]
struct ConverseMessage {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

/// HTTP client for a Converse-compatible endpoint.
///
/// Construct once and share; the underlying `reqwest::Client` pools
/// connections.
pub struct ConverseClient {
    http_client: reqwest::Client,
    url: String,
    model_id: String,
    api_key: Option<String>,
    max_tokens: u32,
    temperature: f32,
    timeout: Duration,
}

impl std::fmt::Debug for ConverseClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConverseClient")
            .field("url", &self.url)
            .field("model_id", &self.model_id)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl ConverseClient {
    /// Create a client from `config`.
    pub fn new(config: &GraderConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("parapal/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;

        Ok(ConverseClient {
            http_client,
            url: converse_url(&config.endpoint_url(), &config.model_id)?,
            model_id: config.model_id.clone(),
            api_key: config.api_key.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            timeout,
        })
    }

    /// Full URL requests are sent to.
    pub fn url(&self) -> &str {
        &self.url
    }

    fn request_body<'a>(&self, prompt: &'a GradingPrompt) -> ConverseRequest<'a> {
        let system = if prompt.system.is_empty() {
            Vec::new()
        } else {
            vec![TextBlock {
                text: &prompt.system,
            }]
        };
        ConverseRequest {
            messages: vec![Message {
                role: "user",
                content: vec![TextBlock { text: &prompt.user }],
            }],
            system,
            inference_config: InferenceConfig {
                max_tokens: self.max_tokens,
                temperature: self.temperature,
            },
        }
    }

    async fn send(&self, prompt: &GradingPrompt) -> std::result::Result<String, String> {
        let mut request = self
            .http_client
            .post(&self.url)
            .json(&self.request_body(prompt));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| self.describe_error(&e))?;
        let status = response.status();
        let body = response.text().await.map_err(|e| self.describe_error(&e))?;

        if !status.is_success() {
            return Err(transport_failure(
                body,
                format!("Inference endpoint returned HTTP {}", status.as_u16()),
            ));
        }

        extract_response_text(&body).ok_or_else(|| transport_failure(body, UNEXPECTED_FORMAT))
    }

    fn describe_error(&self, err: &reqwest::Error) -> String {
        let message = if err.is_timeout() {
            format!(
                "Inference request timed out after {}s",
                self.timeout.as_secs()
            )
        } else {
            "Failed to reach inference endpoint".to_string()
        };
        transport_failure(err.to_string(), message)
    }
}

#[async_trait]
impl InferenceClient for ConverseClient {
    async fn complete(&self, prompt: &GradingPrompt) -> String {
        let started = Instant::now();
        match self.send(prompt).await {
            Ok(text) => {
                obs::emit_inference_completed(
                    &self.model_id,
                    started.elapsed().as_millis() as u64,
                    text.len(),
                );
                debug!(completion = %text, "raw completion");
                text
            }
            Err(synthetic) => {
                obs::emit_inference_failed(&self.model_id, &synthetic);
                synthetic
            }
        }
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

fn converse_url(endpoint: &str, model_id: &str) -> Result<String> {
    let mut url = reqwest::Url::parse(endpoint)
        .map_err(|e| ParapalError::Config(format!("invalid endpoint {endpoint:?}: {e}")))?;
    url.path_segments_mut()
        .map_err(|_| ParapalError::Config(format!("endpoint {endpoint:?} cannot be a base URL")))?
        .pop_if_empty()
        .extend(["model", model_id, "converse"]);
    Ok(url.to_string())
}

/// Concatenate every text block of a Converse response body.
///
/// Returns `None` when the body is not JSON or lacks
/// `output.message.content`.
pub fn extract_response_text(body: &str) -> Option<String> {
    let response: ConverseResponse = serde_json::from_str(body).ok()?;
    Some(
        response
            .output
            .message
            .content
            .into_iter()
            .filter_map(|block| block.text)
            .collect(),
    )
}
