//! Grader configuration
//!
//! Defaults, optionally overlaid by a TOML file, then by environment
//! variables. Environment always wins.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ParapalError, Result};
use crate::extract::ExtractionMode;
use crate::validate::ValidationPolicy;

/// Model used when nothing else is configured.
pub const DEFAULT_MODEL_ID: &str = "google.gemma-3-12b-it";

/// Region used when `AWS_REGION` is unset (local runs).
pub const DEFAULT_REGION: &str = "us-east-1";

/// Maximum allowed gap between `overall_score` and the category aggregate.
pub const DEFAULT_SCORE_TOLERANCE: f64 = 0.1;

/// Runtime configuration for the grading pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraderConfig {
    /// Inference model identifier
    pub model_id: String,
    /// Region used to derive the default endpoint
    pub region: String,
    /// Explicit endpoint base URL (overrides the region-derived one)
    pub endpoint: Option<String>,
    /// Bearer token for the inference endpoint
    pub api_key: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Request timeout for the inference call, in seconds
    pub timeout_secs: u64,
    /// Tolerance for the overall/category consistency check
    pub score_tolerance: f64,
    pub extraction: ExtractionMode,
    /// Root directory for persisted batch results
    pub results_dir: Option<PathBuf>,
}

impl Default for GraderConfig {
    fn default() -> Self {
        GraderConfig {
            model_id: DEFAULT_MODEL_ID.to_string(),
            region: DEFAULT_REGION.to_string(),
            endpoint: None,
            api_key: None,
            max_tokens: 1024,
            temperature: 0.3,
            timeout_secs: 60,
            score_tolerance: DEFAULT_SCORE_TOLERANCE,
            extraction: ExtractionMode::Greedy,
            results_dir: None,
        }
    }
}

impl GraderConfig {
    /// Defaults plus environment overrides.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Read a TOML file, then apply environment overrides.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml_str(&content)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Parse a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: GraderConfig = toml::from_str(content)?;
        Ok(config)
    }

    /// Apply overrides from a variable lookup (the process environment in
    /// production, a map in tests).
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("PARAPAL_MODEL_ID") {
            self.model_id = v;
        }
        if let Some(v) = lookup("AWS_REGION") {
            self.region = v;
        }
        if let Some(v) = lookup("PARAPAL_ENDPOINT") {
            self.endpoint = Some(v);
        }
        if let Some(v) = lookup("AWS_BEARER_TOKEN_BEDROCK") {
            self.api_key = Some(v);
        }
        if let Some(v) = lookup("PARAPAL_MAX_TOKENS") {
            self.max_tokens = parse_var("PARAPAL_MAX_TOKENS", &v)?;
        }
        if let Some(v) = lookup("PARAPAL_TEMPERATURE") {
            self.temperature = parse_var("PARAPAL_TEMPERATURE", &v)?;
        }
        if let Some(v) = lookup("PARAPAL_TIMEOUT_SECS") {
            self.timeout_secs = parse_var("PARAPAL_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = lookup("PARAPAL_SCORE_TOLERANCE") {
            self.score_tolerance = parse_var("PARAPAL_SCORE_TOLERANCE", &v)?;
        }
        if let Some(v) = lookup("PARAPAL_EXTRACTION") {
            self.extraction = parse_var("PARAPAL_EXTRACTION", &v)?;
        }
        if let Some(v) = lookup("PARAPAL_RESULTS_DIR") {
            self.results_dir = Some(PathBuf::from(v));
        }
        Ok(())
    }

    /// Reject configurations the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.model_id.trim().is_empty() {
            return Err(ParapalError::Config("model_id must not be empty".to_string()));
        }
        if !(self.score_tolerance.is_finite() && self.score_tolerance > 0.0) {
            return Err(ParapalError::Config(format!(
                "score_tolerance must be a positive number, got {}",
                self.score_tolerance
            )));
        }
        if self.timeout_secs == 0 {
            return Err(ParapalError::Config("timeout_secs must be at least 1".to_string()));
        }
        if self.max_tokens == 0 {
            return Err(ParapalError::Config("max_tokens must be at least 1".to_string()));
        }
        if !(0.0..=1.0).contains(&self.temperature) {
            return Err(ParapalError::Config(format!(
                "temperature must be within 0.0..=1.0, got {}",
                self.temperature
            )));
        }
        Ok(())
    }

    /// Base URL of the inference endpoint.
    pub fn endpoint_url(&self) -> String {
        match &self.endpoint {
            Some(endpoint) => endpoint.trim_end_matches('/').to_string(),
            None => format!("https://bedrock-runtime.{}.amazonaws.com", self.region),
        }
    }

    /// The validator settings carried by this config.
    pub fn validation_policy(&self) -> ValidationPolicy {
        ValidationPolicy {
            tolerance: self.score_tolerance,
            extraction: self.extraction,
        }
    }
}

fn parse_var<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ParapalError::Config(format!("{key} has an invalid value: {value:?}")))
}
