//! Error types for parapal-core
//!
//! Only configuration, I/O and storage surface as `Err`. Model output and
//! transport problems are values (`GradeOutcome::Rejected`), never errors.

use thiserror::Error;

/// Errors that can occur outside the grading pipeline proper
#[derive(Error, Debug)]
pub enum ParapalError {
    /// Invalid or unparseable configuration
    #[error("invalid configuration: {0}")]
    Config(String),

    /// TOML configuration file could not be parsed
    #[error("config file parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// HTTP client construction or request error
    #[error("HTTP error: {0}")]
    Http(String),

    /// Result store failure
    #[error("result store error: {0}")]
    Store(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<reqwest::Error> for ParapalError {
    fn from(err: reqwest::Error) -> Self {
        ParapalError::Http(err.to_string())
    }
}

/// Result type for parapal-core operations
pub type Result<T> = std::result::Result<T, ParapalError>;
