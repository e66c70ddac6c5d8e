//! Locating the JSON object inside a model completion.
//!
//! Models wrap their answer in prose ("Sure! Here is the JSON: ..."). The
//! default [`ExtractionMode::Greedy`] takes everything from the first `{` to
//! the last `}`. It mis-extracts when a completion holds several independent
//! objects; [`ExtractionMode::Balanced`] stops at the brace that closes the
//! first object, honouring string literals and escapes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Strategy for cutting the JSON object out of a completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMode {
    /// First `{` through last `}`
    #[default]
    Greedy,
    /// First `{` through its matching `}`
    Balanced,
}

impl fmt::Display for ExtractionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractionMode::Greedy => f.write_str("greedy"),
            ExtractionMode::Balanced => f.write_str("balanced"),
        }
    }
}

impl FromStr for ExtractionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "greedy" => Ok(ExtractionMode::Greedy),
            "balanced" => Ok(ExtractionMode::Balanced),
            other => Err(format!("unknown extraction mode: {other}")),
        }
    }
}

/// Raised when a completion contains no `{...}` span.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("No JSON object found in model output")]
pub struct NoJsonObject;

/// Cut the candidate JSON object out of `raw` using `mode`.
pub fn extract_json_object(raw: &str, mode: ExtractionMode) -> Result<&str, NoJsonObject> {
    match mode {
        ExtractionMode::Greedy => extract_greedy(raw),
        ExtractionMode::Balanced => extract_balanced(raw),
    }
}

/// Everything between the first `{` and the last `}`, inclusive.
pub fn extract_greedy(raw: &str) -> Result<&str, NoJsonObject> {
    let start = raw.find('{').ok_or(NoJsonObject)?;
    let end = raw.rfind('}').ok_or(NoJsonObject)?;
    if end < start {
        return Err(NoJsonObject);
    }
    Ok(&raw[start..=end])
}

/// The first complete object, scanning string literals so braces inside
/// them do not count. Falls back to [`NoJsonObject`] if it never closes.
pub fn extract_balanced(raw: &str) -> Result<&str, NoJsonObject> {
    let start = raw.find('{').ok_or(NoJsonObject)?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in raw[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(&raw[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }

    Err(NoJsonObject)
}
