//! Inbound request verification.
//!
//! Both request shapes go through the same checks: the body is located and
//! decoded first (these steps cannot continue past a failure), then every
//! field contributes at most one issue. The single-grade surface reports the
//! first issue as `{"error": ...}`; the batch surface reports all of them as
//! `{"errors": [...]}`.

use serde_json::{Map, Value};

use crate::domain::{default_standards, BatchDocument, BatchRequest, GradeRequest, DEFAULT_RUBRIC};
use crate::envelope::{build_response, error_response, Envelope};
use crate::obs;

pub const BODY_MISSING: &str = "Request body is missing.";
pub const BODY_INVALID_JSON: &str = "Invalid JSON in request body.";
pub const BODY_NOT_OBJECT: &str = "Request body must be a JSON object.";

/// Locate the request body in an event and decode it to an object.
///
/// The body may be embedded JSON or a JSON-encoded string.
pub fn extract_body(event: &Value) -> Result<Map<String, Value>, &'static str> {
    let body = match event.get("body") {
        None | Some(Value::Null) => return Err(BODY_MISSING),
        Some(body) => body,
    };

    let decoded;
    let body = match body {
        Value::String(text) => {
            decoded = serde_json::from_str::<Value>(text).map_err(|_| BODY_INVALID_JSON)?;
            &decoded
        }
        other => other,
    };

    match body {
        Value::Object(map) => Ok(map.clone()),
        _ => Err(BODY_NOT_OBJECT),
    }
}

/// Verify a single-grade event.
///
/// On failure returns the 400 envelope to send back.
pub fn verify_request(event: &Value) -> Result<GradeRequest, Envelope> {
    let body = extract_body(event).map_err(|reason| reject_single(reason))?;
    parse_grade_request(&body).map_err(|issues| reject_single(&issues[0]))
}

/// Verify a batch event, collecting every issue.
pub fn verify_batch_request(event: &Value) -> Result<BatchRequest, Envelope> {
    let body = extract_body(event).map_err(|reason| reject_batch(vec![reason.to_string()]))?;
    parse_batch_request(&body).map_err(reject_batch)
}

/// Field checks for a single-grade body. `Err` is never empty.
pub fn parse_grade_request(body: &Map<String, Value>) -> Result<GradeRequest, Vec<String>> {
    let mut issues = Vec::new();

    let essay_text = match body.get("essay_text") {
        None => {
            issues.push("Missing essay_text in request body.".to_string());
            None
        }
        Some(value) if is_falsy(value) => {
            issues.push("essay_text cannot be empty.".to_string());
            None
        }
        Some(Value::String(text)) if text.trim().is_empty() => {
            issues.push("essay_text cannot be blank.".to_string());
            None
        }
        Some(Value::String(text)) => Some(text.clone()),
        Some(_) => {
            issues.push("essay_text must be a string.".to_string());
            None
        }
    };

    let rubric = optional_string(body, "rubric", "rubric must be a string.", &mut issues)
        .unwrap_or_else(|| DEFAULT_RUBRIC.to_string());
    let standards = optional_standards(body, &mut issues).unwrap_or_else(default_standards);

    match essay_text {
        Some(submission_text) if issues.is_empty() => Ok(GradeRequest {
            submission_text,
            rubric,
            standards,
        }),
        _ => Err(issues),
    }
}

/// Field checks for a batch body. `Err` is never empty.
pub fn parse_batch_request(body: &Map<String, Value>) -> Result<BatchRequest, Vec<String>> {
    let mut issues = Vec::new();

    let rubric = match body.get("rubric") {
        Some(Value::String(text)) if !text.trim().is_empty() => Some(text.clone()),
        Some(value) if !is_falsy(value) && !value.is_string() => {
            issues.push("Rubric must be a string".to_string());
            None
        }
        _ => {
            issues.push("Rubric is required".to_string());
            None
        }
    };

    let mut documents = Vec::new();
    match body.get("documents") {
        None => issues.push("Documents list is required".to_string()),
        Some(value) if is_falsy(value) => issues.push("Documents list is required".to_string()),
        Some(Value::Array(items)) => {
            for (index, item) in items.iter().enumerate() {
                match item.as_object() {
                    Some(doc) => documents.push(parse_document(doc)),
                    None => issues.push(format!("Document {index} must be an object")),
                }
            }
        }
        Some(_) => issues.push("Documents must be a list".to_string()),
    }

    let standards = optional_standards(body, &mut issues).unwrap_or_else(default_standards);

    match rubric {
        Some(rubric) if issues.is_empty() => Ok(BatchRequest {
            rubric,
            standards,
            documents,
        }),
        _ => Err(issues),
    }
}

fn parse_document(doc: &Map<String, Value>) -> BatchDocument {
    let student_id = match doc.get("id") {
        Some(Value::String(id)) if !id.is_empty() => id.clone(),
        Some(Value::Number(id)) => id.to_string(),
        _ => "unknown".to_string(),
    };
    let text = doc
        .get("text")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    BatchDocument { student_id, text }
}

fn optional_string(
    body: &Map<String, Value>,
    key: &str,
    message: &str,
    issues: &mut Vec<String>,
) -> Option<String> {
    match body.get(key) {
        None | Some(Value::Null) => None,
        Some(Value::String(text)) => Some(text.clone()),
        Some(_) => {
            issues.push(message.to_string());
            None
        }
    }
}

fn optional_standards(body: &Map<String, Value>, issues: &mut Vec<String>) -> Option<Vec<String>> {
    match body.get("standards") {
        None | Some(Value::Null) => None,
        Some(Value::Array(items)) => {
            let standards: Option<Vec<String>> = items
                .iter()
                .map(|item| item.as_str().map(str::to_string))
                .collect();
            if standards.is_none() {
                issues.push("standards must be an array of strings.".to_string());
            }
            standards
        }
        Some(_) => {
            issues.push("standards must be an array of strings.".to_string());
            None
        }
    }
}

/// Values a caller would consider "nothing": null, false, 0, "", [] and {}.
fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

fn reject_single(reason: &str) -> Envelope {
    obs::emit_request_rejected(reason);
    error_response(400, reason)
}

fn reject_batch(issues: Vec<String>) -> Envelope {
    obs::emit_request_rejected(&issues.join("; "));
    build_response(400, &serde_json::json!({ "errors": issues }))
}
