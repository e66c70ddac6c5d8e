//! Transport envelope for handler responses.
//!
//! Serializes as the API-gateway proxy shape
//! `{"statusCode", "headers", "body"}` with `body` a JSON string.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body used if a payload ever fails to serialize.
const FALLBACK_BODY: &str = r#"{"error":"Internal server error."}"#;

/// Headers attached to every response.
pub const RESPONSE_HEADERS: [(&str, &str); 4] = [
    ("Content-Type", "application/json"),
    ("Access-Control-Allow-Origin", "*"),
    ("Access-Control-Allow-Headers", "*"),
    ("Access-Control-Allow-Methods", "OPTIONS,POST"),
];

/// Status, headers and serialized JSON body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

impl Envelope {
    /// Parse the body back into JSON.
    pub fn body_json(&self) -> Option<Value> {
        serde_json::from_str(&self.body).ok()
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}

/// Wrap `payload` in an envelope with the standard headers.
pub fn build_response<T: Serialize + ?Sized>(status_code: u16, payload: &T) -> Envelope {
    let (status_code, body) = match serde_json::to_string(payload) {
        Ok(body) => (status_code, body),
        Err(e) => {
            tracing::error!(error = %e, "response payload failed to serialize");
            (500, FALLBACK_BODY.to_string())
        }
    };

    Envelope {
        status_code,
        headers: RESPONSE_HEADERS
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        body,
    }
}

/// `{"error": message}` with the given status.
pub fn error_response(status_code: u16, message: &str) -> Envelope {
    build_response(status_code, &serde_json::json!({ "error": message }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_build_response_headers_and_body() {
        let env = build_response(200, &json!({"id": "abc"}));
        assert_eq!(env.status_code, 200);
        assert_eq!(env.headers["Content-Type"], "application/json");
        assert_eq!(env.headers["Access-Control-Allow-Origin"], "*");
        assert_eq!(env.headers["Access-Control-Allow-Methods"], "OPTIONS,POST");
        assert_eq!(env.body_json(), Some(json!({"id": "abc"})));
        assert!(env.is_success());
    }

    #[test]
    fn test_envelope_serializes_camel_case() {
        let env = error_response(400, "essay_text cannot be empty.");
        let value = serde_json::to_value(&env).unwrap();
        assert_eq!(value["statusCode"], 400);
        assert!(value["body"].is_string());
        assert!(value["headers"].is_object());
    }

    #[test]
    fn test_error_response_shape() {
        let env = error_response(400, "Request body is missing.");
        assert_eq!(env.body_json(), Some(json!({"error": "Request body is missing."})));
        assert!(!env.is_success());
    }

    #[test]
    fn test_unserializable_payload_falls_back() {
        let mut map = std::collections::HashMap::new();
        map.insert(vec![1u8], "non-string key");
        let env = build_response(200, &map);
        assert_eq!(env.status_code, 500);
        assert_eq!(env.body, FALLBACK_BODY);
    }
}
