//! HTTP routes for parapald
//!
//! Each grading route wraps the raw request body as `{"body": <text>}`, hands
//! it to the event handler and replays the resulting envelope as the HTTP
//! response. Bodies are decoded lossily, so invalid UTF-8 is answered by the
//! verifier like any other malformed body.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use parapal_core::{Envelope, Grader, ResultStore, RESPONSE_HEADERS};
use serde_json::{json, Value};
use tracing::warn;

/// Shared by every request.
pub struct AppState {
    pub grader: Grader,
    /// Batch results are saved here when set.
    pub store: Option<Arc<dyn ResultStore>>,
}

type AppStateArc = Arc<AppState>;

// ============================================================================
// Grading Routes
// ============================================================================

pub fn grade_routes() -> Router<AppStateArc> {
    Router::new()
        .route("/v1/grade", post(grade).options(preflight))
        .route("/v1/grade/batch", post(grade_batch).options(preflight))
}

async fn grade(State(state): State<AppStateArc>, body: Bytes) -> Response {
    let envelope = state.grader.handle_event(&event_for(&body)).await;
    envelope_response(envelope)
}

async fn grade_batch(State(state): State<AppStateArc>, body: Bytes) -> Response {
    let envelope = state
        .grader
        .handle_batch_event(&event_for(&body), state.store.as_deref())
        .await;
    envelope_response(envelope)
}

fn event_for(body: &[u8]) -> Value {
    json!({ "body": String::from_utf8_lossy(body) })
}

async fn preflight() -> Response {
    let mut response = StatusCode::NO_CONTENT.into_response();
    let cors = RESPONSE_HEADERS
        .iter()
        .copied()
        .filter(|(name, _)| name.starts_with("Access-Control-"));
    apply_headers(response.headers_mut(), cors);
    response
}

// ============================================================================
// Health Routes
// ============================================================================

pub fn health_routes() -> Router<AppStateArc> {
    Router::new().route("/health", get(health))
}

async fn health(State(state): State<AppStateArc>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": parapal_core::VERSION,
        "model_id": state.grader.model_id(),
    }))
}

/// Build a router with every route mounted.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(grade_routes())
        .merge(health_routes())
        .with_state(Arc::new(state))
}

fn envelope_response(envelope: Envelope) -> Response {
    let status =
        StatusCode::from_u16(envelope.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut response = (status, envelope.body).into_response();
    apply_headers(
        response.headers_mut(),
        envelope
            .headers
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str())),
    );
    response
}

fn apply_headers<'a>(headers: &mut HeaderMap, pairs: impl IntoIterator<Item = (&'a str, &'a str)>) {
    for (name, value) in pairs {
        match (HeaderName::try_from(name), HeaderValue::try_from(value)) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => warn!(header = %name, "skipping invalid response header"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request};
    use parapal_core::{MemoryResultStore, ScriptedInference, ValidationPolicy};
    use tower::ServiceExt;

    const VALID: &str = r#"{"inferred_scale_min":1,"inferred_scale_max":5,"category_scores":[{"category":"ideas","score":4},{"category":"voice","score":3}],"overall_score":3.5,"feedback":"Good.","evidence":[]}"#;

    fn test_app(completions: &[&str], store: Option<Arc<dyn ResultStore>>) -> Router {
        let fake = Arc::new(ScriptedInference::new(completions.iter().copied()));
        app(AppState {
            grader: Grader::new(fake, ValidationPolicy::default()),
            store,
        })
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn grade_returns_validated_record() {
        let response = test_app(&[VALID], None)
            .oneshot(post_json("/v1/grade", r#"{"essay_text": "An essay."}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["access-control-allow-origin"], "*");
        assert_eq!(response.headers()["content-type"], "application/json");

        let body = body_json(response).await;
        assert_eq!(body["grade"]["overall_score"], 3.5);
    }

    #[tokio::test]
    async fn grade_rejects_non_json_body() {
        let response = test_app(&[], None)
            .oneshot(post_json("/v1/grade", ""))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            json!({"error": "Invalid JSON in request body."})
        );
    }

    fn post_bytes(uri: &str, body: &'static [u8]) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn grade_rejects_non_utf8_body_with_envelope() {
        let response = test_app(&[], None)
            .oneshot(post_bytes("/v1/grade", b"\xff\xfe{"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.headers()["access-control-allow-origin"], "*");
        assert_eq!(response.headers()["content-type"], "application/json");
        assert_eq!(
            body_json(response).await,
            json!({"error": "Invalid JSON in request body."})
        );
    }

    #[tokio::test]
    async fn batch_rejects_non_utf8_body_with_errors_list() {
        let response = test_app(&[], None)
            .oneshot(post_bytes("/v1/grade/batch", b"\xc3\x28"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.headers()["access-control-allow-methods"], "OPTIONS,POST");
        assert_eq!(
            body_json(response).await,
            json!({"errors": ["Invalid JSON in request body."]})
        );
    }

    #[tokio::test]
    async fn stray_invalid_byte_in_essay_is_replaced() {
        let response = test_app(&[VALID], None)
            .oneshot(post_bytes("/v1/grade", b"{\"essay_text\": \"caf\xe9\"}"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn grade_reports_model_failure_as_500() {
        let response = test_app(&["not json at all"], None)
            .oneshot(post_json("/v1/grade", r#"{"essay_text": "An essay."}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["grade"]["raw_output"], "not json at all");
    }

    #[tokio::test]
    async fn batch_saves_to_store() {
        let store = Arc::new(MemoryResultStore::new());
        let response = test_app(&[VALID], Some(store.clone()))
            .oneshot(post_json(
                "/v1/grade/batch",
                r#"{"rubric": "Ideas and voice.", "documents": [{"id": 7, "text": "Mine."}]}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["results"][0]["student_id"], "7");
        assert_eq!(body["results"][0]["error"], false);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn preflight_is_204_with_cors() {
        let response = test_app(&[], None)
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/v1/grade/batch")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(
            response.headers()["access-control-allow-methods"],
            "OPTIONS,POST"
        );
    }

    #[tokio::test]
    async fn health_reports_model() {
        let response = test_app(&[], None)
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["model_id"], "scripted");
    }
}
