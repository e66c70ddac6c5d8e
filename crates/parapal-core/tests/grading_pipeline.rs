use std::sync::Arc;

use parapal_core::{
    validate_completion, ConverseClient, FsResultStore, GradeOutcome, Grader, GraderConfig,
    ScriptedInference, ValidationPolicy,
};
use serde_json::{json, Value};
use wiremock::{matchers, Mock, MockServer, ResponseTemplate};

const EXAMPLE_GRADE: &str = r#"{"category_scores":[{"category":"clarity","score":20},{"category":"grammar","score":20}],"overall_score":40,"feedback":"ok","evidence":[],"inferred_scale_min":0,"inferred_scale_max":100}"#;

fn scripted(completions: Vec<String>) -> (Arc<ScriptedInference>, Grader) {
    let fake = Arc::new(ScriptedInference::new(completions));
    let grader = Grader::new(fake.clone(), ValidationPolicy::default());
    (fake, grader)
}

fn essay_event(text: &str) -> Value {
    json!({"body": {"essay_text": text}})
}

#[test]
fn example_grade_validates_and_drops_scale() {
    let outcome = validate_completion(EXAMPLE_GRADE, &ValidationPolicy::default());
    let record = outcome.record().expect("graded");
    assert_eq!(record.overall_score, 40.0);

    let value = serde_json::to_value(record).unwrap();
    assert!(value.get("inferred_scale_min").is_none());
    assert!(value.get("inferred_scale_max").is_none());
}

#[test]
fn example_grade_with_wrong_overall_rejected() {
    let raw = EXAMPLE_GRADE.replace("\"overall_score\":40", "\"overall_score\":10");
    let outcome = validate_completion(&raw, &ValidationPolicy::default());
    let err = outcome.error().expect("rejected");
    assert!(err.error.contains("does not equal the sum"));
    assert_eq!(err.raw_output, raw);
}

#[test]
fn prose_wrapped_partial_grade_reports_missing_field() {
    let raw = r#"Sure! Here is the JSON: {"overall_score":5} more text"#;
    let outcome = validate_completion(raw, &ValidationPolicy::default());
    let err = outcome.error().expect("rejected");
    assert!(err.error.starts_with("Missing '"));
    assert_eq!(err.raw_output, raw);
}

#[tokio::test]
async fn empty_essay_is_400() {
    let (fake, grader) = scripted(vec![]);
    let env = grader.handle_event(&essay_event("")).await;

    assert_eq!(env.status_code, 400);
    assert_eq!(
        env.body_json().unwrap(),
        json!({"error": "essay_text cannot be empty."})
    );
    assert_eq!(fake.calls(), 0);
}

#[tokio::test]
async fn end_to_end_over_http() {
    let server = MockServer::start().await;
    let completion = format!("Here is my evaluation:\n```json\n{EXAMPLE_GRADE}\n```");
    Mock::given(matchers::method("POST"))
        .and(matchers::path_regex(r"^/model/.+/converse$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "output": {"message": {"role": "assistant", "content": [{"text": completion}]}}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = GraderConfig {
        endpoint: Some(server.uri()),
        ..GraderConfig::default()
    };
    let client = Arc::new(ConverseClient::new(&config).unwrap());
    let grader = Grader::new(client, config.validation_policy());

    let env = grader
        .handle_event(&json!({"body": json!({"essay_text": "Dogs are loyal."}).to_string()}))
        .await;

    assert_eq!(env.status_code, 200);
    assert_eq!(env.headers["Access-Control-Allow-Origin"], "*");
    let body = env.body_json().unwrap();
    assert_eq!(body["grade"]["overall_score"], 40.0);
    assert_eq!(body["grade"]["category_scores"][0]["category"], "clarity");
}

#[tokio::test]
async fn transport_failure_reaches_caller_as_500() {
    let server = MockServer::start().await;
    Mock::given(matchers::method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("Service Unavailable"))
        .mount(&server)
        .await;

    let config = GraderConfig {
        endpoint: Some(server.uri()),
        ..GraderConfig::default()
    };
    let grader = Grader::new(
        Arc::new(ConverseClient::new(&config).unwrap()),
        config.validation_policy(),
    );

    let env = grader.handle_event(&essay_event("Dogs are loyal.")).await;
    assert_eq!(env.status_code, 500);

    let body = env.body_json().unwrap();
    assert_eq!(body["grade"]["error"], "Inference endpoint returned HTTP 503");
    let raw = body["grade"]["raw_output"].as_str().unwrap();
    assert!(raw.contains("Service Unavailable"));
}

#[tokio::test]
async fn rejected_raw_output_revalidates_identically() {
    let completions = vec![
        "no json".to_string(),
        "{broken".to_string(),
        "{\"overall_score\": 5}".to_string(),
        EXAMPLE_GRADE.replace("\"overall_score\":40", "\"overall_score\":99"),
    ];
    let (_fake, grader) = scripted(completions.clone());

    for _ in &completions {
        let env = grader.handle_event(&essay_event("An essay.")).await;
        assert_eq!(env.status_code, 500);
        let err = env.body_json().unwrap()["grade"].clone();
        let raw = err["raw_output"].as_str().unwrap();

        let again = validate_completion(raw, grader.policy());
        assert_eq!(again.error().unwrap().error, err["error"].as_str().unwrap());
    }
}

#[tokio::test]
async fn batch_persists_results_to_disk() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsResultStore::new(dir.path()).unwrap();
    let (_fake, grader) = scripted(vec![EXAMPLE_GRADE.to_string(), "nope".to_string()]);

    let env = grader
        .handle_batch_event(
            &json!({"body": {
                "rubric": "Grade on clarity and grammar.",
                "documents": [
                    {"id": "ada", "text": "Essay A."},
                    {"id": "bob", "text": "Essay B."}
                ]
            }}),
            Some(&store),
        )
        .await;
    assert_eq!(env.status_code, 200);

    let body = env.body_json().unwrap();
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["error"], false);
    assert_eq!(results[1]["error"], true);

    let id = results[1]["result_id"].as_str().unwrap().parse().unwrap();
    let saved = store.load_result(&id).unwrap();
    assert_eq!(saved.student_id, "bob");
    assert!(matches!(saved.outcome, GradeOutcome::Rejected(_)));
}
