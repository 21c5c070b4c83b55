//! `GeminiClient` against a local mock of the `generateContent` endpoint.
//!
//! Run with: `cargo test --test ai_client_tests`
#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::net::TcpListener;

use resume_tools_api::ai_client::{AiError, GeminiClient, TextGenerator, generate_json};

const MODEL: &str = "test-model";

/// Canned answer served by the mock provider.
struct MockProvider {
    status: StatusCode,
    body: Value,
    retry_after: Option<&'static str>,
    delay: Duration,
    hits: AtomicUsize,
    last_request: Mutex<Option<(HeaderMap, Value)>>,
}

impl MockProvider {
    fn new(status: StatusCode, body: Value) -> Self {
        Self {
            status,
            body,
            retry_after: None,
            delay: Duration::ZERO,
            hits: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    fn answering(text: &str) -> Self {
        Self::new(
            StatusCode::OK,
            json!({
                "candidates": [{
                    "content": {"role": "model", "parts": [{"text": text}]},
                    "finishReason": "STOP"
                }]
            }),
        )
    }
}

async fn generate_content(
    State(mock): State<Arc<MockProvider>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    mock.hits.fetch_add(1, Ordering::SeqCst);
    *mock.last_request.lock().unwrap() = Some((headers, body));

    if !mock.delay.is_zero() {
        tokio::time::sleep(mock.delay).await;
    }

    let mut response = (mock.status, Json(mock.body.clone())).into_response();
    if let Some(retry_after) = mock.retry_after {
        response
            .headers_mut()
            .insert("retry-after", retry_after.parse().unwrap());
    }
    response
}

/// Start the mock and return a client pointed at it.
async fn start(mock: MockProvider, timeout: Duration) -> (GeminiClient, Arc<MockProvider>) {
    let mock = Arc::new(mock);
    let app = Router::new()
        .route(
            &format!("/v1beta/models/{MODEL}:generateContent"),
            post(generate_content),
        )
        .with_state(mock.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let client = GeminiClient::new(
        Some("secret-key".to_string()),
        &format!("http://{addr}/"),
        MODEL,
        timeout,
    )
    .unwrap();

    (client, mock)
}

#[tokio::test]
async fn test_generate_sends_expected_request() {
    let (client, mock) = start(
        MockProvider::answering("Your resume is strong."),
        Duration::from_secs(5),
    )
    .await;

    assert!(client.is_configured());
    assert!(client.endpoint().ends_with("/v1beta/models/test-model:generateContent"));

    let text = client
        .generate("You are a career coach.", "Review this resume")
        .await
        .unwrap();
    assert_eq!(text, "Your resume is strong.");

    let (headers, body) = mock.last_request.lock().unwrap().clone().unwrap();
    assert_eq!(headers["x-goog-api-key"], "secret-key");
    assert_eq!(
        body["systemInstruction"]["parts"][0]["text"],
        "You are a career coach."
    );
    assert_eq!(body["contents"][0]["role"], "user");
    assert_eq!(body["contents"][0]["parts"][0]["text"], "Review this resume");
    assert_eq!(body["generationConfig"]["maxOutputTokens"], 2048);
}

#[tokio::test]
async fn test_multi_part_answer_is_joined() {
    let mock = MockProvider::new(
        StatusCode::OK,
        json!({
            "candidates": [{
                "content": {"parts": [{"text": "Dear team, "}, {"text": "I am writing..."}]}
            }]
        }),
    );
    let (client, _) = start(mock, Duration::from_secs(5)).await;

    let text = client.generate("system", "prompt").await.unwrap();
    assert_eq!(text, "Dear team, I am writing...");
}

#[tokio::test]
async fn test_quota_exhaustion_is_not_retried() {
    let mut mock = MockProvider::new(
        StatusCode::TOO_MANY_REQUESTS,
        json!({"error": {
            "code": 429,
            "message": "Resource has been exhausted",
            "status": "RESOURCE_EXHAUSTED"
        }}),
    );
    mock.retry_after = Some("37");
    let (client, mock) = start(mock, Duration::from_secs(5)).await;

    let err = client.generate("system", "prompt").await.unwrap_err();
    assert!(matches!(
        err,
        AiError::QuotaExceeded {
            retry_after: Some(37)
        }
    ));
    assert_eq!(err.label(), "quota");
    assert_eq!(mock.hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_provider_error_message_is_extracted() {
    let mock = MockProvider::new(
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({"error": {"code": 500, "message": "Internal error encountered."}}),
    );
    let (client, _) = start(mock, Duration::from_secs(5)).await;

    match client.generate("system", "prompt").await.unwrap_err() {
        AiError::Api { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "Internal error encountered.");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_blocked_prompt() {
    let mock = MockProvider::new(
        StatusCode::OK,
        json!({"promptFeedback": {"blockReason": "SAFETY"}}),
    );
    let (client, _) = start(mock, Duration::from_secs(5)).await;

    let err = client.generate("system", "prompt").await.unwrap_err();
    assert!(matches!(err, AiError::Blocked(ref reason) if reason == "SAFETY"));
}

#[tokio::test]
async fn test_empty_candidates() {
    let mock = MockProvider::new(StatusCode::OK, json!({"candidates": []}));
    let (client, _) = start(mock, Duration::from_secs(5)).await;

    let err = client.generate("system", "prompt").await.unwrap_err();
    assert!(matches!(err, AiError::EmptyContent));
}

#[tokio::test]
async fn test_slow_provider_times_out() {
    let mut mock = MockProvider::answering("too late");
    mock.delay = Duration::from_secs(2);
    let (client, _) = start(mock, Duration::from_millis(200)).await;

    let err = client.generate("system", "prompt").await.unwrap_err();
    assert!(matches!(err, AiError::Timeout), "got {err:?}");
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Gap {
    summary: String,
    missing_skills: Vec<String>,
}

#[tokio::test]
async fn test_generate_json_tolerates_fences() {
    let answer = "```json\n{\"summary\": \"Close fit.\", \"missingSkills\": [\"Kubernetes\"]}\n```";
    let (client, _) = start(MockProvider::answering(answer), Duration::from_secs(5)).await;

    let gap: Gap = generate_json(&client, "json only", "prompt").await.unwrap();
    assert_eq!(gap.summary, "Close fit.");
    assert_eq!(gap.missing_skills, vec!["Kubernetes".to_string()]);
}

#[tokio::test]
async fn test_generate_json_rejects_prose() {
    let (client, _) = start(
        MockProvider::answering("Sure! Here is your analysis."),
        Duration::from_secs(5),
    )
    .await;

    let err = generate_json::<Gap>(&client, "json only", "prompt")
        .await
        .unwrap_err();
    assert!(matches!(err, AiError::Parse(_)));
}

#[tokio::test]
async fn test_missing_key_fails_without_network() {
    let client = GeminiClient::new(
        Some("   ".to_string()),
        "http://127.0.0.1:9",
        MODEL,
        Duration::from_secs(1),
    )
    .unwrap();

    assert!(!client.is_configured());
    let err = client.generate("system", "prompt").await.unwrap_err();
    assert!(matches!(err, AiError::MissingApiKey));
}
