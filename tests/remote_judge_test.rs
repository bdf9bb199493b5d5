//! Wiremock integration tests for the Gemini judge: request shape, failure
//! classification, and the zero-call guarantee without a credential.

mod common;

use std::time::Duration;

use duygu_lib::models::{Label, RemoteFailure};
use duygu_lib::services::providers::ProviderClient;
use duygu_lib::services::sentiment::{GeminiJudge, RemoteJudge};
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{judge_answer_json, judge_for, GENERATE_PATH};

#[tokio::test]
async fn judge_returns_model_text_and_sends_expected_request() {
    let server = MockServer::start().await;
    let answer = "LLM Tahmini: Positive\nYerel Model: Doğru\nAçıklama: Olumlu bir yorum.";

    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .and(header("x-goog-api-key", "test-key"))
        .and(body_partial_json(serde_json::json!({
            "safetySettings": [
                {"category": "HARM_CATEGORY_HARASSMENT", "threshold": "BLOCK_NONE"},
                {"category": "HARM_CATEGORY_HATE_SPEECH", "threshold": "BLOCK_NONE"},
                {"category": "HARM_CATEGORY_SEXUALLY_EXPLICIT", "threshold": "BLOCK_NONE"},
                {"category": "HARM_CATEGORY_DANGEROUS_CONTENT", "threshold": "BLOCK_NONE"}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(judge_answer_json(answer)))
        .expect(1)
        .mount(&server)
        .await;

    let judge = judge_for(&server.uri(), Some("test-key"));
    let verdict = judge
        .judge("Bu film çok güzeldi", Label::Positive)
        .await
        .expect("judge should succeed");
    assert_eq!(verdict.text, answer);

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let body: serde_json::Value = requests[0].body_json().unwrap();
    let prompt = body["contents"][0]["parts"][0]["text"].as_str().unwrap();
    assert!(prompt.contains("Analiz edilecek metin: \"Bu film çok güzeldi\""));
    assert!(prompt.contains("şu şekilde etiketledi: \"Positive\""));
    assert!(!requests[0].url.as_str().contains("test-key"));
}

#[tokio::test]
async fn quota_errors_are_reported_distinctly() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(429).set_body_string("RESOURCE_EXHAUSTED"))
        .mount(&server)
        .await;

    let judge = judge_for(&server.uri(), Some("test-key"));
    let failure = judge.judge("kargo geç geldi", Label::Negative).await.unwrap_err();
    assert!(matches!(failure, RemoteFailure::QuotaExceeded { .. }));
    assert!(failure.to_string().contains("kotası doldu (429)"));
}

#[tokio::test]
async fn server_errors_are_generic_failures() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal"))
        .mount(&server)
        .await;

    let judge = judge_for(&server.uri(), Some("test-key"));
    let failure = judge.judge("fena değil", Label::Notr).await.unwrap_err();
    match &failure {
        RemoteFailure::Generic { detail } => assert!(detail.contains("500")),
        other => panic!("expected generic failure, got {:?}", other),
    }
    assert!(failure.to_string().starts_with("Bağlantı Hatası: "));
}

#[tokio::test]
async fn empty_candidate_reports_finish_reason() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "candidates": [{"content": {"parts": []}, "finishReason": "SAFETY"}]
        })))
        .mount(&server)
        .await;

    let judge = judge_for(&server.uri(), Some("test-key"));
    let failure = judge.judge("...", Label::Notr).await.unwrap_err();
    assert_eq!(
        failure,
        RemoteFailure::EmptyOrBlocked {
            reason: "SAFETY".to_string()
        }
    );
    assert!(failure.to_string().contains("SAFETY"));
}

#[tokio::test]
async fn blocked_prompt_reports_block_reason() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "promptFeedback": {"blockReason": "OTHER"}
        })))
        .mount(&server)
        .await;

    let judge = judge_for(&server.uri(), Some("test-key"));
    let failure = judge.judge("...", Label::Negative).await.unwrap_err();
    assert_eq!(
        failure,
        RemoteFailure::EmptyOrBlocked {
            reason: "OTHER".to_string()
        }
    );
}

#[tokio::test]
async fn timeout_is_a_generic_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(judge_answer_json("geç cevap"))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let judge = GeminiJudge::new(
        ProviderClient::with_settings(&server.uri(), Duration::from_millis(200)),
        Some("test-key".to_string()),
        "gemini-flash-latest",
    );
    let failure = judge.judge("harika", Label::Positive).await.unwrap_err();
    assert!(matches!(failure, RemoteFailure::Generic { .. }));
}

#[tokio::test]
async fn missing_credential_makes_no_network_call() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(judge_answer_json("x")))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"models": []})))
        .expect(0)
        .mount(&server)
        .await;

    let judge = judge_for(&server.uri(), None);
    assert_eq!(
        judge.judge("harika", Label::Positive).await,
        Err(RemoteFailure::CredentialMissing)
    );
    assert_eq!(judge.list_models().await, Err(RemoteFailure::CredentialMissing));
}

#[tokio::test]
async fn list_models_follows_pages_and_filters_generators() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1beta/models"))
        .and(query_param("pageToken", "page-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "models": [{
                "name": "models/gemini-pro-latest",
                "supportedGenerationMethods": ["generateContent", "countTokens"]
            }]
        })))
        .with_priority(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1beta/models"))
        .and(query_param("pageSize", "1000"))
        .and(header("x-goog-api-key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "models": [
                {
                    "name": "models/gemini-flash-latest",
                    "displayName": "Gemini Flash Latest",
                    "supportedGenerationMethods": ["generateContent"]
                },
                {
                    "name": "models/text-embedding-004",
                    "supportedGenerationMethods": ["embedContent"]
                }
            ],
            "nextPageToken": "page-2"
        })))
        .mount(&server)
        .await;

    let judge = judge_for(&server.uri(), Some("test-key"));
    let models = judge.list_models().await.unwrap();
    let names: Vec<&str> = models.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["models/gemini-flash-latest", "models/gemini-pro-latest"]);
    assert_eq!(models[0].display_name.as_deref(), Some("Gemini Flash Latest"));
}
