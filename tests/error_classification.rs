//! Integration tests for failure classification through real adapters
//!
//! Drives the OpenAI and Gemini adapters against a wiremock server and
//! checks that HTTP statuses and provider error phrasing land in the right
//! failure category.

use tubegrow::provider::{
    FailureKind, GeminiAdapter, GrokAdapter, OpenAiAdapter, ProviderAdapter, ProviderId,
};
use tubegrow::{CanonicalRequest, TaskKind};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn text_request() -> CanonicalRequest {
    CanonicalRequest::new(TaskKind::TextGenerate, "write something").unwrap()
}

#[tokio::test]
async fn test_openai_401_is_auth_invalid() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "error": {"message": "Incorrect API key provided: sk-bad"}
        })))
        .mount(&server)
        .await;

    let adapter = OpenAiAdapter::new(reqwest::Client::new()).with_base_url(server.uri());
    let failure = adapter.invoke(&text_request(), "sk-bad").await.unwrap_err();

    assert_eq!(failure.provider, ProviderId::OpenAI);
    assert_eq!(failure.kind, FailureKind::AuthInvalid);
    assert!(failure.message.contains("Incorrect API key"));
}

#[tokio::test]
async fn test_openai_429_is_quota_exceeded() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
            "error": {"message": "You exceeded your current quota, please check your plan and billing details."}
        })))
        .mount(&server)
        .await;

    let adapter = OpenAiAdapter::new(reqwest::Client::new()).with_base_url(server.uri());
    let failure = adapter.invoke(&text_request(), "sk-test").await.unwrap_err();

    assert_eq!(failure.kind, FailureKind::QuotaExceeded);
}

#[tokio::test]
async fn test_same_body_different_status_classifies_differently() {
    // 401 and 429 must never collapse into the same category, even when the
    // provider reuses the error text.
    let body = serde_json::json!({"error": {"message": "request rejected"}});

    let unauthorized = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_json(body.clone()))
        .mount(&unauthorized)
        .await;
    let throttled = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_json(body))
        .mount(&throttled)
        .await;

    let client = reqwest::Client::new();
    let a = OpenAiAdapter::new(client.clone()).with_base_url(unauthorized.uri());
    let b = OpenAiAdapter::new(client).with_base_url(throttled.uri());

    let first = a.invoke(&text_request(), "sk").await.unwrap_err();
    let second = b.invoke(&text_request(), "sk").await.unwrap_err();
    assert_eq!(first.kind, FailureKind::AuthInvalid);
    assert_eq!(second.kind, FailureKind::QuotaExceeded);
}

#[tokio::test]
async fn test_gemini_503_is_service_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_json(serde_json::json!({
            "error": {"message": "The model is overloaded. Please try again later."}
        })))
        .mount(&server)
        .await;

    let adapter = GeminiAdapter::new(reqwest::Client::new()).with_base_url(server.uri());
    let failure = adapter.invoke(&text_request(), "AIza-test").await.unwrap_err();

    assert_eq!(failure.provider, ProviderId::Gemini);
    assert_eq!(failure.kind, FailureKind::ServiceUnavailable);
}

#[tokio::test]
async fn test_gemini_safety_block_is_content_blocked() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "promptFeedback": {"blockReason": "SAFETY"}
        })))
        .mount(&server)
        .await;

    let adapter = GeminiAdapter::new(reqwest::Client::new()).with_base_url(server.uri());
    let failure = adapter.invoke(&text_request(), "AIza-test").await.unwrap_err();

    assert_eq!(failure.kind, FailureKind::ContentBlocked);
}

#[tokio::test]
async fn test_gemini_400_with_invalid_key_message_is_auth_invalid() {
    // Gemini reports bad keys as 400 INVALID_ARGUMENT; the message matcher
    // has to catch what the status cannot.
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": {"message": "API key not valid. Please pass a valid API key."}
        })))
        .mount(&server)
        .await;

    let adapter = GeminiAdapter::new(reqwest::Client::new()).with_base_url(server.uri());
    let failure = adapter.invoke(&text_request(), "AIza-bad").await.unwrap_err();

    assert_eq!(failure.kind, FailureKind::AuthInvalid);
}

#[tokio::test]
async fn test_connection_refused_is_service_unavailable() {
    // Nothing listens on this port; the transport error must classify as an
    // outage rather than Unknown.
    let adapter = GrokAdapter::new(reqwest::Client::new()).with_base_url("http://127.0.0.1:9");
    let failure = adapter.invoke(&text_request(), "xai-test").await.unwrap_err();

    assert_eq!(failure.provider, ProviderId::Grok);
    assert_eq!(failure.kind, FailureKind::ServiceUnavailable);
}

#[tokio::test]
async fn test_gemini_success_parses_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "candidates": [{
                "content": {"parts": [{"text": "Here are five trends."}]}
            }]
        })))
        .mount(&server)
        .await;

    let adapter = GeminiAdapter::new(reqwest::Client::new()).with_base_url(server.uri());
    let success = adapter.invoke(&text_request(), "AIza-test").await.unwrap();
    assert_eq!(success.text, "Here are five trends.");
}

#[tokio::test]
async fn test_openai_success_parses_chat_content() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "Hello there"}}]
        })))
        .mount(&server)
        .await;

    let adapter = OpenAiAdapter::new(reqwest::Client::new()).with_base_url(server.uri());
    let success = adapter.invoke(&text_request(), "sk-test").await.unwrap();
    assert_eq!(success.text, "Hello there");
}

#[tokio::test]
async fn test_openai_image_generation_returns_media() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/images/generations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": [{"b64_json": "aW1hZ2VieXRlcw=="}]
        })))
        .mount(&server)
        .await;

    let adapter = OpenAiAdapter::new(reqwest::Client::new()).with_base_url(server.uri());
    let request = CanonicalRequest::new(TaskKind::ImageGenerate, "a bold thumbnail").unwrap();
    let success = adapter.invoke(&request, "sk-test").await.unwrap();

    let media = success.media.expect("image response should carry media");
    assert_eq!(media.mime_type, "image/png");
    assert_eq!(media.data, "aW1hZ2VieXRlcw==");
}

#[tokio::test]
async fn test_gemini_grounded_answer_collects_citations() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "candidates": [{
                "content": {"parts": [{"text": "Trend one is rising."}]},
                "groundingMetadata": {
                    "groundingChunks": [
                        {"web": {"uri": "https://news.example/a", "title": "Example News"}}
                    ]
                }
            }]
        })))
        .mount(&server)
        .await;

    let adapter = GeminiAdapter::new(reqwest::Client::new()).with_base_url(server.uri());
    let request = CanonicalRequest::new(TaskKind::SearchGenerate, "find trends").unwrap();
    let success = adapter.invoke(&request, "AIza-test").await.unwrap();

    assert_eq!(success.sources.len(), 1);
    assert_eq!(success.sources[0].title, "Example News");
    assert_eq!(success.sources[0].url, "https://news.example/a");
}
