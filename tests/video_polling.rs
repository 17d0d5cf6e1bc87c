//! Integration tests for long-running video generation
//!
//! The Veo flow starts an operation and polls it every five seconds until
//! `done`. A recording sleeper stands in for the tokio timer so the tests
//! observe the cadence without waiting.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tubegrow::provider::{FailureKind, GeminiAdapter, ProviderAdapter, Sleeper};
use tubegrow::{CanonicalRequest, TaskKind};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Sleeper that records requested durations instead of waiting
#[derive(Default)]
struct RecordingSleeper {
    slept: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    fn durations(&self) -> Vec<Duration> {
        self.slept.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.slept.lock().unwrap().push(duration);
    }
}

fn video_request() -> CanonicalRequest {
    CanonicalRequest::new(TaskKind::VideoGenerate, "a timelapse of a growing plant").unwrap()
}

#[tokio::test]
async fn test_video_polls_until_done_then_returns_uri() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(
            "/v1beta/models/veo-3.1-fast-generate-preview:predictLongRunning",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "name": "models/veo-3.1-fast-generate-preview/operations/op-123"
        })))
        .mount(&server)
        .await;

    // Two pending polls, then completion
    Mock::given(method("GET"))
        .and(path(
            "/v1beta/models/veo-3.1-fast-generate-preview/operations/op-123",
        ))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"done": false})),
        )
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(
            "/v1beta/models/veo-3.1-fast-generate-preview/operations/op-123",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "done": true,
            "response": {
                "generateVideoResponse": {
                    "generatedSamples": [
                        {"video": {"uri": "https://video.example/clip.mp4"}}
                    ]
                }
            }
        })))
        .mount(&server)
        .await;

    let sleeper = Arc::new(RecordingSleeper::default());
    let adapter = GeminiAdapter::new(reqwest::Client::new())
        .with_base_url(server.uri())
        .with_sleeper(sleeper.clone());

    let success = adapter.invoke(&video_request(), "AIza-test").await.unwrap();
    assert_eq!(success.text, "https://video.example/clip.mp4");

    // One sleep before each of the three polls, five seconds apart
    let slept = sleeper.durations();
    assert_eq!(slept.len(), 3);
    assert!(slept.iter().all(|d| *d == Duration::from_secs(5)));
}

#[tokio::test]
async fn test_video_operation_error_fails_the_attempt() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "name": "models/veo-3.1-fast-generate-preview/operations/op-err"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "done": true,
            "error": {"message": "The response was blocked due to SAFETY"}
        })))
        .mount(&server)
        .await;

    let adapter = GeminiAdapter::new(reqwest::Client::new())
        .with_base_url(server.uri())
        .with_sleeper(Arc::new(RecordingSleeper::default()));

    let failure = adapter.invoke(&video_request(), "AIza-test").await.unwrap_err();
    assert_eq!(failure.kind, FailureKind::ContentBlocked);
}

#[tokio::test]
async fn test_video_start_rejection_never_polls() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
            "error": {"message": "Quota exceeded for generate requests"}
        })))
        .mount(&server)
        .await;

    let sleeper = Arc::new(RecordingSleeper::default());
    let adapter = GeminiAdapter::new(reqwest::Client::new())
        .with_base_url(server.uri())
        .with_sleeper(sleeper.clone());

    let failure = adapter.invoke(&video_request(), "AIza-test").await.unwrap_err();
    assert_eq!(failure.kind, FailureKind::QuotaExceeded);
    assert!(sleeper.durations().is_empty(), "no polls after a rejected start");
}

#[tokio::test]
async fn test_missing_operation_name_is_unknown_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .mount(&server)
        .await;

    let adapter = GeminiAdapter::new(reqwest::Client::new())
        .with_base_url(server.uri())
        .with_sleeper(Arc::new(RecordingSleeper::default()));

    let failure = adapter.invoke(&video_request(), "AIza-test").await.unwrap_err();
    assert_eq!(failure.kind, FailureKind::Unknown);
    assert!(failure.message.contains("operation name"));
}
