//! OpenAI adapter
//!
//! Chat completions for text/JSON/vision tasks, the images endpoint for
//! thumbnail generation. Tasks OpenAI cannot serve here (search grounding,
//! speech, transcription, video) are filtered out by the router's capability
//! check; if one slips through it fails the attempt rather than panicking.

use crate::classify::classify;
use crate::provider::{
    AttemptFailure, AttemptOutcome, FailureKind, InlineMedia, ProviderAdapter, ProviderId,
    ProviderSuccess, chat_completions_body, openai_style_error_message,
};
use crate::request::{CanonicalRequest, TaskKind};
use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::{debug, warn};

const OPENAI_API_HOST: &str = "https://api.openai.com";

const CHAT_MODEL: &str = "gpt-4o";
const IMAGE_MODEL: &str = "dall-e-3";

pub struct OpenAiAdapter {
    http: reqwest::Client,
    base_url: String,
}

impl OpenAiAdapter {
    pub fn new(http: reqwest::Client) -> Self {
        Self {
            http,
            base_url: OPENAI_API_HOST.to_string(),
        }
    }

    /// Point the adapter at a different host (tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn post(&self, path: &str, body: &Value, credential: &str) -> Result<Value, AttemptFailure> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .post(&url)
            .bearer_auth(credential)
            .json(body)
            .send()
            .await
            .map_err(|err| AttemptFailure::from_transport(ProviderId::OpenAI, &err))?;

        let status = response.status().as_u16();
        let payload: Value = response
            .json()
            .await
            .map_err(|err| AttemptFailure::from_transport(ProviderId::OpenAI, &err))?;

        if !(200..300).contains(&status) {
            let message = openai_style_error_message(&payload);
            let kind = classify(Some(status), &message);
            warn!(provider = "openai", status, kind = %kind, "request failed");
            return Err(AttemptFailure::new(ProviderId::OpenAI, kind, message));
        }
        Ok(payload)
    }

    async fn invoke_chat(&self, request: &CanonicalRequest, credential: &str) -> AttemptOutcome {
        let body = chat_completions_body(request, CHAT_MODEL);
        debug!(provider = "openai", model = CHAT_MODEL, task = ?request.task(), "issuing chat completion");

        let payload = self.post("/v1/chat/completions", &body, credential).await?;
        match payload["choices"][0]["message"]["content"].as_str() {
            Some(content) => Ok(ProviderSuccess::text(content)),
            None => Err(AttemptFailure::new(
                ProviderId::OpenAI,
                FailureKind::Unknown,
                "chat completion carried no message content",
            )),
        }
    }

    async fn invoke_image(&self, request: &CanonicalRequest, credential: &str) -> AttemptOutcome {
        let body = json!({
            "model": IMAGE_MODEL,
            "prompt": request.user_prompt(),
            "n": 1,
            "size": "1024x1024",
            "response_format": "b64_json",
        });
        debug!(provider = "openai", model = IMAGE_MODEL, "issuing image generation");

        let payload = self.post("/v1/images/generations", &body, credential).await?;
        match payload["data"][0]["b64_json"].as_str() {
            Some(data) => Ok(ProviderSuccess {
                text: String::new(),
                sources: Vec::new(),
                media: Some(InlineMedia::new("image/png", data)),
            }),
            None => Err(AttemptFailure::new(
                ProviderId::OpenAI,
                FailureKind::Unknown,
                "image response carried no b64_json payload",
            )),
        }
    }
}

#[async_trait]
impl ProviderAdapter for OpenAiAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::OpenAI
    }

    async fn invoke(&self, request: &CanonicalRequest, credential: &str) -> AttemptOutcome {
        match request.task() {
            TaskKind::ImageGenerate => self.invoke_image(request, credential).await,
            TaskKind::TextGenerate
            | TaskKind::JsonGenerate
            | TaskKind::ChatTurn => self.invoke_chat(request, credential).await,
            unsupported => Err(AttemptFailure::new(
                ProviderId::OpenAI,
                FailureKind::Unknown,
                format!("task {unsupported:?} is not supported by this provider"),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unsupported_task_fails_without_network() {
        // base_url points nowhere; an unsupported task must fail before any
        // request is built.
        let adapter = OpenAiAdapter::new(reqwest::Client::new())
            .with_base_url("http://127.0.0.1:1");
        let request = CanonicalRequest::new(TaskKind::SearchGenerate, "find trends").unwrap();

        let failure = adapter.invoke(&request, "sk-test").await.unwrap_err();
        assert_eq!(failure.provider, ProviderId::OpenAI);
        assert_eq!(failure.kind, FailureKind::Unknown);
        assert!(failure.message.contains("not supported"));
    }
}
