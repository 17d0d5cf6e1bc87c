//! Grok adapter
//!
//! xAI exposes an OpenAI-compatible chat-completions surface, so this
//! adapter is a thin wrapper over the shared body builder. Text only:
//! every multimodal capability is declared unsupported and the router
//! never sends those tasks here.

use crate::classify::classify;
use crate::provider::{
    AttemptFailure, AttemptOutcome, FailureKind, ProviderAdapter, ProviderId, ProviderSuccess,
    chat_completions_body, openai_style_error_message,
};
use crate::request::{CanonicalRequest, TaskKind};
use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

const GROK_API_HOST: &str = "https://api.x.ai";

const CHAT_MODEL: &str = "grok-3";

pub struct GrokAdapter {
    http: reqwest::Client,
    base_url: String,
}

impl GrokAdapter {
    pub fn new(http: reqwest::Client) -> Self {
        Self {
            http,
            base_url: GROK_API_HOST.to_string(),
        }
    }

    /// Point the adapter at a different host (tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl ProviderAdapter for GrokAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Grok
    }

    async fn invoke(&self, request: &CanonicalRequest, credential: &str) -> AttemptOutcome {
        match request.task() {
            TaskKind::TextGenerate | TaskKind::JsonGenerate | TaskKind::ChatTurn => {}
            unsupported => {
                return Err(AttemptFailure::new(
                    ProviderId::Grok,
                    FailureKind::Unknown,
                    format!("task {unsupported:?} is not supported by this provider"),
                ));
            }
        }

        let body = chat_completions_body(request, CHAT_MODEL);
        debug!(provider = "grok", model = CHAT_MODEL, task = ?request.task(), "issuing chat completion");

        let url = format!("{}/v1/chat/completions", self.base_url);
        let response = self
            .http
            .post(&url)
            .bearer_auth(credential)
            .json(&body)
            .send()
            .await
            .map_err(|err| AttemptFailure::from_transport(ProviderId::Grok, &err))?;

        let status = response.status().as_u16();
        let payload: Value = response
            .json()
            .await
            .map_err(|err| AttemptFailure::from_transport(ProviderId::Grok, &err))?;

        if !(200..300).contains(&status) {
            let message = openai_style_error_message(&payload);
            let kind = classify(Some(status), &message);
            warn!(provider = "grok", status, kind = %kind, "request failed");
            return Err(AttemptFailure::new(ProviderId::Grok, kind, message));
        }

        match payload["choices"][0]["message"]["content"].as_str() {
            Some(content) => Ok(ProviderSuccess::text(content)),
            None => Err(AttemptFailure::new(
                ProviderId::Grok,
                FailureKind::Unknown,
                "chat completion carried no message content",
            )),
        }
    }
}
