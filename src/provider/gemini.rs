//! Gemini adapter
//!
//! Speaks the Generative Language REST surface (`v1beta`). The one adapter
//! that covers every task kind: text, JSON, search-grounded answers, image
//! generation, speech synthesis, transcription, and long-running video
//! generation with operation polling.

use crate::classify::classify;
use crate::provider::{
    AttemptFailure, AttemptOutcome, FailureKind, InlineMedia, ProviderAdapter, ProviderId,
    ProviderSuccess, Sleeper, SourceCitation, TokioSleeper,
};
use crate::request::{CanonicalRequest, TaskKind};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const GEMINI_API_HOST: &str = "https://generativelanguage.googleapis.com";

const TEXT_MODEL: &str = "gemini-3-flash-preview";
const SEARCH_MODEL: &str = "gemini-3-pro-preview";
const IMAGE_MODEL: &str = "gemini-2.5-flash-image";
const TTS_MODEL: &str = "gemini-2.5-flash-preview-tts";
const VIDEO_MODEL: &str = "veo-3.1-fast-generate-preview";

const DEFAULT_TTS_VOICE: &str = "Kore";
const IMAGE_ASPECT_RATIO: &str = "16:9";

/// Interval between long-running operation polls
const POLL_INTERVAL: Duration = Duration::from_secs(5);
/// Upper bound on polls before giving up (~10 minutes of video rendering)
const MAX_POLLS: u32 = 120;

pub struct GeminiAdapter {
    http: reqwest::Client,
    base_url: String,
    sleeper: Arc<dyn Sleeper>,
}

impl GeminiAdapter {
    pub fn new(http: reqwest::Client) -> Self {
        Self {
            http,
            base_url: GEMINI_API_HOST.to_string(),
            sleeper: Arc::new(TokioSleeper),
        }
    }

    /// Point the adapter at a different host (tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Replace the poll sleeper (tests)
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    fn model_for(task: TaskKind) -> &'static str {
        match task {
            TaskKind::SearchGenerate => SEARCH_MODEL,
            TaskKind::ImageGenerate => IMAGE_MODEL,
            TaskKind::SpeechSynthesize => TTS_MODEL,
            TaskKind::VideoGenerate => VIDEO_MODEL,
            _ => TEXT_MODEL,
        }
    }

    fn generate_content_url(&self, model: &str, credential: &str) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url, model, credential
        )
    }

    /// Build a `generateContent` body from the canonical request
    fn generate_content_body(request: &CanonicalRequest) -> Value {
        let mut parts = vec![json!({"text": request.user_prompt()})];
        for attachment in request.attachments() {
            parts.push(json!({
                "inlineData": {
                    "mimeType": attachment.mime_type(),
                    "data": attachment.to_base64(),
                }
            }));
        }

        let mut body = json!({
            "contents": [{"role": "user", "parts": parts}],
        });

        // For speech the system prompt slot carries the voice name, not an
        // instruction; it must never reach the model as systemInstruction.
        if request.task() != TaskKind::SpeechSynthesize {
            if let Some(system) = request.system_prompt() {
                body["systemInstruction"] = json!({"parts": [{"text": system}]});
            }
        }

        match request.task() {
            TaskKind::SearchGenerate => {
                // Search tool-use and responseMimeType are mutually exclusive
                // on this surface; grounded answers come back as prose.
                body["tools"] = json!([{"google_search": {}}]);
            }
            TaskKind::SpeechSynthesize => {
                let voice = request.system_prompt().unwrap_or(DEFAULT_TTS_VOICE);
                body["generationConfig"] = json!({
                    "responseModalities": ["AUDIO"],
                    "speechConfig": {
                        "voiceConfig": {"prebuiltVoiceConfig": {"voiceName": voice}}
                    }
                });
            }
            TaskKind::ImageGenerate => {
                body["generationConfig"] =
                    json!({"imageConfig": {"aspectRatio": IMAGE_ASPECT_RATIO}});
            }
            _ => {
                if request.wants_json() {
                    body["generationConfig"] = json!({"responseMimeType": "application/json"});
                }
            }
        }

        body
    }

    /// Pull text, inline media, and grounding citations out of a
    /// `generateContent` response
    fn parse_generate_content(body: &Value) -> AttemptOutcome {
        let Some(candidate) = body["candidates"].get(0) else {
            let reason = body["promptFeedback"]["blockReason"]
                .as_str()
                .unwrap_or("no candidates in response");
            let kind = classify(None, reason);
            return Err(AttemptFailure::new(ProviderId::Gemini, kind, reason.to_string()));
        };

        if candidate["finishReason"].as_str() == Some("SAFETY") {
            return Err(AttemptFailure::new(
                ProviderId::Gemini,
                FailureKind::ContentBlocked,
                "response blocked by safety filters",
            ));
        }

        let mut text = String::new();
        let mut media = None;
        if let Some(parts) = candidate["content"]["parts"].as_array() {
            for part in parts {
                if let Some(chunk) = part["text"].as_str() {
                    text.push_str(chunk);
                }
                if let (Some(mime), Some(data)) = (
                    part["inlineData"]["mimeType"].as_str(),
                    part["inlineData"]["data"].as_str(),
                ) {
                    media = Some(InlineMedia::new(mime, data));
                }
            }
        }

        let sources = candidate["groundingMetadata"]["groundingChunks"]
            .as_array()
            .map(|chunks| {
                chunks
                    .iter()
                    .filter_map(|chunk| {
                        let web = &chunk["web"];
                        let url = web["uri"].as_str()?;
                        // Title is optional; fall back to the URL itself
                        let title = web["title"].as_str().unwrap_or(url);
                        Some(SourceCitation {
                            title: title.to_string(),
                            url: url.to_string(),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        if text.is_empty() && media.is_none() {
            return Err(AttemptFailure::new(
                ProviderId::Gemini,
                FailureKind::Unknown,
                "candidate contained no text or inline data",
            ));
        }

        Ok(ProviderSuccess {
            text,
            sources,
            media,
        })
    }

    async fn invoke_generate_content(
        &self,
        request: &CanonicalRequest,
        credential: &str,
    ) -> AttemptOutcome {
        let model = Self::model_for(request.task());
        let url = self.generate_content_url(model, credential);
        let body = Self::generate_content_body(request);

        debug!(provider = "gemini", model, task = ?request.task(), "issuing generateContent");

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|err| AttemptFailure::from_transport(ProviderId::Gemini, &err))?;

        let status = response.status().as_u16();
        let payload: Value = response
            .json()
            .await
            .map_err(|err| AttemptFailure::from_transport(ProviderId::Gemini, &err))?;

        if !(200..300).contains(&status) {
            let message = payload["error"]["message"]
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| payload.to_string());
            let kind = classify(Some(status), &message);
            warn!(provider = "gemini", status, kind = %kind, "generateContent failed");
            return Err(AttemptFailure::new(ProviderId::Gemini, kind, message));
        }

        Self::parse_generate_content(&payload)
    }

    /// Kick off a Veo long-running operation and poll it until done
    async fn invoke_video(&self, request: &CanonicalRequest, credential: &str) -> AttemptOutcome {
        let start_url = format!(
            "{}/v1beta/models/{}:predictLongRunning?key={}",
            self.base_url, VIDEO_MODEL, credential
        );
        let body = json!({
            "instances": [{"prompt": request.user_prompt()}],
            "parameters": {"aspectRatio": "16:9"},
        });

        let payload = self.post_json(&start_url, &body).await?;
        let Some(operation) = payload["name"].as_str() else {
            return Err(AttemptFailure::new(
                ProviderId::Gemini,
                FailureKind::Unknown,
                "video operation response missing operation name",
            ));
        };
        let operation = operation.to_string();

        debug!(provider = "gemini", operation = %operation, "video generation started");

        for _ in 0..MAX_POLLS {
            self.sleeper.sleep(POLL_INTERVAL).await;

            let poll_url = format!("{}/v1beta/{}?key={}", self.base_url, operation, credential);
            let response = self
                .http
                .get(&poll_url)
                .send()
                .await
                .map_err(|err| AttemptFailure::from_transport(ProviderId::Gemini, &err))?;
            let status = response.status().as_u16();
            let payload: Value = response
                .json()
                .await
                .map_err(|err| AttemptFailure::from_transport(ProviderId::Gemini, &err))?;

            if !(200..300).contains(&status) {
                let message = payload["error"]["message"]
                    .as_str()
                    .map(str::to_string)
                    .unwrap_or_else(|| payload.to_string());
                return Err(AttemptFailure::new(
                    ProviderId::Gemini,
                    classify(Some(status), &message),
                    message,
                ));
            }

            if payload["done"].as_bool() != Some(true) {
                continue;
            }

            if let Some(message) = payload["error"]["message"].as_str() {
                return Err(AttemptFailure::new(
                    ProviderId::Gemini,
                    classify(None, message),
                    message.to_string(),
                ));
            }

            let uri = payload["response"]["generateVideoResponse"]["generatedSamples"][0]
                ["video"]["uri"]
                .as_str()
                .or_else(|| {
                    payload["response"]["generatedVideos"][0]["video"]["uri"].as_str()
                });
            return match uri {
                Some(uri) => Ok(ProviderSuccess::text(uri)),
                None => Err(AttemptFailure::new(
                    ProviderId::Gemini,
                    FailureKind::Unknown,
                    "completed video operation carried no video uri",
                )),
            };
        }

        Err(AttemptFailure::new(
            ProviderId::Gemini,
            FailureKind::ServiceUnavailable,
            "video generation did not complete in time",
        ))
    }

    async fn post_json(&self, url: &str, body: &Value) -> Result<Value, AttemptFailure> {
        let response = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|err| AttemptFailure::from_transport(ProviderId::Gemini, &err))?;
        let status = response.status().as_u16();
        let payload: Value = response
            .json()
            .await
            .map_err(|err| AttemptFailure::from_transport(ProviderId::Gemini, &err))?;

        if !(200..300).contains(&status) {
            let message = payload["error"]["message"]
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| payload.to_string());
            return Err(AttemptFailure::new(
                ProviderId::Gemini,
                classify(Some(status), &message),
                message,
            ));
        }
        Ok(payload)
    }
}

#[async_trait]
impl ProviderAdapter for GeminiAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Gemini
    }

    async fn invoke(&self, request: &CanonicalRequest, credential: &str) -> AttemptOutcome {
        match request.task() {
            TaskKind::VideoGenerate => self.invoke_video(request, credential).await,
            _ => self.invoke_generate_content(request, credential).await,
        }
    }
}
