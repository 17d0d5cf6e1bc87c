//! Provider adapters
//!
//! One adapter per backend, each translating a `CanonicalRequest` into that
//! provider's wire format and back. Adapters never let a transport or
//! provider error escape as a Rust error: every failure is caught locally
//! and converted into an `AttemptFailure` value for the router to record.

pub mod gemini;
pub mod grok;
pub mod openai;

pub use gemini::GeminiAdapter;
pub use grok::GrokAdapter;
pub use openai::OpenAiAdapter;

use crate::classify::classify;
use crate::request::CanonicalRequest;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt;
use std::time::Duration;

/// Third-party generative-AI backend identity. Static set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    Gemini,
    OpenAI,
    Grok,
}

impl ProviderId {
    /// All providers, in declaration order
    pub const ALL: [ProviderId; 3] = [ProviderId::Gemini, ProviderId::OpenAI, ProviderId::Grok];

    /// String identity for logging and the key store
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::OpenAI => "openai",
            Self::Grok => "grok",
        }
    }

    /// Whether this provider supports a capability
    ///
    /// Only Gemini supports Google Search tool-use and native audio/video in
    /// this design; OpenAI adds image understanding and generation; Grok is
    /// text-only.
    pub fn supports(&self, capability: Capability) -> bool {
        use Capability::*;
        match self {
            Self::Gemini => true,
            Self::OpenAI => matches!(capability, JsonMode | ImageInput | ImageGeneration),
            Self::Grok => matches!(capability, JsonMode),
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capability a task or attachment may require from a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    JsonMode,
    SearchGrounding,
    ImageInput,
    AudioInput,
    ImageGeneration,
    SpeechSynthesis,
    VideoGeneration,
}

/// Classified failure category for a single provider attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    AuthInvalid,
    QuotaExceeded,
    ServiceUnavailable,
    ContentBlocked,
    Unknown,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::AuthInvalid => "invalid credentials",
            Self::QuotaExceeded => "quota exceeded",
            Self::ServiceUnavailable => "service unavailable",
            Self::ContentBlocked => "content blocked",
            Self::Unknown => "unknown",
        };
        f.write_str(label)
    }
}

/// One failed provider attempt, produced per attempt and consumed by the router
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptFailure {
    pub provider: ProviderId,
    pub kind: FailureKind,
    pub message: String,
}

impl AttemptFailure {
    pub fn new(provider: ProviderId, kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            provider,
            kind,
            message: message.into(),
        }
    }

    /// Classify a reqwest transport error (no HTTP response at all)
    pub fn from_transport(provider: ProviderId, error: &reqwest::Error) -> Self {
        let kind = if error.is_timeout() || error.is_connect() {
            FailureKind::ServiceUnavailable
        } else {
            classify(error.status().map(|s| s.as_u16()), &error.to_string())
        };
        Self::new(provider, kind, error.to_string())
    }
}

impl fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} ({})", self.provider, self.message, self.kind)
    }
}

/// Web source cited by a search-grounded answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceCitation {
    pub title: String,
    pub url: String,
}

/// Base64 media payload returned inline by a provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineMedia {
    pub mime_type: String,
    /// Base64-encoded bytes, exactly as the provider returned them
    pub data: String,
}

impl InlineMedia {
    pub fn new(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    /// Canonical data-URI form used by the router for generated images
    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }
}

/// Successful provider attempt: raw text plus optional grounding sources
/// and inline media (generated image bytes, synthesized audio)
#[derive(Debug, Clone, Default)]
pub struct ProviderSuccess {
    pub text: String,
    pub sources: Vec<SourceCitation>,
    pub media: Option<InlineMedia>,
}

impl ProviderSuccess {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }
}

/// Per-attempt result: success value or classified failure
pub type AttemptOutcome = Result<ProviderSuccess, AttemptFailure>;

/// A provider backend
///
/// `invoke` performs one network round trip (or, for long-running video
/// generation, a bounded poll loop) and never panics or returns a raw
/// transport error.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Which provider this adapter speaks for
    fn id(&self) -> ProviderId;

    /// Issue the request against the backend with the given credential
    async fn invoke(&self, request: &CanonicalRequest, credential: &str) -> AttemptOutcome;
}

/// Sleep dependency for poll loops, injectable so tests can simulate
/// multiple poll iterations without real delay
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Production sleeper backed by the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Build an OpenAI-style chat-completions request body
///
/// Shared by the OpenAI and Grok adapters (xAI exposes an OpenAI-compatible
/// surface). Image attachments become `image_url` content parts carrying
/// data URIs; `response_shape = Json` sets `response_format: json_object`.
pub(crate) fn chat_completions_body(request: &CanonicalRequest, model: &str) -> Value {
    let mut messages = Vec::new();
    if let Some(system) = request.system_prompt() {
        messages.push(json!({"role": "system", "content": system}));
    }

    if request.attachments().is_empty() {
        messages.push(json!({"role": "user", "content": request.user_prompt()}));
    } else {
        let mut parts = vec![json!({"type": "text", "text": request.user_prompt()})];
        for attachment in request.attachments() {
            let uri = format!(
                "data:{};base64,{}",
                attachment.mime_type(),
                attachment.to_base64()
            );
            parts.push(json!({"type": "image_url", "image_url": {"url": uri}}));
        }
        messages.push(json!({"role": "user", "content": parts}));
    }

    let mut body = json!({"model": model, "messages": messages});
    if request.wants_json() {
        body["response_format"] = json!({"type": "json_object"});
    }
    body
}

/// Extract the error message from an OpenAI-style error body
pub(crate) fn openai_style_error_message(body: &Value) -> String {
    body["error"]["message"]
        .as_str()
        .map(str::to_string)
        .unwrap_or_else(|| body.to_string())
}
