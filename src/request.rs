//! Canonical request model
//!
//! One `CanonicalRequest` is built per UI action and is immutable once
//! constructed. It is the provider-agnostic representation of "what the user
//! wants"; each adapter translates it into that provider's wire format.

use crate::error::{AppError, AppResult};
use crate::provider::Capability;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

/// Task classification for a canonical request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    TextGenerate,
    JsonGenerate,
    ImageGenerate,
    SearchGenerate,
    SpeechSynthesize,
    Transcribe,
    VideoGenerate,
    ChatTurn,
}

impl TaskKind {
    /// Capability a provider must have to be attempted for this task.
    ///
    /// A provider lacking the capability is skipped entirely: it would
    /// silently ignore the requirement (an adapter without search tool-use
    /// cannot be "corrected" by retrying), so it is never a candidate.
    pub fn required_capability(&self) -> Option<Capability> {
        match self {
            Self::SearchGenerate => Some(Capability::SearchGrounding),
            Self::ImageGenerate => Some(Capability::ImageGeneration),
            Self::SpeechSynthesize => Some(Capability::SpeechSynthesis),
            Self::Transcribe => Some(Capability::AudioInput),
            Self::VideoGenerate => Some(Capability::VideoGeneration),
            Self::TextGenerate | Self::JsonGenerate | Self::ChatTurn => None,
        }
    }
}

/// Expected shape of the provider's answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ResponseShape {
    #[default]
    PlainText,
    Json,
}

/// Output language requested by the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Vi,
    Zh,
    Ja,
}

impl Language {
    /// Human-readable name used inside prompts
    pub fn prompt_name(&self) -> &'static str {
        match self {
            Self::En => "English",
            Self::Vi => "Vietnamese",
            Self::Zh => "Chinese (Simplified)",
            Self::Ja => "Japanese",
        }
    }
}

/// Binary payload attached to a request (thumbnail to rate, audio to transcribe)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    mime_type: String,
    data: Vec<u8>,
}

impl Attachment {
    pub fn new(mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data,
        }
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }

    pub fn is_audio(&self) -> bool {
        self.mime_type.starts_with("audio/")
    }

    /// Base64 encoding used by every provider's inline-data wire shape
    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.data)
    }
}

/// Provider-agnostic request, one per UI action
///
/// Fields are private to keep a constructed request immutable and validated:
/// the prompt is guaranteed non-blank and `JsonGenerate` always carries a
/// `Json` response shape.
#[derive(Debug, Clone)]
pub struct CanonicalRequest {
    task: TaskKind,
    system_prompt: Option<String>,
    user_prompt: String,
    attachments: Vec<Attachment>,
    response_shape: ResponseShape,
    language: Language,
}

impl CanonicalRequest {
    /// Create a request, validating the prompt
    ///
    /// # Errors
    /// Returns `AppError::Validation` if the prompt is empty or whitespace.
    pub fn new(task: TaskKind, user_prompt: impl Into<String>) -> AppResult<Self> {
        let user_prompt = user_prompt.into();
        if user_prompt.trim().is_empty() {
            return Err(AppError::Validation(
                "user_prompt cannot be empty or contain only whitespace".to_string(),
            ));
        }

        let response_shape = match task {
            TaskKind::JsonGenerate => ResponseShape::Json,
            _ => ResponseShape::PlainText,
        };

        Ok(Self {
            task,
            system_prompt: None,
            user_prompt,
            attachments: Vec::new(),
            response_shape,
            language: Language::default(),
        })
    }

    /// Set the system prompt
    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    /// Add a binary attachment
    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Override the expected response shape
    pub fn with_response_shape(mut self, shape: ResponseShape) -> Self {
        self.response_shape = shape;
        self
    }

    /// Set the output language
    pub fn with_language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    pub fn task(&self) -> TaskKind {
        self.task
    }

    pub fn system_prompt(&self) -> Option<&str> {
        self.system_prompt.as_deref()
    }

    pub fn user_prompt(&self) -> &str {
        &self.user_prompt
    }

    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    pub fn response_shape(&self) -> ResponseShape {
        self.response_shape
    }

    pub fn language(&self) -> Language {
        self.language
    }

    /// True when the router must normalize the answer into JSON
    pub fn wants_json(&self) -> bool {
        self.response_shape == ResponseShape::Json
    }

    /// Every capability a provider must have to serve this request:
    /// the task's own requirement plus one per attached modality.
    pub fn required_capabilities(&self) -> Vec<Capability> {
        let mut caps = Vec::new();
        if let Some(cap) = self.task.required_capability() {
            caps.push(cap);
        }
        if self.attachments.iter().any(Attachment::is_image) {
            caps.push(Capability::ImageInput);
        }
        if self.attachments.iter().any(Attachment::is_audio) && !caps.contains(&Capability::AudioInput) {
            caps.push(Capability::AudioInput);
        }
        caps
    }
}
