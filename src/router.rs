//! Fallback router
//!
//! Orders the configured providers for a request, attempts each exactly
//! once, and canonicalizes the first success. Credentials are snapshotted
//! from the registry at the start of every call, so settings changes apply
//! to the next request immediately.
//!
//! Design decisions worth calling out:
//! - One attempt per provider per call. No retries, no backoff: the next
//!   provider in the chain *is* the retry.
//! - A provider that returns unparseable output for a JSON task is recorded
//!   as a failed attempt and the chain continues; a later provider may
//!   produce valid JSON.
//! - Capability filtering happens before any network call, so a text-only
//!   provider is never asked to ground a search or synthesize speech.

use crate::error::{AppError, AppResult};
use crate::normalize::normalize;
use crate::provider::{
    AttemptFailure, FailureKind, GeminiAdapter, GrokAdapter, OpenAiAdapter, ProviderAdapter,
    ProviderId, ProviderSuccess, SourceCitation,
};
use crate::registry::KeyRegistry;
use crate::request::{CanonicalRequest, TaskKind};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

/// Transport-level ceiling per provider attempt. Generous because image
/// generation regularly takes tens of seconds.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Parsed payload of a routed response
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedResult {
    Text(String),
    Json(Value),
}

impl ParsedResult {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Json(_) => None,
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            Self::Text(_) => None,
        }
    }

    /// Decode a JSON result into a concrete type
    pub fn decode<T: serde::de::DeserializeOwned>(&self, context: &str) -> AppResult<T> {
        match self {
            Self::Json(value) => {
                serde_json::from_value(value.clone()).map_err(|err| AppError::MalformedResponse {
                    context: context.to_string(),
                    reason: err.to_string(),
                })
            }
            Self::Text(_) => Err(AppError::MalformedResponse {
                context: context.to_string(),
                reason: "expected a JSON payload, got plain text".to_string(),
            }),
        }
    }
}

/// Successful routing outcome: which provider answered and with what
#[derive(Debug, Clone)]
pub struct RoutedResponse {
    provider: ProviderId,
    result: ParsedResult,
    sources: Vec<SourceCitation>,
}

impl RoutedResponse {
    pub fn provider(&self) -> ProviderId {
        self.provider
    }

    pub fn result(&self) -> &ParsedResult {
        &self.result
    }

    pub fn into_result(self) -> ParsedResult {
        self.result
    }

    pub fn sources(&self) -> &[SourceCitation] {
        &self.sources
    }
}

/// Routes canonical requests across provider adapters in priority order
pub struct FallbackRouter {
    registry: Arc<KeyRegistry>,
    adapters: Vec<Box<dyn ProviderAdapter>>,
}

impl FallbackRouter {
    /// Router with the default production adapters
    pub fn new(registry: Arc<KeyRegistry>) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| AppError::Config(format!("failed to build http client: {err}")))?;

        Ok(Self {
            registry,
            adapters: vec![
                Box::new(GeminiAdapter::new(http.clone())),
                Box::new(OpenAiAdapter::new(http.clone())),
                Box::new(GrokAdapter::new(http)),
            ],
        })
    }

    /// Router with custom adapters, for tests and alternate deployments
    pub fn with_adapters(
        registry: Arc<KeyRegistry>,
        adapters: Vec<Box<dyn ProviderAdapter>>,
    ) -> Self {
        Self { registry, adapters }
    }

    /// Preferred provider order for a task
    ///
    /// Gemini leads for anything needing search grounding or a non-text
    /// modality, and for requests carrying attachments; plain text and JSON
    /// tasks lead with OpenAI.
    fn priority_order(request: &CanonicalRequest) -> [ProviderId; 3] {
        let gemini_first = matches!(
            request.task(),
            TaskKind::SearchGenerate
                | TaskKind::SpeechSynthesize
                | TaskKind::Transcribe
                | TaskKind::VideoGenerate
        ) || !request.attachments().is_empty();

        if gemini_first {
            [ProviderId::Gemini, ProviderId::OpenAI, ProviderId::Grok]
        } else {
            [ProviderId::OpenAI, ProviderId::Gemini, ProviderId::Grok]
        }
    }

    /// Ordered candidates for a request: priority order, filtered down to
    /// providers with a non-blank credential in the snapshot that support
    /// every required capability. Derived entirely from the snapshot so the
    /// candidate set and the credentials can never disagree mid-call.
    fn candidates<'a>(
        request: &CanonicalRequest,
        credentials: &'a BTreeMap<ProviderId, String>,
    ) -> Vec<(ProviderId, &'a str)> {
        let required = request.required_capabilities();
        Self::priority_order(request)
            .into_iter()
            .filter(|provider| required.iter().all(|cap| provider.supports(*cap)))
            .filter_map(|provider| {
                let key = credentials.get(&provider)?;
                if key.trim().is_empty() {
                    return None;
                }
                Some((provider, key.as_str()))
            })
            .collect()
    }

    fn adapter(&self, provider: ProviderId) -> Option<&dyn ProviderAdapter> {
        self.adapters
            .iter()
            .map(|adapter| adapter.as_ref())
            .find(|adapter| adapter.id() == provider)
    }

    /// Route a request through the fallback chain
    ///
    /// # Errors
    /// - `NoProviderConfigured` when no configured provider can serve the
    ///   task; returned before any network call.
    /// - `AllProvidersFailed` when every candidate was attempted once and
    ///   failed, carrying each per-provider failure.
    pub async fn route(&self, request: &CanonicalRequest) -> AppResult<RoutedResponse> {
        let request_id = Uuid::new_v4();
        let credentials = self.registry.snapshot();
        let candidates = Self::candidates(request, &credentials);

        info!(
            %request_id,
            task = ?request.task(),
            candidates = ?candidates.iter().map(|(provider, _)| *provider).collect::<Vec<_>>(),
            "routing request"
        );

        if candidates.is_empty() {
            return Err(AppError::NoProviderConfigured {
                task: request.task(),
            });
        }

        let mut failures = Vec::new();
        for (provider, credential) in candidates {
            let Some(adapter) = self.adapter(provider) else {
                // Configured key but no adapter installed; record and move on
                failures.push(AttemptFailure::new(
                    provider,
                    FailureKind::Unknown,
                    "no adapter installed for this provider",
                ));
                continue;
            };

            match adapter.invoke(request, credential).await {
                Ok(success) => match finish(request, provider, success) {
                    Ok(response) => {
                        info!(%request_id, provider = %provider, "request served");
                        return Ok(response);
                    }
                    Err(failure) => {
                        warn!(
                            %request_id,
                            provider = %provider,
                            kind = %failure.kind,
                            "response rejected: {}",
                            failure.message
                        );
                        failures.push(failure);
                    }
                },
                Err(failure) => {
                    warn!(
                        %request_id,
                        provider = %provider,
                        kind = %failure.kind,
                        "attempt failed: {}",
                        failure.message
                    );
                    failures.push(failure);
                }
            }
        }

        Err(AppError::AllProvidersFailed { failures })
    }
}

/// Canonicalize a provider success into the shape the request asked for
///
/// Failures here count as failed attempts, not terminal errors: the chain
/// continues with the next provider.
fn finish(
    request: &CanonicalRequest,
    provider: ProviderId,
    success: ProviderSuccess,
) -> Result<RoutedResponse, AttemptFailure> {
    let ProviderSuccess {
        text,
        sources,
        media,
    } = success;

    let result = match request.task() {
        TaskKind::ImageGenerate => match media {
            Some(media) => ParsedResult::Text(media.to_data_uri()),
            None => {
                return Err(AttemptFailure::new(
                    provider,
                    FailureKind::Unknown,
                    "image task returned no inline media",
                ));
            }
        },
        TaskKind::SpeechSynthesize => match media {
            // Raw base64 PCM, exactly as the provider returned it; the
            // caller owns decoding and playback.
            Some(media) => ParsedResult::Text(media.data),
            None => {
                return Err(AttemptFailure::new(
                    provider,
                    FailureKind::Unknown,
                    "speech task returned no audio data",
                ));
            }
        },
        _ if request.wants_json() => match normalize(&text) {
            Some(value) => ParsedResult::Json(value),
            None => {
                return Err(AttemptFailure::new(
                    provider,
                    FailureKind::Unknown,
                    "response could not be parsed as JSON",
                ));
            }
        },
        _ => ParsedResult::Text(text),
    };

    Ok(RoutedResponse {
        provider,
        result,
        sources,
    })
}
