//! Error types for TubeGrow
//!
//! Adapter-level provider failures are *values* (`AttemptFailure`), not errors:
//! they are collected by the router and only surface here once the whole
//! fallback chain is exhausted.

use crate::provider::AttemptFailure;
use crate::request::TaskKind;
use thiserror::Error;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Failed to read key store at {path}: {source}")]
    KeyStoreRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse key store at {path}: {source}")]
    KeyStoreParse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to write key store at {path}: {source}")]
    KeyStoreWrite {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// No provider eligible for this task had a credential configured.
    /// Raised before any network call is made.
    #[error("No provider configured for {task:?}. Add an API key in settings.")]
    NoProviderConfigured { task: TaskKind },

    /// Every eligible provider was attempted once and failed.
    ///
    /// The message carries each per-provider failure so the UI can show one
    /// coherent diagnostic instead of a generic "request failed".
    #[error("All configured providers failed: {}", join_failures(.failures))]
    AllProvidersFailed { failures: Vec<AttemptFailure> },

    /// A provider responded, but the payload did not decode into the
    /// expected shape (missing fields, wrong structure).
    #[error("Unexpected {context} payload: {reason}")]
    MalformedResponse { context: String, reason: String },

    #[error("YouTube API error ({status}): {message}")]
    YouTubeApi { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

impl AppError {
    /// Per-provider failure records for an `AllProvidersFailed` error,
    /// empty for every other variant. The `kind` tag on each record lets a
    /// UI distinguish transient failures (quota, outage) from permanent
    /// ones (bad key) if it chooses to.
    pub fn failures(&self) -> &[AttemptFailure] {
        match self {
            Self::AllProvidersFailed { failures } => failures,
            _ => &[],
        }
    }
}

fn join_failures(failures: &[AttemptFailure]) -> String {
    failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Convenience type alias for Results
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{FailureKind, ProviderId};

    #[test]
    fn test_config_error_creates() {
        let err = AppError::Config("test error".to_string());
        assert_eq!(err.to_string(), "Configuration error: test error");
    }

    #[test]
    fn test_no_provider_configured_names_task() {
        let err = AppError::NoProviderConfigured {
            task: TaskKind::SearchGenerate,
        };
        assert!(err.to_string().contains("SearchGenerate"));
    }

    #[test]
    fn test_all_providers_failed_joins_every_message() {
        let err = AppError::AllProvidersFailed {
            failures: vec![
                AttemptFailure::new(
                    ProviderId::OpenAI,
                    FailureKind::QuotaExceeded,
                    "You exceeded your current quota",
                ),
                AttemptFailure::new(
                    ProviderId::Gemini,
                    FailureKind::AuthInvalid,
                    "API key not valid",
                ),
            ],
        };

        let msg = err.to_string();
        assert!(msg.contains("exceeded your current quota"), "got: {}", msg);
        assert!(msg.contains("API key not valid"), "got: {}", msg);
        assert!(msg.contains("openai"), "got: {}", msg);
        assert!(msg.contains("gemini"), "got: {}", msg);
    }

    #[test]
    fn test_failures_accessor_empty_for_other_variants() {
        let err = AppError::Validation("bad".to_string());
        assert!(err.failures().is_empty());
    }
}
