//! TubeGrow: AI-assisted YouTube growth toolkit
//!
//! The core of the crate is a fallback router that sends each request to an
//! ordered chain of AI providers (Gemini, OpenAI, Grok) and returns the
//! first usable answer. Provider credentials live in a [`KeyRegistry`] that
//! is re-read on every call, so keys saved in settings take effect
//! immediately. On top of the router, [`studio::Studio`] exposes the
//! product operations (metadata, scripts, trend research, thumbnail
//! critique and generation, video audits, speech, transcription, video
//! generation, chat), and [`youtube::YouTubeClient`] reads the connected
//! channel's statistics from the YouTube Data API.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tubegrow::{FallbackRouter, KeyRegistry, Language, ProviderId};
//! use tubegrow::studio::Studio;
//!
//! # async fn run() -> tubegrow::AppResult<()> {
//! let registry = Arc::new(KeyRegistry::load("keys.toml")?);
//! registry.set(ProviderId::Gemini, "AIza...");
//!
//! let studio = Studio::new(FallbackRouter::new(registry)?);
//! let metadata = studio
//!     .generate_video_metadata("growing tomatoes indoors", "enthusiastic", Language::En)
//!     .await?;
//! println!("{:?}", metadata.titles);
//! # Ok(())
//! # }
//! ```

pub mod classify;
pub mod error;
pub mod normalize;
pub mod provider;
pub mod registry;
pub mod request;
pub mod router;
pub mod studio;
pub mod telemetry;
pub mod youtube;

pub use error::{AppError, AppResult};
pub use provider::{AttemptFailure, FailureKind, ProviderId};
pub use registry::KeyRegistry;
pub use request::{Attachment, CanonicalRequest, Language, ResponseShape, TaskKind};
pub use router::{FallbackRouter, ParsedResult, RoutedResponse};
