//! Creator studio facade
//!
//! The high-level operations the product exposes: each builds a canonical
//! request with the right prompt, routes it through the fallback chain, and
//! decodes the answer into a typed result. Prompts embed the requested
//! output language by name so every provider answers in the user's locale.

use crate::error::{AppError, AppResult};
use crate::provider::SourceCitation;
use crate::request::{Attachment, CanonicalRequest, Language, ResponseShape, TaskKind};
use crate::router::{FallbackRouter, ParsedResult, RoutedResponse};
use serde::{Deserialize, Serialize};
use tracing::info;

/// SEO metadata for a planned video
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub titles: Vec<String>,
    pub description: String,
    pub tags: String,
}

/// Trend research result: prose report plus any web citations
#[derive(Debug, Clone)]
pub struct TrendReport {
    pub text: String,
    pub sources: Vec<SourceCitation>,
}

/// Audit verdict for an existing video
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoAudit {
    #[serde(rename = "videoTitle")]
    pub video_title: String,
    #[serde(rename = "channelName", default)]
    pub channel_name: String,
    pub score: u32,
    pub summary: String,
    #[serde(default)]
    pub positives: Vec<String>,
    #[serde(default)]
    pub negatives: Vec<String>,
    #[serde(default)]
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyAnalysis {
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyMetadata {
    pub title_options: Vec<String>,
    pub description: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThumbnailIdea {
    pub visual_description: String,
    pub text_overlay: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptOutline {
    pub hook: String,
    pub content_beats: Vec<String>,
    pub cta: String,
}

/// Complete viral strategy package
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViralStrategy {
    #[serde(default)]
    pub original_channel: String,
    pub strategy_title: String,
    #[serde(default)]
    pub trend_context: String,
    pub analysis: StrategyAnalysis,
    pub target_audience: String,
    pub metadata: StrategyMetadata,
    pub thumbnail_idea: ThumbnailIdea,
    pub script_outline: ScriptOutline,
    #[serde(default)]
    pub promotion_plan: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelInfoVideo {
    pub title: String,
    #[serde(default)]
    pub views: String,
    #[serde(default)]
    pub published_at: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub thumbnail: String,
}

/// Search-derived public profile of a channel. Counts are approximate
/// strings ("1.5M"), not numbers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelInfo {
    pub name: String,
    #[serde(default)]
    pub subscriber_count: String,
    #[serde(default)]
    pub view_count: String,
    #[serde(default)]
    pub video_count: String,
    #[serde(default)]
    pub avatar: String,
    #[serde(default)]
    pub recent_videos: Vec<ChannelInfoVideo>,
}

/// One turn in an assistant conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Model,
}

/// Stateful assistant conversation
///
/// Providers here are stateless, so history is replayed into each request as
/// a transcript. The session owns its history; `Studio::send_chat` appends
/// both sides after a successful turn.
#[derive(Debug, Clone)]
pub struct ChatSession {
    system_prompt: String,
    history: Vec<ChatMessage>,
    language: Language,
}

impl ChatSession {
    pub fn new(language: Language) -> Self {
        let system_prompt = format!(
            "You are an expert YouTube Strategist. Answer in {}. \
             Be helpful, concise, and professional.",
            language.prompt_name()
        );
        Self {
            system_prompt,
            history: Vec::new(),
            language,
        }
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    /// Flatten history plus the new message into a single prompt
    fn transcript_with(&self, message: &str) -> String {
        let mut transcript = String::new();
        for turn in &self.history {
            let speaker = match turn.role {
                ChatRole::User => "User",
                ChatRole::Model => "Assistant",
            };
            transcript.push_str(&format!("{}: {}\n", speaker, turn.text));
        }
        transcript.push_str(&format!("User: {}\nAssistant:", message));
        transcript
    }

    fn record(&mut self, user: &str, model: &str) {
        self.history.push(ChatMessage {
            role: ChatRole::User,
            text: user.to_string(),
        });
        self.history.push(ChatMessage {
            role: ChatRole::Model,
            text: model.to_string(),
        });
    }
}

/// High-level entry point tying prompts, routing, and decoding together
pub struct Studio {
    router: FallbackRouter,
}

impl Studio {
    pub fn new(router: FallbackRouter) -> Self {
        Self { router }
    }

    pub fn router(&self) -> &FallbackRouter {
        &self.router
    }

    /// SEO metadata (titles, description, tags) for a video topic
    pub async fn generate_video_metadata(
        &self,
        topic: &str,
        tone: &str,
        language: Language,
    ) -> AppResult<VideoMetadata> {
        let prompt = format!(
            "You are a YouTube SEO Expert. Generate metadata for a video about \"{topic}\". \
             Tone: {tone}.\n\
             IMPORTANT: The content MUST be generated in {lang}.\n\
             Return a JSON object with:\n\
             1. 5 click-worthy, high CTR titles.\n\
             2. A compelling video description (first 2 lines are hooks).\n\
             3. 15 comma-separated tags.\n\n\
             JSON Structure: {{ \"titles\": [], \"description\": \"\", \"tags\": \"\" }}",
            lang = language.prompt_name(),
        );

        let request =
            CanonicalRequest::new(TaskKind::JsonGenerate, prompt)?.with_language(language);
        let response = self.router.route(&request).await?;
        response.result().decode("video metadata")
    }

    /// Full video script in markdown
    pub async fn generate_script(
        &self,
        title: &str,
        points: &str,
        language: Language,
    ) -> AppResult<String> {
        let prompt = format!(
            "Write a full YouTube video script for the title: \"{title}\".\n\
             Key points to cover: {points}.\n\
             IMPORTANT: Write the entire script in {lang}.\n\
             Structure: Hook (0-30s), Intro, Body, CTA, Outro.\n\
             Use Markdown formatting. Make it engaging.",
            lang = language.prompt_name(),
        );

        let request =
            CanonicalRequest::new(TaskKind::TextGenerate, prompt)?.with_language(language);
        let response = self.router.route(&request).await?;
        Ok(text_of(response))
    }

    /// Breakout trends for a niche
    ///
    /// Grounded search first; if the whole grounded chain fails, retries as
    /// a plain brainstorming prompt so the user still gets ideas, just
    /// without citations.
    pub async fn find_trends(&self, niche: &str, language: Language) -> AppResult<TrendReport> {
        let lang = language.prompt_name();
        let grounded_prompt = format!(
            "Find the latest trending topics and news in the \"{niche}\" niche using Google Search.\n\
             Identify 5 breakout trends that would make good YouTube videos right now.\n\
             For each trend, suggest a video angle.\n\
             IMPORTANT: Provide the response in {lang}.\n\
             Format the output as a clean Markdown list. Include links to sources where possible."
        );

        let grounded = CanonicalRequest::new(TaskKind::SearchGenerate, grounded_prompt)?
            .with_language(language);
        match self.router.route(&grounded).await {
            Ok(response) => {
                let sources = response.sources().to_vec();
                Ok(TrendReport {
                    text: text_of(response),
                    sources,
                })
            }
            Err(err) => {
                info!("grounded trend search failed, brainstorming instead: {err}");
                let fallback_prompt =
                    format!("Suggest 5 evergreen trending topics for \"{niche}\" in {lang}.");
                let fallback = CanonicalRequest::new(TaskKind::TextGenerate, fallback_prompt)?
                    .with_language(language);
                let response = self.router.route(&fallback).await?;
                Ok(TrendReport {
                    text: text_of(response),
                    sources: Vec::new(),
                })
            }
        }
    }

    /// Critique a thumbnail image: CTR score, strengths, weaknesses
    pub async fn analyze_thumbnail(
        &self,
        image: Attachment,
        context: &str,
        language: Language,
    ) -> AppResult<String> {
        if !image.is_image() {
            return Err(AppError::Validation(format!(
                "thumbnail attachment must be an image, got {}",
                image.mime_type()
            )));
        }

        let context = if context.trim().is_empty() {
            "General YouTube Video"
        } else {
            context
        };
        let prompt = format!(
            "Analyze this YouTube thumbnail. Video Context: {context}.\n\
             IMPORTANT: Provide the analysis in {lang}.\n\
             Provide: CTR Score (1-10), 3 Strengths, 3 Weaknesses, and Actionable advice.",
            lang = language.prompt_name(),
        );

        let request = CanonicalRequest::new(TaskKind::TextGenerate, prompt)?
            .with_attachment(image)
            .with_language(language);
        let response = self.router.route(&request).await?;
        Ok(text_of(response))
    }

    /// Audit a published video by URL
    ///
    /// Grounded search first, to find the real title and channel; if the
    /// whole grounded chain fails, retries as a non-grounded inference
    /// prompt so the user still gets advice, just without looked-up facts.
    ///
    /// # Errors
    /// `AppError::Validation` if the URL is not a YouTube link.
    pub async fn audit_video(&self, url: &str, language: Language) -> AppResult<VideoAudit> {
        if !url.contains("youtu") {
            return Err(AppError::Validation(format!(
                "not a YouTube URL: {url}"
            )));
        }

        let lang = language.prompt_name();
        let prompt = format!(
            "You are a YouTube Algorithm Expert.\n\
             I have a YouTube video Link: {url}\n\n\
             TASK:\n\
             1. Use Google Search to find the EXACT Title and EXACT Channel Name of this video.\n\
             2. Analyze why this video is good or bad.\n\
             3. CRITICAL: Provide the response entirely in {lang}.\n\n\
             RETURN RAW JSON ONLY (Start with {{ and end with }}). NO MARKDOWN.\n\
             {{\n\
                 \"videoTitle\": \"Found Title\",\n\
                 \"channelName\": \"Found Channel Name\",\n\
                 \"score\": 85,\n\
                 \"summary\": \"Short explanation in {lang}.\",\n\
                 \"positives\": [\"Good point 1\", \"Good point 2\"],\n\
                 \"negatives\": [\"Improvement 1\", \"Improvement 2\"],\n\
                 \"suggestions\": [\"Action 1\", \"Action 2\"]\n\
             }}"
        );

        // Grounded model output is prose-shaped on the wire even when the
        // prompt demands JSON, so the response shape is overridden and the
        // normalizer recovers the object.
        let request = CanonicalRequest::new(TaskKind::SearchGenerate, prompt)?
            .with_response_shape(ResponseShape::Json)
            .with_language(language);
        match self.router.route(&request).await {
            Ok(response) => response.result().decode("video audit"),
            Err(err) => {
                info!("grounded audit failed, inferring without search: {err}");
                let fallback_prompt = format!(
                    "I have a video URL: {url}. Since you can't browse, infer the likely \
                     topic and give generic advice for this type of video in {lang}. \
                     Return JSON format {{ \"videoTitle\": \"Unknown\", \"channelName\": \
                     \"Unknown\", \"score\": 50, \"summary\": \"...\", \"positives\": [], \
                     \"negatives\": [], \"suggestions\": [] }}."
                );
                let fallback = CanonicalRequest::new(TaskKind::JsonGenerate, fallback_prompt)?
                    .with_language(language);
                let response = self.router.route(&fallback).await?;
                response.result().decode("video audit")
            }
        }
    }

    /// Generate a thumbnail image, returned as a `data:image/png;base64,` URI
    pub async fn generate_thumbnail_image(&self, prompt: &str) -> AppResult<String> {
        let full_prompt =
            format!("YouTube Thumbnail, High CTR, 16:9 aspect ratio style. {prompt}");
        let request = CanonicalRequest::new(TaskKind::ImageGenerate, full_prompt)?;
        let response = self.router.route(&request).await?;
        Ok(text_of(response))
    }

    /// Complete viral strategy for a topic or competitor video URL
    pub async fn generate_viral_strategy(
        &self,
        topic: &str,
        language: Language,
    ) -> AppResult<ViralStrategy> {
        let lowered = topic.to_lowercase();
        let is_url = lowered.contains("youtube.com") || lowered.contains("youtu.be");

        // Research phase: only a grounded provider can look up a URL. A
        // failure here degrades the strategy, it does not abort it.
        let mut trend_context = String::new();
        if is_url {
            let research_prompt = format!(
                "Research this video: {topic}. What is the title, channel, and why is it successful?"
            );
            if let Ok(research) =
                CanonicalRequest::new(TaskKind::SearchGenerate, research_prompt)
            {
                match self.router.route(&research).await {
                    Ok(response) => trend_context = text_of(response),
                    Err(err) => info!("strategy research failed, continuing without: {err}"),
                }
            }
        }

        let context_line = if trend_context.is_empty() {
            String::new()
        } else {
            format!("Context from Search: {trend_context}\n")
        };
        let prompt = format!(
            "You are a World-Class YouTube Strategist.\n\
             Topic/Input: \"{topic}\".\n\
             {context_line}\n\
             Generate a Viral Strategy in {lang}.\n\n\
             Return RAW JSON ONLY. Structure:\n\
             {{\n\
               \"originalChannel\": \"N/A\",\n\
               \"strategyTitle\": \"Viral Strategy Title\",\n\
               \"trendContext\": \"Why is this relevant?\",\n\
               \"analysis\": {{\n\
                 \"strengths\": [\"S1\", \"S2\"],\n\
                 \"weaknesses\": [\"W1\", \"W2\"]\n\
               }},\n\
               \"targetAudience\": \"Audience Description\",\n\
               \"metadata\": {{\n\
                 \"titleOptions\": [\"T1\", \"T2\"],\n\
                 \"description\": \"Desc\",\n\
                 \"tags\": [\"tag1\", \"tag2\"]\n\
               }},\n\
               \"thumbnailIdea\": {{\n\
                 \"visualDescription\": \"Detailed visual description for AI generator\",\n\
                 \"textOverlay\": \"Text on thumbnail\"\n\
               }},\n\
               \"scriptOutline\": {{\n\
                 \"hook\": \"Hook\",\n\
                 \"contentBeats\": [\"B1\", \"B2\"],\n\
                 \"cta\": \"CTA\"\n\
               }},\n\
               \"promotionPlan\": [\"P1\", \"P2\"]\n\
             }}",
            lang = language.prompt_name(),
        );

        let request =
            CanonicalRequest::new(TaskKind::JsonGenerate, prompt)?.with_language(language);
        let response = self.router.route(&request).await?;
        response.result().decode("viral strategy")
    }

    /// Search-derived public profile of any channel
    ///
    /// When the grounded chain fails, a non-grounded template request keeps
    /// the feature usable with placeholder-quality data.
    pub async fn public_channel_info(
        &self,
        query: &str,
        language: Language,
    ) -> AppResult<ChannelInfo> {
        let prompt = format!(
            "You are a YouTube Data Analyst.\n\
             TASK: Use Google Search to find detailed information about the YouTube channel \
             matching: \"{query}\".\n\n\
             I need:\n\
             1. Exact Channel Name\n\
             2. Approximate Subscriber Count\n\
             3. Total View Count (if available)\n\
             4. Total Video Count (approx)\n\
             5. 4 Most Recent or Popular Videos (Title, Views, Date, URL)\n\n\
             Return RAW JSON ONLY (Start with {{ and end with }}). NO MARKDOWN.\n\
             {{\n\
                 \"name\": \"Channel Name\",\n\
                 \"subscriberCount\": \"1.5M\",\n\
                 \"viewCount\": \"250M\",\n\
                 \"videoCount\": \"450\",\n\
                 \"avatar\": \"\",\n\
                 \"recentVideos\": [\n\
                     {{\n\
                         \"title\": \"Video Title\",\n\
                         \"views\": \"View count string\",\n\
                         \"publishedAt\": \"e.g. 2 days ago\",\n\
                         \"url\": \"https://youtube.com/...\",\n\
                         \"thumbnail\": \"\"\n\
                     }}\n\
                 ]\n\
             }}"
        );

        let request = CanonicalRequest::new(TaskKind::SearchGenerate, prompt)?
            .with_response_shape(ResponseShape::Json)
            .with_language(language);
        match self.router.route(&request).await {
            Ok(response) => response.result().decode("channel info"),
            Err(err) => {
                info!("grounded channel lookup failed, templating instead: {err}");
                let fallback_prompt = format!(
                    "Generate a JSON template for YouTube channel info for query \
                     \"{query}\". Return RAW JSON ONLY with the keys name, \
                     subscriberCount, viewCount, videoCount, avatar, recentVideos."
                );
                let fallback = CanonicalRequest::new(TaskKind::JsonGenerate, fallback_prompt)?
                    .with_language(language);
                let response = self.router.route(&fallback).await?;
                response.result().decode("channel info")
            }
        }
    }

    /// Synthesize speech from text
    ///
    /// Returns base64-encoded raw PCM (signed 16-bit little-endian, 24 kHz,
    /// mono). Decoding and playback are the caller's concern.
    pub async fn synthesize_speech(&self, text: &str, voice: &str) -> AppResult<String> {
        let request = CanonicalRequest::new(TaskKind::SpeechSynthesize, text)?
            .with_system_prompt(voice);
        let response = self.router.route(&request).await?;
        Ok(text_of(response))
    }

    /// Transcribe an audio attachment to plain text
    pub async fn transcribe_audio(&self, audio: Attachment) -> AppResult<String> {
        if !audio.is_audio() {
            return Err(AppError::Validation(format!(
                "transcription attachment must be audio, got {}",
                audio.mime_type()
            )));
        }

        let request = CanonicalRequest::new(
            TaskKind::Transcribe,
            "Transcribe this audio exactly. Return only the transcript text.",
        )?
        .with_attachment(audio);
        let response = self.router.route(&request).await?;
        Ok(text_of(response))
    }

    /// Generate a short video clip, returning the provider's download URI
    pub async fn generate_video(&self, prompt: &str) -> AppResult<String> {
        let request = CanonicalRequest::new(TaskKind::VideoGenerate, prompt)?;
        let response = self.router.route(&request).await?;
        Ok(text_of(response))
    }

    /// Send one chat turn, recording both sides in the session on success
    pub async fn send_chat(&self, session: &mut ChatSession, message: &str) -> AppResult<String> {
        let request = CanonicalRequest::new(TaskKind::ChatTurn, session.transcript_with(message))?
            .with_system_prompt(session.system_prompt.clone())
            .with_language(session.language);
        let response = self.router.route(&request).await?;
        let answer = text_of(response);
        session.record(message, &answer);
        Ok(answer)
    }
}

/// Extract the textual payload of a routed response, re-serializing a JSON
/// result where a text one was expected
fn text_of(response: RoutedResponse) -> String {
    match response.into_result() {
        ParsedResult::Text(text) => text,
        ParsedResult::Json(value) => value.to_string(),
    }
}
