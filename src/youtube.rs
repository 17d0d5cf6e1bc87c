//! YouTube Data API v3 client
//!
//! Read-only: channel statistics for the connected account and its most
//! recent uploads. Authenticated with an OAuth2 access token supplied by the
//! caller; token acquisition and refresh live outside this crate.

use crate::error::{AppError, AppResult};
use serde_json::Value;
use tracing::debug;

const YOUTUBE_API_HOST: &str = "https://www.googleapis.com";

/// Connected channel's own statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelStats {
    pub title: String,
    pub subscriber_count: String,
    pub view_count: String,
    pub video_count: String,
    pub avatar_url: String,
}

/// One uploaded video with its public counters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelVideo {
    pub id: String,
    pub title: String,
    pub thumbnail_url: String,
    pub view_count: String,
    pub like_count: String,
    pub published_at: String,
    pub url: String,
}

pub struct YouTubeClient {
    http: reqwest::Client,
    base_url: String,
    access_token: String,
}

impl YouTubeClient {
    pub fn new(http: reqwest::Client, access_token: impl Into<String>) -> Self {
        Self {
            http,
            base_url: YOUTUBE_API_HOST.to_string(),
            access_token: access_token.into(),
        }
    }

    /// Point the client at a different host (tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn get(&self, path: &str, query: &[(&str, &str)]) -> AppResult<Value> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "youtube api request");

        let response = self
            .http
            .get(&url)
            .query(query)
            .bearer_auth(&self.access_token)
            .send()
            .await?;

        let status = response.status().as_u16();
        let payload: Value = response.json().await?;

        if !(200..300).contains(&status) {
            let message = payload["error"]["message"]
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| payload.to_string());
            return Err(AppError::YouTubeApi { status, message });
        }
        Ok(payload)
    }

    /// Statistics for the authenticated user's channel
    pub async fn my_channel(&self) -> AppResult<ChannelStats> {
        let payload = self
            .get(
                "/youtube/v3/channels",
                &[("part", "snippet,statistics,contentDetails"), ("mine", "true")],
            )
            .await?;

        let Some(channel) = payload["items"].get(0) else {
            return Err(AppError::MalformedResponse {
                context: "channel listing".to_string(),
                reason: "no channel found for this account".to_string(),
            });
        };

        Ok(ChannelStats {
            title: str_at(channel, &["snippet", "title"]),
            subscriber_count: str_at(channel, &["statistics", "subscriberCount"]),
            view_count: str_at(channel, &["statistics", "viewCount"]),
            video_count: str_at(channel, &["statistics", "videoCount"]),
            avatar_url: str_at(channel, &["snippet", "thumbnails", "default", "url"]),
        })
    }

    /// Most recent uploads of the authenticated user's channel
    ///
    /// Three calls: the channel's uploads playlist id, the newest playlist
    /// items, then the videos listing for their statistics.
    pub async fn recent_videos(&self, max_results: u8) -> AppResult<Vec<ChannelVideo>> {
        let channels = self
            .get(
                "/youtube/v3/channels",
                &[("part", "contentDetails"), ("mine", "true")],
            )
            .await?;
        let uploads = channels["items"][0]["contentDetails"]["relatedPlaylists"]["uploads"]
            .as_str()
            .ok_or_else(|| AppError::MalformedResponse {
                context: "channel listing".to_string(),
                reason: "missing uploads playlist id".to_string(),
            })?
            .to_string();

        let max = max_results.to_string();
        let items = self
            .get(
                "/youtube/v3/playlistItems",
                &[
                    ("part", "contentDetails"),
                    ("playlistId", uploads.as_str()),
                    ("maxResults", max.as_str()),
                ],
            )
            .await?;
        let ids: Vec<String> = items["items"]
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item["contentDetails"]["videoId"].as_str())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let id_list = ids.join(",");
        let videos = self
            .get(
                "/youtube/v3/videos",
                &[("part", "snippet,statistics"), ("id", id_list.as_str())],
            )
            .await?;

        let listed = videos["items"]
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|video| {
                        let id = video["id"].as_str()?.to_string();
                        Some(ChannelVideo {
                            url: format!("https://www.youtube.com/watch?v={id}"),
                            title: str_at(video, &["snippet", "title"]),
                            thumbnail_url: str_at(
                                video,
                                &["snippet", "thumbnails", "medium", "url"],
                            ),
                            view_count: str_at(video, &["statistics", "viewCount"]),
                            like_count: str_at(video, &["statistics", "likeCount"]),
                            published_at: str_at(video, &["snippet", "publishedAt"]),
                            id,
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(listed)
    }
}

/// String at a JSON path, empty when absent. The Data API reports counters
/// as strings already, so no numeric conversion happens here.
fn str_at(value: &Value, path: &[&str]) -> String {
    let mut current = value;
    for key in path {
        current = &current[key];
    }
    current.as_str().unwrap_or_default().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_str_at_walks_nested_path() {
        let value = json!({"snippet": {"thumbnails": {"default": {"url": "https://a"}}}});
        assert_eq!(
            str_at(&value, &["snippet", "thumbnails", "default", "url"]),
            "https://a"
        );
    }

    #[test]
    fn test_str_at_missing_path_is_empty() {
        let value = json!({"snippet": {}});
        assert_eq!(str_at(&value, &["snippet", "title"]), "");
        assert_eq!(str_at(&value, &["statistics", "viewCount"]), "");
    }
}
