//! YouTube Data API v3 source reader.
//!
//! Uses `search.list` for channel descriptors and `videos.list` for single
//! video descriptors. Only the minimal response shape the pipeline depends on
//! is modelled.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use super::types::{
    Item, PublishedWindow, SourceDescriptor, SourceError, SourceReader, SourceType,
};

const DEFAULT_API_BASE: &str = "https://www.googleapis.com";
const CHANNEL_MAX_RESULTS: u32 = 50;

/// YouTube Data API source reader.
pub struct YouTubeReader {
    client: reqwest::Client,
    api_key: String,
    api_base: String,
    timeout: Duration,
    max_retries: u8,
    window: Option<PublishedWindow>,
}

impl YouTubeReader {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            api_base: DEFAULT_API_BASE.to_string(),
            timeout: Duration::from_secs(15),
            max_retries: 2,
            window: None,
        }
    }

    /// Point the reader at a different API base (used by tests).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Restrict channel listings to a published-at window.
    pub fn with_window(mut self, window: PublishedWindow) -> Self {
        self.window = Some(window);
        self
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        source: &str,
        url: &str,
    ) -> Result<T, SourceError> {
        let mut attempt: u8 = 0;
        loop {
            attempt += 1;
            let result = self
                .client
                .get(url)
                .timeout(self.timeout)
                .send()
                .await
                .and_then(|r| r.error_for_status());

            match result {
                Ok(response) => {
                    return response.json::<T>().await.map_err(|e| {
                        SourceError::Malformed {
                            name: source.to_string(),
                            cause: e.to_string(),
                        }
                    });
                }
                Err(e) => {
                    if attempt <= self.max_retries {
                        warn!("YouTube API call failed (attempt {}): {}", attempt, e);
                        tokio::time::sleep(Duration::from_millis(500u64 << (attempt - 1))).await;
                        continue;
                    }
                    return Err(SourceError::Unavailable {
                        name: source.to_string(),
                        cause: e.to_string(),
                    });
                }
            }
        }
    }

    async fn list_video(&self, descriptor: &SourceDescriptor) -> Result<Vec<Item>, SourceError> {
        let url = format!(
            "{}/youtube/v3/videos?part=snippet&id={}&key={}",
            self.api_base,
            urlencoding::encode(&descriptor.identifier),
            urlencoding::encode(&self.api_key),
        );

        let response: VideosResponse = self.get_json(&descriptor.name, &url).await?;

        Ok(response
            .items
            .into_iter()
            .map(|v| Item {
                url: watch_url(&v.id),
                title: v.snippet.title,
                published_at: parse_published(&v.snippet.published_at),
                id: v.id,
                source_type: SourceType::Video,
            })
            .collect())
    }

    async fn list_channel(&self, descriptor: &SourceDescriptor) -> Result<Vec<Item>, SourceError> {
        let mut url = format!(
            "{}/youtube/v3/search?part=snippet&channelId={}&type=video&order=date&maxResults={}&key={}",
            self.api_base,
            urlencoding::encode(&descriptor.identifier),
            CHANNEL_MAX_RESULTS,
            urlencoding::encode(&self.api_key),
        );
        if let Some(keyword) = &descriptor.keyword {
            url.push_str(&format!("&q={}", urlencoding::encode(keyword)));
        }
        if let Some(window) = &self.window {
            url.push_str(&format!(
                "&publishedAfter={}&publishedBefore={}",
                window.after.to_rfc3339_opts(SecondsFormat::Secs, true),
                window.before.to_rfc3339_opts(SecondsFormat::Secs, true),
            ));
        }

        let response: SearchResponse = self.get_json(&descriptor.name, &url).await?;

        let items: Vec<Item> = response
            .items
            .into_iter()
            .filter_map(|entry| {
                let video_id = entry.id.video_id?;
                Some(Item {
                    url: watch_url(&video_id),
                    title: entry.snippet.title,
                    published_at: parse_published(&entry.snippet.published_at),
                    id: video_id,
                    source_type: SourceType::Channel,
                })
            })
            .collect();

        debug!(
            "Channel '{}' listed {} candidate videos",
            descriptor.name,
            items.len()
        );
        Ok(items)
    }
}

fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", video_id)
}

fn parse_published(raw: &Option<String>) -> Option<DateTime<Utc>> {
    raw.as_deref()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

#[async_trait]
impl SourceReader for YouTubeReader {
    fn name(&self) -> &str {
        "youtube"
    }

    fn handles(&self, source_type: SourceType) -> bool {
        matches!(source_type, SourceType::Video | SourceType::Channel)
    }

    async fn list_items(&self, descriptor: &SourceDescriptor) -> Result<Vec<Item>, SourceError> {
        match descriptor.source_type {
            SourceType::Video => self.list_video(descriptor).await,
            SourceType::Channel => self.list_channel(descriptor).await,
            SourceType::Feed => Err(SourceError::Unavailable {
                name: descriptor.name.clone(),
                cause: "youtube reader cannot list feed sources".to_string(),
            }),
        }
    }
}

// Minimal wire shapes.

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchEntry>,
}

#[derive(Debug, Deserialize)]
struct SearchEntry {
    id: SearchId,
    snippet: Snippet,
}

#[derive(Debug, Deserialize)]
struct SearchId {
    #[serde(rename = "videoId")]
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VideosResponse {
    #[serde(default)]
    items: Vec<VideoEntry>,
}

#[derive(Debug, Deserialize)]
struct VideoEntry {
    id: String,
    snippet: Snippet,
}

#[derive(Debug, Deserialize)]
struct Snippet {
    title: String,
    #[serde(rename = "publishedAt")]
    published_at: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_response_parsing() {
        let json = r#"{
            "items": [
                {
                    "id": { "videoId": "abc123" },
                    "snippet": { "title": "First video", "publishedAt": "2025-06-01T10:00:00Z" }
                },
                {
                    "id": {},
                    "snippet": { "title": "A playlist result" }
                }
            ]
        }"#;
        let response: SearchResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.items.len(), 2);
        assert_eq!(response.items[0].id.video_id.as_deref(), Some("abc123"));
        assert!(response.items[1].id.video_id.is_none());
    }

    #[test]
    fn test_videos_response_parsing() {
        let json = r#"{
            "items": [
                { "id": "xyz", "snippet": { "title": "One video", "publishedAt": "2025-01-02T03:04:05Z" } }
            ]
        }"#;
        let response: VideosResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.items[0].id, "xyz");
        let published = parse_published(&response.items[0].snippet.published_at).unwrap();
        assert_eq!(published.to_rfc3339(), "2025-01-02T03:04:05+00:00");
    }

    #[test]
    fn test_parse_published_garbage_is_none() {
        assert!(parse_published(&Some("not a date".to_string())).is_none());
        assert!(parse_published(&None).is_none());
    }

    #[test]
    fn test_reader_handles_video_and_channel_only() {
        let reader = YouTubeReader::new("key");
        assert!(reader.handles(SourceType::Video));
        assert!(reader.handles(SourceType::Channel));
        assert!(!reader.handles(SourceType::Feed));
    }

    #[test]
    fn test_watch_url() {
        assert_eq!(watch_url("abc"), "https://www.youtube.com/watch?v=abc");
    }
}
