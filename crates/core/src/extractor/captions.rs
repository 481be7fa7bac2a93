//! Transcript fetch from YouTube's timedtext endpoint.
//!
//! Tries each preferred language in order; a language with no track comes
//! back as an empty document, which is treated as "not found" rather than an
//! error so the next language (and eventually speech-to-text) gets a chance.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::types::{CaptionError, CaptionSource};
use crate::source::Item;

const DEFAULT_API_BASE: &str = "https://www.youtube.com";

fn default_languages() -> Vec<String> {
    ["zh-TW", "zh-Hant", "en", "zh-Hans"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Caption client for YouTube videos.
pub struct YouTubeCaptionClient {
    client: reqwest::Client,
    api_base: String,
    languages: Vec<String>,
    timeout: Duration,
}

impl Default for YouTubeCaptionClient {
    fn default() -> Self {
        Self::new()
    }
}

impl YouTubeCaptionClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: DEFAULT_API_BASE.to_string(),
            languages: default_languages(),
            timeout: Duration::from_secs(15),
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Preferred caption languages, tried in order.
    pub fn with_languages(mut self, languages: Vec<String>) -> Self {
        if !languages.is_empty() {
            self.languages = languages;
        }
        self
    }

    async fn fetch_language(&self, video_id: &str, lang: &str) -> Result<Option<String>, CaptionError> {
        let url = format!(
            "{}/api/timedtext?v={}&lang={}&fmt=json3",
            self.api_base,
            urlencoding::encode(video_id),
            urlencoding::encode(lang),
        );

        let response = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| CaptionError::Fetch(e.to_string()))?;

        // The endpoint answers 404 for unknown videos and an empty 200 body
        // for videos without a track in the requested language.
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = response
            .error_for_status()
            .map_err(|e| CaptionError::Fetch(e.to_string()))?;

        let body = response
            .text()
            .await
            .map_err(|e| CaptionError::Fetch(e.to_string()))?;
        if body.trim().is_empty() {
            return Ok(None);
        }

        let text = parse_timedtext(&body).map_err(CaptionError::Fetch)?;
        if text.is_empty() {
            return Ok(None);
        }
        Ok(Some(text))
    }
}

/// Join all segment texts of a timedtext json3 document with spaces.
fn parse_timedtext(body: &str) -> Result<String, String> {
    let doc: TimedText = serde_json::from_str(body).map_err(|e| e.to_string())?;

    let mut parts = Vec::new();
    for event in doc.events {
        for seg in event.segs {
            let trimmed = seg.utf8.trim();
            if !trimmed.is_empty() {
                parts.push(trimmed.to_string());
            }
        }
    }
    Ok(parts.join(" "))
}

#[async_trait]
impl CaptionSource for YouTubeCaptionClient {
    fn name(&self) -> &str {
        "youtube-timedtext"
    }

    async fn fetch_transcript(&self, item: &Item) -> Result<String, CaptionError> {
        for lang in &self.languages {
            if let Some(text) = self.fetch_language(&item.id, lang).await? {
                debug!("Transcript for '{}' found in '{}'", item.id, lang);
                return Ok(text);
            }
        }
        Err(CaptionError::NotFound(item.id.clone()))
    }
}

#[derive(Debug, Deserialize)]
struct TimedText {
    #[serde(default)]
    events: Vec<TimedTextEvent>,
}

#[derive(Debug, Deserialize)]
struct TimedTextEvent {
    #[serde(default)]
    segs: Vec<TimedTextSeg>,
}

#[derive(Debug, Deserialize)]
struct TimedTextSeg {
    #[serde(default)]
    utf8: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_timedtext() {
        let body = r#"{
            "events": [
                { "segs": [ { "utf8": "hello " }, { "utf8": "world" } ] },
                { "segs": [ { "utf8": "\n" } ] },
                { "segs": [ { "utf8": "again" } ] }
            ]
        }"#;
        assert_eq!(parse_timedtext(body).unwrap(), "hello world again");
    }

    #[test]
    fn test_parse_timedtext_empty_events() {
        assert_eq!(parse_timedtext(r#"{"events":[]}"#).unwrap(), "");
        assert_eq!(parse_timedtext(r#"{}"#).unwrap(), "");
    }

    #[test]
    fn test_parse_timedtext_malformed() {
        assert!(parse_timedtext("<html>").is_err());
    }

    #[test]
    fn test_language_list_defaults_kept_when_empty() {
        let client = YouTubeCaptionClient::new().with_languages(Vec::new());
        assert!(!client.languages.is_empty());

        let client = YouTubeCaptionClient::new().with_languages(vec!["en".to_string()]);
        assert_eq!(client.languages, vec!["en".to_string()]);
    }
}
