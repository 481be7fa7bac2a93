//! LINE Messaging API broadcast destination.

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tracing::{info, warn};

use super::{PublishError, Publisher};
use crate::extractor::ContentRecord;

const DEFAULT_API_BASE: &str = "https://api.line.me";

/// LINE caps a text message at 5000 characters; stay well under it so the
/// title and url always fit.
const MAX_SUMMARY_CHARS: usize = 1000;

/// Broadcasts each summary to all followers of a LINE channel.
pub struct LineBroadcaster {
    client: reqwest::Client,
    channel_token: String,
    api_base: String,
    timeout: Duration,
    max_retries: u32,
}

impl LineBroadcaster {
    pub fn new(channel_token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            channel_token: channel_token.into(),
            api_base: DEFAULT_API_BASE.to_string(),
            timeout: Duration::from_secs(15),
            max_retries: 2,
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn build_message(record: &ContentRecord, summary: &str) -> String {
        let mut excerpt: String = summary.trim().chars().take(MAX_SUMMARY_CHARS).collect();
        if summary.trim().chars().count() > MAX_SUMMARY_CHARS {
            excerpt.push('…');
        }
        format!("{}\n{}\n\n{}", record.title, record.url, excerpt)
    }

    async fn send_once(&self, text: &str) -> Result<(), PublishError> {
        let request = BroadcastRequest {
            messages: vec![TextMessage {
                message_type: "text",
                text: text.to_string(),
            }],
        };

        let response = self
            .client
            .post(format!("{}/v2/bot/message/broadcast", self.api_base))
            .bearer_auth(&self.channel_token)
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| PublishError::Http(e.to_string()))?;

        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            let message = response.text().await.unwrap_or_default();
            return Err(PublishError::Api { status, message });
        }
        Ok(())
    }

    fn is_retryable(error: &PublishError) -> bool {
        match error {
            PublishError::Http(_) => true,
            PublishError::Api { status, .. } => *status == 429 || *status >= 500,
            PublishError::Io(_) => false,
        }
    }
}

#[async_trait]
impl Publisher for LineBroadcaster {
    fn name(&self) -> &str {
        "line"
    }

    async fn publish(&self, record: &ContentRecord, summary: &str) -> Result<(), PublishError> {
        let text = Self::build_message(record, summary);

        let mut attempt = 0;
        loop {
            match self.send_once(&text).await {
                Ok(()) => {
                    info!("Broadcast summary for '{}' via LINE", record.item_id);
                    return Ok(());
                }
                Err(e) if Self::is_retryable(&e) && attempt < self.max_retries => {
                    warn!("LINE broadcast attempt {} failed ({})", attempt + 1, e);
                    tokio::time::sleep(Duration::from_millis(500u64 << attempt)).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct BroadcastRequest {
    messages: Vec<TextMessage>,
}

#[derive(Debug, Serialize)]
struct TextMessage {
    #[serde(rename = "type")]
    message_type: &'static str,
    text: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;

    #[test]
    fn test_message_contains_title_url_and_summary() {
        let record = fixtures::content_record("vid-1", "My talk");
        let text = LineBroadcaster::build_message(&record, "short summary");
        assert!(text.starts_with("My talk\n"));
        assert!(text.contains(&record.url));
        assert!(text.ends_with("short summary"));
    }

    #[test]
    fn test_long_summary_is_truncated() {
        let record = fixtures::content_record("vid-1", "My talk");
        let long = "y".repeat(5000);
        let text = LineBroadcaster::build_message(&record, &long);
        assert!(text.chars().count() < 1200);
        assert!(text.ends_with('…'));
    }

    #[test]
    fn test_broadcast_request_serialization() {
        let request = BroadcastRequest {
            messages: vec![TextMessage {
                message_type: "text",
                text: "hello".to_string(),
            }],
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("\"type\":\"text\""));
        assert!(json.contains("\"text\":\"hello\""));
    }

    #[test]
    fn test_retryable_classification() {
        assert!(LineBroadcaster::is_retryable(&PublishError::Http(
            "reset".to_string()
        )));
        assert!(LineBroadcaster::is_retryable(&PublishError::Api {
            status: 500,
            message: String::new()
        }));
        assert!(!LineBroadcaster::is_retryable(&PublishError::Api {
            status: 401,
            message: String::new()
        }));
    }
}
