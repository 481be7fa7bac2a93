//! RSS feed source reader.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quick_xml::de::from_str;
use serde::Deserialize;
use std::time::Duration;
use tracing::warn;

use super::types::{Item, PublishedWindow, SourceDescriptor, SourceError, SourceReader, SourceType};

/// RSS 2.0 feed reader. Item id is the entry `<guid>`, falling back to `<link>`.
pub struct RssReader {
    client: reqwest::Client,
    timeout: Duration,
    window: Option<PublishedWindow>,
}

impl Default for RssReader {
    fn default() -> Self {
        Self::new()
    }
}

impl RssReader {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            timeout: Duration::from_secs(15),
            window: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Only list entries published inside the window. Entries without a
    /// parseable date are skipped while a window is set.
    pub fn with_window(mut self, window: PublishedWindow) -> Self {
        self.window = Some(window);
        self
    }

    /// Parse a feed document into items. Entries with neither guid nor link
    /// are skipped; they cannot be deduplicated across runs.
    fn parse_feed(
        source: &str,
        xml: &str,
        window: Option<PublishedWindow>,
    ) -> Result<Vec<Item>, SourceError> {
        let rss: Rss = from_str(xml).map_err(|e| SourceError::Malformed {
            name: source.to_string(),
            cause: e.to_string(),
        })?;

        let mut items = Vec::with_capacity(rss.channel.items.len());
        for entry in rss.channel.items {
            let link = entry.link.unwrap_or_default();
            let id = match entry.guid.filter(|g| !g.is_empty()) {
                Some(guid) => guid,
                None if !link.is_empty() => link.clone(),
                None => {
                    warn!("Feed '{}' entry without guid or link, skipping", source);
                    continue;
                }
            };

            let published_at = entry.pub_date.as_deref().and_then(parse_rfc2822);
            if let Some(window) = window {
                match published_at {
                    Some(ts) if window.contains(ts) => {}
                    Some(_) => continue,
                    None => {
                        warn!("Feed '{}' entry '{}' has no date, skipping", source, id);
                        continue;
                    }
                }
            }

            items.push(Item {
                id,
                title: entry.title.unwrap_or_else(|| "(untitled)".to_string()),
                url: link,
                published_at,
                source_type: SourceType::Feed,
            });
        }
        Ok(items)
    }
}

fn parse_rfc2822(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[async_trait]
impl SourceReader for RssReader {
    fn name(&self) -> &str {
        "rss"
    }

    fn handles(&self, source_type: SourceType) -> bool {
        source_type == SourceType::Feed
    }

    async fn list_items(&self, descriptor: &SourceDescriptor) -> Result<Vec<Item>, SourceError> {
        let body = self
            .client
            .get(&descriptor.identifier)
            .timeout(self.timeout)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| SourceError::Unavailable {
                name: descriptor.name.clone(),
                cause: e.to_string(),
            })?
            .text()
            .await
            .map_err(|e| SourceError::Unavailable {
                name: descriptor.name.clone(),
                cause: e.to_string(),
            })?;

        Self::parse_feed(&descriptor.name, &body, self.window)
    }
}

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    items: Vec<FeedEntry>,
}

#[derive(Debug, Deserialize)]
struct FeedEntry {
    title: Option<String>,
    link: Option<String>,
    guid: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
}
