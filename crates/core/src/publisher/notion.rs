//! Notion database destination: one page per item.

use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;
use tracing::info;

use super::{PublishError, Publisher};
use crate::extractor::ContentRecord;

const DEFAULT_API_BASE: &str = "https://api.notion.com";
const NOTION_VERSION: &str = "2022-06-28";

/// Notion caps a rich_text element at 2000 characters.
const MAX_BLOCK_CHARS: usize = 2000;

/// Creates a page in a Notion database for each summary.
pub struct NotionPublisher {
    client: reqwest::Client,
    token: String,
    database_id: String,
    api_base: String,
    timeout: Duration,
}

impl NotionPublisher {
    pub fn new(token: impl Into<String>, database_id: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            token: token.into(),
            database_id: database_id.into(),
            api_base: DEFAULT_API_BASE.to_string(),
            timeout: Duration::from_secs(20),
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    fn build_page(&self, record: &ContentRecord, summary: &str) -> serde_json::Value {
        let children: Vec<serde_json::Value> = chunk_text(summary, MAX_BLOCK_CHARS)
            .into_iter()
            .map(|chunk| {
                json!({
                    "object": "block",
                    "type": "paragraph",
                    "paragraph": {
                        "rich_text": [{ "type": "text", "text": { "content": chunk } }]
                    }
                })
            })
            .collect();

        json!({
            "parent": { "database_id": self.database_id },
            "properties": {
                "Name": {
                    "title": [{ "text": { "content": record.title } }]
                },
                "URL": { "url": record.url },
                "Published": {
                    "date": record.published_at.map(|d| json!({ "start": d.to_rfc3339() }))
                }
            },
            "children": children
        })
    }
}

/// Split text into chunks on character boundaries.
fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let chars: Vec<char> = text.trim().chars().collect();
    if chars.is_empty() {
        return Vec::new();
    }
    chars
        .chunks(max_chars)
        .map(|c| c.iter().collect())
        .collect()
}

#[async_trait]
impl Publisher for NotionPublisher {
    fn name(&self) -> &str {
        "notion"
    }

    async fn publish(&self, record: &ContentRecord, summary: &str) -> Result<(), PublishError> {
        let page = self.build_page(record, summary);

        let response = self
            .client
            .post(format!("{}/v1/pages", self.api_base))
            .bearer_auth(&self.token)
            .header("Notion-Version", NOTION_VERSION)
            .timeout(self.timeout)
            .json(&page)
            .send()
            .await
            .map_err(|e| PublishError::Http(e.to_string()))?;

        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            let message = response.text().await.unwrap_or_default();
            return Err(PublishError::Api { status, message });
        }

        info!("Created Notion page for '{}'", record.item_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;

    #[test]
    fn test_chunk_text() {
        assert_eq!(chunk_text("abcdef", 4), vec!["abcd", "ef"]);
        assert_eq!(chunk_text("  ", 4), Vec::<String>::new());
        assert_eq!(chunk_text("短い文", 2), vec!["短い", "文"]);
    }

    #[test]
    fn test_page_shape() {
        let publisher = NotionPublisher::new("secret", "db-123");
        let record = fixtures::content_record("vid-1", "My talk");
        let page = publisher.build_page(&record, "the summary");

        assert_eq!(page["parent"]["database_id"], "db-123");
        assert_eq!(
            page["properties"]["Name"]["title"][0]["text"]["content"],
            "My talk"
        );
        assert_eq!(page["children"][0]["type"], "paragraph");
    }

    #[test]
    fn test_long_summary_splits_into_blocks() {
        let publisher = NotionPublisher::new("secret", "db-123");
        let record = fixtures::content_record("vid-1", "My talk");
        let page = publisher.build_page(&record, &"z".repeat(4500));

        assert_eq!(page["children"].as_array().unwrap().len(), 3);
    }
}
