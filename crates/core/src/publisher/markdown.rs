//! Markdown file output, one file per item.

use async_trait::async_trait;
use chrono::Utc;
use once_cell::sync::Lazy;
use regex_lite::Regex;
use std::path::{Path, PathBuf};
use tracing::info;

use super::{PublishError, Publisher};
use crate::extractor::ContentRecord;

/// Characters that are unsafe or awkward in filenames.
static UNSAFE_CHARS: Lazy<Regex> = Lazy::new(|| {
    // The pattern is a literal; it cannot fail to compile.
    Regex::new(r#"[\\/:*?"<>|\s]+"#).unwrap()
});

const MAX_TITLE_CHARS: usize = 80;

/// Writes each summary as `<dir>/YYYYMMDD_<title>.md`.
pub struct MarkdownPublisher {
    output_dir: PathBuf,
}

impl MarkdownPublisher {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn file_name(record: &ContentRecord) -> String {
        let date = record.published_at.unwrap_or_else(Utc::now);
        let title = sanitize_title(&record.title);
        format!("{}_{}.md", date.format("%Y%m%d"), title)
    }

    fn render(record: &ContentRecord, summary: &str) -> String {
        let published = record
            .published_at
            .map(|d| d.to_rfc3339())
            .unwrap_or_else(|| "unknown".to_string());
        format!(
            "# {}\n\n- Source: {}\n- Published: {}\n- Extracted via: {}\n\n## Summary\n\n{}\n\n## Full text\n\n{}\n",
            record.title,
            record.url,
            published,
            record.extraction_method.as_str(),
            summary.trim(),
            record.body_text.trim(),
        )
    }
}

/// Replace filesystem-unsafe characters and cap the length.
fn sanitize_title(title: &str) -> String {
    let cleaned = UNSAFE_CHARS.replace_all(title.trim(), "_");
    let cleaned = cleaned.trim_matches('_');
    let truncated: String = cleaned.chars().take(MAX_TITLE_CHARS).collect();
    if truncated.is_empty() {
        "untitled".to_string()
    } else {
        truncated
    }
}

#[async_trait]
impl Publisher for MarkdownPublisher {
    fn name(&self) -> &str {
        "markdown"
    }

    async fn publish(&self, record: &ContentRecord, summary: &str) -> Result<(), PublishError> {
        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|e| PublishError::Io(e.to_string()))?;

        let path = self.output_dir.join(Self::file_name(record));
        let content = Self::render(record, summary);

        tokio::fs::write(&path, content)
            .await
            .map_err(|e| PublishError::Io(e.to_string()))?;

        info!("Wrote summary for '{}' to {:?}", record.item_id, path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;
    use chrono::TimeZone;

    #[test]
    fn test_sanitize_title() {
        assert_eq!(sanitize_title("A talk: part 1/2"), "A_talk_part_1_2");
        assert_eq!(sanitize_title("   "), "untitled");
        assert_eq!(sanitize_title("plain"), "plain");
    }

    #[test]
    fn test_sanitize_title_caps_length() {
        let long = "x".repeat(200);
        assert_eq!(sanitize_title(&long).chars().count(), MAX_TITLE_CHARS);
    }

    #[test]
    fn test_file_name_uses_published_date() {
        let mut record = fixtures::content_record("vid-1", "My talk");
        record.published_at = Some(chrono::Utc.with_ymd_and_hms(2024, 3, 5, 12, 0, 0).unwrap());
        assert_eq!(MarkdownPublisher::file_name(&record), "20240305_My_talk.md");
    }

    #[tokio::test]
    async fn test_publish_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let publisher = MarkdownPublisher::new(dir.path());
        let mut record = fixtures::content_record("vid-1", "My talk");
        record.published_at = Some(chrono::Utc.with_ymd_and_hms(2024, 3, 5, 12, 0, 0).unwrap());

        publisher.publish(&record, "the summary").await.unwrap();

        let content =
            std::fs::read_to_string(dir.path().join("20240305_My_talk.md")).unwrap();
        assert!(content.starts_with("# My talk\n"));
        assert!(content.contains("## Summary\n\nthe summary"));
        assert!(content.contains("## Full text"));
    }

    #[tokio::test]
    async fn test_publish_creates_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("out/summaries");
        let publisher = MarkdownPublisher::new(&nested);
        let record = fixtures::content_record("vid-1", "My talk");

        publisher.publish(&record, "s").await.unwrap();
        assert!(nested.exists());
    }

    #[tokio::test]
    async fn test_republish_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let publisher = MarkdownPublisher::new(dir.path());
        let mut record = fixtures::content_record("vid-1", "My talk");
        record.published_at = Some(chrono::Utc.with_ymd_and_hms(2024, 3, 5, 12, 0, 0).unwrap());

        publisher.publish(&record, "first").await.unwrap();
        publisher.publish(&record, "second").await.unwrap();

        let content =
            std::fs::read_to_string(dir.path().join("20240305_My_talk.md")).unwrap();
        assert!(content.contains("second"));
        assert!(!content.contains("first"));
    }
}
