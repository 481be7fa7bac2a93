use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Kind of content source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    /// A single YouTube video.
    Video,
    /// A YouTube channel (listing yields its recent videos).
    Channel,
    /// An RSS/Atom feed of articles.
    Feed,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Video => "video",
            SourceType::Channel => "channel",
            SourceType::Feed => "feed",
        }
    }
}

/// A configured source to check on every run. Immutable, supplied by configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceDescriptor {
    /// Human-readable label used in logs.
    pub name: String,
    #[serde(rename = "type")]
    pub source_type: SourceType,
    /// Video id, channel id, or feed url depending on `source_type`.
    pub identifier: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Optional keyword filter for channel listings.
    #[serde(default)]
    pub keyword: Option<String>,
}

fn default_enabled() -> bool {
    true
}

/// One discoverable unit of content. Created per discovered entry and
/// discarded after one pipeline pass; only its id is persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    /// Stable id, globally unique per source type.
    pub id: String,
    pub title: String,
    pub url: String,
    pub published_at: Option<DateTime<Utc>>,
    pub source_type: SourceType,
}

/// Optional published-at window for channel listings (e.g. "only June 2025").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishedWindow {
    pub after: DateTime<Utc>,
    pub before: DateTime<Utc>,
}

impl PublishedWindow {
    /// Window covering one calendar month, UTC.
    pub fn for_month(year: i32, month: u32) -> Option<Self> {
        let after = Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0).single()?;
        let before = if month == 12 {
            Utc.with_ymd_and_hms(year + 1, 1, 1, 0, 0, 0).single()?
        } else {
            Utc.with_ymd_and_hms(year, month + 1, 1, 0, 0, 0).single()?
        };
        Some(Self { after, before })
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.after && ts < self.before
    }
}

/// Error type for source listing operations.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Upstream listing call failed after the reader's own retry budget.
    /// The orchestrator skips the source and continues the run.
    #[error("Source '{name}' unavailable: {cause}")]
    Unavailable { name: String, cause: String },

    /// The upstream answered but the payload could not be interpreted.
    #[error("Source '{name}' returned malformed data: {cause}")]
    Malformed { name: String, cause: String },
}

/// Trait for source readers.
///
/// `list_items` yields items in source-reported order (newest first for the
/// built-in readers); nothing downstream relies on that order.
#[async_trait]
pub trait SourceReader: Send + Sync {
    /// Reader name for logs (e.g. "youtube", "rss").
    fn name(&self) -> &str;

    /// Whether this reader can list the given source type.
    fn handles(&self, source_type: SourceType) -> bool;

    /// List candidate items for one source descriptor.
    ///
    /// A single-video descriptor yields at most one item.
    async fn list_items(&self, descriptor: &SourceDescriptor) -> Result<Vec<Item>, SourceError>;
}
