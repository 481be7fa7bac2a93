//! Publishing: deliver one item's summary to the configured destinations.
//!
//! Publishers are independent; the pipeline fans a finished summary out to
//! all of them and a failing destination never blocks the others or the
//! item's processed state.

mod line;
mod markdown;
mod notion;

pub use line::LineBroadcaster;
pub use markdown::MarkdownPublisher;
pub use notion::NotionPublisher;

use async_trait::async_trait;

use crate::extractor::ContentRecord;

/// Error type for publish operations.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },
}

/// Trait for summary destinations.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Destination name for logs and metrics (e.g. "markdown", "line").
    fn name(&self) -> &str;

    /// Deliver one summary.
    async fn publish(&self, record: &ContentRecord, summary: &str) -> Result<(), PublishError>;
}
