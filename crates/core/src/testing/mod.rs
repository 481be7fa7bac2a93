//! Testing utilities and mock implementations for E2E tests.
//!
//! This module provides mock implementations of all external service traits,
//! allowing full pipeline testing without real infrastructure.
//!
//! # Example
//!
//! ```rust,ignore
//! use recap_core::testing::{fixtures, MockCaptionSource, MockSummarizer};
//!
//! let captions = MockCaptionSource::new();
//! captions.set_transcript("vid-1", "hello world");
//!
//! let summarizer = MockSummarizer::new();
//! summarizer.set_response("a short digest");
//!
//! // Wire into a PipelineRunner...
//! ```

mod memory_ledger;
mod mock_extractor;
mod mock_publisher;
mod mock_source;
mod mock_summarizer;

pub use memory_ledger::MemoryLedger;
pub use mock_extractor::{MockArticleFetcher, MockCaptionSource, MockTranscriber};
pub use mock_publisher::{MockPublisher, RecordedPublish};
pub use mock_source::MockSourceReader;
pub use mock_summarizer::MockSummarizer;

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::extractor::{ContentRecord, ExtractionMethod};
    use crate::source::{Item, SourceDescriptor, SourceType};

    /// Create a video item with reasonable defaults.
    pub fn video_item(id: &str, title: &str) -> Item {
        Item {
            id: id.to_string(),
            title: title.to_string(),
            url: format!("https://www.youtube.com/watch?v={}", id),
            published_at: None,
            source_type: SourceType::Video,
        }
    }

    /// Create a feed item with reasonable defaults.
    pub fn feed_item(id: &str, title: &str) -> Item {
        Item {
            id: id.to_string(),
            title: title.to_string(),
            url: format!("https://example.com/posts/{}", id),
            published_at: None,
            source_type: SourceType::Feed,
        }
    }

    /// Create a content record as if captions extraction succeeded.
    pub fn content_record(id: &str, title: &str) -> ContentRecord {
        ContentRecord::from_item(
            &video_item(id, title),
            "full transcript text".to_string(),
            ExtractionMethod::Captions,
        )
    }

    /// Create an enabled channel source descriptor.
    pub fn channel_source(name: &str, identifier: &str) -> SourceDescriptor {
        SourceDescriptor {
            name: name.to_string(),
            source_type: SourceType::Channel,
            identifier: identifier.to_string(),
            enabled: true,
            keyword: None,
        }
    }

    /// Create an enabled feed source descriptor.
    pub fn feed_source(name: &str, identifier: &str) -> SourceDescriptor {
        SourceDescriptor {
            name: name.to_string(),
            source_type: SourceType::Feed,
            identifier: identifier.to_string(),
            enabled: true,
            keyword: None,
        }
    }
}
