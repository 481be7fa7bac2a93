//! Source readers: discovery of candidate items from configured sources.
//!
//! A source is a YouTube video, a YouTube channel, or an RSS feed. Readers
//! produce candidate [`Item`]s; they do not decide whether an item is new,
//! that is the dedup ledger's job.

mod rss;
mod types;
mod youtube;

pub use rss::RssReader;
pub use types::{Item, PublishedWindow, SourceDescriptor, SourceError, SourceReader, SourceType};
pub use youtube::YouTubeReader;
