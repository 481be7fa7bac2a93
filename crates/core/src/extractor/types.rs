use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::source::Item;

/// How an item's full text was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    /// Platform-provided transcript/captions.
    Captions,
    /// Local speech-to-text over downloaded audio.
    SpeechToText,
    /// Article body fetched from the entry url.
    ArticleBody,
}

impl ExtractionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionMethod::Captions => "captions",
            ExtractionMethod::SpeechToText => "speech_to_text",
            ExtractionMethod::ArticleBody => "article_body",
        }
    }
}

/// Normalized full-text content for one item. Immutable after creation;
/// owned by the orchestrator until handed to publishers.
#[derive(Debug, Clone)]
pub struct ContentRecord {
    pub item_id: String,
    pub title: String,
    pub url: String,
    pub published_at: Option<DateTime<Utc>>,
    pub body_text: String,
    pub extraction_method: ExtractionMethod,
}

impl ContentRecord {
    pub fn from_item(item: &Item, body_text: String, method: ExtractionMethod) -> Self {
        Self {
            item_id: item.id.clone(),
            title: item.title.clone(),
            url: item.url.clone(),
            published_at: item.published_at,
            body_text,
            extraction_method: method,
        }
    }
}

/// Stage at which extraction failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionStage {
    Captions,
    AudioDownload,
    SpeechToText,
    ArticleFetch,
}

impl ExtractionStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionStage::Captions => "captions",
            ExtractionStage::AudioDownload => "audio_download",
            ExtractionStage::SpeechToText => "speech_to_text",
            ExtractionStage::ArticleFetch => "article_fetch",
        }
    }
}

/// Error type for content extraction. Always a retryable condition: the
/// caller marks the item failed, not processed.
#[derive(Debug, thiserror::Error)]
#[error("Extraction failed for '{item_id}' at {}: {cause}", stage.as_str())]
pub struct ExtractionError {
    pub item_id: String,
    pub stage: ExtractionStage,
    pub cause: String,
}

/// Error type for caption fetches. `NotFound` is the only variant that lets
/// the extractor fall through to speech-to-text.
#[derive(Debug, thiserror::Error)]
pub enum CaptionError {
    #[error("No captions available for video '{0}'")]
    NotFound(String),

    #[error("Caption fetch failed: {0}")]
    Fetch(String),
}

/// Error type for audio download + transcription.
#[derive(Debug, thiserror::Error)]
pub enum TranscribeError {
    #[error("Speech-to-text model not found at '{path}'")]
    ModelNotFound { path: String },

    #[error("Audio download failed: {0}")]
    Download(String),

    #[error("Transcription failed: {0}")]
    Inference(String),

    #[error("Speech-to-text support not compiled in (build with the 'whisper' feature)")]
    Disabled,
}

/// Error type for article body fetches.
#[derive(Debug, thiserror::Error)]
pub enum ArticleError {
    #[error("Article fetch failed: {0}")]
    Fetch(String),

    #[error("No extractable article body at '{0}'")]
    NoContent(String),
}

/// Trait for transcript/caption providers.
#[async_trait]
pub trait CaptionSource: Send + Sync {
    fn name(&self) -> &str;

    /// Fetch the full transcript text for a video item.
    async fn fetch_transcript(&self, item: &Item) -> Result<String, CaptionError>;
}

/// Trait for the audio-download + local speech-to-text fallback.
#[async_trait]
pub trait AudioTranscriber: Send + Sync {
    /// Model identifier for logs and the run report.
    fn model_name(&self) -> &str;

    /// Download the item's audio and transcribe it locally.
    async fn transcribe(&self, item: &Item) -> Result<String, TranscribeError>;
}

/// Trait for article body extraction (feed sources).
#[async_trait]
pub trait ArticleFetcher: Send + Sync {
    async fn fetch_body(&self, item: &Item) -> Result<String, ArticleError>;
}
