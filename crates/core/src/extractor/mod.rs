//! Content extraction: full text for a candidate item.
//!
//! Each source type maps to an ordered list of strategies, tried until one
//! succeeds. Captions are cheap and tried first for video content; the
//! speech-to-text fallback only runs when the platform reports no captions,
//! never on transport errors. On retry runs captions are re-checked first
//! (the platform may have published them since the last attempt).

mod article;
mod captions;
mod types;
mod whisper;

pub use article::ArticleExtractor;
pub use captions::YouTubeCaptionClient;
pub use types::{
    ArticleError, ArticleFetcher, AudioTranscriber, CaptionError, CaptionSource, ContentRecord,
    ExtractionError, ExtractionMethod, ExtractionStage, TranscribeError,
};
pub use whisper::{SttConfig, WhisperTranscriber};

use std::sync::Arc;

use tracing::{debug, info};

use crate::metrics;
use crate::source::{Item, SourceType};

/// One step in the extraction chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Strategy {
    Captions,
    SpeechToText,
    Article,
}

fn strategies_for(source_type: SourceType) -> &'static [Strategy] {
    match source_type {
        SourceType::Video | SourceType::Channel => &[Strategy::Captions, Strategy::SpeechToText],
        SourceType::Feed => &[Strategy::Article],
    }
}

/// Drives the per-item extraction chain.
pub struct ContentExtractor {
    captions: Arc<dyn CaptionSource>,
    transcriber: Arc<dyn AudioTranscriber>,
    articles: Arc<dyn ArticleFetcher>,
}

impl ContentExtractor {
    pub fn new(
        captions: Arc<dyn CaptionSource>,
        transcriber: Arc<dyn AudioTranscriber>,
        articles: Arc<dyn ArticleFetcher>,
    ) -> Self {
        Self {
            captions,
            transcriber,
            articles,
        }
    }

    /// Extract full text for one item.
    pub async fn extract(&self, item: &Item) -> Result<ContentRecord, ExtractionError> {
        for strategy in strategies_for(item.source_type) {
            match strategy {
                Strategy::Captions => match self.captions.fetch_transcript(item).await {
                    Ok(text) => {
                        debug!("Captions found for '{}'", item.id);
                        return Ok(self.finish(item, text, ExtractionMethod::Captions));
                    }
                    Err(CaptionError::NotFound(_)) => {
                        info!("No captions for '{}', falling back to speech-to-text", item.id);
                        continue;
                    }
                    Err(CaptionError::Fetch(cause)) => {
                        return Err(ExtractionError {
                            item_id: item.id.clone(),
                            stage: ExtractionStage::Captions,
                            cause,
                        });
                    }
                },
                Strategy::SpeechToText => {
                    let text = self.transcriber.transcribe(item).await.map_err(|e| {
                        ExtractionError {
                            item_id: item.id.clone(),
                            stage: match e {
                                TranscribeError::Download(_) => ExtractionStage::AudioDownload,
                                _ => ExtractionStage::SpeechToText,
                            },
                            cause: e.to_string(),
                        }
                    })?;
                    return Ok(self.finish(item, text, ExtractionMethod::SpeechToText));
                }
                Strategy::Article => {
                    let text = self.articles.fetch_body(item).await.map_err(|e| {
                        ExtractionError {
                            item_id: item.id.clone(),
                            stage: ExtractionStage::ArticleFetch,
                            cause: e.to_string(),
                        }
                    })?;
                    return Ok(self.finish(item, text, ExtractionMethod::ArticleBody));
                }
            }
        }

        // Unreachable with the current strategy tables: every chain ends in a
        // strategy that either returns or errors.
        Err(ExtractionError {
            item_id: item.id.clone(),
            stage: ExtractionStage::Captions,
            cause: "no extraction strategy applies".to_string(),
        })
    }

    fn finish(&self, item: &Item, text: String, method: ExtractionMethod) -> ContentRecord {
        metrics::EXTRACTIONS_TOTAL
            .with_label_values(&[method.as_str()])
            .inc();
        ContentRecord::from_item(item, text, method)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fixtures, MockArticleFetcher, MockCaptionSource, MockTranscriber};

    fn extractor(
        captions: MockCaptionSource,
        transcriber: MockTranscriber,
        articles: MockArticleFetcher,
    ) -> (
        ContentExtractor,
        Arc<MockCaptionSource>,
        Arc<MockTranscriber>,
    ) {
        let captions = Arc::new(captions);
        let transcriber = Arc::new(transcriber);
        let extractor = ContentExtractor::new(
            Arc::clone(&captions) as Arc<dyn CaptionSource>,
            Arc::clone(&transcriber) as Arc<dyn AudioTranscriber>,
            Arc::new(articles),
        );
        (extractor, captions, transcriber)
    }

    #[tokio::test]
    async fn test_captions_preferred_over_stt() {
        let captions = MockCaptionSource::new();
        captions.set_transcript("vid-1", "hello from captions");
        let (extractor, _, transcriber) =
            extractor(captions, MockTranscriber::new(), MockArticleFetcher::new());

        let item = fixtures::video_item("vid-1", "A video");
        let record = extractor.extract(&item).await.unwrap();

        assert_eq!(record.extraction_method, ExtractionMethod::Captions);
        assert_eq!(record.body_text, "hello from captions");
        assert_eq!(transcriber.call_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_captions_fall_back_to_stt() {
        let transcriber = MockTranscriber::new();
        transcriber.set_text("vid-1", "hello from whisper");
        let (extractor, captions, _) =
            extractor(MockCaptionSource::new(), transcriber, MockArticleFetcher::new());

        let item = fixtures::video_item("vid-1", "A captionless video");
        let record = extractor.extract(&item).await.unwrap();

        assert_eq!(record.extraction_method, ExtractionMethod::SpeechToText);
        assert_eq!(record.body_text, "hello from whisper");
        assert_eq!(captions.call_count(), 1);
    }

    #[tokio::test]
    async fn test_caption_transport_error_does_not_fall_back() {
        let captions = MockCaptionSource::new();
        captions.set_next_error(CaptionError::Fetch("connection reset".to_string()));
        let transcriber = MockTranscriber::new();
        transcriber.set_text("vid-1", "should never be used");
        let (extractor, _, transcriber) =
            extractor(captions, transcriber, MockArticleFetcher::new());

        let item = fixtures::video_item("vid-1", "A video");
        let err = extractor.extract(&item).await.unwrap_err();

        assert_eq!(err.stage, ExtractionStage::Captions);
        assert_eq!(transcriber.call_count(), 0);
    }

    #[tokio::test]
    async fn test_stt_failure_is_extraction_error() {
        let transcriber = MockTranscriber::new();
        transcriber.set_next_error(TranscribeError::Download("403".to_string()));
        let (extractor, _, _) =
            extractor(MockCaptionSource::new(), transcriber, MockArticleFetcher::new());

        let item = fixtures::video_item("vid-1", "A video");
        let err = extractor.extract(&item).await.unwrap_err();
        assert_eq!(err.stage, ExtractionStage::AudioDownload);
        assert_eq!(err.item_id, "vid-1");
    }

    #[tokio::test]
    async fn test_feed_items_use_article_fetcher() {
        let articles = MockArticleFetcher::new();
        articles.set_body("post-1", "the article body");
        let captions = MockCaptionSource::new();
        captions.set_transcript("post-1", "should not be consulted");
        let (extractor, captions, _) = extractor(captions, MockTranscriber::new(), articles);

        let item = fixtures::feed_item("post-1", "A post");
        let record = extractor.extract(&item).await.unwrap();

        assert_eq!(record.extraction_method, ExtractionMethod::ArticleBody);
        assert_eq!(record.body_text, "the article body");
        assert_eq!(captions.call_count(), 0);
    }

    #[tokio::test]
    async fn test_article_failure_is_retryable_extraction_error() {
        let articles = MockArticleFetcher::new();
        articles.set_next_error(ArticleError::NoContent("https://example.com/x".to_string()));
        let (extractor, _, _) = extractor(MockCaptionSource::new(), MockTranscriber::new(), articles);

        let item = fixtures::feed_item("post-1", "A post");
        let err = extractor.extract(&item).await.unwrap_err();
        assert_eq!(err.stage, ExtractionStage::ArticleFetch);
    }
}
