//! Mock extraction providers for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::extractor::{
    ArticleError, ArticleFetcher, AudioTranscriber, CaptionError, CaptionSource, TranscribeError,
};
use crate::source::Item;

/// Mock implementation of the CaptionSource trait.
///
/// Items without a configured transcript report `CaptionError::NotFound`,
/// which is what drives the speech-to-text fallback.
pub struct MockCaptionSource {
    transcripts: Mutex<HashMap<String, String>>,
    next_error: Mutex<Option<CaptionError>>,
    calls: Mutex<u32>,
}

impl Default for MockCaptionSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MockCaptionSource {
    pub fn new() -> Self {
        Self {
            transcripts: Mutex::new(HashMap::new()),
            next_error: Mutex::new(None),
            calls: Mutex::new(0),
        }
    }

    pub fn set_transcript(&self, item_id: &str, text: &str) {
        self.transcripts
            .lock()
            .unwrap()
            .insert(item_id.to_string(), text.to_string());
    }

    /// The next fetch fails with this error.
    pub fn set_next_error(&self, error: CaptionError) {
        *self.next_error.lock().unwrap() = Some(error);
    }

    pub fn call_count(&self) -> u32 {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl CaptionSource for MockCaptionSource {
    fn name(&self) -> &str {
        "mock-captions"
    }

    async fn fetch_transcript(&self, item: &Item) -> Result<String, CaptionError> {
        *self.calls.lock().unwrap() += 1;
        if let Some(error) = self.next_error.lock().unwrap().take() {
            return Err(error);
        }
        self.transcripts
            .lock()
            .unwrap()
            .get(&item.id)
            .cloned()
            .ok_or_else(|| CaptionError::NotFound(item.id.clone()))
    }
}

/// Mock implementation of the AudioTranscriber trait.
pub struct MockTranscriber {
    texts: Mutex<HashMap<String, String>>,
    next_error: Mutex<Option<TranscribeError>>,
    calls: Mutex<u32>,
}

impl Default for MockTranscriber {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTranscriber {
    pub fn new() -> Self {
        Self {
            texts: Mutex::new(HashMap::new()),
            next_error: Mutex::new(None),
            calls: Mutex::new(0),
        }
    }

    pub fn set_text(&self, item_id: &str, text: &str) {
        self.texts
            .lock()
            .unwrap()
            .insert(item_id.to_string(), text.to_string());
    }

    pub fn set_next_error(&self, error: TranscribeError) {
        *self.next_error.lock().unwrap() = Some(error);
    }

    pub fn call_count(&self) -> u32 {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl AudioTranscriber for MockTranscriber {
    fn model_name(&self) -> &str {
        "mock-model"
    }

    async fn transcribe(&self, item: &Item) -> Result<String, TranscribeError> {
        *self.calls.lock().unwrap() += 1;
        if let Some(error) = self.next_error.lock().unwrap().take() {
            return Err(error);
        }
        self.texts
            .lock()
            .unwrap()
            .get(&item.id)
            .cloned()
            .ok_or_else(|| TranscribeError::Inference(format!("no text for '{}'", item.id)))
    }
}

/// Mock implementation of the ArticleFetcher trait.
pub struct MockArticleFetcher {
    bodies: Mutex<HashMap<String, String>>,
    next_error: Mutex<Option<ArticleError>>,
    calls: Mutex<u32>,
}

impl Default for MockArticleFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl MockArticleFetcher {
    pub fn new() -> Self {
        Self {
            bodies: Mutex::new(HashMap::new()),
            next_error: Mutex::new(None),
            calls: Mutex::new(0),
        }
    }

    pub fn set_body(&self, item_id: &str, text: &str) {
        self.bodies
            .lock()
            .unwrap()
            .insert(item_id.to_string(), text.to_string());
    }

    pub fn set_next_error(&self, error: ArticleError) {
        *self.next_error.lock().unwrap() = Some(error);
    }

    pub fn call_count(&self) -> u32 {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl ArticleFetcher for MockArticleFetcher {
    async fn fetch_body(&self, item: &Item) -> Result<String, ArticleError> {
        *self.calls.lock().unwrap() += 1;
        if let Some(error) = self.next_error.lock().unwrap().take() {
            return Err(error);
        }
        self.bodies
            .lock()
            .unwrap()
            .get(&item.id)
            .cloned()
            .ok_or_else(|| ArticleError::NoContent(item.url.clone()))
    }
}
