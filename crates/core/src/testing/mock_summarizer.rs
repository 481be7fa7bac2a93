//! Mock summarizer for testing.

use async_trait::async_trait;
use std::sync::Mutex;

use crate::summarizer::{SummarizeError, Summarizer};

/// Mock implementation of the Summarizer trait.
pub struct MockSummarizer {
    response: Mutex<String>,
    fail_always: Mutex<bool>,
    calls: Mutex<u32>,
    requests: Mutex<Vec<String>>,
}

impl Default for MockSummarizer {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSummarizer {
    pub fn new() -> Self {
        Self {
            response: Mutex::new("mock summary".to_string()),
            fail_always: Mutex::new(false),
            calls: Mutex::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn set_response(&self, text: &str) {
        *self.response.lock().unwrap() = text.to_string();
    }

    /// Every call fails, as if all provider retries were exhausted.
    pub fn fail_always(&self) {
        *self.fail_always.lock().unwrap() = true;
    }

    pub fn call_count(&self) -> u32 {
        *self.calls.lock().unwrap()
    }

    /// Titles summarized so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Summarizer for MockSummarizer {
    fn provider(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-model"
    }

    async fn summarize(&self, title: &str, _body: &str) -> Result<String, SummarizeError> {
        *self.calls.lock().unwrap() += 1;
        self.requests.lock().unwrap().push(title.to_string());
        if *self.fail_always.lock().unwrap() {
            return Err(SummarizeError::Api {
                status: 500,
                message: "mock failure".to_string(),
            });
        }
        Ok(self.response.lock().unwrap().clone())
    }
}
