//! Mock publisher for testing.

use async_trait::async_trait;
use std::sync::Mutex;

use crate::extractor::ContentRecord;
use crate::publisher::{PublishError, Publisher};

/// A delivery recorded by [`MockPublisher`].
#[derive(Debug, Clone)]
pub struct RecordedPublish {
    pub item_id: String,
    pub title: String,
    pub summary: String,
}

/// Mock implementation of the Publisher trait.
pub struct MockPublisher {
    name: String,
    published: Mutex<Vec<RecordedPublish>>,
    fail_always: Mutex<bool>,
}

impl MockPublisher {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            published: Mutex::new(Vec::new()),
            fail_always: Mutex::new(false),
        }
    }

    pub fn fail_always(&self) {
        *self.fail_always.lock().unwrap() = true;
    }

    pub fn published(&self) -> Vec<RecordedPublish> {
        self.published.lock().unwrap().clone()
    }

    pub fn publish_count(&self) -> usize {
        self.published.lock().unwrap().len()
    }
}

#[async_trait]
impl Publisher for MockPublisher {
    fn name(&self) -> &str {
        &self.name
    }

    async fn publish(&self, record: &ContentRecord, summary: &str) -> Result<(), PublishError> {
        if *self.fail_always.lock().unwrap() {
            return Err(PublishError::Api {
                status: 503,
                message: "mock failure".to_string(),
            });
        }
        self.published.lock().unwrap().push(RecordedPublish {
            item_id: record.item_id.clone(),
            title: record.title.clone(),
            summary: summary.to_string(),
        });
        Ok(())
    }
}
