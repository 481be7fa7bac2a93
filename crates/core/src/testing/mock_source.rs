//! Mock source reader for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::source::{Item, SourceDescriptor, SourceError, SourceReader, SourceType};

/// Mock implementation of the SourceReader trait.
///
/// Handles every source type; items are keyed by source identifier so one
/// mock can back several configured sources.
pub struct MockSourceReader {
    items: Mutex<HashMap<String, Vec<Item>>>,
    next_error: Mutex<Option<SourceError>>,
    listed: Mutex<Vec<String>>,
}

impl Default for MockSourceReader {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSourceReader {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(HashMap::new()),
            next_error: Mutex::new(None),
            listed: Mutex::new(Vec::new()),
        }
    }

    pub fn set_items(&self, identifier: &str, items: Vec<Item>) {
        self.items
            .lock()
            .unwrap()
            .insert(identifier.to_string(), items);
    }

    /// The next listing fails with this error.
    pub fn set_next_error(&self, error: SourceError) {
        *self.next_error.lock().unwrap() = Some(error);
    }

    /// Identifiers listed so far, in order.
    pub fn listed(&self) -> Vec<String> {
        self.listed.lock().unwrap().clone()
    }
}

#[async_trait]
impl SourceReader for MockSourceReader {
    fn name(&self) -> &str {
        "mock-source"
    }

    fn handles(&self, _source_type: SourceType) -> bool {
        true
    }

    async fn list_items(&self, source: &SourceDescriptor) -> Result<Vec<Item>, SourceError> {
        self.listed.lock().unwrap().push(source.identifier.clone());
        if let Some(error) = self.next_error.lock().unwrap().take() {
            return Err(error);
        }
        Ok(self
            .items
            .lock()
            .unwrap()
            .get(&source.identifier)
            .cloned()
            .unwrap_or_default())
    }
}
