//! In-memory ledger for testing, with write-failure injection.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use crate::ledger::{Ledger, LedgerError};

#[derive(Default)]
struct State {
    processed: HashSet<String>,
    failed: HashMap<String, String>,
    excluded: HashSet<String>,
}

/// Ledger backed by process memory. Nothing survives the process; intended
/// purely for pipeline tests.
#[derive(Default)]
pub struct MemoryLedger {
    state: Mutex<State>,
    fail_writes: Mutex<bool>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// All mutating calls fail with an I/O error until cleared.
    pub fn set_fail_writes(&self, fail: bool) {
        *self.fail_writes.lock().unwrap() = fail;
    }

    pub fn exclude(&self, item_id: &str) {
        self.state
            .lock()
            .unwrap()
            .excluded
            .insert(item_id.to_string());
    }

    pub fn failure_reason(&self, item_id: &str) -> Option<String> {
        self.state.lock().unwrap().failed.get(item_id).cloned()
    }

    fn check_writes(&self) -> Result<(), LedgerError> {
        if *self.fail_writes.lock().unwrap() {
            Err(LedgerError::Io("injected write failure".to_string()))
        } else {
            Ok(())
        }
    }
}

impl Ledger for MemoryLedger {
    fn is_processed(&self, item_id: &str) -> Result<bool, LedgerError> {
        Ok(self.state.lock().unwrap().processed.contains(item_id))
    }

    fn is_failed(&self, item_id: &str) -> Result<bool, LedgerError> {
        Ok(self.state.lock().unwrap().failed.contains_key(item_id))
    }

    fn is_permanently_failed(&self, item_id: &str) -> Result<bool, LedgerError> {
        Ok(self.state.lock().unwrap().excluded.contains(item_id))
    }

    fn mark_processed(&self, item_id: &str) -> Result<(), LedgerError> {
        self.check_writes()?;
        self.state
            .lock()
            .unwrap()
            .processed
            .insert(item_id.to_string());
        Ok(())
    }

    fn mark_failed(&self, item_id: &str, reason: &str) -> Result<(), LedgerError> {
        self.check_writes()?;
        let mut state = self.state.lock().unwrap();
        if state.processed.contains(item_id) {
            return Ok(());
        }
        state.failed.insert(item_id.to_string(), reason.to_string());
        Ok(())
    }

    fn mark_recovered(&self, item_id: &str) -> Result<(), LedgerError> {
        self.check_writes()?;
        let mut state = self.state.lock().unwrap();
        state.processed.insert(item_id.to_string());
        state.failed.remove(item_id);
        Ok(())
    }

    fn processed_count(&self) -> Result<usize, LedgerError> {
        Ok(self.state.lock().unwrap().processed.len())
    }

    fn failed_count(&self) -> Result<usize, LedgerError> {
        Ok(self.state.lock().unwrap().failed.len())
    }
}
