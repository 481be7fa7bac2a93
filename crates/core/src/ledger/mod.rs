//! Dedup ledger: the persisted record of which item ids have been processed
//! or have failed.
//!
//! The ledger is the only cross-run shared mutable state. Two backends
//! implement the same contract: a flat-file store (default) and SQLite.
//! Invariants either way:
//! - `processed` and `failed` are disjoint; an id found in both at load time
//!   resolves to `processed`.
//! - an id in `processed` is never re-attempted.
//! - a crash mid-run never corrupts previously durable entries.

mod file;
mod sqlite;
mod store;

pub use file::FileLedger;
pub use sqlite::SqliteLedger;
pub use store::{Ledger, LedgerError};

use std::path::Path;
use std::sync::Arc;

use crate::config::{LedgerBackend, LedgerConfig};

/// Create a ledger from configuration.
pub fn create_ledger(config: &LedgerConfig) -> Result<Arc<dyn Ledger>, LedgerError> {
    match config.backend {
        LedgerBackend::File => Ok(Arc::new(FileLedger::open(Path::new(&config.path))?)),
        LedgerBackend::Sqlite => Ok(Arc::new(SqliteLedger::new(Path::new(&config.path))?)),
    }
}
