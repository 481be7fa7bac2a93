//! SQLite-backed ledger.
//!
//! One row per item id with a `state` column. `mark_recovered` is a single
//! upsert, so the disjointness invariant holds even under a crash.

use std::path::Path;
use std::sync::Mutex;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use super::store::{Ledger, LedgerError};

const STATE_PROCESSED: &str = "processed";
const STATE_FAILED: &str = "failed";
const STATE_EXCLUDED: &str = "excluded";

/// SQLite-backed dedup ledger.
pub struct SqliteLedger {
    conn: Mutex<Connection>,
}

impl SqliteLedger {
    /// Open the database, creating the file and schema if needed.
    pub fn new(path: &Path) -> Result<Self, LedgerError> {
        let conn = Connection::open(path).map_err(db_err)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory ledger (useful for testing).
    pub fn in_memory() -> Result<Self, LedgerError> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), LedgerError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS ledger (
                item_id TEXT PRIMARY KEY,
                state TEXT NOT NULL CHECK(state IN ('processed', 'failed', 'excluded')),
                reason TEXT,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_ledger_state ON ledger(state);
            "#,
        )
        .map_err(db_err)?;
        Ok(())
    }

    /// Mark an id as excluded from processing forever. Operator-facing; the
    /// pipeline itself only reads this state.
    pub fn mark_excluded(&self, item_id: &str) -> Result<(), LedgerError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO ledger (item_id, state, reason, updated_at) VALUES (?1, ?2, NULL, ?3)
             ON CONFLICT(item_id) DO UPDATE SET state = ?2, reason = NULL, updated_at = ?3",
            params![item_id, STATE_EXCLUDED, Utc::now().to_rfc3339()],
        )
        .map_err(db_err)?;
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, LedgerError> {
        self.conn
            .lock()
            .map_err(|e| LedgerError::Database(format!("connection lock poisoned: {}", e)))
    }

    fn state_of(&self, item_id: &str) -> Result<Option<String>, LedgerError> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT state FROM ledger WHERE item_id = ?1",
            params![item_id],
            |row| row.get(0),
        )
        .optional()
        .map_err(db_err)
    }

    fn count_state(&self, state: &str) -> Result<usize, LedgerError> {
        let conn = self.lock()?;
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM ledger WHERE state = ?1",
                params![state],
                |row| row.get(0),
            )
            .map_err(db_err)?;
        Ok(count as usize)
    }
}

impl Ledger for SqliteLedger {
    fn is_processed(&self, item_id: &str) -> Result<bool, LedgerError> {
        Ok(self.state_of(item_id)?.as_deref() == Some(STATE_PROCESSED))
    }

    fn is_failed(&self, item_id: &str) -> Result<bool, LedgerError> {
        Ok(self.state_of(item_id)?.as_deref() == Some(STATE_FAILED))
    }

    fn is_permanently_failed(&self, item_id: &str) -> Result<bool, LedgerError> {
        Ok(self.state_of(item_id)?.as_deref() == Some(STATE_EXCLUDED))
    }

    fn mark_processed(&self, item_id: &str) -> Result<(), LedgerError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO ledger (item_id, state, reason, updated_at) VALUES (?1, ?2, NULL, ?3)
             ON CONFLICT(item_id) DO UPDATE SET state = ?2, reason = NULL, updated_at = ?3",
            params![item_id, STATE_PROCESSED, Utc::now().to_rfc3339()],
        )
        .map_err(db_err)?;
        Ok(())
    }

    fn mark_failed(&self, item_id: &str, reason: &str) -> Result<(), LedgerError> {
        let conn = self.lock()?;
        // Processed is terminal; never demote it.
        conn.execute(
            "INSERT INTO ledger (item_id, state, reason, updated_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(item_id) DO UPDATE SET state = ?2, reason = ?3, updated_at = ?4
             WHERE ledger.state != 'processed'",
            params![item_id, STATE_FAILED, reason, Utc::now().to_rfc3339()],
        )
        .map_err(db_err)?;
        Ok(())
    }

    fn mark_recovered(&self, item_id: &str) -> Result<(), LedgerError> {
        self.mark_processed(item_id)
    }

    fn processed_count(&self) -> Result<usize, LedgerError> {
        self.count_state(STATE_PROCESSED)
    }

    fn failed_count(&self) -> Result<usize, LedgerError> {
        self.count_state(STATE_FAILED)
    }
}

fn db_err(e: rusqlite::Error) -> LedgerError {
    LedgerError::Database(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_and_query() {
        let ledger = SqliteLedger::in_memory().unwrap();
        ledger.mark_processed("a").unwrap();
        ledger.mark_failed("b", "no captions").unwrap();

        assert!(ledger.is_processed("a").unwrap());
        assert!(!ledger.is_failed("a").unwrap());
        assert!(ledger.is_failed("b").unwrap());
        assert_eq!(ledger.processed_count().unwrap(), 1);
        assert_eq!(ledger.failed_count().unwrap(), 1);
    }

    #[test]
    fn test_mark_processed_idempotent() {
        let ledger = SqliteLedger::in_memory().unwrap();
        ledger.mark_processed("a").unwrap();
        ledger.mark_processed("a").unwrap();
        assert_eq!(ledger.processed_count().unwrap(), 1);
    }

    #[test]
    fn test_mark_failed_never_demotes_processed() {
        let ledger = SqliteLedger::in_memory().unwrap();
        ledger.mark_processed("a").unwrap();
        ledger.mark_failed("a", "late failure").unwrap();
        assert!(ledger.is_processed("a").unwrap());
        assert!(!ledger.is_failed("a").unwrap());
    }

    #[test]
    fn test_recovered_leaves_single_state() {
        let ledger = SqliteLedger::in_memory().unwrap();
        ledger.mark_failed("a", "flaky").unwrap();
        ledger.mark_recovered("a").unwrap();
        assert!(ledger.is_processed("a").unwrap());
        assert!(!ledger.is_failed("a").unwrap());
        assert_eq!(ledger.failed_count().unwrap(), 0);
    }

    #[test]
    fn test_excluded_state() {
        let ledger = SqliteLedger::in_memory().unwrap();
        ledger.mark_excluded("spam").unwrap();
        assert!(ledger.is_permanently_failed("spam").unwrap());
        assert!(!ledger.is_processed("spam").unwrap());
        assert!(!ledger.is_failed("spam").unwrap());
    }

    #[test]
    fn test_persists_across_open() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("ledger.db");
        {
            let ledger = SqliteLedger::new(&path).unwrap();
            ledger.mark_processed("a").unwrap();
            ledger.mark_failed("b", "x").unwrap();
        }
        let reopened = SqliteLedger::new(&path).unwrap();
        assert!(reopened.is_processed("a").unwrap());
        assert!(reopened.is_failed("b").unwrap());
    }
}
