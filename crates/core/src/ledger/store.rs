//! Ledger trait and error type.

/// Error type for ledger operations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Ledger I/O error: {0}")]
    Io(String),

    #[error("Ledger database error: {0}")]
    Database(String),
}

/// Trait for dedup ledger backends.
///
/// All mutating operations are idempotent and must be durable before they
/// return: a later run reading the same backing store observes them.
pub trait Ledger: Send + Sync {
    /// Whether the item has terminally succeeded. Processed items are never
    /// re-attempted.
    fn is_processed(&self, item_id: &str) -> Result<bool, LedgerError>;

    /// Whether the item has failed on its last attempt. Failed items are
    /// retried on later runs.
    fn is_failed(&self, item_id: &str) -> Result<bool, LedgerError>;

    /// Whether the item has been deliberately excluded by an operator and
    /// must never be retried.
    fn is_permanently_failed(&self, item_id: &str) -> Result<bool, LedgerError>;

    /// Record terminal success. Adding an id already present is a no-op.
    fn mark_processed(&self, item_id: &str) -> Result<(), LedgerError>;

    /// Record a failure with its reason. Overwrites any previous reason for
    /// the same id. A no-op for ids already processed.
    fn mark_failed(&self, item_id: &str, reason: &str) -> Result<(), LedgerError>;

    /// Move an id from `failed` to `processed` as one logically atomic step.
    fn mark_recovered(&self, item_id: &str) -> Result<(), LedgerError>;

    /// Number of processed ids.
    fn processed_count(&self) -> Result<usize, LedgerError>;

    /// Number of failed ids.
    fn failed_count(&self) -> Result<usize, LedgerError>;
}
