//! Flat-file ledger backend.
//!
//! Layout inside the ledger directory:
//! - `processed_ids` — append-only, one id per line, synced after each append.
//! - `failed_ids` — one `id<TAB>reason` per line, rewritten atomically via a
//!   temp file and rename (never truncated in place).
//! - `excluded_ids` — optional, operator-maintained, one id per line;
//!   consulted for [`Ledger::is_permanently_failed`], never written.
//! - `corrections.log` — optional free-form operator notes, never touched.

use std::collections::{HashMap, HashSet};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, warn};

use super::store::{Ledger, LedgerError};

const PROCESSED_FILE: &str = "processed_ids";
const FAILED_FILE: &str = "failed_ids";
const EXCLUDED_FILE: &str = "excluded_ids";

struct State {
    processed: HashSet<String>,
    failed: HashMap<String, String>,
    excluded: HashSet<String>,
    processed_writer: File,
}

/// File-backed dedup ledger.
pub struct FileLedger {
    dir: PathBuf,
    state: Mutex<State>,
}

impl FileLedger {
    /// Open (or create) a ledger directory and load its current state.
    pub fn open(dir: &Path) -> Result<Self, LedgerError> {
        std::fs::create_dir_all(dir).map_err(io_err)?;

        let processed = read_id_lines(&dir.join(PROCESSED_FILE))?
            .into_iter()
            .collect::<HashSet<_>>();

        let mut failed = HashMap::new();
        for line in read_lines(&dir.join(FAILED_FILE))? {
            let (id, reason) = match line.split_once('\t') {
                Some((id, reason)) => (id.to_string(), reason.to_string()),
                None => (line, String::new()),
            };
            // Processed wins: a crash between the recovery append and the
            // failed-file rewrite can leave an id in both files.
            if processed.contains(&id) {
                debug!("Ledger id '{}' present in both sets, keeping processed", id);
                continue;
            }
            failed.insert(id, reason);
        }

        let excluded = read_id_lines(&dir.join(EXCLUDED_FILE))?
            .into_iter()
            .collect::<HashSet<_>>();

        let processed_writer = OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join(PROCESSED_FILE))
            .map_err(io_err)?;

        debug!(
            "Ledger loaded: {} processed, {} failed, {} excluded",
            processed.len(),
            failed.len(),
            excluded.len()
        );

        Ok(Self {
            dir: dir.to_path_buf(),
            state: Mutex::new(State {
                processed,
                failed,
                excluded,
                processed_writer,
            }),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, State>, LedgerError> {
        self.state
            .lock()
            .map_err(|e| LedgerError::Io(format!("ledger lock poisoned: {}", e)))
    }

    fn append_processed(state: &mut State, item_id: &str) -> Result<(), LedgerError> {
        writeln!(state.processed_writer, "{}", item_id).map_err(io_err)?;
        state.processed_writer.flush().map_err(io_err)?;
        state.processed_writer.sync_data().map_err(io_err)?;
        state.processed.insert(item_id.to_string());
        Ok(())
    }

    /// Rewrite `failed_ids` from the in-memory map: write a temp file in the
    /// same directory, then rename over the old one.
    fn rewrite_failed(&self, state: &State) -> Result<(), LedgerError> {
        let tmp_path = self.dir.join(format!("{}.tmp", FAILED_FILE));
        let mut tmp = File::create(&tmp_path).map_err(io_err)?;
        for (id, reason) in &state.failed {
            writeln!(tmp, "{}\t{}", id, sanitize_reason(reason)).map_err(io_err)?;
        }
        tmp.sync_all().map_err(io_err)?;
        std::fs::rename(&tmp_path, self.dir.join(FAILED_FILE)).map_err(io_err)?;
        Ok(())
    }
}

impl Ledger for FileLedger {
    fn is_processed(&self, item_id: &str) -> Result<bool, LedgerError> {
        Ok(self.lock()?.processed.contains(item_id))
    }

    fn is_failed(&self, item_id: &str) -> Result<bool, LedgerError> {
        Ok(self.lock()?.failed.contains_key(item_id))
    }

    fn is_permanently_failed(&self, item_id: &str) -> Result<bool, LedgerError> {
        Ok(self.lock()?.excluded.contains(item_id))
    }

    fn mark_processed(&self, item_id: &str) -> Result<(), LedgerError> {
        let mut state = self.lock()?;
        if state.processed.contains(item_id) {
            return Ok(());
        }
        Self::append_processed(&mut state, item_id)
    }

    fn mark_failed(&self, item_id: &str, reason: &str) -> Result<(), LedgerError> {
        let mut state = self.lock()?;
        if state.processed.contains(item_id) {
            warn!("mark_failed for already-processed id '{}', ignoring", item_id);
            return Ok(());
        }
        state.failed.insert(item_id.to_string(), reason.to_string());
        self.rewrite_failed(&state)
    }

    fn mark_recovered(&self, item_id: &str) -> Result<(), LedgerError> {
        let mut state = self.lock()?;
        if !state.processed.contains(item_id) {
            // Append first: if we crash before the failed rewrite lands, the
            // load-time "processed wins" rule restores the invariant.
            Self::append_processed(&mut state, item_id)?;
        }
        if state.failed.remove(item_id).is_some() {
            self.rewrite_failed(&state)?;
        }
        Ok(())
    }

    fn processed_count(&self) -> Result<usize, LedgerError> {
        Ok(self.lock()?.processed.len())
    }

    fn failed_count(&self) -> Result<usize, LedgerError> {
        Ok(self.lock()?.failed.len())
    }
}

fn io_err(e: std::io::Error) -> LedgerError {
    LedgerError::Io(e.to_string())
}

/// Reasons are stored one-per-line; strip anything that would break that.
fn sanitize_reason(reason: &str) -> String {
    reason.replace(['\n', '\r', '\t'], " ")
}

fn read_lines(path: &Path) -> Result<Vec<String>, LedgerError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let raw = std::fs::read_to_string(path).map_err(io_err)?;
    Ok(raw
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect())
}

fn read_id_lines(path: &Path) -> Result<Vec<String>, LedgerError> {
    // Tolerate trailing fields so the format can grow.
    Ok(read_lines(path)?
        .into_iter()
        .map(|l| l.split('\t').next().unwrap_or_default().to_string())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_ledger(dir: &TempDir) -> FileLedger {
        FileLedger::open(dir.path()).unwrap()
    }

    #[test]
    fn test_empty_ledger() {
        let dir = TempDir::new().unwrap();
        let ledger = open_ledger(&dir);
        assert!(!ledger.is_processed("a").unwrap());
        assert!(!ledger.is_failed("a").unwrap());
        assert_eq!(ledger.processed_count().unwrap(), 0);
    }

    #[test]
    fn test_mark_processed_is_durable_and_idempotent() {
        let dir = TempDir::new().unwrap();
        {
            let ledger = open_ledger(&dir);
            ledger.mark_processed("vid-1").unwrap();
            ledger.mark_processed("vid-1").unwrap();
            ledger.mark_processed("vid-2").unwrap();
        }

        // Idempotence holds on disk, not just in memory.
        let raw = std::fs::read_to_string(dir.path().join(PROCESSED_FILE)).unwrap();
        assert_eq!(raw.lines().count(), 2);

        let reloaded = open_ledger(&dir);
        assert!(reloaded.is_processed("vid-1").unwrap());
        assert!(reloaded.is_processed("vid-2").unwrap());
        assert_eq!(reloaded.processed_count().unwrap(), 2);
    }

    #[test]
    fn test_mark_failed_overwrites_reason() {
        let dir = TempDir::new().unwrap();
        let ledger = open_ledger(&dir);
        ledger.mark_failed("vid-1", "no captions").unwrap();
        ledger.mark_failed("vid-1", "summarizer timeout").unwrap();
        assert_eq!(ledger.failed_count().unwrap(), 1);

        let raw = std::fs::read_to_string(dir.path().join(FAILED_FILE)).unwrap();
        assert_eq!(raw.lines().count(), 1);
        assert!(raw.contains("summarizer timeout"));
        assert!(!raw.contains("no captions"));
    }

    #[test]
    fn test_mark_recovered_moves_between_sets() {
        let dir = TempDir::new().unwrap();
        let ledger = open_ledger(&dir);
        ledger.mark_failed("vid-1", "flaky").unwrap();
        ledger.mark_recovered("vid-1").unwrap();

        assert!(ledger.is_processed("vid-1").unwrap());
        assert!(!ledger.is_failed("vid-1").unwrap());

        let reloaded = open_ledger(&dir);
        assert!(reloaded.is_processed("vid-1").unwrap());
        assert!(!reloaded.is_failed("vid-1").unwrap());
    }

    #[test]
    fn test_processed_wins_when_both_files_hold_an_id() {
        // Simulates a crash between the recovery append and the failed rewrite.
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(PROCESSED_FILE), "vid-1\n").unwrap();
        std::fs::write(dir.path().join(FAILED_FILE), "vid-1\told reason\n").unwrap();

        let ledger = open_ledger(&dir);
        assert!(ledger.is_processed("vid-1").unwrap());
        assert!(!ledger.is_failed("vid-1").unwrap());
    }

    #[test]
    fn test_mark_failed_ignored_for_processed_id() {
        let dir = TempDir::new().unwrap();
        let ledger = open_ledger(&dir);
        ledger.mark_processed("vid-1").unwrap();
        ledger.mark_failed("vid-1", "should not stick").unwrap();
        assert!(!ledger.is_failed("vid-1").unwrap());
        assert!(ledger.is_processed("vid-1").unwrap());
    }

    #[test]
    fn test_excluded_ids_are_permanent() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(EXCLUDED_FILE), "spam-1\nspam-2\n").unwrap();

        let ledger = open_ledger(&dir);
        assert!(ledger.is_permanently_failed("spam-1").unwrap());
        assert!(!ledger.is_permanently_failed("vid-1").unwrap());

        // The pipeline never writes the excluded list.
        ledger.mark_processed("other").unwrap();
        let raw = std::fs::read_to_string(dir.path().join(EXCLUDED_FILE)).unwrap();
        assert_eq!(raw, "spam-1\nspam-2\n");
    }

    #[test]
    fn test_reason_with_newlines_stays_one_line() {
        let dir = TempDir::new().unwrap();
        let ledger = open_ledger(&dir);
        ledger.mark_failed("vid-1", "line one\nline two").unwrap();

        let raw = std::fs::read_to_string(dir.path().join(FAILED_FILE)).unwrap();
        assert_eq!(raw.lines().count(), 1);

        let reloaded = open_ledger(&dir);
        assert!(reloaded.is_failed("vid-1").unwrap());
    }

    #[test]
    fn test_corrections_log_never_touched() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("corrections.log"), "manual note\n").unwrap();

        let ledger = open_ledger(&dir);
        ledger.mark_processed("vid-1").unwrap();
        ledger.mark_failed("vid-2", "x").unwrap();

        let raw = std::fs::read_to_string(dir.path().join("corrections.log")).unwrap();
        assert_eq!(raw, "manual note\n");
    }
}
