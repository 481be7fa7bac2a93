use std::time::Duration;

/// Outcome of one full run, for the exit log and the CLI summary line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Items discovered across all sources, before dedup.
    pub items_seen: usize,
    /// Items newly processed this run (including recoveries).
    pub processed: usize,
    /// Items that failed and were recorded for retry.
    pub failed: usize,
    /// Items skipped because the ledger already settled them.
    pub skipped: usize,
    /// Sources skipped because discovery failed.
    pub skipped_sources: usize,
}

impl std::fmt::Display for RunReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} seen, {} processed, {} failed, {} skipped ({} sources unavailable)",
            self.items_seen, self.processed, self.failed, self.skipped, self.skipped_sources
        )
    }
}

/// Pacing for one run.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunSettings {
    /// Pause between items; zero means no pause.
    pub item_delay: Duration,
}

/// Per-item result, used for counting only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ItemOutcome {
    Processed,
    Failed,
    Skipped,
}

impl ItemOutcome {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            ItemOutcome::Processed => "processed",
            ItemOutcome::Failed => "failed",
            ItemOutcome::Skipped => "skipped",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_display() {
        let report = RunReport {
            items_seen: 5,
            processed: 2,
            failed: 1,
            skipped: 2,
            skipped_sources: 1,
        };
        assert_eq!(
            report.to_string(),
            "5 seen, 2 processed, 1 failed, 2 skipped (1 sources unavailable)"
        );
    }
}
