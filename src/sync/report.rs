//! End-of-run summary

use crate::logging::Logger;
use crate::sync::purge::PurgeOutcome;
use crate::sync::transfer::SyncOutcome;
use crate::sync::validator::ValidationResult;
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub candidates: usize,
    pub validated_good: usize,
    pub validated_bad: usize,
    pub synced: usize,
    pub sync_failed: usize,
    pub cleanup_failed: usize,
    pub purge_candidates: usize,
    pub purged: usize,
    pub purge_skipped: usize,
    pub purge_failed: usize,
    pub validation_time: Duration,
    pub total_time: Duration,
    pub purge_mode: bool,
}

impl RunSummary {
    pub fn record_validation(&mut self, results: &[ValidationResult], elapsed: Duration) {
        self.validated_good = results.iter().filter(|r| r.is_good()).count();
        self.validated_bad = results.len() - self.validated_good;
        self.validation_time = elapsed;
    }

    /// `queued` is the number of verified images handed to the sync pool;
    /// any that never produced an outcome count as failed.
    pub fn record_sync(&mut self, outcomes: &[SyncOutcome], queued: usize) {
        self.synced = outcomes.iter().filter(|o| o.is_synced()).count();
        self.sync_failed = queued.saturating_sub(self.synced);
        self.cleanup_failed = outcomes.iter().filter(|o| o.cleanup_error.is_some()).count();
    }

    pub fn record_purge(&mut self, outcomes: &[PurgeOutcome]) {
        self.purged = outcomes.iter().filter(|o| o.is_purged()).count();
        self.purge_skipped = outcomes.iter().filter(|o| o.is_skipped()).count();
        self.purge_failed = outcomes.len() - self.purged - self.purge_skipped;
    }

    pub fn log(&self, output: &Logger) {
        let mut items: Vec<(&str, String)> = Vec::new();
        if self.purge_mode {
            items.push(("Purge candidates", self.purge_candidates.to_string()));
            items.push(("Purged", self.purged.to_string()));
            items.push(("Purge skipped", self.purge_skipped.to_string()));
            items.push(("Purge failed", self.purge_failed.to_string()));
        } else {
            items.push(("Candidates", self.candidates.to_string()));
            items.push(("Validated good", self.validated_good.to_string()));
            items.push(("Validated bad", self.validated_bad.to_string()));
            items.push(("Synced", self.synced.to_string()));
            items.push(("Sync failed", self.sync_failed.to_string()));
            items.push(("Cleanup failed", self.cleanup_failed.to_string()));
            items.push(("Validation time", output.format_duration(self.validation_time)));
        }
        items.push(("Total time", output.format_duration(self.total_time)));
        output.summary_kv("Run Summary", &items);
    }
}
