//! Run counters

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

/// What happened to one source line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Inserted,
    SkippedExisting,
    Errored,
}

/// Counters for one load run, owned by the run loop
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadStats {
    /// Lines read and dispatched
    pub processed: u64,
    pub inserted: u64,
    pub skipped_existing: u64,
    pub errored: u64,
    /// The source was read through to its end
    pub reached_end: bool,
    /// The run was cancelled before the end of the source
    pub interrupted: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl LoadStats {
    /// Create new empty stats
    pub fn new() -> Self {
        Self {
            started_at: Some(Utc::now()),
            ..Default::default()
        }
    }

    pub fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Inserted => self.inserted += 1,
            Outcome::SkippedExisting => self.skipped_existing += 1,
            Outcome::Errored => self.errored += 1,
        }
    }

    /// Lines whose outcome is known
    pub fn settled(&self) -> u64 {
        self.inserted + self.skipped_existing + self.errored
    }

    /// Lines dispatched but not yet settled
    pub fn in_flight(&self) -> u64 {
        self.processed.saturating_sub(self.settled())
    }

    pub fn is_success(&self) -> bool {
        self.errored == 0
    }

    pub fn mark_completed(&mut self) {
        self.completed_at = Some(Utc::now());
    }

    pub fn duration_secs(&self) -> f64 {
        match (self.started_at, self.completed_at) {
            (Some(start), Some(end)) => (end - start).num_milliseconds() as f64 / 1000.0,
            _ => 0.0,
        }
    }

    /// Human-readable completion line for the terminal
    pub fn completion_message(&self) -> &'static str {
        match (self.interrupted, self.is_success()) {
            (false, true) => "finished and all success!",
            (false, false) => "finished and ended with error...",
            (true, true) => "interrupted before the end of the source, no errors so far",
            (true, false) => "interrupted before the end of the source, ended with error...",
        }
    }

    /// Log the current counters
    pub fn log_snapshot(&self) {
        info!(
            errored = self.errored,
            inserted = self.inserted,
            skipped_existing = self.skipped_existing,
            processed = self.processed,
            "Current counts"
        );
    }

    /// Log the end-of-run marker and final counters
    pub fn log_final(&self) {
        info!(
            errored = self.errored,
            inserted = self.inserted,
            skipped_existing = self.skipped_existing,
            processed = self.processed,
            interrupted = self.interrupted,
            duration_secs = self.duration_secs(),
            "================== FINISHED =================="
        );
    }
}
