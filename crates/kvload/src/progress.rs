//! Terminal progress for interactive runs
//!
//! A spinner on stderr showing live counters. indicatif draws nothing when
//! stderr is not a terminal, so unattended runs only get the log file.

use crate::stats::LoadStats;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

pub struct LoadProgress {
    bar: ProgressBar,
}

impl LoadProgress {
    /// Spinner with a steady tick
    pub fn spinner(source: &str) -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {prefix} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_prefix(source.to_string());
        bar.enable_steady_tick(Duration::from_millis(100));
        Self { bar }
    }

    /// Draws nothing; used by tests and non-interactive callers
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    pub fn update(&self, stats: &LoadStats) {
        self.bar.set_message(format_counts(stats));
    }

    pub fn finish(&self, stats: &LoadStats) {
        self.bar.finish_with_message(format_counts(stats));
    }
}

impl Default for LoadProgress {
    fn default() -> Self {
        Self::hidden()
    }
}

/// One-line counter summary
pub fn format_counts(stats: &LoadStats) -> String {
    format!(
        "processed {} | inserted {} | skipped {} | errors {}",
        stats.processed, stats.inserted, stats.skipped_existing, stats.errored
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::Outcome;

    #[test]
    fn test_format_counts() {
        let mut stats = LoadStats::new();
        stats.processed = 3;
        stats.record(Outcome::Inserted);
        stats.record(Outcome::SkippedExisting);
        stats.record(Outcome::Errored);

        assert_eq!(
            format_counts(&stats),
            "processed 3 | inserted 1 | skipped 1 | errors 1"
        );
    }

    #[test]
    fn test_hidden_progress_accepts_updates() {
        let progress = LoadProgress::hidden();
        let stats = LoadStats::new();
        progress.update(&stats);
        progress.finish(&stats);
    }
}
