//! The load run
//!
//! Reads the source line by line and hands each line to the
//! [`ExistenceGatedInserter`]. Up to `max_in_flight` lines have store calls
//! outstanding at once; the next line is read only when a slot is free.
//! Outcomes are folded into [`LoadStats`] and the [`FailureSink`] by this
//! loop alone, so neither needs synchronization.
//!
//! After each dispatched line the progress cadence and the [`Throttle`] are
//! consulted. Every `batch_size` lines all in-flight lines are settled and
//! the counters are logged before anything else happens. A throttle pause
//! then stops reading; lines already in flight keep settling while it runs.
//!
//! Lines are read as bytes. A line that is not valid UTF-8 is a per-record
//! failure and its bytes go to the failure sink unchanged.

use crate::config::LoaderConfig;
use crate::error::{LoadError, RecordError, Result};
use crate::failure_sink::FailureSink;
use crate::inserter::{Disposition, ExistenceGatedInserter, RecordFailure};
use crate::progress::LoadProgress;
use crate::stats::{LoadStats, Outcome};
use crate::store::KeyValueStore;
use crate::throttle::Throttle;
use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Settled result of one line, carrying the raw text when it failed
#[derive(Debug)]
pub enum LineOutcome {
    Inserted,
    SkippedExisting,
    Errored {
        raw: Vec<u8>,
        key: Option<String>,
        error: RecordError,
    },
}

impl LineOutcome {
    pub fn outcome(&self) -> Outcome {
        match self {
            LineOutcome::Inserted => Outcome::Inserted,
            LineOutcome::SkippedExisting => Outcome::SkippedExisting,
            LineOutcome::Errored { .. } => Outcome::Errored,
        }
    }
}

pub struct Loader<S> {
    inserter: ExistenceGatedInserter<S>,
    throttle: Box<dyn Throttle>,
    sink: FailureSink,
    report_every: u64,
    max_in_flight: usize,
    progress: LoadProgress,
    cancel: CancellationToken,
}

impl<S: KeyValueStore> Loader<S> {
    /// Loader writing into `table`, configured from `config`
    pub fn new(store: S, table: impl Into<String>, config: &LoaderConfig, sink: FailureSink) -> Self {
        Self {
            inserter: ExistenceGatedInserter::new(
                store,
                table,
                config.key_attribute.clone(),
                config.normalization,
            ),
            throttle: config.build_throttle(),
            sink,
            report_every: config.batch_size,
            max_in_flight: config.max_in_flight.max(1),
            progress: LoadProgress::hidden(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_throttle(mut self, throttle: Box<dyn Throttle>) -> Self {
        self.throttle = throttle;
        self
    }

    pub fn with_progress(mut self, progress: LoadProgress) -> Self {
        self.progress = progress;
        self
    }

    /// Stop reading when `cancel` fires; in-flight lines are still settled
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Load every line of `source`
    pub async fn run(self, source: &Path) -> Result<LoadStats> {
        let Loader {
            inserter,
            mut throttle,
            mut sink,
            report_every,
            max_in_flight,
            progress,
            cancel,
        } = self;

        let file = File::open(source)
            .await
            .map_err(|e| LoadError::SourceUnavailable {
                path: source.to_path_buf(),
                source: e,
            })?;
        let mut reader = BufReader::new(file);
        let mut buf = Vec::new();

        info!(
            source = %source.display(),
            table = %inserter.table(),
            error_file = %sink.path().display(),
            max_in_flight,
            "Load started"
        );

        let mut stats = LoadStats::new();
        let mut in_flight = FuturesUnordered::new();
        let mut fatal = None;

        loop {
            buf.clear();
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    warn!(processed = stats.processed, "Load interrupted, no further lines will be read");
                    stats.interrupted = true;
                    break;
                }
                next = reader.read_until(b'\n', &mut buf) => next,
            };

            match next {
                Ok(0) => {
                    stats.reached_end = true;
                    break;
                },
                Ok(_) => {},
                Err(e) => {
                    error!(error = %e, line = stats.processed + 1, "Failed to read source");
                    fatal = Some(LoadError::LineRead {
                        path: source.to_path_buf(),
                        line: stats.processed + 1,
                        source: e,
                    });
                    break;
                },
            }

            stats.processed += 1;
            in_flight.push(handle_line(&inserter, take_line(&mut buf)));

            while in_flight.len() >= max_in_flight {
                if let Some(outcome) = in_flight.next().await {
                    settle(outcome, &mut stats, &mut sink, &progress);
                }
            }

            if report_every > 0 && stats.processed % report_every == 0 {
                while let Some(outcome) = in_flight.next().await {
                    settle(outcome, &mut stats, &mut sink, &progress);
                }
                stats.log_snapshot();
            }

            if let Some(delay) = throttle.after_line(stats.processed) {
                debug!(delay_ms = delay.as_millis() as u64, "Pausing");
                let sleep = tokio::time::sleep(delay);
                tokio::pin!(sleep);

                loop {
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = &mut sleep => break,
                        Some(outcome) = in_flight.next(), if !in_flight.is_empty() => {
                            settle(outcome, &mut stats, &mut sink, &progress);
                        }
                    }
                }
            }
        }

        while let Some(outcome) = in_flight.next().await {
            settle(outcome, &mut stats, &mut sink, &progress);
        }
        drop(in_flight);

        sink.flush();
        stats.mark_completed();
        progress.finish(&stats);
        stats.log_final();

        match fatal {
            Some(err) => Err(err),
            None => Ok(stats),
        }
    }
}

/// Strip the line terminator (`\n` or `\r\n`) and hand the bytes over
fn take_line(buf: &mut Vec<u8>) -> Vec<u8> {
    let mut line = std::mem::take(buf);
    if line.last() == Some(&b'\n') {
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
    }
    line
}

/// Run one line through the inserter, turning a panic into an error outcome
async fn handle_line<S: KeyValueStore>(
    inserter: &ExistenceGatedInserter<S>,
    raw: Vec<u8>,
) -> LineOutcome {
    let line = match String::from_utf8(raw) {
        Ok(line) => line,
        Err(e) => {
            let error = RecordError::malformed(format!("line is not valid UTF-8: {}", e.utf8_error()));
            return LineOutcome::Errored {
                raw: e.into_bytes(),
                key: None,
                error,
            };
        },
    };

    let result = AssertUnwindSafe(inserter.handle(&line)).catch_unwind().await;

    match result {
        Ok(Ok(Disposition::Inserted)) => LineOutcome::Inserted,
        Ok(Ok(Disposition::SkippedExisting)) => LineOutcome::SkippedExisting,
        Ok(Err(RecordFailure { key, error })) => LineOutcome::Errored {
            raw: line.into_bytes(),
            key,
            error,
        },
        Err(panic) => LineOutcome::Errored {
            raw: line.into_bytes(),
            key: None,
            error: RecordError::Unexpected(panic_message(panic.as_ref())),
        },
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "panic while handling record".to_string()
    }
}

fn settle(outcome: LineOutcome, stats: &mut LoadStats, sink: &mut FailureSink, progress: &LoadProgress) {
    stats.record(outcome.outcome());

    if let LineOutcome::Errored { raw, key, error } = outcome {
        error!(
            stage = error.stage(),
            key = key.as_deref().unwrap_or("-"),
            raw = %String::from_utf8_lossy(&raw),
            error = %error,
            "Record failed"
        );
        stats.log_snapshot();
        sink.record(&raw);
    }

    progress.update(stats);
}
