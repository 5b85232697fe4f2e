//! Error types for the loader
//!
//! Two tiers: [`LoadError`] stops the run, [`RecordError`] is caught at the
//! per-line boundary, counted, and the raw line is handed to the failure sink.

use crate::store::StoreError;
use kvload_common::KvloadError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for run-level operations
pub type Result<T> = std::result::Result<T, LoadError>;

/// Fatal errors. Any of these ends the run.
#[derive(Error, Debug)]
pub enum LoadError {
    /// The source file cannot be opened before the first line is read
    #[error("source file '{}' is unavailable: {source}", path.display())]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// I/O fault while reading the source mid-stream
    #[error("failed to read line {line} of '{}': {source}", path.display())]
    LineRead {
        path: PathBuf,
        line: u64,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot open error-data file '{}': {source}", path.display())]
    FailureSinkUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Config(#[from] KvloadError),
}

/// Per-record failures. Recovered: the line is counted as errored and
/// processing continues.
#[derive(Error, Debug)]
pub enum RecordError {
    /// The normalized line is not a valid item
    #[error("malformed record: {0}")]
    MalformedRecord(String),

    #[error("primary key attribute '{0}' is missing")]
    MissingPrimaryKey(String),

    /// Existence check against the target store failed
    #[error("getItem failed: {0}")]
    LookupFailed(#[source] StoreError),

    #[error("putItem failed: {0}")]
    InsertFailed(#[source] StoreError),

    /// Anything else raised while handling the line
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl RecordError {
    pub fn malformed(msg: impl std::fmt::Display) -> Self {
        Self::MalformedRecord(msg.to_string())
    }

    /// Pipeline stage the failure came from, used as a log field
    pub fn stage(&self) -> &'static str {
        match self {
            RecordError::MalformedRecord(_) | RecordError::MissingPrimaryKey(_) => "parse",
            RecordError::LookupFailed(_) => "getItem",
            RecordError::InsertFailed(_) => "putItem",
            RecordError::Unexpected(_) => "unexpected",
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_names() {
        let store_err = || StoreError::service("GetItem", "t", "timeout");

        assert_eq!(RecordError::malformed("bad").stage(), "parse");
        assert_eq!(RecordError::MissingPrimaryKey("fileId".into()).stage(), "parse");
        assert_eq!(RecordError::LookupFailed(store_err()).stage(), "getItem");
        assert_eq!(RecordError::InsertFailed(store_err()).stage(), "putItem");
        assert_eq!(RecordError::Unexpected("boom".into()).stage(), "unexpected");
    }

    #[test]
    fn test_source_unavailable_message_names_path() {
        let err = LoadError::SourceUnavailable {
            path: PathBuf::from("myTable"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        };
        assert!(err.to_string().contains("'myTable'"));
    }
}
