//! Append-only side file of failed source lines
//!
//! Each entry is the original raw line, before normalization, followed by a
//! newline, so the file can be fed back to the loader as a replay input.
//! Writing is best-effort: a failed append is logged and otherwise ignored.

use crate::error::{LoadError, Result};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub struct FailureSink {
    path: PathBuf,
    file: File,
}

impl FailureSink {
    /// Open `path` for appending, creating it and its directory if needed
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let unavailable = |source| LoadError::FailureSinkUnavailable {
            path: path.clone(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(unavailable)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(unavailable)?;

        debug!(path = %path.display(), "Error-data file opened");

        Ok(Self {
            path,
            file,
        })
    }

    /// Append one raw line, byte for byte. Never fails.
    pub fn record(&mut self, raw: &[u8]) {
        let mut entry = Vec::with_capacity(raw.len() + 1);
        entry.extend_from_slice(raw);
        entry.push(b'\n');

        if let Err(e) = self.file.write_all(&entry) {
            warn!(
                error = %e,
                path = %self.path.display(),
                "Failed to append to error-data file"
            );
        }
    }

    pub fn flush(&mut self) {
        if let Err(e) = self.file.flush().and_then(|()| self.file.sync_data()) {
            warn!(error = %e, path = %self.path.display(), "Failed to flush error-data file");
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for FailureSink {
    fn drop(&mut self) {
        self.flush();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_appends_raw_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("errors").join("errorData.txt");

        let mut sink = FailureSink::open(&path).unwrap();
        sink.record(b"not-json");
        sink.record(br#"{"fileId":{"b":"ZmlsZTE="}}"#);
        sink.flush();

        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "not-json\n{\"fileId\":{\"b\":\"ZmlsZTE=\"}}\n"
        );
    }

    #[test]
    fn test_non_utf8_bytes_are_kept() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("errorData.txt");

        let mut sink = FailureSink::open(&path).unwrap();
        sink.record(b"caf\xe9");
        sink.flush();

        assert_eq!(std::fs::read(&path).unwrap(), b"caf\xe9\n");
    }

    #[test]
    fn test_reopen_preserves_existing_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("errorData.txt");

        FailureSink::open(&path).unwrap().record(b"first");
        FailureSink::open(&path).unwrap().record(b"second");

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "first\nsecond\n");
    }

    #[test]
    fn test_open_in_unwritable_location_fails() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "x").unwrap();

        let err = FailureSink::open(blocker.join("errorData.txt")).err().unwrap();
        assert!(matches!(err, LoadError::FailureSinkUnavailable { .. }));
    }
}
