//! Existence-gated insert of one source line
//!
//! `Normalize → Parse → LookupExisting → {Exists: skip | Absent: Insert}`.
//! At most one write per record, and an existing item is never
//! overwritten by this path. There is no conditional write: two runs racing
//! on the same key may both insert, and the store's put semantics decide
//! which item wins.

use crate::error::RecordError;
use crate::normalize::{normalize, NormalizationMode};
use crate::record::Record;
use crate::store::KeyValueStore;
use tracing::debug;

/// Successful end states of a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Inserted,
    SkippedExisting,
}

/// A failed line, with the key when it got far enough to have one
#[derive(Debug)]
pub struct RecordFailure {
    pub key: Option<String>,
    pub error: RecordError,
}

impl RecordFailure {
    fn before_key(error: RecordError) -> Self {
        Self { key: None, error }
    }
}

pub struct ExistenceGatedInserter<S> {
    store: S,
    table: String,
    key_attribute: String,
    normalization: NormalizationMode,
}

impl<S: KeyValueStore> ExistenceGatedInserter<S> {
    pub fn new(
        store: S,
        table: impl Into<String>,
        key_attribute: impl Into<String>,
        normalization: NormalizationMode,
    ) -> Self {
        Self {
            store,
            table: table.into(),
            key_attribute: key_attribute.into(),
            normalization,
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Handle one raw source line
    pub async fn handle(&self, raw: &str) -> Result<Disposition, RecordFailure> {
        let normalized = normalize(raw, self.normalization).map_err(RecordFailure::before_key)?;
        let record = Record::parse(&normalized).map_err(RecordFailure::before_key)?;
        let key = record
            .primary_key(&self.key_attribute)
            .map_err(RecordFailure::before_key)?;

        let exists = self
            .store
            .contains_key(&self.table, &key)
            .await
            .map_err(|e| RecordFailure {
                key: Some(key.to_string()),
                error: RecordError::LookupFailed(e),
            })?;

        if exists {
            debug!(key = %key, "Key already present, skipping");
            return Ok(Disposition::SkippedExisting);
        }

        self.store
            .put_item(&self.table, record.item())
            .await
            .map_err(|e| RecordFailure {
                key: Some(key.to_string()),
                error: RecordError::InsertFailed(e),
            })?;

        debug!(key = %key, "Inserted");
        Ok(Disposition::Inserted)
    }
}
