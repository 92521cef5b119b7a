//! Append-only record store with a single JSON export at crawl end.

use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use crate::error::CrawlError;
use crate::types::DetailRecord;

/// Collects records from concurrent detail tasks. Arrival order is kept but
/// carries no meaning.
#[derive(Debug, Default)]
pub struct RecordSink {
    records: Mutex<Vec<DetailRecord>>,
}

impl RecordSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `record`, or discards it with a warning when it has no fields.
    /// Returns whether the record was stored.
    pub fn push(&self, source_url: &str, record: DetailRecord) -> bool {
        if record.is_empty() {
            tracing::warn!(url = source_url, "discarding detail record with no fields");
            return false;
        }
        self.lock().push(record);
        true
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Snapshot of the records stored so far.
    #[must_use]
    pub fn records(&self) -> Vec<DetailRecord> {
        self.lock().clone()
    }

    /// Serializes all records as one pretty-printed JSON array.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlError::Serialize`] if serialization fails.
    pub fn to_json(&self) -> Result<String, CrawlError> {
        serde_json::to_string_pretty(&*self.lock()).map_err(CrawlError::Serialize)
    }

    /// Writes all records to `path` as one JSON array, replacing the file.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlError::Export`] if the file cannot be written.
    pub fn export_json(&self, path: &Path) -> Result<usize, CrawlError> {
        let json = self.to_json()?;
        let export_err = |source| CrawlError::Export {
            path: path.display().to_string(),
            source,
        };

        let mut file = std::fs::File::create(path).map_err(export_err)?;
        file.write_all(json.as_bytes()).map_err(export_err)?;
        file.write_all(b"\n").map_err(export_err)?;
        file.flush().map_err(export_err)?;

        let count = self.len();
        tracing::info!(path = %path.display(), records = count, "exported records");
        Ok(count)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<DetailRecord>> {
        self.records
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
