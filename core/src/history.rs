//! Workout history store
//!
//! Completed runs are kept in a single JSON file, newest first, capped at
//! [`MAX_HISTORY`] entries.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use wodtimer_types::{HistoryEntry, HistoryRecord};

use crate::collaborators::HistorySink;
use crate::store::{StoreError, data_path, next_id, read_list, write_list};

pub const MAX_HISTORY: usize = 50;

#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<data dir>/wodtimer/history.json`
    pub fn default_path() -> Option<PathBuf> {
        data_path("history.json")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All entries, newest first. A missing file is an empty history.
    pub fn load(&self) -> Result<Vec<HistoryEntry>, StoreError> {
        read_list(&self.path)
    }

    /// Prepend a record stamped with `date`, dropping the oldest entries past
    /// the cap.
    pub fn add(
        &self,
        record: HistoryRecord,
        date: DateTime<Utc>,
    ) -> Result<HistoryEntry, StoreError> {
        let mut entries = self.load()?;

        let id = next_id(date.timestamp_millis(), entries.iter().map(|e| e.id));

        let entry = HistoryEntry {
            id,
            date: date.to_rfc3339(),
            record,
        };
        entries.insert(0, entry.clone());
        entries.truncate(MAX_HISTORY);

        self.write(&entries)?;
        tracing::debug!(id, total = entries.len(), "History entry added");
        Ok(entry)
    }

    pub fn clear(&self) -> Result<(), StoreError> {
        self.write(&[])
    }

    fn write(&self, entries: &[HistoryEntry]) -> Result<(), StoreError> {
        write_list(&self.path, entries)
    }
}

impl HistorySink for HistoryStore {
    fn record(&mut self, record: HistoryRecord) -> Result<(), StoreError> {
        self.add(record, Utc::now()).map(|_| ())
    }
}
