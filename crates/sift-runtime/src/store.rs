//! Verdict record persistence.
//!
//! Records are upserted by document id; a later screening of the same
//! document supersedes the earlier record in place.

use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use sift_core::VerdictRecord;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to access verdict file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to (de)serialize verdicts: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Append-only result store for screening rounds.
pub trait VerdictStore: Send + Sync {
    /// Insert or replace the record for its document.
    fn save(&self, record: VerdictRecord) -> Result<(), StoreError>;

    /// Relevance label per document id.
    fn load_all(&self) -> Result<BTreeMap<String, Option<bool>>, StoreError>;

    /// Every stored record, in first-saved order.
    fn records(&self) -> Result<Vec<VerdictRecord>, StoreError>;

    /// Remove every record.
    fn reset(&self) -> Result<(), StoreError>;
}

fn upsert(records: &mut Vec<VerdictRecord>, record: VerdictRecord) {
    match records
        .iter_mut()
        .find(|r| r.document_id == record.document_id)
    {
        Some(existing) => *existing = record,
        None => records.push(record),
    }
}

fn labels(records: &[VerdictRecord]) -> BTreeMap<String, Option<bool>> {
    records
        .iter()
        .map(|r| (r.document_id.clone(), r.relevant))
        .collect()
}

/// Store kept in process memory.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    records: RwLock<Vec<VerdictRecord>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl VerdictStore for InMemoryStore {
    fn save(&self, record: VerdictRecord) -> Result<(), StoreError> {
        upsert(&mut self.records.write(), record);
        Ok(())
    }

    fn load_all(&self) -> Result<BTreeMap<String, Option<bool>>, StoreError> {
        Ok(labels(&self.records.read()))
    }

    fn records(&self) -> Result<Vec<VerdictRecord>, StoreError> {
        Ok(self.records.read().clone())
    }

    fn reset(&self) -> Result<(), StoreError> {
        self.records.write().clear();
        Ok(())
    }
}

/// Store backed by a JSON array file, rewritten on every save.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    records: RwLock<Vec<VerdictRecord>>,
}

impl JsonFileStore {
    /// Open a store, loading existing records if the file exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let records = if path.exists() {
            let contents = fs::read_to_string(&path)?;
            if contents.trim().is_empty() {
                Vec::new()
            } else {
                serde_json::from_str(&contents)?
            }
        } else {
            Vec::new()
        };
        debug!(path = %path.display(), records = records.len(), "Opened verdict store");
        Ok(Self {
            path,
            records: RwLock::new(records),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, records: &[VerdictRecord]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, serde_json::to_string_pretty(records)?)?;
        Ok(())
    }
}

impl VerdictStore for JsonFileStore {
    fn save(&self, record: VerdictRecord) -> Result<(), StoreError> {
        let mut records = self.records.write();
        let mut updated = records.clone();
        upsert(&mut updated, record);
        self.flush(&updated)?;
        *records = updated;
        Ok(())
    }

    fn load_all(&self) -> Result<BTreeMap<String, Option<bool>>, StoreError> {
        Ok(labels(&self.records.read()))
    }

    fn records(&self) -> Result<Vec<VerdictRecord>, StoreError> {
        Ok(self.records.read().clone())
    }

    fn reset(&self) -> Result<(), StoreError> {
        let mut records = self.records.write();
        self.flush(&[])?;
        records.clear();
        Ok(())
    }
}
