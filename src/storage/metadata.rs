/// The metadata store: a single serialized collection of photo records.
///
/// The whole collection lives as one JSON array in one file
/// (`photos_metadata.json`), loaded at open and rewritten on every
/// mutation. Queries scan linearly; the library holds hundreds of records,
/// not millions, so the simplicity wins.
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use log::{info, warn};

use super::{default_data_dir, StorageError};
use crate::types::PhotoRecord;

/// File name of the serialized collection, mirroring the store key the
/// mobile builds use.
const METADATA_FILE: &str = "photos_metadata.json";

pub struct MetadataStore {
    path: PathBuf,
    records: Mutex<Vec<PhotoRecord>>,
}

impl MetadataStore {
    /// Open the store backed by the given file, loading any existing
    /// collection. A missing file starts an empty library.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let records = match std::fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(err) => return Err(err.into()),
        };
        info!(
            "metadata store opened at {} ({} records)",
            path.display(),
            records.len()
        );
        Ok(MetadataStore {
            path,
            records: Mutex::new(records),
        })
    }

    /// Open the store at the default managed location
    /// (`<data_dir>/camloc/photos_metadata.json`).
    pub fn open_default() -> Result<Self, StorageError> {
        let mut path = default_data_dir().ok_or_else(|| {
            StorageError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "could not determine user data directory",
            ))
        })?;
        std::fs::create_dir_all(&path)?;
        path.push(METADATA_FILE);
        Self::open(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<PhotoRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Rewrite the serialized collection.
    fn persist(&self, records: &[PhotoRecord]) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let bytes = serde_json::to_vec(records)?;
        std::fs::write(&self.path, bytes)?;
        Ok(())
    }

    /// Insert a new record.
    ///
    /// Ids are caller-guaranteed unique (the pipeline generates them from
    /// timestamp plus randomness); a duplicate is logged, and the newer
    /// record replaces the older one rather than shadowing it.
    ///
    /// Mutations rewrite a candidate copy first and commit to the in-memory
    /// collection only once the file write succeeded, so a failed rewrite
    /// leaves no phantom record behind.
    pub fn insert(&self, record: PhotoRecord) -> Result<(), StorageError> {
        let mut records = self.lock();
        let mut candidate = records.clone();
        if let Some(existing) = candidate.iter_mut().find(|r| r.id == record.id) {
            warn!("duplicate photo id {}, replacing existing record", record.id);
            *existing = record;
        } else {
            candidate.push(record);
        }
        self.persist(&candidate)?;
        *records = candidate;
        Ok(())
    }

    /// Apply `f` to the record with the given id. No-op if absent; returns
    /// whether anything changed. The edit is discarded if the rewrite fails.
    pub fn update<F>(&self, id: &str, f: F) -> Result<bool, StorageError>
    where
        F: FnOnce(&mut PhotoRecord),
    {
        let mut records = self.lock();
        let Some(index) = records.iter().position(|r| r.id == id) else {
            return Ok(false);
        };
        let mut candidate = records.clone();
        f(&mut candidate[index]);
        self.persist(&candidate)?;
        *records = candidate;
        Ok(true)
    }

    /// Remove the record with the given id. Deleting an unknown id is a
    /// no-op, not an error. The record stays if the rewrite fails.
    pub fn delete_by_id(&self, id: &str) -> Result<(), StorageError> {
        let mut records = self.lock();
        if !records.iter().any(|r| r.id == id) {
            return Ok(());
        }
        let mut candidate = records.clone();
        candidate.retain(|r| r.id != id);
        self.persist(&candidate)?;
        *records = candidate;
        Ok(())
    }

    pub fn list_all(&self) -> Vec<PhotoRecord> {
        self.lock().clone()
    }

    /// Records ordered newest capture first.
    pub fn list_sorted_by_time_desc(&self) -> Vec<PhotoRecord> {
        let mut records = self.lock().clone();
        records.sort_by(|a, b| b.captured_at.cmp(&a.captured_at));
        records
    }

    /// Only the records that carry a location.
    pub fn list_with_location(&self) -> Vec<PhotoRecord> {
        self.lock()
            .iter()
            .filter(|r| r.location.is_some())
            .cloned()
            .collect()
    }

    pub fn get_by_id(&self, id: &str) -> Option<PhotoRecord> {
        self.lock().iter().find(|r| r.id == id).cloned()
    }

    pub fn count(&self) -> usize {
        self.lock().len()
    }
}

impl std::fmt::Debug for MetadataStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetadataStore")
            .field("path", &self.path)
            .field("records", &self.count())
            .finish()
    }
}
