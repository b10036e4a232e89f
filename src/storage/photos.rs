/// Photo byte storage, content-addressed by photo id.
///
/// Two interchangeable backends share one contract: the device filesystem
/// for native builds and an in-memory blob map for browser-style platforms.
/// The backend is chosen once at startup; the pipeline only ever sees the
/// trait.
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use dashmap::DashMap;
use log::info;

use super::{default_data_dir, StorageError};

/// Deterministic file name for a photo id. Same id, same name, always.
pub fn photo_file_name(id: &str) -> String {
    format!("photo_{id}.jpg")
}

/// Capability for persisting and retrieving image bytes.
#[async_trait]
pub trait PhotoStore: Send + Sync {
    /// Persist `image` under a location derived from `id`, returning that
    /// location. Saving the same id twice overwrites in place.
    async fn save(&self, image: &[u8], id: &str) -> Result<String, StorageError>;

    /// Remove the bytes at `location`. Deleting an absent entry is a no-op.
    async fn delete(&self, location: &str) -> Result<(), StorageError>;

    /// Read back the bytes at `location`.
    async fn load(&self, location: &str) -> Result<Vec<u8>, StorageError>;

    /// Every stored location, in no particular order.
    async fn list_all(&self) -> Result<Vec<String>, StorageError>;

    /// Total bytes currently stored. Entries that vanished contribute zero.
    async fn total_size(&self) -> Result<u64, StorageError>;
}

/// Filesystem-backed store: one file per photo inside a managed directory.
pub struct FileSystemPhotoStore {
    dir: PathBuf,
}

impl FileSystemPhotoStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        info!("photo store opened at {}", dir.display());
        Ok(FileSystemPhotoStore { dir })
    }

    /// Open the store in the default managed location
    /// (`<data_dir>/camloc/photos`).
    pub async fn open_default() -> Result<Self, StorageError> {
        let mut dir = default_data_dir().ok_or_else(|| {
            StorageError::Io(std::io::Error::new(
                ErrorKind::NotFound,
                "could not determine user data directory",
            ))
        })?;
        dir.push("photos");
        Self::open(dir).await
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl PhotoStore for FileSystemPhotoStore {
    async fn save(&self, image: &[u8], id: &str) -> Result<String, StorageError> {
        let path = self.dir.join(photo_file_name(id));
        tokio::fs::write(&path, image).await?;
        Ok(path.to_string_lossy().into_owned())
    }

    async fn delete(&self, location: &str) -> Result<(), StorageError> {
        match tokio::fs::remove_file(location).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    async fn load(&self, location: &str) -> Result<Vec<u8>, StorageError> {
        match tokio::fs::read(location).await {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                Err(StorageError::NotFound(location.to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn list_all(&self) -> Result<Vec<String>, StorageError> {
        let mut locations = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                locations.push(entry.path().to_string_lossy().into_owned());
            }
        }
        Ok(locations)
    }

    async fn total_size(&self) -> Result<u64, StorageError> {
        let mut total = 0u64;
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            // A file deleted mid-scan just contributes zero.
            if let Ok(meta) = entry.metadata().await {
                if meta.is_file() {
                    total += meta.len();
                }
            }
        }
        Ok(total)
    }
}

const BLOB_SCHEME: &str = "blob:";

/// In-memory blob store keyed by photo id, the browser-platform stand-in
/// for the filesystem backend. Locations use a `blob:{id}` scheme.
#[derive(Debug, Default)]
pub struct BlobPhotoStore {
    blobs: DashMap<String, Vec<u8>>,
}

impl BlobPhotoStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn id_from_location(location: &str) -> Option<&str> {
        location.strip_prefix(BLOB_SCHEME)
    }
}

#[async_trait]
impl PhotoStore for BlobPhotoStore {
    async fn save(&self, image: &[u8], id: &str) -> Result<String, StorageError> {
        self.blobs.insert(id.to_string(), image.to_vec());
        Ok(format!("{BLOB_SCHEME}{id}"))
    }

    async fn delete(&self, location: &str) -> Result<(), StorageError> {
        if let Some(id) = Self::id_from_location(location) {
            self.blobs.remove(id);
        }
        Ok(())
    }

    async fn load(&self, location: &str) -> Result<Vec<u8>, StorageError> {
        Self::id_from_location(location)
            .and_then(|id| self.blobs.get(id).map(|b| b.value().clone()))
            .ok_or_else(|| StorageError::NotFound(location.to_string()))
    }

    async fn list_all(&self) -> Result<Vec<String>, StorageError> {
        Ok(self
            .blobs
            .iter()
            .map(|entry| format!("{BLOB_SCHEME}{}", entry.key()))
            .collect())
    }

    async fn total_size(&self) -> Result<u64, StorageError> {
        Ok(self.blobs.iter().map(|entry| entry.value().len() as u64).sum())
    }
}
