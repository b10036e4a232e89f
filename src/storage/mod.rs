/// Local persistence: image bytes in the photo store, records in the
/// metadata store.
///
/// The photo store exclusively owns image bytes; the metadata store owns the
/// record collection and holds only the image location reference. The two
/// are linked by nothing but the photo id.
pub mod metadata;
pub mod photos;

use std::path::PathBuf;

use thiserror::Error;

pub use metadata::MetadataStore;
pub use photos::{BlobPhotoStore, FileSystemPhotoStore, PhotoStore};

/// Errors from either store. Fatal inside the capture pipeline: a failed
/// write rejects the whole capture rather than leaving a partial record.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("metadata serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("not found: {0}")]
    NotFound(String),
}

/// The managed application data directory.
///
/// - Linux: `~/.local/share/camloc`
/// - macOS: `~/Library/Application Support/camloc`
/// - Windows: `%APPDATA%\camloc`
pub fn default_data_dir() -> Option<PathBuf> {
    let mut path = dirs::data_dir().or_else(dirs::home_dir)?;
    path.push("camloc");
    Some(path)
}
