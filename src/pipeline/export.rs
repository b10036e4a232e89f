/// Export to the platform's shared photo library.
///
/// Export runs after the in-app record is already durable, so every error
/// here is logged and swallowed by the pipeline. Nothing in this module is
/// allowed to undo a persisted capture.
use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("media library permission not granted")]
    PermissionDenied,
    #[error("camera roll export failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Capability pushing a copy of a photo into the shared library.
#[async_trait]
pub trait CameraRollExporter: Send + Sync {
    async fn export(&self, image: &[u8], file_name: &str) -> Result<(), ExportError>;
}

/// Exporter that copies photos into a shared pictures directory, for
/// platforms whose camera roll is a plain folder.
pub struct DirectoryExporter {
    dir: PathBuf,
}

impl DirectoryExporter {
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, ExportError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(DirectoryExporter { dir })
    }

    /// Exporter targeting the user's pictures directory.
    pub async fn open_default() -> Result<Self, ExportError> {
        let mut dir = dirs::picture_dir().or_else(dirs::home_dir).ok_or_else(|| {
            ExportError::Io(std::io::Error::new(
                ErrorKind::NotFound,
                "could not determine pictures directory",
            ))
        })?;
        dir.push("camloc");
        Self::open(dir).await
    }
}

#[async_trait]
impl CameraRollExporter for DirectoryExporter {
    async fn export(&self, image: &[u8], file_name: &str) -> Result<(), ExportError> {
        let path = self.dir.join(file_name);
        tokio::fs::write(&path, image).await?;
        Ok(())
    }
}
