//! Scratch-directory artifact store on the local filesystem

use super::{is_valid_artifact_id, ArtifactStore, StorageError};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// File extension for encrypted MP3 artifacts
const ARTIFACT_EXTENSION: &str = "mp3.enc";

/// Artifact store backed by a writable scratch directory.
///
/// Each artifact lives in `<scratch_dir>/<id>.mp3.enc`; the file's mtime is its
/// creation time. No index file exists, the directory listing is the index.
#[derive(Debug, Clone)]
pub struct LocalDiskStore {
    base_path: PathBuf,
}

impl LocalDiskStore {
    /// Create the store, creating the scratch directory if needed.
    pub async fn new(base_path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = base_path.as_ref().to_path_buf();
        fs::create_dir_all(&path).await?;

        info!("Local artifact store initialized at: {}", path.display());
        Ok(Self { base_path: path })
    }

    /// Path for a well-formed id, `None` for anything else.
    fn artifact_path(&self, id: &str) -> Option<PathBuf> {
        if !is_valid_artifact_id(id) {
            return None;
        }
        Some(self.base_path.join(format!("{}.{}", id, ARTIFACT_EXTENSION)))
    }
}

#[async_trait]
impl ArtifactStore for LocalDiskStore {
    fn backend_name(&self) -> &'static str {
        "local"
    }

    async fn save(&self, id: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let path = self
            .artifact_path(id)
            .ok_or_else(|| StorageError::InvalidId(id.to_string()))?;

        // create_new refuses to clobber an existing artifact
        let mut file = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(StorageError::AlreadyExists(id.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        let written = async {
            file.write_all(bytes).await?;
            file.sync_all().await
        }
        .await;

        if let Err(e) = written {
            // Do not leave a half-written artifact behind
            if let Err(cleanup) = fs::remove_file(&path).await {
                warn!(artifact_id = %id, error = %cleanup, "Failed to remove partial artifact");
            }
            return Err(e.into());
        }

        debug!(artifact_id = %id, size = bytes.len(), "Artifact written");
        Ok(())
    }

    async fn load(&self, id: &str) -> Result<Vec<u8>, StorageError> {
        let path = self
            .artifact_path(id)
            .ok_or_else(|| StorageError::NotFound(id.to_string()))?;

        match fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StorageError::NotFound(id.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, id: &str) -> Result<bool, StorageError> {
        match self.artifact_path(id) {
            Some(path) => Ok(fs::try_exists(&path).await?),
            None => Ok(false),
        }
    }

    async fn delete(&self, id: &str) -> Result<(), StorageError> {
        let Some(path) = self.artifact_path(id) else {
            return Ok(());
        };

        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!(artifact_id = %id, "Artifact deleted");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
