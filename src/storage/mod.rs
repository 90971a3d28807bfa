//! # Artifact Storage
//!
//! Keeps encrypted audio artifacts between the moment they are produced by
//! `POST /translate` and the moment a client fetches them with `GET /audio/{id}`.
//!
//! ## Key Components:
//! - **ArtifactStore trait**: the narrow interface the pipeline talks to
//! - **LocalDiskStore**: scratch directory on local (often ephemeral) disk
//! - **MemoryStore**: process-local map, used by tests and single-instance demos
//!
//! ## Retention Policy:
//! Stores never promise retention. A platform cleaner may wipe the scratch
//! directory at any time, so `NotFound` is a routine answer, never a fatal one.
//!
//! ## Naming:
//! Artifact ids are lowercase hyphenated UUID v4 strings. Anything else is
//! treated as "not found" before a backend is consulted, which also keeps
//! path-like ids (`../etc/passwd`) away from the filesystem.

pub mod local;
pub mod memory;

pub use local::LocalDiskStore;
pub use memory::MemoryStore;

use crate::config::StorageConfig;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

/// Errors returned by artifact store backends.
#[derive(Debug, Error)]
pub enum StorageError {
    /// No artifact exists under this id (expired, cleaned up, or never created)
    #[error("artifact not found: {0}")]
    NotFound(String),

    /// A save targeted an id that already holds an artifact
    #[error("artifact already exists: {0}")]
    AlreadyExists(String),

    /// The id does not have the shape produced by `generate_id`
    #[error("malformed artifact id: {0}")]
    InvalidId(String),

    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Content storage keyed by artifact id.
///
/// ## Concurrency:
/// Every artifact is written once by its creator and read zero-to-many times.
/// Implementations must allow concurrent saves under distinct ids and
/// concurrent loads without any caller-side locking.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Short backend name for logs and health output
    fn backend_name(&self) -> &'static str;

    /// Produce a fresh collision-resistant artifact id.
    fn generate_id(&self) -> String {
        Uuid::new_v4().to_string()
    }

    /// Persist bytes under `id`. Never overwrites an existing artifact.
    async fn save(&self, id: &str, bytes: &[u8]) -> Result<(), StorageError>;

    /// Read the bytes stored under `id`.
    async fn load(&self, id: &str) -> Result<Vec<u8>, StorageError>;

    /// Check whether an artifact is currently present.
    async fn exists(&self, id: &str) -> Result<bool, StorageError>;

    /// Remove an artifact. Removing an absent artifact is not an error.
    async fn delete(&self, id: &str) -> Result<(), StorageError>;
}

/// Check that an id has the shape produced by [`ArtifactStore::generate_id`].
///
/// Only canonical lowercase hyphenated UUIDs pass, so one artifact can never be
/// reachable under two spellings.
pub fn is_valid_artifact_id(id: &str) -> bool {
    match Uuid::parse_str(id) {
        Ok(uuid) => uuid.hyphenated().to_string() == id,
        Err(_) => false,
    }
}

/// Build the configured store backend.
///
/// ## Supported backends:
/// - `local`: [`LocalDiskStore`] rooted at `storage.scratch_dir`
/// - `memory`: [`MemoryStore`], unbounded, for tests and demos
pub async fn build_store(config: &StorageConfig) -> anyhow::Result<Arc<dyn ArtifactStore>> {
    match config.backend.as_str() {
        "local" => {
            let store = LocalDiskStore::new(&config.scratch_dir).await?;
            Ok(Arc::new(store))
        }
        "memory" => {
            warn!("Memory artifact store keeps every artifact until restart; use it for tests and demos only");
            Ok(Arc::new(MemoryStore::new()))
        }
        other => Err(anyhow::anyhow!("Unsupported storage backend: {}", other)),
    }
}
