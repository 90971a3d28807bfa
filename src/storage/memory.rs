//! In-memory artifact store

use super::{is_valid_artifact_id, ArtifactStore, StorageError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Artifact store that keeps ciphertext in a process-local map.
///
/// Contents vanish on restart, which matches the "no retention guarantee"
/// contract of the scratch area. Nothing ever evicts an entry while the process
/// runs, so memory grows with every artifact: tests and short demos only.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    artifacts: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub async fn is_empty(&self) -> bool {
        self.artifacts.read().await.is_empty()
    }
}

#[async_trait]
impl ArtifactStore for MemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn save(&self, id: &str, bytes: &[u8]) -> Result<(), StorageError> {
        if !is_valid_artifact_id(id) {
            return Err(StorageError::InvalidId(id.to_string()));
        }
        let mut artifacts = self.artifacts.write().await;
        if artifacts.contains_key(id) {
            return Err(StorageError::AlreadyExists(id.to_string()));
        }
        artifacts.insert(id.to_string(), bytes.to_vec());
        Ok(())
    }

    async fn load(&self, id: &str) -> Result<Vec<u8>, StorageError> {
        self.artifacts
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(id.to_string()))
    }

    async fn exists(&self, id: &str) -> Result<bool, StorageError> {
        Ok(self.artifacts.read().await.contains_key(id))
    }

    async fn delete(&self, id: &str) -> Result<(), StorageError> {
        self.artifacts.write().await.remove(id);
        Ok(())
    }
}
