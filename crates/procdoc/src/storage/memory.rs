//! In-memory blob store, used in tests and ephemeral deployments.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::StorageError;

use super::BlobStore;

/// Thread-safe map-backed blob store.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlobStore for MemoryBlobStore {
    fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let blobs = self
            .blobs
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        blobs
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let mut blobs = self
            .blobs
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        blobs.insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    fn size(&self, key: &str) -> Result<Option<u64>, StorageError> {
        let blobs = self
            .blobs
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(blobs.get(key).map(|b| b.len() as u64))
    }
}
