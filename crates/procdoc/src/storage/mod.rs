//! Blob storage for uploaded documents and analysis results.
//!
//! The pipeline reads inputs and writes results through the [`BlobStore`]
//! trait so tests can run entirely in memory while deployments use the
//! filesystem backend.

mod filesystem;
mod memory;

pub use filesystem::FsBlobStore;
pub use memory::MemoryBlobStore;

use crate::error::StorageError;

/// Key-addressed byte storage.
///
/// Keys are slash-separated paths like `uploads/report.pdf`. Backends are
/// shared across job tasks, so implementations must be thread-safe.
pub trait BlobStore: Send + Sync {
    /// Reads the full contents of a blob.
    fn get(&self, key: &str) -> Result<Vec<u8>, StorageError>;

    /// Writes a blob, replacing any existing value under the key.
    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError>;

    /// Returns the blob size in bytes, or `None` when the key is absent.
    fn size(&self, key: &str) -> Result<Option<u64>, StorageError>;
}
