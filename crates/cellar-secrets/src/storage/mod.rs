//! Object storage collaborator
//!
//! Supports AWS S3 and S3-compatible storage through [`s3::S3Storage`], and an
//! in-memory map through [`memory::MemoryStorage`].

pub mod memory;
pub mod s3;

use crate::error::StorageError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub use memory::MemoryStorage;
pub use s3::S3Storage;

/// Content type for every stored bundle
pub const CONTENT_TYPE: &str = "application/octet-stream";

/// One entry of an object listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectSummary {
    /// Full object key, including any prefix
    pub key: String,
    pub last_modified: DateTime<Utc>,
    /// Size in bytes
    pub size: u64,
    /// Entity tag as reported by the store, quotes included if the store adds them
    pub etag: String,
}

/// The subset of an object store the secret manager depends on
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// List every object in `bucket` whose key starts with `prefix`
    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<ObjectSummary>, StorageError>;

    /// Fetch an object body; a missing key is [`StorageError::NotFound`]
    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError>;

    /// Create or replace an object
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError>;

    /// Delete an object; deleting a missing key succeeds
    async fn delete(&self, bucket: &str, key: &str) -> Result<(), StorageError>;
}
