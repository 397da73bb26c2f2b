//! Backend Module
//!
//! The durable object store sitting behind the cache. The cache server only
//! consumes it through the [`ObjectBackend`] trait.

mod memory;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use thiserror::Error;

pub use memory::MemoryBackend;

// == Object Metadata ==
/// Metadata the backend reports for an object.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectMetadata {
    pub content_type: String,
    /// Size of the raw object in bytes
    pub size: u64,
    pub last_modified: DateTime<Utc>,
    pub etag: String,
}

// == Backend Error ==
#[derive(Error, Debug)]
pub enum BackendError {
    /// The object (or its bucket) does not exist
    #[error("object not found: {bucket}/{key}")]
    NotFound { bucket: String, key: String },

    /// Any other failure reported by the store
    #[error("backend failure: {0}")]
    Other(String),
}

impl BackendError {
    pub fn not_found(bucket: &str, key: &str) -> Self {
        BackendError::NotFound {
            bucket: bucket.to_string(),
            key: key.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, BackendError::NotFound { .. })
    }
}

// == Object Backend ==
/// Trait for object store backends.
#[async_trait]
pub trait ObjectBackend: Send + Sync {
    /// Reads the full object with its metadata.
    async fn fetch(&self, bucket: &str, key: &str) -> Result<(Bytes, ObjectMetadata), BackendError>;

    /// Writes raw object bytes.
    async fn store(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> Result<(), BackendError>;

    /// Removes an object.
    async fn remove(&self, bucket: &str, key: &str) -> Result<(), BackendError>;

    /// Reads object metadata without the body.
    async fn stat(&self, bucket: &str, key: &str) -> Result<ObjectMetadata, BackendError>;
}
