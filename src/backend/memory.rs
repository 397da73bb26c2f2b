//! In-memory object backend.
//!
//! Keeps objects in a map behind a tokio `RwLock`. Used by the server binary
//! for local runs and by the test suites.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;

use super::{BackendError, ObjectBackend, ObjectMetadata};

#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    metadata: ObjectMetadata,
}

/// Object store held entirely in process memory.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    objects: RwLock<HashMap<(String, String), StoredObject>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects across all buckets.
    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }
}

/// Quoted content hash, stable for identical bytes.
fn content_etag(data: &[u8]) -> String {
    let mut hasher = DefaultHasher::new();
    data.hash(&mut hasher);
    format!("\"{:016x}\"", hasher.finish())
}

fn object_id(bucket: &str, key: &str) -> (String, String) {
    (bucket.to_string(), key.to_string())
}

#[async_trait]
impl ObjectBackend for MemoryBackend {
    async fn fetch(&self, bucket: &str, key: &str) -> Result<(Bytes, ObjectMetadata), BackendError> {
        let objects = self.objects.read().await;
        objects
            .get(&object_id(bucket, key))
            .map(|object| (object.data.clone(), object.metadata.clone()))
            .ok_or_else(|| BackendError::not_found(bucket, key))
    }

    async fn store(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> Result<(), BackendError> {
        let metadata = ObjectMetadata {
            content_type: content_type.to_string(),
            size: data.len() as u64,
            last_modified: chrono::Utc::now(),
            etag: content_etag(&data),
        };

        let mut objects = self.objects.write().await;
        objects.insert(object_id(bucket, key), StoredObject { data, metadata });
        Ok(())
    }

    async fn remove(&self, bucket: &str, key: &str) -> Result<(), BackendError> {
        let mut objects = self.objects.write().await;
        objects
            .remove(&object_id(bucket, key))
            .map(|_| ())
            .ok_or_else(|| BackendError::not_found(bucket, key))
    }

    async fn stat(&self, bucket: &str, key: &str) -> Result<ObjectMetadata, BackendError> {
        let objects = self.objects.read().await;
        objects
            .get(&object_id(bucket, key))
            .map(|object| object.metadata.clone())
            .ok_or_else(|| BackendError::not_found(bucket, key))
    }
}
