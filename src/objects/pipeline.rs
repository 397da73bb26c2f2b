//! Object Request Pipeline
//!
//! Per-verb orchestration of cache lookups, backend fallback and cache
//! population/invalidation.
//!
//! The cache never fails a request: a rejected or failed cache operation
//! degrades to a miss. Backend failures are wrapped with the verb and key
//! and surface as [`ObjectError::Internal`], except "not found" which maps
//! to [`ObjectError::NotFound`] (or success, for DELETE).

use std::sync::Arc;

use axum::http::StatusCode;
use bytes::Bytes;
use tracing::{debug, info, warn};

use crate::backend::{BackendError, ObjectBackend};
use crate::cache::{cache_key, compression, CacheStore};
use crate::error::{ObjectError, Result};
use crate::models::{RequestMeta, GZIP_ENCODING};
use crate::objects::{CacheStatus, ObjectResponse};

/// Content type stored when a PUT declares none.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

// == Object Pipeline ==
/// Shared handler for GET/PUT/DELETE/HEAD on `bucket/key`.
#[derive(Clone)]
pub struct ObjectPipeline {
    cache: Arc<CacheStore>,
    backend: Arc<dyn ObjectBackend>,
}

impl ObjectPipeline {
    pub fn new(cache: Arc<CacheStore>, backend: Arc<dyn ObjectBackend>) -> Self {
        Self { cache, backend }
    }

    pub fn cache(&self) -> &Arc<CacheStore> {
        &self.cache
    }

    // == GET ==
    /// Serves from cache when live, otherwise fetches and populates.
    pub async fn get(&self, bucket: &str, key: &str, meta: &RequestMeta) -> Result<ObjectResponse> {
        validate_path(bucket, key)?;
        let cache_key = cache_key(bucket, key);

        if let Some(entry) = self.cache.get(&cache_key) {
            let response = match (&entry.compressed_data, meta.accepts_gzip) {
                (Some(compressed), true) => {
                    ObjectResponse::from_entry(&entry, compressed.clone(), Some(GZIP_ENCODING))
                }
                _ => ObjectResponse::from_entry(&entry, entry.raw_data.clone(), None),
            };
            debug!(key = %cache_key, encoded = response.content_encoding.is_some(), "serving from cache");
            return Ok(response);
        }

        info!(key = %cache_key, "cache miss, fetching from storage");
        let generation = self.cache.generation(&cache_key);

        let (data, metadata) = self
            .backend
            .fetch(bucket, key)
            .await
            .map_err(|err| backend_error("GET", bucket, key, err))?;

        info!(
            key = %cache_key,
            size = data.len(),
            content_type = %metadata.content_type,
            "object retrieved from storage"
        );

        self.cache
            .put_if_generation(cache_key.as_str(), generation, data.clone(), metadata.clone());

        let should_compress = self
            .cache
            .policy()
            .should_compress(&metadata.content_type, data.len() as u64);

        if meta.accepts_gzip && should_compress {
            match compression::compress(&data) {
                Ok(compressed) if compressed.len() < data.len() => {
                    debug!(
                        original_size = data.len(),
                        compressed_size = compressed.len(),
                        "serving compressed data"
                    );
                    return Ok(ObjectResponse::from_metadata(
                        &metadata,
                        Bytes::from(compressed),
                        Some(GZIP_ENCODING),
                    ));
                }
                Ok(_) => {}
                Err(err) => warn!(key = %cache_key, error = %err, "inline compression failed"),
            }
        }

        Ok(ObjectResponse::from_metadata(&metadata, data, None))
    }

    // == PUT ==
    /// Invalidates the cached copy, then stores raw bytes in the backend.
    pub async fn put(
        &self,
        bucket: &str,
        key: &str,
        meta: &RequestMeta,
        body: Bytes,
    ) -> Result<ObjectResponse> {
        validate_path(bucket, key)?;
        let cache_key = cache_key(bucket, key);

        self.cache.delete(&cache_key);

        let content_type = meta
            .content_type
            .clone()
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());

        let data = if meta.body_is_gzip() {
            let decoded = compression::decompress(&body).map_err(|err| {
                ObjectError::Validation(format!("failed to decompress request body: {}", err))
            })?;
            debug!(key = %cache_key, decompressed_size = decoded.len(), "decompressed request body");
            Bytes::from(decoded)
        } else {
            body
        };
        let size = data.len();

        self.backend
            .store(bucket, key, data, &content_type)
            .await
            .map_err(|err| backend_error("PUT", bucket, key, err))?;

        // Refuses population by any GET that fetched during the store
        self.cache.delete(&cache_key);

        info!(key = %cache_key, size, content_type = %content_type, "object stored successfully");
        Ok(ObjectResponse::empty(StatusCode::OK, CacheStatus::Bypass))
    }

    // == DELETE ==
    /// Invalidates, then removes from the backend. Deleting an absent object
    /// succeeds.
    pub async fn delete(&self, bucket: &str, key: &str) -> Result<ObjectResponse> {
        validate_path(bucket, key)?;
        let cache_key = cache_key(bucket, key);

        self.cache.delete(&cache_key);

        match self.backend.remove(bucket, key).await {
            Ok(()) => info!(key = %cache_key, "object deleted successfully"),
            Err(err) if err.is_not_found() => debug!(key = %cache_key, "object already absent"),
            Err(err) => return Err(backend_error("DELETE", bucket, key, err)),
        }

        self.cache.delete(&cache_key);
        Ok(ObjectResponse::empty(StatusCode::NO_CONTENT, CacheStatus::Bypass))
    }

    // == HEAD ==
    /// Metadata only. A miss consults backend `stat` and never populates.
    pub async fn head(&self, bucket: &str, key: &str) -> Result<ObjectResponse> {
        validate_path(bucket, key)?;
        let cache_key = cache_key(bucket, key);

        if let Some(entry) = self.cache.get(&cache_key) {
            debug!(key = %cache_key, size = entry.raw_size, "serving head from cache");
            return Ok(ObjectResponse::from_entry(&entry, Bytes::new(), None)
                .headers_only(entry.raw_size));
        }

        let metadata = self
            .backend
            .stat(bucket, key)
            .await
            .map_err(|err| backend_error("HEAD", bucket, key, err))?;

        debug!(key = %cache_key, size = metadata.size, "object stats retrieved");
        Ok(ObjectResponse::from_metadata(&metadata, Bytes::new(), None).headers_only(metadata.size))
    }
}

/// Rejects empty path components before any cache or backend work.
fn validate_path(bucket: &str, key: &str) -> Result<()> {
    if bucket.is_empty() || key.is_empty() {
        return Err(ObjectError::Validation("invalid bucket or key".to_string()));
    }
    Ok(())
}

fn backend_error(verb: &str, bucket: &str, key: &str, err: BackendError) -> ObjectError {
    if err.is_not_found() {
        return ObjectError::NotFound(format!("object {}/{}", bucket, key));
    }
    warn!(verb, bucket, key, error = %err, "backend operation failed");
    ObjectError::Internal(format!("{} {}/{}: {}", verb, bucket, key, err))
}
