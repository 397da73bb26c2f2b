//! API Handlers
//!
//! HTTP request handlers for the object endpoints and the service
//! endpoints. Object handlers only adapt HTTP extractors to the
//! [`ObjectPipeline`].

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, Uri},
    Json,
};

use crate::api::middleware::{AccessControl, OBJECTS_PREFIX};
use crate::backend::ObjectBackend;
use crate::cache::{CacheStore, CompressionPolicy};
use crate::config::Config;
use crate::error::{ObjectError, Result};
use crate::models::{HealthResponse, RequestMeta, StatsResponse};
use crate::objects::{ObjectPipeline, ObjectResponse};

/// Application state shared across all handlers.
///
/// Holds the single cache instance by handle; nothing is ambient global.
#[derive(Clone)]
pub struct AppState {
    /// Shared cache store, also driven by the cleanup task
    pub cache: Arc<CacheStore>,
    pub pipeline: ObjectPipeline,
    pub access: AccessControl,
}

impl AppState {
    /// Creates a new AppState around an existing cache and backend.
    pub fn new(
        cache: Arc<CacheStore>,
        backend: Arc<dyn ObjectBackend>,
        access: AccessControl,
    ) -> Self {
        let pipeline = ObjectPipeline::new(Arc::clone(&cache), backend);
        Self {
            cache,
            pipeline,
            access,
        }
    }

    /// Creates a new AppState from configuration.
    ///
    /// Initializes the cache store with parameters from the Config.
    pub fn from_config(config: &Config, backend: Arc<dyn ObjectBackend>) -> Self {
        let cache = CacheStore::new(
            config.max_cache_size,
            config.ttl(),
            CompressionPolicy::new(config.min_compress_size),
        );
        let access = AccessControl::new(
            config.bucket_policies.clone(),
            config.bucket_policies_enabled,
        );
        Self::new(Arc::new(cache), backend, access)
    }
}

/// Handler for GET /objects/:bucket/*key
pub async fn get_object(
    State(state): State<AppState>,
    Path((bucket, key)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<ObjectResponse> {
    let meta = RequestMeta::from_headers(&headers);
    state.pipeline.get(&bucket, &key, &meta).await
}

/// Handler for PUT /objects/:bucket/*key
pub async fn put_object(
    State(state): State<AppState>,
    Path((bucket, key)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<ObjectResponse> {
    let meta = RequestMeta::from_headers(&headers);
    state.pipeline.put(&bucket, &key, &meta, body).await
}

/// Handler for DELETE /objects/:bucket/*key
pub async fn delete_object(
    State(state): State<AppState>,
    Path((bucket, key)): Path<(String, String)>,
) -> Result<ObjectResponse> {
    state.pipeline.delete(&bucket, &key).await
}

/// Handler for HEAD /objects/:bucket/*key
pub async fn head_object(
    State(state): State<AppState>,
    Path((bucket, key)): Path<(String, String)>,
) -> Result<ObjectResponse> {
    state.pipeline.head(&bucket, &key).await
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse::from(state.cache.stats()))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

/// Fallback for unmatched paths.
///
/// An objects path that reaches here has an empty bucket or key, which is
/// a malformed request rather than a missing object.
pub async fn fallback_handler(uri: Uri) -> ObjectError {
    let path = uri.path();
    if path.starts_with(OBJECTS_PREFIX) || path == OBJECTS_PREFIX.trim_end_matches('/') {
        ObjectError::Validation("invalid bucket or key".to_string())
    } else {
        ObjectError::NotFound(format!("no route for {}", path))
    }
}
