//! Object Cache - a caching proxy in front of an object store
//!
//! Serves bucket/key objects over HTTP with read-through caching,
//! write-through invalidation, TTL expiry, size-bounded eviction and
//! gzip-aware storage.

pub mod api;
pub mod backend;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod objects;
pub mod policy;
pub mod tasks;

pub use api::{create_router, AppState};
pub use backend::{MemoryBackend, ObjectBackend};
pub use cache::CacheStore;
pub use config::Config;
pub use objects::ObjectPipeline;
pub use tasks::spawn_cleanup_task;
