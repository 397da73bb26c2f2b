//! Cache Module
//!
//! Provides the in-memory object cache: TTL expiration, size-bounded
//! best-effort eviction and compression-aware storage.

pub mod compression;
mod entry;
mod stats;
mod store;


// Re-export public types
pub use compression::{CodecError, CompressionPolicy};
pub use entry::CacheEntry;
pub use stats::{CacheStats, StatsCounters};
pub use store::CacheStore;

// == Public Constants ==
/// Default maximum aggregate cache size in bytes
pub const DEFAULT_MAX_CACHE_SIZE: u64 = 100 * 1024 * 1024; // 100 MB

// == Cache Key ==
/// Builds the composite cache key for an object.
pub fn cache_key(bucket: &str, key: &str) -> String {
    format!("{}/{}", bucket, key)
}
