//! TTL Cleanup Task
//!
//! Background task that periodically removes expired cache entries.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::CacheStore;

/// Shortest period the sweep accepts.
pub const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(10);

/// Spawns a background task that periodically sweeps expired cache entries.
///
/// The sweep goes through the same consistency path as request-time
/// removals, so it needs no exclusive access to the store.
///
/// # Arguments
/// * `cache` - Shared handle to the cache store
/// * `interval` - Time between sweeps, raised to [`MIN_SWEEP_INTERVAL`]
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during graceful shutdown.
///
/// # Example
/// ```ignore
/// let cleanup_handle = spawn_cleanup_task(state.cache.clone(), config.cleanup_period());
/// // Later, during shutdown:
/// cleanup_handle.abort();
/// ```
pub fn spawn_cleanup_task(cache: Arc<CacheStore>, interval: Duration) -> JoinHandle<()> {
    if interval < MIN_SWEEP_INTERVAL {
        warn!(
            requested_ms = interval.as_millis() as u64,
            "cleanup interval too short, clamping"
        );
    }
    let interval = interval.max(MIN_SWEEP_INTERVAL);

    tokio::spawn(async move {
        info!(
            interval_ms = interval.as_millis() as u64,
            "Starting TTL cleanup task"
        );

        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;

            let removed = cache.sweep_expired();

            if removed > 0 {
                info!(removed, "TTL cleanup: removed expired entries");
            } else {
                debug!("TTL cleanup: no expired entries found");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ObjectMetadata;
    use crate::cache::CompressionPolicy;
    use bytes::Bytes;

    fn metadata(size: u64) -> ObjectMetadata {
        ObjectMetadata {
            content_type: "text/plain".to_string(),
            size,
            last_modified: chrono::Utc::now(),
            etag: "\"e\"".to_string(),
        }
    }

    #[tokio::test]
    async fn test_cleanup_task_removes_expired_entries() {
        let cache = Arc::new(CacheStore::new(
            1024,
            Duration::from_millis(50),
            CompressionPolicy::default(),
        ));
        cache.put("b/expire_soon", Bytes::from_static(b"value"), metadata(5));

        let handle = spawn_cleanup_task(cache.clone(), Duration::from_millis(100));

        tokio::time::sleep(Duration::from_millis(350)).await;

        assert!(!cache.contains_key("b/expire_soon"), "Expired entry should have been swept");
        assert_eq!(cache.current_size(), 0);
        assert_eq!(cache.stats().expirations, 1);
        assert!(cache.stats().last_cleanup.is_some());

        handle.abort();
    }

    #[tokio::test]
    async fn test_cleanup_task_preserves_valid_entries() {
        let cache = Arc::new(CacheStore::new(
            1024,
            Duration::from_secs(3600),
            CompressionPolicy::default(),
        ));
        cache.put("b/long_lived", Bytes::from_static(b"value"), metadata(5));

        let handle = spawn_cleanup_task(cache.clone(), Duration::from_millis(50));

        tokio::time::sleep(Duration::from_millis(200)).await;

        let entry = cache.get("b/long_lived");
        assert!(entry.is_some(), "Valid entry should not be removed");
        assert_eq!(entry.unwrap().raw_data.as_ref(), b"value");

        handle.abort();
    }

    #[tokio::test]
    async fn test_zero_interval_is_clamped_and_keeps_sweeping() {
        let cache = Arc::new(CacheStore::new(
            1024,
            Duration::from_millis(20),
            CompressionPolicy::default(),
        ));
        cache.put("b/short", Bytes::from_static(b"value"), metadata(5));

        let handle = spawn_cleanup_task(cache.clone(), Duration::ZERO);

        tokio::time::sleep(Duration::from_millis(150)).await;

        assert!(!handle.is_finished(), "sweep task must still be running");
        assert!(!cache.contains_key("b/short"));
        assert_eq!(cache.stats().expirations, 1);

        handle.abort();
    }

    #[tokio::test]
    async fn test_cleanup_task_can_be_aborted() {
        let cache = Arc::new(CacheStore::new(
            1024,
            Duration::from_secs(300),
            CompressionPolicy::default(),
        ));

        let handle = spawn_cleanup_task(cache, Duration::from_secs(1));

        handle.abort();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished(), "Task should be finished after abort");
    }
}
