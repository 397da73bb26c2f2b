//! Cache Store Module
//!
//! Main cache engine: a concurrent entry map with size-bounded eviction,
//! TTL expiration and compression-aware storage.
//!
//! The entry map is a [`DashMap`] and may be read and written from any
//! request context. The aggregate size counter and the eviction sweep are
//! serialized under a single mutex. Every path that removes an entry from
//! the map subtracts exactly the size of the entry it removed, so the
//! counter converges to the sum of live entry sizes. No shard guard is
//! ever held while waiting for the size lock.
//!
//! Deletes bump a per-key invalidation generation under the same lock.
//! A read-through population carries the generation it observed before
//! going to the backend and is refused once that generation has moved, so
//! a slow fetch can never reinstate bytes older than a completed write.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use bytes::Bytes;
use dashmap::DashMap;
use tracing::{debug, warn};

use crate::backend::ObjectMetadata;
use crate::cache::compression::{self, CompressionPolicy};
use crate::cache::{CacheEntry, CacheStats, StatsCounters};

/// Number of invalidation generation slots. Keys sharing a slot only cost
/// each other a skipped population.
const GENERATION_SLOTS: usize = 256;

// == Cache Store ==
/// Process-wide object cache, shared by handle.
#[derive(Debug)]
pub struct CacheStore {
    /// Composite key to immutable entry
    entries: DashMap<String, Arc<CacheEntry>>,
    /// Sum of stored sizes of live entries
    current_size: Mutex<u64>,
    /// Performance counters
    stats: StatsCounters,
    last_cleanup: Mutex<Option<chrono::DateTime<chrono::Utc>>>,
    /// Invalidation counters, indexed by key hash
    generations: Box<[AtomicU64]>,
    /// Upper bound for `current_size` and for any single raw payload
    max_size: u64,
    /// Lifetime given to every new entry
    default_ttl: Duration,
    policy: CompressionPolicy,
}

impl CacheStore {
    // == Constructor ==
    /// Creates an empty store.
    ///
    /// # Arguments
    /// * `max_size` - Maximum aggregate size in bytes
    /// * `default_ttl` - Lifetime of each entry
    /// * `policy` - Decides which entries get a compressed copy
    pub fn new(max_size: u64, default_ttl: Duration, policy: CompressionPolicy) -> Self {
        Self {
            entries: DashMap::new(),
            current_size: Mutex::new(0),
            stats: StatsCounters::default(),
            last_cleanup: Mutex::new(None),
            generations: (0..GENERATION_SLOTS).map(|_| AtomicU64::new(0)).collect(),
            max_size,
            default_ttl,
            policy,
        }
    }

    // == Put ==
    /// Caches an object, replacing any previous version of the key.
    ///
    /// Payloads larger than `max_size` are ignored. Returns whether the
    /// entry was stored.
    pub fn put(&self, key: impl Into<String>, data: Bytes, metadata: ObjectMetadata) -> bool {
        self.insert(key.into(), data, metadata, None)
    }

    /// Caches an object fetched after reading `generation` for its key.
    ///
    /// Refused when the key was deleted since, which means the fetched
    /// bytes may predate a write.
    pub fn put_if_generation(
        &self,
        key: impl Into<String>,
        generation: u64,
        data: Bytes,
        metadata: ObjectMetadata,
    ) -> bool {
        self.insert(key.into(), data, metadata, Some(generation))
    }

    fn insert(
        &self,
        key: String,
        data: Bytes,
        metadata: ObjectMetadata,
        expected_generation: Option<u64>,
    ) -> bool {
        let raw_size = data.len() as u64;

        if raw_size > self.max_size {
            debug!(key = %key, size = raw_size, max = self.max_size, "object too large to cache");
            return false;
        }

        let compressed = if self.policy.should_compress(&metadata.content_type, raw_size) {
            match compression::compress(&data) {
                Ok(compressed) => Some(compressed),
                Err(err) => {
                    warn!(key = %key, error = %err, "compression failed, caching raw bytes");
                    None
                }
            }
        } else {
            None
        };

        let entry = Arc::new(CacheEntry::new(
            key.clone(),
            data,
            compressed,
            metadata,
            self.default_ttl,
        ));
        let incoming = entry.stored_size();

        let mut current = self.lock_size();

        if let Some(expected) = expected_generation {
            if self.generation(&key) != expected {
                debug!(key = %key, "key invalidated during fetch, not caching");
                return false;
            }
        }

        if let Some((_, previous)) = self.entries.remove(&key) {
            *current = current.saturating_sub(previous.stored_size());
        }

        if *current + incoming > self.max_size {
            let evicted = self.evict_until_fits(&mut current, incoming);
            if evicted > 0 {
                self.stats.record_evictions(evicted);
                metrics::counter!("cache_evictions_total").increment(evicted);
                debug!(evicted, "evicted entries to make room");
            }
        }

        self.entries.insert(key, entry);
        *current += incoming;
        true
    }

    // == Get ==
    /// Returns the live entry for `key`.
    ///
    /// An expired entry is removed on the spot and reported as a miss.
    pub fn get(&self, key: &str) -> Option<Arc<CacheEntry>> {
        let found = self.entries.get(key).map(|item| Arc::clone(item.value()));

        match found {
            Some(entry) if !entry.is_expired() => {
                self.stats.record_hit();
                Some(entry)
            }
            Some(entry) => {
                if self.remove_exact(key, &entry) {
                    self.stats.record_expirations(1);
                }
                self.stats.record_miss();
                None
            }
            None => {
                self.stats.record_miss();
                None
            }
        }
    }

    // == Delete ==
    /// Removes `key` if present and bumps its invalidation generation.
    /// Returns whether anything was removed.
    pub fn delete(&self, key: &str) -> bool {
        let mut current = self.lock_size();
        self.generation_slot(key).fetch_add(1, Ordering::SeqCst);

        match self.entries.remove(key) {
            Some((_, entry)) => {
                *current = current.saturating_sub(entry.stored_size());
                true
            }
            None => false,
        }
    }

    // == Generation ==
    /// Invalidation generation of `key`, to be read before a backend fetch
    /// and handed back to [`CacheStore::put_if_generation`].
    pub fn generation(&self, key: &str) -> u64 {
        self.generation_slot(key).load(Ordering::SeqCst)
    }

    // == Sweep Expired ==
    /// Removes every expired entry. Returns the number removed by this call.
    pub fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let expired: Vec<(String, Arc<CacheEntry>)> = self
            .entries
            .iter()
            .filter(|item| item.value().is_expired_at(now))
            .map(|item| (item.key().clone(), Arc::clone(item.value())))
            .collect();

        let removed = expired
            .iter()
            .filter(|(key, entry)| self.remove_exact(key, entry))
            .count();

        self.stats.record_expirations(removed as u64);
        *self
            .last_cleanup
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(chrono::Utc::now());
        removed
    }

    // == Stats ==
    /// Returns a snapshot of the cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut entry_count = 0;
        let mut raw_total = 0u64;
        let mut compressed_total = 0u64;

        for item in self.entries.iter() {
            entry_count += 1;
            if item.is_compressed() {
                raw_total += item.raw_size;
                compressed_total += item.compressed_size;
            }
        }

        let compression_ratio = if raw_total > 0 {
            compressed_total as f64 / raw_total as f64
        } else {
            0.0
        };

        let last_cleanup = self
            .last_cleanup
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .map(|at| at.to_rfc3339());

        CacheStats {
            hits: self.stats.hits(),
            misses: self.stats.misses(),
            evictions: self.stats.evictions(),
            expirations: self.stats.expirations(),
            entry_count,
            current_size: self.current_size(),
            max_size: self.max_size,
            compression_ratio,
            last_cleanup,
        }
    }

    pub fn current_size(&self) -> u64 {
        *self.lock_size()
    }

    pub fn max_size(&self) -> u64 {
        self.max_size
    }

    pub fn policy(&self) -> CompressionPolicy {
        self.policy
    }

    // == Length ==
    /// Returns the number of entries in the map, including not yet swept ones.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    // == Internals ==
    fn generation_slot(&self, key: &str) -> &AtomicU64 {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        &self.generations[(hasher.finish() % self.generations.len() as u64) as usize]
    }

    fn lock_size(&self) -> MutexGuard<'_, u64> {
        self.current_size
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Removes `key` only if it still maps to `entry`, so a fresh
    /// replacement written concurrently survives.
    fn remove_exact(&self, key: &str, entry: &Arc<CacheEntry>) -> bool {
        let removed = self
            .entries
            .remove_if(key, |_, current| Arc::ptr_eq(current, entry))
            .is_some();

        if removed {
            let mut current = self.lock_size();
            *current = current.saturating_sub(entry.stored_size());
        }
        removed
    }

    /// Unordered sweep: removes entries in map iteration order until
    /// `incoming` bytes fit. Caller holds the size lock.
    fn evict_until_fits(&self, current: &mut MutexGuard<'_, u64>, incoming: u64) -> u64 {
        let mut projected = **current;
        let mut victims = Vec::new();

        for item in self.entries.iter() {
            if projected + incoming <= self.max_size {
                break;
            }
            projected = projected.saturating_sub(item.value().stored_size());
            victims.push(item.key().clone());
        }

        let mut evicted = 0;
        for key in victims {
            if let Some((_, entry)) = self.entries.remove(&key) {
                **current = current.saturating_sub(entry.stored_size());
                evicted += 1;
            }
        }
        evicted
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    const TTL: Duration = Duration::from_secs(300);

    fn metadata(content_type: &str) -> ObjectMetadata {
        ObjectMetadata {
            content_type: content_type.to_string(),
            size: 0,
            last_modified: chrono::Utc::now(),
            etag: "\"etag\"".to_string(),
        }
    }

    fn store(max_size: u64) -> CacheStore {
        CacheStore::new(max_size, TTL, CompressionPolicy::default())
    }

    fn live_size(store: &CacheStore) -> u64 {
        store.entries.iter().map(|item| item.stored_size()).sum()
    }

    #[test]
    fn test_store_new() {
        let store = store(1000);
        assert!(store.is_empty());
        assert_eq!(store.current_size(), 0);
    }

    #[test]
    fn test_put_and_get() {
        let store = store(1000);

        assert!(store.put("b/k", Bytes::from_static(b"value"), metadata("text/plain")));
        let entry = store.get("b/k").unwrap();

        assert_eq!(entry.raw_data.as_ref(), b"value");
        assert_eq!(entry.content_type, "text/plain");
        assert!(!entry.is_compressed());
        assert_eq!(store.current_size(), 5);
    }

    #[test]
    fn test_get_nonexistent() {
        let store = store(1000);
        assert!(store.get("missing").is_none());
        assert_eq!(store.stats().misses, 1);
    }

    #[test]
    fn test_oversize_put_is_rejected() {
        let store = store(1000);

        let stored = store.put("b/k", Bytes::from(vec![b'x'; 2000]), metadata("text/plain"));

        assert!(!stored);
        assert!(store.is_empty());
        assert_eq!(store.current_size(), 0);
        assert!(store.get("b/k").is_none());
    }

    #[test]
    fn test_compressible_entry_is_stored_compressed() {
        let store = store(1 << 20);
        let body = "compress me please ".repeat(200);

        store.put("b/doc.txt", Bytes::from(body.clone()), metadata("text/plain"));
        let entry = store.get("b/doc.txt").unwrap();

        assert!(entry.is_compressed());
        assert!(entry.compressed_size < entry.raw_size);
        assert_eq!(store.current_size(), entry.compressed_size);
        let restored = compression::decompress(entry.compressed_data.as_ref().unwrap()).unwrap();
        assert_eq!(restored, body.as_bytes());
    }

    #[test]
    fn test_binary_entry_is_not_compressed() {
        let store = store(1 << 20);
        store.put("b/img.png", Bytes::from(vec![0u8; 4096]), metadata("image/png"));

        let entry = store.get("b/img.png").unwrap();
        assert!(!entry.is_compressed());
        assert_eq!(store.current_size(), 4096);
    }

    #[test]
    fn test_overwrite_replaces_entry_and_size() {
        let store = store(1000);

        store.put("b/k", Bytes::from(vec![b'a'; 100]), metadata("image/png"));
        store.put("b/k", Bytes::from(vec![b'b'; 40]), metadata("image/png"));

        assert_eq!(store.len(), 1);
        assert_eq!(store.current_size(), 40);
        assert_eq!(store.get("b/k").unwrap().raw_data[0], b'b');
    }

    #[test]
    fn test_delete_is_idempotent() {
        let store = store(1000);
        store.put("b/k", Bytes::from(vec![1u8; 100]), metadata("image/png"));
        store.put("b/other", Bytes::from(vec![1u8; 50]), metadata("image/png"));

        assert!(store.delete("b/k"));
        assert_eq!(store.current_size(), 50);
        assert!(!store.delete("b/k"));
        assert_eq!(store.current_size(), 50);
        assert!(store.get("b/k").is_none());
    }

    #[test]
    fn test_delete_bumps_generation() {
        let store = store(1000);
        let before = store.generation("b/k");

        store.delete("b/k");

        assert_ne!(store.generation("b/k"), before);
    }

    #[test]
    fn test_put_if_generation_refused_after_delete() {
        let store = store(1000);
        let observed = store.generation("b/k");

        // A write lands while the fetch for `observed` is in flight
        store.delete("b/k");

        let stored = store.put_if_generation(
            "b/k",
            observed,
            Bytes::from_static(b"old"),
            metadata("text/plain"),
        );
        assert!(!stored);
        assert!(!store.contains_key("b/k"));
        assert_eq!(store.current_size(), 0);

        let fresh = store.generation("b/k");
        assert!(store.put_if_generation(
            "b/k",
            fresh,
            Bytes::from_static(b"new"),
            metadata("text/plain"),
        ));
        assert_eq!(store.get("b/k").unwrap().raw_data.as_ref(), b"new");
    }

    #[test]
    fn test_eviction_keeps_size_under_bound() {
        let store = store(1000);

        for i in 0..5 {
            store.put(format!("b/{i}"), Bytes::from(vec![0u8; 300]), metadata("image/png"));
            assert!(store.current_size() <= 1000);
        }

        assert!(store.contains_key("b/4"), "newest entry must be present");
        assert_eq!(store.len(), 3);
        assert_eq!(store.current_size(), 900);
        assert_eq!(store.stats().evictions, 2);
        assert_eq!(store.current_size(), live_size(&store));
    }

    #[test]
    fn test_entry_exactly_max_size_fits() {
        let store = store(1000);
        store.put("b/a", Bytes::from(vec![0u8; 10]), metadata("image/png"));
        assert!(store.put("b/big", Bytes::from(vec![0u8; 1000]), metadata("image/png")));

        assert_eq!(store.len(), 1);
        assert_eq!(store.current_size(), 1000);
    }

    #[test]
    fn test_get_after_expiry_is_miss() {
        let store = CacheStore::new(1000, Duration::from_millis(50), CompressionPolicy::default());
        store.put("b/k", Bytes::from_static(b"value"), metadata("text/plain"));
        assert!(store.get("b/k").is_some());

        sleep(Duration::from_millis(80));

        assert!(store.get("b/k").is_none());
        assert!(!store.contains_key("b/k"), "expired entry should be removed lazily");
        assert_eq!(store.current_size(), 0);
        assert_eq!(store.stats().expirations, 1);
    }

    #[test]
    fn test_sweep_expired() {
        let short = CacheStore::new(1000, Duration::from_millis(50), CompressionPolicy::default());
        short.put("b/1", Bytes::from_static(b"one"), metadata("text/plain"));
        short.put("b/2", Bytes::from_static(b"two"), metadata("text/plain"));

        sleep(Duration::from_millis(80));

        assert_eq!(short.sweep_expired(), 2);
        assert!(short.is_empty());
        assert_eq!(short.current_size(), 0);
        assert!(short.stats().last_cleanup.is_some());
        assert_eq!(short.sweep_expired(), 0);
    }

    #[test]
    fn test_sweep_preserves_live_entries() {
        let store = store(1000);
        store.put("b/k", Bytes::from_static(b"value"), metadata("text/plain"));

        assert_eq!(store.sweep_expired(), 0);
        assert!(store.get("b/k").is_some());
    }

    #[test]
    fn test_stats_snapshot() {
        let store = store(1 << 20);
        store.put("b/t", Bytes::from("abc".repeat(1000)), metadata("text/plain"));
        store.put("b/p", Bytes::from(vec![0u8; 10]), metadata("image/png"));
        store.get("b/t");
        store.get("b/missing");

        let stats = store.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entry_count, 2);
        assert_eq!(stats.max_size, 1 << 20);
        assert!(stats.compression_ratio > 0.0 && stats.compression_ratio < 1.0);
        assert_eq!(stats.current_size, live_size(&store));
    }

    #[test]
    fn test_concurrent_writers_keep_size_consistent() {
        let store = Arc::new(store(10_000));

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for i in 0..200 {
                        let key = format!("b/{}", (t * 7 + i) % 40);
                        match i % 3 {
                            0 | 1 => {
                                store.put(key, Bytes::from(vec![0u8; 50 + i % 300]), metadata("image/png"));
                            }
                            _ => {
                                store.delete(&key);
                            }
                        }
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert!(store.current_size() <= store.max_size());
        assert_eq!(store.current_size(), live_size(&store));
    }
}
