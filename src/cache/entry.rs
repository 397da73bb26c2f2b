//! Cache Entry Module
//!
//! Defines one cached object version together with its metadata and expiry.

use std::time::{Duration, Instant};

use bytes::Bytes;

use crate::backend::ObjectMetadata;

// == Cache Entry ==
/// An immutable cached object. Replaced wholesale, never mutated in place.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Composite `bucket/key`
    pub key: String,
    /// Original payload
    pub raw_data: Bytes,
    /// Gzip payload, only present when strictly smaller than `raw_data`
    pub compressed_data: Option<Bytes>,
    pub content_type: String,
    pub raw_size: u64,
    pub compressed_size: u64,
    pub last_modified: chrono::DateTime<chrono::Utc>,
    pub etag: String,
    /// The entry is dead once this instant is reached
    pub expires_at: Instant,
}

impl CacheEntry {
    // == Constructor ==
    /// Builds an entry expiring `ttl` from now.
    ///
    /// `compressed` is dropped unless it is strictly smaller than `raw_data`.
    pub fn new(
        key: String,
        raw_data: Bytes,
        compressed: Option<Vec<u8>>,
        metadata: ObjectMetadata,
        ttl: Duration,
    ) -> Self {
        let raw_size = raw_data.len() as u64;
        let compressed_data = compressed
            .filter(|c| (c.len() as u64) < raw_size)
            .map(Bytes::from);
        let compressed_size = compressed_data.as_ref().map_or(0, |c| c.len() as u64);

        Self {
            key,
            raw_data,
            compressed_data,
            content_type: metadata.content_type,
            raw_size,
            compressed_size,
            last_modified: metadata.last_modified,
            etag: metadata.etag,
            expires_at: Instant::now() + ttl,
        }
    }

    // == Is Expired ==
    /// An entry is expired once the current time is at or past `expires_at`.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    pub fn is_expired_at(&self, now: Instant) -> bool {
        now >= self.expires_at
    }

    pub fn is_compressed(&self) -> bool {
        self.compressed_data.is_some()
    }

    // == Stored Size ==
    /// Bytes this entry counts against the cache size bound.
    pub fn stored_size(&self) -> u64 {
        if self.is_compressed() {
            self.compressed_size
        } else {
            self.raw_size
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    fn metadata() -> ObjectMetadata {
        ObjectMetadata {
            content_type: "text/plain".to_string(),
            size: 5,
            last_modified: chrono::Utc::now(),
            etag: "\"abc\"".to_string(),
        }
    }

    #[test]
    fn test_entry_uncompressed() {
        let entry = CacheEntry::new(
            "b/k".to_string(),
            Bytes::from_static(b"hello"),
            None,
            metadata(),
            Duration::from_secs(60),
        );

        assert!(!entry.is_compressed());
        assert_eq!(entry.raw_size, 5);
        assert_eq!(entry.compressed_size, 0);
        assert_eq!(entry.stored_size(), 5);
        assert!(!entry.is_expired());
    }

    #[test]
    fn test_entry_keeps_smaller_compressed_payload() {
        let entry = CacheEntry::new(
            "b/k".to_string(),
            Bytes::from(vec![b'a'; 100]),
            Some(vec![1, 2, 3]),
            metadata(),
            Duration::from_secs(60),
        );

        assert!(entry.is_compressed());
        assert_eq!(entry.compressed_size, 3);
        assert_eq!(entry.stored_size(), 3);
    }

    #[test]
    fn test_entry_drops_compressed_payload_that_is_not_smaller() {
        let entry = CacheEntry::new(
            "b/k".to_string(),
            Bytes::from_static(b"abc"),
            Some(vec![1, 2, 3]),
            metadata(),
            Duration::from_secs(60),
        );

        assert!(!entry.is_compressed());
        assert_eq!(entry.stored_size(), 3);
    }

    #[test]
    fn test_entry_expiration() {
        let entry = CacheEntry::new(
            "b/k".to_string(),
            Bytes::from_static(b"hello"),
            None,
            metadata(),
            Duration::from_millis(50),
        );

        assert!(!entry.is_expired());
        sleep(Duration::from_millis(80));
        assert!(entry.is_expired());
    }

    #[test]
    fn test_expiration_boundary_condition() {
        let entry = CacheEntry::new(
            "b/k".to_string(),
            Bytes::from_static(b"hello"),
            None,
            metadata(),
            Duration::from_secs(60),
        );

        assert!(entry.is_expired_at(entry.expires_at), "Entry should be expired at boundary");
        assert!(!entry.is_expired_at(entry.expires_at - Duration::from_millis(1)));
    }
}
