//! Bounded cache of relayed attestation digests
//!
//! Remembers recently completed relays so a re-scan after restart or a
//! duplicate log entry short-circuits before collecting signatures again. It
//! is only an optimisation: the destination nonce check stays authoritative.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use alloy::primitives::B256;

/// Digest cache with TTL and max-size eviction
pub struct BoundedHashCache {
    /// Digest -> insertion timestamp
    map: HashMap<B256, Instant>,
    max_size: usize,
    ttl: Duration,
}

impl BoundedHashCache {
    pub fn new(max_size: usize, ttl: Duration) -> Self {
        Self {
            map: HashMap::new(),
            max_size,
            ttl,
        }
    }

    /// Returns true if the digest is present and not expired.
    pub fn contains(&self, digest: &B256) -> bool {
        self.map.get(digest).is_some_and(|&t| t.elapsed() < self.ttl)
    }

    /// Insert a digest. Evicts expired entries, then the oldest, when full.
    pub fn insert(&mut self, digest: B256) {
        let now = Instant::now();

        self.map.retain(|_, &mut t| now.duration_since(t) < self.ttl);

        while self.map.len() >= self.max_size && !self.map.is_empty() {
            let oldest = self.map.iter().min_by_key(|(_, t)| *t).map(|(h, _)| *h);
            match oldest {
                Some(h) => {
                    self.map.remove(&h);
                }
                None => break,
            }
        }

        self.map.insert(digest, now);
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn test_insert_and_contains() {
        let mut cache = BoundedHashCache::new(10, Duration::from_secs(3600));
        let digest = B256::repeat_byte(1);
        assert!(!cache.contains(&digest));
        cache.insert(digest);
        assert!(cache.contains(&digest));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_evicts_oldest_when_full() {
        let mut cache = BoundedHashCache::new(2, Duration::from_secs(3600));
        let (a, b, c) = (B256::repeat_byte(1), B256::repeat_byte(2), B256::repeat_byte(3));

        cache.insert(a);
        sleep(Duration::from_millis(2));
        cache.insert(b);
        sleep(Duration::from_millis(2));
        cache.insert(c);

        assert!(!cache.contains(&a), "oldest should be evicted");
        assert!(cache.contains(&b));
        assert!(cache.contains(&c));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_expired_entries_not_contained() {
        let mut cache = BoundedHashCache::new(10, Duration::from_millis(5));
        let digest = B256::repeat_byte(7);
        cache.insert(digest);
        sleep(Duration::from_millis(10));
        assert!(!cache.contains(&digest));

        cache.insert(B256::repeat_byte(8));
        assert_eq!(cache.len(), 1);
    }
}
