//! Replay-protection registry
//!
//! Consumed nonces are keyed by `(channel, nonce)`. The key space is split
//! across a fixed number of shards, each behind its own mutex, so that
//! transitions on unrelated nonces never contend on a single lock while any
//! two transitions on the same key always meet in the same critical section.
//!
//! A reservation is a single check-and-insert under the shard lock. Nothing
//! reads the set and writes it back later.

use alloy::primitives::U256;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};
use std::sync::{Mutex, MutexGuard};

use crate::types::{Channel, Nonce};

const SHARD_COUNT: usize = 16;

type Key = (Channel, U256);

/// Per-instance set of consumed nonces
#[derive(Debug)]
pub struct NonceRegistry {
    shards: Vec<Mutex<HashSet<Key>>>,
}

impl Default for NonceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl NonceRegistry {
    pub fn new() -> Self {
        Self {
            shards: (0..SHARD_COUNT).map(|_| Mutex::new(HashSet::new())).collect(),
        }
    }

    fn shard(&self, key: &Key) -> MutexGuard<'_, HashSet<Key>> {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        let index = (hasher.finish() as usize) % SHARD_COUNT;
        // A poisoned shard still holds a consistent set: inserts and removes
        // are single operations.
        self.shards[index]
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Atomically check-and-mark `nonce` consumed on `channel`.
    ///
    /// Returns `false` if it was already consumed (or is held by a pending
    /// reservation).
    pub fn reserve(&self, channel: Channel, nonce: Nonce) -> bool {
        let key = (channel, nonce);
        self.shard(&key).insert(key)
    }

    /// Reserve a nonce for the duration of a transition.
    ///
    /// The key is marked consumed immediately, so concurrent transitions on the
    /// same key observe it as taken. Dropping the guard without calling
    /// [`NonceReservation::commit`] releases the key again.
    ///
    /// A caller that lost to a pending reservation gets `None` even if the
    /// holder later rolls back; it may retry once the holder has released.
    pub fn try_reserve(&self, channel: Channel, nonce: Nonce) -> Option<NonceReservation<'_>> {
        if self.reserve(channel, nonce) {
            Some(NonceReservation {
                registry: self,
                key: (channel, nonce),
                committed: false,
            })
        } else {
            None
        }
    }

    pub fn is_consumed(&self, channel: Channel, nonce: Nonce) -> bool {
        let key = (channel, nonce);
        self.shard(&key).contains(&key)
    }

    /// Number of consumed nonces on `channel`
    pub fn consumed_count(&self, channel: Channel) -> usize {
        self.shards
            .iter()
            .map(|shard| {
                shard
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner())
                    .iter()
                    .filter(|(c, _)| *c == channel)
                    .count()
            })
            .sum()
    }

    fn release(&self, key: &Key) {
        self.shard(key).remove(key);
    }
}

/// Pending nonce reservation; rolled back on drop unless committed
#[derive(Debug)]
#[must_use = "a reservation is released when dropped"]
pub struct NonceReservation<'a> {
    registry: &'a NonceRegistry,
    key: Key,
    committed: bool,
}

impl NonceReservation<'_> {
    pub fn channel(&self) -> Channel {
        self.key.0
    }

    pub fn nonce(&self) -> Nonce {
        self.key.1
    }

    /// Make the reservation permanent
    pub fn commit(mut self) {
        self.committed = true;
    }
}

impl Drop for NonceReservation<'_> {
    fn drop(&mut self) {
        if !self.committed {
            tracing::debug!(
                channel = %self.key.0,
                nonce = %self.key.1,
                "Releasing uncommitted nonce reservation"
            );
            self.registry.release(&self.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_reserve_once_per_channel() {
        let registry = NonceRegistry::new();
        let nonce = U256::from(1u64);

        assert!(registry.reserve(Channel::Burn, nonce));
        assert!(!registry.reserve(Channel::Burn, nonce));
        assert!(!registry.reserve(Channel::Burn, nonce));

        // Separate namespaces
        assert!(registry.reserve(Channel::Mint, nonce));
        assert!(registry.reserve(Channel::Withdraw, nonce));
        assert!(!registry.reserve(Channel::Mint, nonce));
    }

    #[test]
    fn test_is_consumed() {
        let registry = NonceRegistry::new();
        let nonce = U256::from(42u64);
        assert!(!registry.is_consumed(Channel::Withdraw, nonce));
        registry.reserve(Channel::Withdraw, nonce);
        assert!(registry.is_consumed(Channel::Withdraw, nonce));
        assert!(!registry.is_consumed(Channel::Burn, nonce));
    }

    #[test]
    fn test_reservation_rolls_back_on_drop() {
        let registry = NonceRegistry::new();
        let nonce = U256::from(7u64);

        {
            let guard = registry.try_reserve(Channel::Mint, nonce).unwrap();
            assert_eq!(guard.channel(), Channel::Mint);
            assert!(registry.is_consumed(Channel::Mint, nonce));
            assert!(registry.try_reserve(Channel::Mint, nonce).is_none());
        }

        assert!(!registry.is_consumed(Channel::Mint, nonce));
    }

    #[test]
    fn test_loser_can_retry_after_holder_releases() {
        let registry = NonceRegistry::new();
        let nonce = U256::from(8u64);

        let holder = registry.try_reserve(Channel::Withdraw, nonce).unwrap();
        assert!(registry.try_reserve(Channel::Withdraw, nonce).is_none());
        drop(holder);

        registry.try_reserve(Channel::Withdraw, nonce).unwrap().commit();
        assert!(registry.is_consumed(Channel::Withdraw, nonce));
    }

    #[test]
    fn test_committed_reservation_is_permanent() {
        let registry = NonceRegistry::new();
        let nonce = U256::from(7u64);

        registry.try_reserve(Channel::Mint, nonce).unwrap().commit();
        assert!(registry.is_consumed(Channel::Mint, nonce));
        assert!(registry.try_reserve(Channel::Mint, nonce).is_none());
    }

    #[test]
    fn test_large_nonce_values() {
        let registry = NonceRegistry::new();
        assert!(registry.reserve(Channel::Burn, U256::MAX));
        assert!(!registry.reserve(Channel::Burn, U256::MAX));
        assert!(registry.reserve(Channel::Burn, U256::ZERO));
    }

    #[test]
    fn test_consumed_count() {
        let registry = NonceRegistry::new();
        for n in 0..40u64 {
            registry.reserve(Channel::Burn, U256::from(n));
        }
        registry.reserve(Channel::Mint, U256::from(1u64));
        assert_eq!(registry.consumed_count(Channel::Burn), 40);
        assert_eq!(registry.consumed_count(Channel::Mint), 1);
        assert_eq!(registry.consumed_count(Channel::Withdraw), 0);
    }

    #[test]
    fn test_concurrent_reserve_single_winner() {
        let registry = Arc::new(NonceRegistry::new());
        let nonce = U256::from(99u64);

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || registry.reserve(Channel::Withdraw, nonce))
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
    }
}
