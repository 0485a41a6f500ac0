// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! LRU cache of recently used signed-request nonces.
//!
//! A nonce is remembered for as long as the request that carried it could
//! still pass the timestamp window, i.e. through `max(timestamp, now) +
//! window` inclusive. After that the timestamp check alone rejects a replay,
//! so the entry can be dropped. When the cache is full the least recently used entry is evicted.

use std::num::NonZeroUsize;
use std::sync::Mutex;

use lru::LruCache;

/// Outcome of recording a nonce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NonceStatus {
    /// First use inside the window; now recorded.
    Fresh,
    /// Already used by a request that is still inside the window.
    Replayed,
}

/// Bounded, concurrent nonce store with per-entry expiry.
pub struct NonceCache {
    /// Nonce -> last Unix second at which a replay could pass the window.
    cache: Mutex<LruCache<String, i64>>,
    window_secs: i64,
}

impl NonceCache {
    /// Create a new cache.
    ///
    /// - `capacity`: Max number of live nonces to remember.
    /// - `window_secs`: Replay window of the signed channel.
    pub fn new(capacity: usize, window_secs: i64) -> Self {
        Self {
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN),
            )),
            window_secs,
        }
    }

    /// Insert `nonce` unless a live entry exists. The check and the insert
    /// happen under one lock.
    pub fn check_and_insert(&self, nonce: &str, timestamp: i64, now: i64) -> NonceStatus {
        let expires_at = timestamp.max(now).saturating_add(self.window_secs);

        let mut cache = match self.cache.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(existing) = cache.get(nonce) {
            if *existing >= now {
                return NonceStatus::Replayed;
            }
            // Expired, reuse the slot
        }

        cache.put(nonce.to_string(), expires_at);
        NonceStatus::Fresh
    }

    /// Drop every expired entry.
    pub fn purge_expired(&self, now: i64) -> usize {
        let mut cache = match self.cache.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let expired: Vec<String> = cache
            .iter()
            .filter(|(_, expires_at)| **expires_at < now)
            .map(|(nonce, _)| nonce.clone())
            .collect();

        for nonce in &expired {
            cache.pop(nonce);
        }
        expired.len()
    }

    /// Number of remembered nonces, expired ones included.
    pub fn len(&self) -> usize {
        self.cache.lock().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.cache.lock().map(|c| c.cap().get()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    const NOW: i64 = 1_700_000_000;

    #[test]
    fn first_use_is_fresh_and_second_is_replayed() {
        let cache = NonceCache::new(10, 300);
        assert_eq!(cache.check_and_insert("n1", NOW, NOW), NonceStatus::Fresh);
        assert_eq!(cache.check_and_insert("n1", NOW, NOW + 10), NonceStatus::Replayed);
        assert_eq!(cache.check_and_insert("n2", NOW, NOW + 10), NonceStatus::Fresh);
    }

    #[test]
    fn entry_outlives_a_future_dated_request() {
        let cache = NonceCache::new(10, 300);
        // Signed 300 s in the future: still acceptable until NOW + 600.
        cache.check_and_insert("n1", NOW + 300, NOW);
        assert_eq!(
            cache.check_and_insert("n1", NOW + 300, NOW + 599),
            NonceStatus::Replayed
        );
    }

    #[test]
    fn expired_entries_can_be_reused() {
        let cache = NonceCache::new(10, 300);
        cache.check_and_insert("n1", NOW, NOW);
        assert_eq!(
            cache.check_and_insert("n1", NOW, NOW + 300),
            NonceStatus::Replayed
        );
        assert_eq!(
            cache.check_and_insert("n1", NOW + 301, NOW + 301),
            NonceStatus::Fresh
        );
    }

    #[test]
    fn capacity_is_bounded() {
        let cache = NonceCache::new(2, 300);
        cache.check_and_insert("a", NOW, NOW);
        cache.check_and_insert("b", NOW, NOW);
        cache.check_and_insert("c", NOW, NOW);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.capacity(), 2);
        // "a" was least recently used
        assert_eq!(cache.check_and_insert("a", NOW, NOW), NonceStatus::Fresh);
    }

    #[test]
    fn purge_removes_only_expired_entries() {
        let cache = NonceCache::new(10, 300);
        cache.check_and_insert("old", NOW - 400, NOW - 400);
        cache.check_and_insert("live", NOW, NOW);

        assert_eq!(cache.purge_expired(NOW), 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.check_and_insert("live", NOW, NOW + 1), NonceStatus::Replayed);
    }

    #[test]
    fn zero_capacity_falls_back_to_one() {
        let cache = NonceCache::new(0, 300);
        assert_eq!(cache.capacity(), 1);
    }

    #[test]
    fn concurrent_inserts_admit_exactly_one() {
        let cache = Arc::new(NonceCache::new(100, 300));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || cache.check_and_insert("shared", NOW, NOW))
            })
            .collect();

        let fresh = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|s| *s == NonceStatus::Fresh)
            .count();
        assert_eq!(fresh, 1);
    }
}
