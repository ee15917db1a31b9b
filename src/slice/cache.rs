//! Bounded LRU cache for extracted slices.
//!
//! This is the repeated-visit half of the latency story: a viewer
//! scrubbing back and forth along an axis keeps hitting the same few
//! indices, so a small cache of recently extracted planes turns those
//! revisits into copies instead of chunk decodes.
//!
//! # Snapshot isolation
//!
//! The cache never hands out references into its own storage. `put`
//! takes the snapshot by value and `get` returns a clone, so a consumer
//! mutating the slice it received cannot disturb the cached copy or any
//! other consumer.
//!
//! # Accounting
//!
//! Hit and miss counters live under the same lock as the entries, so the
//! counts always agree with the lookups that produced them. `contains`
//! deliberately touches neither the counters nor the recency order.

use lru::LruCache;
use std::num::NonZeroUsize;
use tokio::sync::RwLock;

use crate::slice::{SliceKey, SliceSnapshot};

/// Default number of slices kept per volume.
pub const DEFAULT_SLICE_CACHE_CAPACITY: usize = 20;

/// Point-in-time view of cache occupancy and effectiveness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub size: usize,
    pub capacity: usize,
}

impl CacheStats {
    pub fn total_requests(&self) -> u64 {
        self.hits + self.misses
    }

    /// Fraction of lookups that hit, or 0.0 before any lookup.
    pub fn hit_rate(&self) -> f64 {
        let total = self.total_requests();
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

struct CacheInner {
    entries: LruCache<SliceKey, SliceSnapshot>,
    hits: u64,
    misses: u64,
}

/// LRU cache of extracted slices with hit/miss accounting.
///
/// Thread-safe; share across tasks via `Arc`.
pub struct SliceCache {
    inner: RwLock<CacheInner>,
    capacity: usize,
}

impl SliceCache {
    /// Create a cache with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_SLICE_CACHE_CAPACITY)
    }

    /// Create a cache holding at most `capacity` slices.
    ///
    /// # Panics
    /// Panics if `capacity` is zero.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: RwLock::new(CacheInner {
                entries: LruCache::new(NonZeroUsize::new(capacity).unwrap()),
                hits: 0,
                misses: 0,
            }),
            capacity,
        }
    }

    /// Look up a slice, counting the outcome.
    ///
    /// A hit promotes the entry to most recently used and returns a copy
    /// of it. A miss returns `None`; the caller is expected to extract
    /// the slice and `put` it back.
    pub async fn get(&self, key: &SliceKey) -> Option<SliceSnapshot> {
        let mut inner = self.inner.write().await;
        match inner.entries.get(key) {
            Some(snapshot) => {
                let snapshot = snapshot.clone();
                inner.hits += 1;
                Some(snapshot)
            }
            None => {
                inner.misses += 1;
                None
            }
        }
    }

    /// Store a slice, evicting the least recently used entry if full.
    ///
    /// An existing entry under the same key is replaced and promoted.
    pub async fn put(&self, snapshot: SliceSnapshot) {
        let mut inner = self.inner.write().await;
        inner.entries.put(snapshot.key(), snapshot);
    }

    /// Check for a key without counting a lookup or touching recency.
    pub async fn contains(&self, key: &SliceKey) -> bool {
        let inner = self.inner.read().await;
        inner.entries.contains(key)
    }

    /// Remove one entry, returning it if present. Counters are untouched.
    pub async fn remove(&self, key: &SliceKey) -> Option<SliceSnapshot> {
        let mut inner = self.inner.write().await;
        inner.entries.pop(key)
    }

    /// Drop every entry and reset the hit/miss counters.
    pub async fn clear(&self) {
        let mut inner = self.inner.write().await;
        inner.entries.clear();
        inner.hits = 0;
        inner.misses = 0;
    }

    /// Current number of cached slices.
    pub async fn len(&self) -> usize {
        let inner = self.inner.read().await;
        inner.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        let inner = self.inner.read().await;
        inner.entries.is_empty()
    }

    /// Maximum number of slices the cache will hold.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Snapshot of the counters and occupancy.
    pub async fn stats(&self) -> CacheStats {
        let inner = self.inner.read().await;
        CacheStats {
            hits: inner.hits,
            misses: inner.misses,
            size: inner.entries.len(),
            capacity: self.capacity,
        }
    }
}

impl Default for SliceCache {
    fn default() -> Self {
        Self::new()
    }
}
