//! LRU decision cache with TTL.

use std::num::NonZeroUsize;
use std::time::Duration;

use lru::LruCache;
use parking_lot::Mutex;
use tokio::time::Instant;

use super::decision::RoutingDecision;

/// Hit/miss/eviction counters for the decision cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheMetrics {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub size: usize,
    pub capacity: usize,
}

struct CachedDecision {
    decision: RoutingDecision,
    cached_at: Instant,
}

/// Bounded, TTL'd cache of routing decisions keyed by (tool, arg-hash).
///
/// A `get` on a live entry promotes it to most-recently-used; an expired
/// entry is dropped and reported as a miss. Inserting at capacity evicts
/// the least-recently-used entry.
pub struct DecisionCache {
    entries: Mutex<LruCache<u64, CachedDecision>>,
    ttl: Duration,
    metrics: Mutex<CacheMetrics>,
}

impl DecisionCache {
    /// Create a cache holding up to `capacity` decisions for `ttl` each.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero; router configuration validates this
    /// before construction.
    #[must_use]
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        #[allow(clippy::expect_used)]
        let entries = LruCache::new(NonZeroUsize::new(capacity).expect("capacity must be nonzero"));
        Self {
            entries: Mutex::new(entries),
            ttl,
            metrics: Mutex::new(CacheMetrics {
                capacity,
                ..CacheMetrics::default()
            }),
        }
    }

    /// Fetch an unexpired decision, promoting it to most-recently-used.
    #[must_use]
    pub fn get(&self, key: u64) -> Option<RoutingDecision> {
        let mut entries = self.entries.lock();
        let mut metrics = self.metrics.lock();

        let expired = match entries.get(&key) {
            Some(entry) if entry.cached_at.elapsed() <= self.ttl => {
                metrics.hits += 1;
                return Some(entry.decision.clone());
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            entries.pop(&key);
            metrics.evictions += 1;
        }
        metrics.misses += 1;
        metrics.size = entries.len();
        None
    }

    /// Insert a decision, evicting the least-recently-used entry at capacity.
    pub fn insert(&self, key: u64, decision: RoutingDecision) {
        let mut entries = self.entries.lock();
        let evicted = entries.push(
            key,
            CachedDecision {
                decision,
                cached_at: Instant::now(),
            },
        );

        let mut metrics = self.metrics.lock();
        if let Some((evicted_key, _)) = evicted {
            if evicted_key != key {
                metrics.evictions += 1;
            }
        }
        metrics.size = entries.len();
    }

    /// Number of live entries (expired entries count until touched).
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Current counters.
    #[must_use]
    pub fn metrics(&self) -> CacheMetrics {
        *self.metrics.lock()
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.entries.lock().clear();
        self.metrics.lock().size = 0;
    }
}
