//! Time-bounded memoization of permission verdicts.

use crate::{
    action::Action,
    clock::{Clock, SharedClock},
    metrics::AccessMetrics,
};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::sync::Arc;

/// Composite key identifying one memoized verdict.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// The actor the verdict is for.
    pub actor_id: String,
    /// The normalized element path.
    pub path: String,
    /// The action checked.
    pub action: Action,
    /// Stable serialization of the evaluation context.
    pub context_fingerprint: String,
}

/// A memoized verdict and when it was written.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The verdict.
    pub verdict: bool,
    /// Write time; entries older than the TTL are treated as absent.
    pub written_at: DateTime<Utc>,
}

/// Verdict cache with lazy TTL eviction and per-actor invalidation.
pub struct PermissionCache {
    entries: DashMap<CacheKey, CacheEntry>,
    ttl: Duration,
    clock: SharedClock,
    metrics: Arc<AccessMetrics>,
}

impl PermissionCache {
    /// Create a cache with the given TTL.
    pub fn new(ttl: Duration, clock: SharedClock, metrics: Arc<AccessMetrics>) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            clock,
            metrics,
        }
    }

    /// Get an unexpired verdict, removing the entry if it has aged out.
    pub fn get(&self, key: &CacheKey) -> Option<bool> {
        if let Some(entry) = self.entries.get(key) {
            let age = self.clock.now() - entry.written_at;
            if age < self.ttl {
                self.metrics.record_cache_hit();
                return Some(entry.verdict);
            }
            drop(entry);
            self.entries.remove(key);
        }

        self.metrics.record_cache_miss();
        None
    }

    /// Write a verdict through to the cache.
    pub fn put(&self, key: CacheKey, verdict: bool) {
        self.entries.insert(
            key,
            CacheEntry {
                verdict,
                written_at: self.clock.now(),
            },
        );
    }

    /// Remove every entry belonging to one actor.
    ///
    /// Call whenever an actor's role or permission assignment changes.
    pub fn invalidate_actor(&self, actor_id: &str) {
        let keys_to_remove: Vec<_> = self
            .entries
            .iter()
            .filter(|entry| entry.key().actor_id == actor_id)
            .map(|entry| entry.key().clone())
            .collect();

        for key in keys_to_remove {
            self.entries.remove(&key);
        }
    }

    /// Remove all entries.
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Number of entries currently held, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for PermissionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionCache")
            .field("entries", &self.entries.len())
            .field("ttl", &self.ttl)
            .finish()
    }
}
