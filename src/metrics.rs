//! Metrics collection for the access-control core.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Metrics collector for permission evaluation.
#[derive(Debug, Clone, Default)]
pub struct AccessMetrics {
    /// Number of evaluations performed.
    pub evaluations: Arc<AtomicU64>,
    /// Number of evaluations that granted access.
    pub grants: Arc<AtomicU64>,
    /// Number of evaluations that denied access.
    pub denials: Arc<AtomicU64>,
    /// Number of cache hits.
    pub cache_hits: Arc<AtomicU64>,
    /// Number of cache misses.
    pub cache_misses: Arc<AtomicU64>,
    /// Number of store faults absorbed by the fail-safe policy.
    pub resolution_faults: Arc<AtomicU64>,
}

impl AccessMetrics {
    /// Create a new metrics collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed evaluation and its verdict.
    pub fn record_evaluation(&self, granted: bool) {
        self.evaluations.fetch_add(1, Ordering::Relaxed);
        if granted {
            self.grants.fetch_add(1, Ordering::Relaxed);
        } else {
            self.denials.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a cache hit.
    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a cache miss.
    pub fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a store fault that was downgraded to a non-match.
    pub fn record_resolution_fault(&self) {
        self.resolution_faults.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the cache hit ratio.
    pub fn cache_hit_ratio(&self) -> f64 {
        let hits = self.cache_hits.load(Ordering::Relaxed);
        let misses = self.cache_misses.load(Ordering::Relaxed);
        let total = hits + misses;

        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }

    /// Get a point-in-time snapshot of all counters.
    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            evaluations: self.evaluations.load(Ordering::Relaxed),
            grants: self.grants.load(Ordering::Relaxed),
            denials: self.denials.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            cache_hit_ratio: self.cache_hit_ratio(),
            resolution_faults: self.resolution_faults.load(Ordering::Relaxed),
        }
    }
}

/// Summary of evaluation metrics.
#[derive(Debug, Clone)]
pub struct MetricsSummary {
    /// Total evaluations performed.
    pub evaluations: u64,
    /// Evaluations that granted access.
    pub grants: u64,
    /// Evaluations that denied access.
    pub denials: u64,
    /// Cache hits.
    pub cache_hits: u64,
    /// Cache misses.
    pub cache_misses: u64,
    /// Cache hit ratio.
    pub cache_hit_ratio: f64,
    /// Store faults absorbed by the fail-safe policy.
    pub resolution_faults: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evaluation_counters() {
        let metrics = AccessMetrics::new();

        metrics.record_evaluation(true);
        metrics.record_evaluation(false);
        metrics.record_evaluation(false);

        let summary = metrics.summary();
        assert_eq!(summary.evaluations, 3);
        assert_eq!(summary.grants, 1);
        assert_eq!(summary.denials, 2);
    }

    #[test]
    fn test_cache_hit_ratio() {
        let metrics = AccessMetrics::new();
        assert_eq!(metrics.cache_hit_ratio(), 0.0);

        metrics.record_cache_hit();
        metrics.record_cache_hit();
        metrics.record_cache_hit();
        metrics.record_cache_miss();

        assert!((metrics.cache_hit_ratio() - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn test_resolution_fault_counter() {
        let metrics = AccessMetrics::new();
        metrics.record_resolution_fault();
        metrics.record_resolution_fault();
        assert_eq!(metrics.summary().resolution_faults, 2);
    }
}
