//! Cache metrics
//!
//! Counters are purely observational: nothing in the cache reads them back to make a
//! decision. Collaborators consume [`MetricsSnapshot`]s through a [`MetricsSink`]:
//! - [`TracingSink`]: structured log line per level
//! - [`PrometheusSink`]: gauges in a private Prometheus registry

mod prometheus_sink;

pub use prometheus_sink::PrometheusSink;

use serde::{Deserialize, Serialize};
use tracing::info;

/// Counters owned by a single cache level
///
/// Increments saturate at `u64::MAX` instead of wrapping.
#[derive(Debug, Clone, Default)]
pub struct CacheMetrics {
    hits: u64,
    misses: u64,
    evictions: u64,
    tag_invalidations: u64,
}

impl CacheMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&mut self) {
        self.hits = self.hits.saturating_add(1);
    }

    pub fn record_miss(&mut self) {
        self.misses = self.misses.saturating_add(1);
    }

    pub fn record_eviction(&mut self) {
        self.evictions = self.evictions.saturating_add(1);
    }

    /// One call per entry removed by a tag invalidation
    pub fn record_tag_invalidation(&mut self) {
        self.tag_invalidations = self.tag_invalidations.saturating_add(1);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            hits: self.hits,
            misses: self.misses,
            evictions: self.evictions,
            tag_invalidations: self.tag_invalidations,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Point-in-time copy of a level's counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub tag_invalidations: u64,
}

impl MetricsSnapshot {
    /// Calculate hit rate
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits.saturating_add(self.misses);
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// Total lookups observed
    pub fn lookups(&self) -> u64 {
        self.hits.saturating_add(self.misses)
    }
}

/// Consumer of per-level snapshots
pub trait MetricsSink: Send + Sync {
    fn record(&self, level: &str, snapshot: &MetricsSnapshot);
}

/// Sink that emits one `info` event per snapshot
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl MetricsSink for TracingSink {
    fn record(&self, level: &str, snapshot: &MetricsSnapshot) {
        info!(
            cache_level = level,
            hits = snapshot.hits,
            misses = snapshot.misses,
            evictions = snapshot.evictions,
            tag_invalidations = snapshot.tag_invalidations,
            hit_rate = snapshot.hit_rate(),
            "cache level metrics"
        );
    }
}
