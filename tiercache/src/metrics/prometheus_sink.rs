use prometheus::{Encoder, IntGaugeVec, Opts, Registry, TextEncoder};

use super::{MetricsSink, MetricsSnapshot};
use crate::core::error::{CacheError, Result};

/// Prometheus exporter for cache level snapshots
///
/// Owns its registry so several caches in one process never collide on metric names.
/// Snapshots are cumulative totals, hence gauges set to the latest value.
pub struct PrometheusSink {
    registry: Registry,
    hits: IntGaugeVec,
    misses: IntGaugeVec,
    evictions: IntGaugeVec,
    tag_invalidations: IntGaugeVec,
}

impl PrometheusSink {
    /// Create a sink whose metric names start with `namespace`
    pub fn new(namespace: &str) -> Result<Self> {
        let registry = Registry::new();

        let hits = register_gauge(&registry, namespace, "hits", "Cache hits per level")?;
        let misses = register_gauge(&registry, namespace, "misses", "Cache misses per level")?;
        let evictions = register_gauge(
            &registry,
            namespace,
            "evictions",
            "Entries evicted by capacity or expiry per level",
        )?;
        let tag_invalidations = register_gauge(
            &registry,
            namespace,
            "tag_invalidations",
            "Entries removed by tag invalidation per level",
        )?;

        Ok(Self {
            registry,
            hits,
            misses,
            evictions,
            tag_invalidations,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Render the registry in the text exposition format
    pub fn gather_text(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(|e| CacheError::Config(format!("Failed to encode metrics: {}", e)))?;
        String::from_utf8(buffer)
            .map_err(|e| CacheError::Config(format!("Metrics are not valid UTF-8: {}", e)))
    }
}

fn register_gauge(
    registry: &Registry,
    namespace: &str,
    name: &str,
    help: &str,
) -> Result<IntGaugeVec> {
    let gauge = IntGaugeVec::new(Opts::new(name, help).namespace(namespace), &["level"])
        .map_err(|e| CacheError::InvalidConfig(format!("Invalid metric '{}': {}", name, e)))?;
    registry
        .register(Box::new(gauge.clone()))
        .map_err(|e| CacheError::InvalidConfig(format!("Cannot register '{}': {}", name, e)))?;
    Ok(gauge)
}

fn clamp(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

impl MetricsSink for PrometheusSink {
    fn record(&self, level: &str, snapshot: &MetricsSnapshot) {
        self.hits.with_label_values(&[level]).set(clamp(snapshot.hits));
        self.misses
            .with_label_values(&[level])
            .set(clamp(snapshot.misses));
        self.evictions
            .with_label_values(&[level])
            .set(clamp(snapshot.evictions));
        self.tag_invalidations
            .with_label_values(&[level])
            .set(clamp(snapshot.tag_invalidations));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prometheus_sink_renders_levels() {
        let sink = PrometheusSink::new("tiercache").unwrap();
        sink.record(
            "l1",
            &MetricsSnapshot {
                hits: 5,
                misses: 2,
                evictions: 1,
                tag_invalidations: 0,
            },
        );
        sink.record(
            "l2",
            &MetricsSnapshot {
                hits: 1,
                ..Default::default()
            },
        );

        let text = sink.gather_text().unwrap();
        assert!(text.contains("tiercache_hits{level=\"l1\"} 5"));
        assert!(text.contains("tiercache_misses{level=\"l1\"} 2"));
        assert!(text.contains("tiercache_hits{level=\"l2\"} 1"));
    }

    #[test]
    fn test_independent_registries() {
        let a = PrometheusSink::new("tiercache").unwrap();
        let b = PrometheusSink::new("tiercache").unwrap();
        a.record("l1", &MetricsSnapshot::default());
        b.record("l1", &MetricsSnapshot::default());
        assert_eq!(a.registry().gather().len(), 4);
    }

    #[test]
    fn test_clamp() {
        assert_eq!(clamp(7), 7);
        assert_eq!(clamp(u64::MAX), i64::MAX);
    }
}
