use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::sweeper::Sweep;
use super::tier::{CacheTier, SharedLevel};
use crate::config::CacheConfig;
use crate::core::clock::Clock;
use crate::core::error::{CacheError, Result};
use crate::core::level::SingleLevelCache;
use crate::core::types::{LevelStats, TagSet};
use crate::metrics::MetricsSink;

/// Counters owned by the multi-level cache itself
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MultiLevelStats {
    /// Writes into faster levels triggered by a hit further down
    pub promotions: u64,
    /// Per-level failures that were logged and swallowed
    pub level_failures: u64,
}

/// Ordered stack of cache levels, fastest first
///
/// Reads probe levels in order and promote hits into every faster level. Writes,
/// deletes, and tag invalidations fan out to all levels independently. The last level
/// is authoritative: its failures are returned to the caller, failures of faster
/// levels are logged and counted.
///
/// Every public operation runs under one instance-wide lock, so a promotion can never
/// interleave with a concurrent write to the same key. Inside it at most one level lock
/// is held at a time, always acquired fastest to slowest.
pub struct MultiLevelCache<K, V> {
    levels: Vec<Arc<dyn CacheTier<K, V>>>,
    op_lock: Mutex<()>,
    stats: Mutex<MultiLevelStats>,
}

impl<K, V> MultiLevelCache<K, V>
where
    K: Clone + Debug,
    V: Clone,
{
    /// Build from levels ordered fastest to slowest
    pub fn new(levels: Vec<Arc<dyn CacheTier<K, V>>>) -> Result<Self> {
        if levels.is_empty() {
            return Err(CacheError::InvalidConfig(
                "multi-level cache needs at least one level".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for level in &levels {
            if !seen.insert(level.name().to_string()) {
                return Err(CacheError::InvalidConfig(format!(
                    "duplicate level name '{}'",
                    level.name()
                )));
            }
        }

        info!(
            "Initializing multi-level cache: {}",
            levels
                .iter()
                .map(|level| level.name())
                .collect::<Vec<_>>()
                .join(" -> ")
        );

        Ok(Self {
            levels,
            op_lock: Mutex::new(()),
            stats: Mutex::new(MultiLevelStats::default()),
        })
    }

    pub fn levels(&self) -> &[Arc<dyn CacheTier<K, V>>] {
        &self.levels
    }

    /// Name of the level whose failures are surfaced
    pub fn authoritative(&self) -> &str {
        self.levels[self.levels.len() - 1].name()
    }

    /// Get a value, checking levels fastest to slowest
    ///
    /// A hit at level `i` is written into levels `0..i` with each level's own default
    /// TTL and the tags the entry carries where it was found. Promotion is best effort.
    pub fn get(&self, key: &K) -> Result<Option<V>> {
        let _guard = self.op_lock.lock();

        for (index, level) in self.levels.iter().enumerate() {
            let hit = match level.get(key) {
                Ok(hit) => hit,
                Err(e) if !self.is_authoritative(index) => {
                    self.record_failure(level.name(), "get", &e);
                    continue;
                }
                Err(e) => return Err(e),
            };

            if let Some(hit) = hit {
                debug!("{} hit for key: {:?}", level.name(), key);
                if index > 0 {
                    self.promote(key, &hit.value, &hit.tags, index);
                }
                return Ok(Some(hit.value));
            }
        }

        debug!("Cache miss for key: {:?}", key);
        Ok(None)
    }

    fn promote(&self, key: &K, value: &V, tags: &TagSet, found_at: usize) {
        for level in &self.levels[..found_at] {
            match level.set(key.clone(), value.clone(), None, tags.clone()) {
                Ok(()) => {
                    let mut stats = self.stats.lock();
                    stats.promotions = stats.promotions.saturating_add(1);
                    drop(stats);
                    debug!("Promoted key {:?} into {}", key, level.name());
                }
                Err(e) => self.record_failure(level.name(), "promote", &e),
            }
        }
    }

    /// Write to every level
    ///
    /// `ttl` overrides each level's default when given.
    pub fn set(&self, key: K, value: V, ttl: Option<Duration>, tags: TagSet) -> Result<()> {
        self.fan_out("set", |level| {
            level.set(key.clone(), value.clone(), ttl, tags.clone())
        })
        .map(|_| ())
    }

    /// Delete at every level; true if any level removed something
    pub fn delete(&self, key: &K) -> Result<bool> {
        let removed = self.fan_out("delete", |level| level.delete(key))?;
        Ok(removed.into_iter().any(|r| r))
    }

    /// Invalidate `tag` at every level; returns the summed removal count
    pub fn invalidate_tag(&self, tag: &str) -> Result<usize> {
        let counts = self.fan_out("invalidate_tag", |level| level.invalidate_tag(tag))?;
        let total: usize = counts.into_iter().sum();
        debug!("Invalidated tag {} across levels: {} entries", tag, total);
        Ok(total)
    }

    /// Drop expired entries at every level
    pub fn purge_expired(&self) -> Result<usize> {
        let counts = self.fan_out("purge_expired", |level| level.purge_expired())?;
        Ok(counts.into_iter().sum())
    }

    /// Drop every entry at every level
    pub fn clear(&self) -> Result<usize> {
        let counts = self.fan_out("clear", |level| level.clear())?;
        Ok(counts.into_iter().sum())
    }

    /// Which levels currently hold a live entry for `key`
    pub fn locate(&self, key: &K) -> Vec<String> {
        let _guard = self.op_lock.lock();

        self.levels
            .iter()
            .filter(|level| match level.contains(key) {
                Ok(found) => found,
                Err(e) => {
                    self.record_failure(level.name(), "contains", &e);
                    false
                }
            })
            .map(|level| level.name().to_string())
            .collect()
    }

    pub fn level_stats(&self) -> Vec<LevelStats> {
        self.levels.iter().map(|level| level.stats()).collect()
    }

    pub fn stats(&self) -> MultiLevelStats {
        *self.stats.lock()
    }

    /// Push every level's counters to `sink`
    pub fn report(&self, sink: &dyn MetricsSink) {
        for stats in self.level_stats() {
            sink.record(&stats.name, &stats.metrics);
        }
    }

    /// Apply `op` to each level in order, keeping per-level failures local
    ///
    /// Results of levels that failed are dropped; the authoritative level's error is
    /// returned after every level has been attempted.
    fn fan_out<R>(
        &self,
        op: &str,
        mut f: impl FnMut(&dyn CacheTier<K, V>) -> Result<R>,
    ) -> Result<Vec<R>> {
        let _guard = self.op_lock.lock();
        let mut results = Vec::with_capacity(self.levels.len());
        let mut authoritative_error = None;

        for (index, level) in self.levels.iter().enumerate() {
            match f(level.as_ref()) {
                Ok(result) => results.push(result),
                Err(e) if self.is_authoritative(index) => authoritative_error = Some(e),
                Err(e) => self.record_failure(level.name(), op, &e),
            }
        }

        match authoritative_error {
            Some(e) => {
                self.count_failure();
                warn!("Authoritative level {} failed {}: {}", self.authoritative(), op, e);
                Err(e)
            }
            None => Ok(results),
        }
    }

    fn is_authoritative(&self, index: usize) -> bool {
        index + 1 == self.levels.len()
    }

    fn record_failure(&self, level: &str, op: &str, err: &CacheError) {
        self.count_failure();
        warn!("Level {} failed {} (ignored): {}", level, op, err);
    }

    fn count_failure(&self) {
        let mut stats = self.stats.lock();
        stats.level_failures = stats.level_failures.saturating_add(1);
    }
}

impl<K, V> MultiLevelCache<K, V>
where
    K: Hash + Eq + Clone + Debug + Send + 'static,
    V: Clone + Send + 'static,
{
    /// Build in-memory LRU levels from configuration
    pub fn from_config(config: &CacheConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;

        let levels = config
            .levels
            .iter()
            .map(|level| -> Result<Arc<dyn CacheTier<K, V>>> {
                let cache = SingleLevelCache::with_clock(&level.name, level.capacity, clock.clone())?
                    .with_default_ttl(level.default_ttl());
                Ok(Arc::new(SharedLevel::new(cache)))
            })
            .collect::<Result<Vec<_>>>()?;

        Self::new(levels)
    }
}

impl<K, V> Sweep for MultiLevelCache<K, V>
where
    K: Clone + Debug + 'static,
    V: Clone + 'static,
{
    fn sweep(&self) -> Result<usize> {
        self.purge_expired()
    }
}
