use parking_lot::Mutex;
use std::fmt::Debug;
use std::hash::Hash;
use std::time::Duration;

use crate::core::error::Result;
use crate::core::level::SingleLevelCache;
use crate::core::policy::{EvictionPolicy, LruPolicy};
use crate::core::types::{Hit, LevelStats, TagSet};

/// One level of a [`super::MultiLevelCache`]
///
/// Every operation is fallible so levels backed by something other than memory can
/// report failures; the multi-level cache decides which failures to swallow.
pub trait CacheTier<K, V>: Send + Sync {
    /// Level name used in logs and metrics
    fn name(&self) -> &str;

    /// TTL applied when a write carries none
    fn default_ttl(&self) -> Option<Duration>;

    fn get(&self, key: &K) -> Result<Option<Hit<V>>>;

    fn set(&self, key: K, value: V, ttl: Option<Duration>, tags: TagSet) -> Result<()>;

    fn delete(&self, key: &K) -> Result<bool>;

    fn invalidate_tag(&self, tag: &str) -> Result<usize>;

    fn contains(&self, key: &K) -> Result<bool>;

    fn purge_expired(&self) -> Result<usize>;

    fn clear(&self) -> Result<usize>;

    fn stats(&self) -> LevelStats;
}

/// [`SingleLevelCache`] behind one coarse lock
///
/// Each public operation holds the lock for its whole duration, so the entry map, policy
/// ordering, and tag index are never observed half-updated.
pub struct SharedLevel<K, V, P = LruPolicy<K>>
where
    K: Hash + Eq,
{
    name: String,
    default_ttl: Option<Duration>,
    inner: Mutex<SingleLevelCache<K, V, P>>,
}

impl<K, V, P> SharedLevel<K, V, P>
where
    K: Hash + Eq + Clone + Debug,
    V: Clone,
    P: EvictionPolicy<K>,
{
    pub fn new(level: SingleLevelCache<K, V, P>) -> Self {
        Self {
            name: level.name().to_string(),
            default_ttl: level.default_ttl(),
            inner: Mutex::new(level),
        }
    }

    /// Run `f` with the level locked
    pub fn with_level<R>(&self, f: impl FnOnce(&mut SingleLevelCache<K, V, P>) -> R) -> R {
        let mut level = self.inner.lock();
        f(&mut level)
    }

    pub fn size(&self) -> usize {
        self.inner.lock().size()
    }
}

impl<K, V, P> CacheTier<K, V> for SharedLevel<K, V, P>
where
    K: Hash + Eq + Clone + Debug + Send,
    V: Clone + Send,
    P: EvictionPolicy<K>,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn default_ttl(&self) -> Option<Duration> {
        self.default_ttl
    }

    fn get(&self, key: &K) -> Result<Option<Hit<V>>> {
        let hit = self
            .inner
            .lock()
            .get_with_tags(key)
            .map(|(value, tags)| Hit { value, tags });
        Ok(hit)
    }

    fn set(&self, key: K, value: V, ttl: Option<Duration>, tags: TagSet) -> Result<()> {
        self.inner.lock().set(key, value, ttl, tags);
        Ok(())
    }

    fn delete(&self, key: &K) -> Result<bool> {
        Ok(self.inner.lock().delete(key))
    }

    fn invalidate_tag(&self, tag: &str) -> Result<usize> {
        Ok(self.inner.lock().invalidate_tag(tag))
    }

    fn contains(&self, key: &K) -> Result<bool> {
        Ok(self.inner.lock().contains(key))
    }

    fn purge_expired(&self) -> Result<usize> {
        Ok(self.inner.lock().purge_expired())
    }

    fn clear(&self) -> Result<usize> {
        Ok(self.inner.lock().clear())
    }

    fn stats(&self) -> LevelStats {
        let level = self.inner.lock();
        LevelStats {
            name: self.name.clone(),
            size: level.size(),
            capacity: level.capacity(),
            metrics: level.metrics(),
        }
    }
}
