use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use super::clock::{Clock, SystemClock};
use super::error::{CacheError, Result};
use super::policy::{EvictionPolicy, LruPolicy};
use super::tag_index::TagIndex;
use super::types::{Entry, TagSet};
use crate::metrics::{CacheMetrics, MetricsSnapshot};

/// Why an entry left the map
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Removal {
    Delete,
    Evict,
    Expire,
    TagInvalidation,
}

/// Bounded LRU/TTL store with tagged invalidation
///
/// Three structures move together on every mutation: the entry map, the eviction
/// policy's ordering, and the tag index. Methods take `&mut self`; share an instance
/// across threads through [`crate::cache::SharedLevel`].
pub struct SingleLevelCache<K, V, P = LruPolicy<K>>
where
    K: Hash + Eq,
{
    name: String,
    capacity: usize,
    default_ttl: Option<Duration>,
    entries: HashMap<K, Entry<V>>,
    policy: P,
    tags: TagIndex<K>,
    clock: Arc<dyn Clock>,
    metrics: CacheMetrics,
}

impl<K, V> SingleLevelCache<K, V, LruPolicy<K>>
where
    K: Hash + Eq + Clone + Debug + Send,
    V: Clone,
{
    /// Create an LRU level on the system clock
    pub fn new(name: impl Into<String>, capacity: usize) -> Result<Self> {
        Self::with_clock(name, capacity, Arc::new(SystemClock))
    }

    /// Create an LRU level on an injected clock
    pub fn with_clock(
        name: impl Into<String>,
        capacity: usize,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        Self::with_policy(name, capacity, LruPolicy::new(), clock)
    }
}

impl<K, V, P> SingleLevelCache<K, V, P>
where
    K: Hash + Eq + Clone + Debug,
    V: Clone,
    P: EvictionPolicy<K>,
{
    /// Create a level with an explicit policy; a capacity of 0 is rejected
    pub fn with_policy(
        name: impl Into<String>,
        capacity: usize,
        policy: P,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let name = name.into();
        if capacity == 0 {
            return Err(CacheError::InvalidCapacity(name));
        }

        info!("Initializing cache level '{}' with capacity={}", name, capacity);

        Ok(Self {
            name,
            capacity,
            default_ttl: None,
            entries: HashMap::with_capacity(capacity.min(4096)),
            policy,
            tags: TagIndex::new(),
            clock,
            metrics: CacheMetrics::new(),
        })
    }

    /// TTL applied by `set` when the caller passes none
    pub fn with_default_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.default_ttl = ttl;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn default_ttl(&self) -> Option<Duration> {
        self.default_ttl
    }

    /// Get value from cache
    ///
    /// An expired entry is removed on discovery and reported as a miss.
    pub fn get(&mut self, key: &K) -> Option<V> {
        self.get_entry(key).map(|entry| entry.value.clone())
    }

    /// Get value and its tags
    pub fn get_with_tags(&mut self, key: &K) -> Option<(V, TagSet)> {
        self.get_entry(key)
            .map(|entry| (entry.value.clone(), entry.tags.clone()))
    }

    fn get_entry(&mut self, key: &K) -> Option<&Entry<V>> {
        let now = self.clock.now();

        let expired = match self.entries.get(key) {
            Some(entry) => entry.is_expired_at(now),
            None => {
                self.metrics.record_miss();
                debug!("[{}] MISS key={:?}", self.name, key);
                return None;
            }
        };

        if expired {
            self.remove_entry(key, Removal::Expire);
            self.metrics.record_miss();
            debug!("[{}] EXPIRED key={:?}", self.name, key);
            return None;
        }

        self.policy.record_access(key);
        self.metrics.record_hit();
        debug!("[{}] HIT key={:?}", self.name, key);

        let entry = self.entries.get_mut(key)?;
        entry.touch(now);
        Some(&*entry)
    }

    /// Insert or replace a value
    ///
    /// `ttl` overrides the level default; a zero TTL stores an entry that the next read
    /// treats as expired. Capacity is restored before returning.
    pub fn set(&mut self, key: K, value: V, ttl: Option<Duration>, tags: TagSet) {
        let now = self.clock.now();
        let ttl = ttl.or(self.default_ttl);

        if let Some(previous) = self.entries.get(&key) {
            self.tags.detach_all(&key, &previous.tags);
        }

        self.tags.attach_all(&key, &tags);
        let is_new = self
            .entries
            .insert(key.clone(), Entry::new(value, ttl, tags, now))
            .is_none();
        if is_new {
            self.policy.record_insert(&key);
        } else {
            self.policy.record_access(&key);
        }

        debug!("[{}] SET key={:?}, ttl={:?}", self.name, key, ttl);

        while self.entries.len() > self.capacity {
            let Some(victim) = self.policy.select_victim() else {
                debug_assert!(false, "entries over capacity but policy tracks nothing");
                break;
            };
            debug!("[{}] EVICT key={:?}", self.name, victim);
            if !self.remove_entry(&victim, Removal::Evict) {
                // policy tracked a key the map no longer holds
                self.policy.record_removal(&victim);
            }
        }
    }

    /// Delete an entry; returns whether anything was removed
    pub fn delete(&mut self, key: &K) -> bool {
        let removed = self.remove_entry(key, Removal::Delete);
        if removed {
            debug!("[{}] DELETE key={:?}", self.name, key);
        }
        removed
    }

    /// Remove every entry carrying `tag`; returns how many were removed
    pub fn invalidate_tag(&mut self, tag: &str) -> usize {
        // snapshot first: removal mutates the bucket being read
        let keys = self.tags.keys_for_tag(tag);
        let mut count = 0;
        for key in &keys {
            debug_assert!(
                self.entries.contains_key(key),
                "tag '{}' references missing key {:?}",
                tag,
                key
            );
            if self.remove_entry(key, Removal::TagInvalidation) {
                count += 1;
            }
        }

        debug!("[{}] INVALIDATE tag={} removed={}", self.name, tag, count);
        count
    }

    /// Remove every expired entry; each removal counts as an eviction
    pub fn purge_expired(&mut self) -> usize {
        let now = self.clock.now();
        let expired: Vec<K> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect();

        let count = expired.len();
        if count > 0 {
            debug!("[{}] Cleaning up {} expired keys", self.name, count);
            for key in &expired {
                self.remove_entry(key, Removal::Expire);
            }
        }
        count
    }

    /// Invalidate (clear) entire level
    pub fn clear(&mut self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        self.policy.clear();
        self.tags.clear();

        debug!("[{}] INVALIDATE ALL ({} entries)", self.name, count);
        count
    }

    /// Whether a live entry exists; leaves ordering and metrics untouched
    pub fn contains(&self, key: &K) -> bool {
        let now = self.clock.now();
        self.entries
            .get(key)
            .is_some_and(|entry| !entry.is_expired_at(now))
    }

    /// Remaining TTL of a live entry; `None` if absent, expired, or without TTL
    pub fn remaining_ttl(&self, key: &K) -> Option<Duration> {
        let now = self.clock.now();
        self.entries
            .get(key)
            .filter(|entry| !entry.is_expired_at(now))
            .and_then(|entry| entry.remaining_ttl(now))
    }

    /// Tags of a live entry
    pub fn tags_of(&self, key: &K) -> Option<&TagSet> {
        let now = self.clock.now();
        self.entries
            .get(key)
            .filter(|entry| !entry.is_expired_at(now))
            .map(|entry| &entry.tags)
    }

    /// Snapshot of the keys currently carrying `tag`
    pub fn keys_for_tag(&self, tag: &str) -> Vec<K> {
        self.tags.keys_for_tag(tag)
    }

    /// Number of stored entries, expired ones not yet discovered included
    pub fn size(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn reset_metrics(&mut self) {
        self.metrics.reset();
    }

    /// Verify the map, ordering, and tag index agree
    ///
    /// Panics with a description of the first violation found.
    pub fn check_invariants(&self) {
        assert!(
            self.entries.len() <= self.capacity,
            "[{}] size {} exceeds capacity {}",
            self.name,
            self.entries.len(),
            self.capacity
        );
        assert_eq!(
            self.entries.len(),
            self.policy.len(),
            "[{}] policy tracks a different number of keys",
            self.name
        );
        for (key, entry) in &self.entries {
            assert!(
                self.policy.contains(key),
                "[{}] key {:?} missing from policy",
                self.name,
                key
            );
            for tag in &entry.tags {
                assert!(
                    self.tags.is_attached(tag, key),
                    "[{}] key {:?} missing from tag '{}'",
                    self.name,
                    key,
                    tag
                );
            }
        }
        for (tag, key) in self.tags.associations() {
            let carries = self
                .entries
                .get(key)
                .is_some_and(|entry| entry.tags.contains(tag));
            assert!(
                carries,
                "[{}] tag '{}' holds stale key {:?}",
                self.name, tag, key
            );
        }
    }

    fn remove_entry(&mut self, key: &K, reason: Removal) -> bool {
        let Some(entry) = self.entries.remove(key) else {
            return false;
        };
        self.policy.record_removal(key);
        self.tags.detach_all(key, &entry.tags);

        match reason {
            Removal::Evict | Removal::Expire => self.metrics.record_eviction(),
            Removal::TagInvalidation => self.metrics.record_tag_invalidation(),
            Removal::Delete => {}
        }
        true
    }
}
