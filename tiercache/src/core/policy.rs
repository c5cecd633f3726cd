//! Eviction policies
//!
//! A policy only tracks ordering; the owning cache decides when to evict and must call
//! [`EvictionPolicy::record_removal`] for the victim it removes.

use lru::LruCache;
use std::hash::Hash;

/// Ordering bookkeeping kept in lock-step with a cache level's entry map
pub trait EvictionPolicy<K>: Send {
    /// Start tracking `key` as most recently used; an already-tracked key is refreshed
    fn record_insert(&mut self, key: &K);

    /// Mark `key` as most recently used; unknown keys are ignored
    fn record_access(&mut self, key: &K);

    /// Stop tracking `key`; unknown keys are ignored
    fn record_removal(&mut self, key: &K);

    /// Next key to evict, without changing the ordering
    fn select_victim(&self) -> Option<K>;

    /// Whether `key` is tracked
    fn contains(&self, key: &K) -> bool;

    /// Number of tracked keys
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forget every key
    fn clear(&mut self);
}

/// Least Recently Used ordering
///
/// Backed by an unbounded [`LruCache`] used purely as an access-ordered list, so every
/// operation is O(1). Keys touched in the same logical step keep insertion order, which
/// makes the oldest insert the victim among equals.
pub struct LruPolicy<K: Hash + Eq> {
    order: LruCache<K, ()>,
}

impl<K: Hash + Eq> LruPolicy<K> {
    pub fn new() -> Self {
        Self {
            order: LruCache::unbounded(),
        }
    }

    /// Keys from least to most recently used
    pub fn keys_lru_first(&self) -> impl Iterator<Item = &K> {
        self.order.iter().rev().map(|(key, _)| key)
    }
}

impl<K: Hash + Eq> Default for LruPolicy<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Hash + Eq + Clone + Send> EvictionPolicy<K> for LruPolicy<K> {
    fn record_insert(&mut self, key: &K) {
        if self.order.contains(key) {
            self.order.promote(key);
        } else {
            self.order.put(key.clone(), ());
        }
    }

    fn record_access(&mut self, key: &K) {
        // promote is a no-op for untracked keys
        self.order.promote(key);
    }

    fn record_removal(&mut self, key: &K) {
        self.order.pop(key);
    }

    fn select_victim(&self) -> Option<K> {
        self.order.peek_lru().map(|(key, _)| key.clone())
    }

    fn contains(&self, key: &K) -> bool {
        self.order.contains(key)
    }

    fn len(&self) -> usize {
        self.order.len()
    }

    fn clear(&mut self) {
        self.order.clear();
    }
}
