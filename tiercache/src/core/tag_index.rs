use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use super::types::TagSet;

/// Tag -> keys mapping used for group invalidation
///
/// Buckets are dropped as soon as they become empty, so the number of tags tracked never
/// exceeds the number of tags actually in use.
#[derive(Debug)]
pub struct TagIndex<K: Hash + Eq> {
    buckets: HashMap<String, HashSet<K>>,
}

impl<K: Hash + Eq + Clone> TagIndex<K> {
    pub fn new() -> Self {
        Self {
            buckets: HashMap::new(),
        }
    }

    /// Add `key` to `tag`'s bucket; idempotent
    pub fn attach(&mut self, tag: &str, key: &K) {
        match self.buckets.get_mut(tag) {
            Some(keys) => {
                if !keys.contains(key) {
                    keys.insert(key.clone());
                }
            }
            None => {
                self.buckets
                    .insert(tag.to_string(), HashSet::from([key.clone()]));
            }
        }
    }

    /// Attach `key` to every tag in `tags`
    pub fn attach_all(&mut self, key: &K, tags: &TagSet) {
        for tag in tags {
            self.attach(tag, key);
        }
    }

    /// Remove `key` from `tag`'s bucket, dropping the bucket once empty
    pub fn detach(&mut self, tag: &str, key: &K) {
        if let Some(keys) = self.buckets.get_mut(tag) {
            keys.remove(key);
            if keys.is_empty() {
                self.buckets.remove(tag);
            }
        }
    }

    /// Detach `key` from every tag in `tags`
    pub fn detach_all(&mut self, key: &K, tags: &TagSet) {
        for tag in tags {
            self.detach(tag, key);
        }
    }

    /// Snapshot of the keys carrying `tag`; empty for unknown tags
    pub fn keys_for_tag(&self, tag: &str) -> Vec<K> {
        self.buckets
            .get(tag)
            .map(|keys| keys.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Whether `key` is in `tag`'s bucket
    pub fn is_attached(&self, tag: &str, key: &K) -> bool {
        self.buckets.get(tag).is_some_and(|keys| keys.contains(key))
    }

    /// Number of live tags
    pub fn tag_count(&self) -> usize {
        self.buckets.len()
    }

    /// Iterate over every (tag, key) association
    pub fn associations(&self) -> impl Iterator<Item = (&str, &K)> {
        self.buckets
            .iter()
            .flat_map(|(tag, keys)| keys.iter().map(move |key| (tag.as_str(), key)))
    }

    pub fn clear(&mut self) {
        self.buckets.clear();
    }
}

impl<K: Hash + Eq + Clone> Default for TagIndex<K> {
    fn default() -> Self {
        Self::new()
    }
}
