use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use super::clock::Clock;

/// Tags attached to an entry; ordered so snapshots and logs are stable
pub type TagSet = BTreeSet<String>;

/// Build a [`TagSet`] from anything string-like
pub fn tag_set<I, S>(tags: I) -> TagSet
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    tags.into_iter().map(Into::into).collect()
}

/// One cached item with its metadata
#[derive(Debug, Clone)]
pub struct Entry<V> {
    /// Cached value
    pub value: V,
    /// Absolute expiry; `None` means no TTL
    pub expires_at: Option<Instant>,
    /// Tags used for bulk invalidation only
    pub tags: TagSet,
    /// Last successful read or write
    pub last_access: Instant,
}

impl<V> Entry<V> {
    /// Create an entry stamped at `now`; a zero TTL yields an already-expired entry
    pub fn new(value: V, ttl: Option<Duration>, tags: TagSet, now: Instant) -> Self {
        Self {
            value,
            expires_at: ttl.and_then(|ttl| now.checked_add(ttl)),
            tags,
            last_access: now,
        }
    }

    /// Check if the entry has expired
    pub fn is_expired(&self, clock: &dyn Clock) -> bool {
        self.is_expired_at(clock.now())
    }

    pub fn is_expired_at(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|expires| now >= expires)
    }

    /// Update access time
    pub fn touch(&mut self, now: Instant) {
        self.last_access = now;
    }

    /// Remaining time to live, saturating at zero
    pub fn remaining_ttl(&self, now: Instant) -> Option<Duration> {
        self.expires_at
            .map(|expires| expires.saturating_duration_since(now))
    }
}

/// Value found by a tier lookup, with the tags it carries at that tier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hit<V> {
    pub value: V,
    pub tags: TagSet,
}

/// Per-level view exposed for introspection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelStats {
    pub name: String,
    pub size: usize,
    pub capacity: usize,
    pub metrics: crate::metrics::MetricsSnapshot,
}
