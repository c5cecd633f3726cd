//! # tiercache
//!
//! In-process LRU/TTL cache with tagged invalidation and multi-level promotion.
//!
//! ```text
//! get:  caller -> L0 -> L1 -> ... -> Ln   (hit at Li promotes into L0..Li-1)
//! set:  caller -> every level, each with its own default TTL
//! tag:  caller -> every level's tag index -> affected keys removed
//! ```
//!
//! ```rust
//! use std::sync::Arc;
//! use tiercache::{CacheConfig, MultiLevelCache, SystemClock, tag_set};
//!
//! let cache: MultiLevelCache<String, String> =
//!     MultiLevelCache::from_config(&CacheConfig::default(), Arc::new(SystemClock)).unwrap();
//!
//! cache
//!     .set("user:1".into(), "alice".into(), None, tag_set(["users"]))
//!     .unwrap();
//! assert_eq!(cache.get(&"user:1".into()).unwrap(), Some("alice".to_string()));
//!
//! assert_eq!(cache.invalidate_tag("users").unwrap(), 2);
//! assert_eq!(cache.get(&"user:1".into()).unwrap(), None);
//! ```

pub mod cache;
pub mod config;
pub mod core;
pub mod metrics;

// Re-export commonly used types
pub use crate::cache::{CacheTier, ExpirySweeper, MultiLevelCache, MultiLevelStats, SharedLevel, Sweep};
pub use crate::config::{CacheConfig, LevelConfig, LoggingConfig};
pub use crate::core::{
    CacheError, Clock, Entry, EvictionPolicy, Hit, LevelStats, LruPolicy, ManualClock, Result,
    SingleLevelCache, SystemClock, TagIndex, TagSet, tag_set,
};
pub use crate::metrics::{CacheMetrics, MetricsSink, MetricsSnapshot, PrometheusSink, TracingSink};
