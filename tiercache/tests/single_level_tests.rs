// Single level cache behavior: capacity, LRU order, TTL, tags

use std::sync::Arc;
use std::time::Duration;
use tiercache::{CacheError, ManualClock, SingleLevelCache, TagSet, tag_set};

fn cache_with_clock(capacity: usize) -> (SingleLevelCache<String, u64>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new());
    let cache = SingleLevelCache::with_clock("l0", capacity, clock.clone()).unwrap();
    (cache, clock)
}

fn k(i: usize) -> String {
    format!("key{}", i)
}

#[test]
fn test_capacity_never_exceeded() {
    let (mut cache, _) = cache_with_clock(5);

    for i in 0..100 {
        // mix fresh keys with rewrites of recent ones
        let key = if i % 3 == 0 { k(i / 2) } else { k(i) };
        cache.set(key, i as u64, None, tag_set([format!("g{}", i % 4)]));
        assert!(cache.size() <= cache.capacity());
        cache.check_invariants();
    }
}

#[test]
fn test_n_plus_one_inserts_evict_first() {
    let n = 10;
    let (mut cache, _) = cache_with_clock(n);

    for i in 0..=n {
        cache.set(k(i), i as u64, None, TagSet::new());
    }

    assert_eq!(cache.get(&k(0)), None);
    for i in 1..=n {
        assert_eq!(cache.get(&k(i)), Some(i as u64), "key{} should survive", i);
    }
    assert_eq!(cache.metrics().evictions, 1);
}

#[test]
fn test_accessed_oldest_survives_next_insert() {
    let n = 4;
    let (mut cache, _) = cache_with_clock(n);
    for i in 0..n {
        cache.set(k(i), i as u64, None, TagSet::new());
    }

    assert_eq!(cache.get(&k(0)), Some(0));
    cache.set(k(n), n as u64, None, TagSet::new());

    assert!(cache.contains(&k(0)), "recently read key must not be evicted");
    assert!(!cache.contains(&k(1)), "second-oldest key should be the victim");
}

#[test]
fn test_ttl_expiry_shrinks_live_size() {
    let (mut cache, clock) = cache_with_clock(8);
    cache.set(k(1), 1, Some(Duration::from_secs(5)), TagSet::new());
    cache.set(k(2), 2, None, TagSet::new());
    let before = cache.size();

    clock.advance(Duration::from_secs(6));
    assert_eq!(cache.get(&k(1)), None);
    assert_eq!(cache.size(), before - 1);
    assert_eq!(cache.get(&k(2)), Some(2));
}

#[test]
fn test_entry_readable_just_before_deadline() {
    let (mut cache, clock) = cache_with_clock(8);
    cache.set(k(1), 1, Some(Duration::from_millis(500)), TagSet::new());

    clock.advance(Duration::from_millis(499));
    assert_eq!(cache.get(&k(1)), Some(1));

    clock.advance(Duration::from_millis(1));
    assert_eq!(cache.get(&k(1)), None);
}

#[test]
fn test_tag_invalidation_is_complete() {
    let (mut cache, _) = cache_with_clock(16);
    for i in 0..6 {
        let tags = if i % 2 == 0 {
            tag_set(["X", "even"])
        } else {
            tag_set(["odd"])
        };
        cache.set(k(i), i as u64, None, tags);
    }

    assert_eq!(cache.invalidate_tag("X"), 3);
    assert!(cache.keys_for_tag("X").is_empty());
    assert!(cache.keys_for_tag("even").is_empty());
    for i in (0..6).step_by(2) {
        assert_eq!(cache.get(&k(i)), None);
    }
    assert_eq!(cache.keys_for_tag("odd").len(), 3);
    cache.check_invariants();
}

#[test]
fn test_invalidate_unknown_tag() {
    let (mut cache, _) = cache_with_clock(4);
    cache.set(k(0), 0, None, tag_set(["a"]));
    assert_eq!(cache.invalidate_tag("missing"), 0);
    assert_eq!(cache.size(), 1);
}

#[test]
fn test_retag_moves_key_between_tags() {
    let (mut cache, _) = cache_with_clock(4);
    cache.set(k(0), 1, None, tag_set(["first", "a"]));
    cache.set(k(0), 2, None, tag_set(["second"]));

    assert!(cache.keys_for_tag("first").is_empty());
    assert!(cache.keys_for_tag("a").is_empty());
    assert_eq!(cache.keys_for_tag("second"), vec![k(0)]);

    assert_eq!(cache.invalidate_tag("first"), 0);
    assert_eq!(cache.get(&k(0)), Some(2));
    assert_eq!(cache.invalidate_tag("second"), 1);
    assert_eq!(cache.get(&k(0)), None);
}

#[test]
fn test_set_then_get_returns_value() {
    let clock = Arc::new(ManualClock::new());
    let mut cache: SingleLevelCache<u32, Vec<u8>> =
        SingleLevelCache::with_clock("bytes", 4, clock).unwrap();

    cache.set(7, b"payload".to_vec(), Some(Duration::from_secs(60)), TagSet::new());
    assert_eq!(cache.get(&7), Some(b"payload".to_vec()));

    let metrics = cache.metrics();
    assert_eq!(metrics.hits, 1);
    assert_eq!(metrics.misses, 0);
}

#[test]
fn test_zero_capacity_is_configuration_error() {
    match SingleLevelCache::<String, u64>::new("bad", 0) {
        Err(err @ CacheError::InvalidCapacity(_)) => assert!(err.is_configuration()),
        Err(other) => panic!("unexpected error: {}", other),
        Ok(_) => panic!("capacity 0 must be rejected"),
    }
}
