// Background TTL sweep against a full multi-level cache

use std::sync::Arc;
use std::time::Duration;
use tiercache::{
    CacheConfig, ExpirySweeper, ManualClock, MultiLevelCache, Sweep, TagSet, tag_set,
};

// tokio time is paused in the async tests, so sleeps advance the clock deterministically

fn config() -> CacheConfig {
    CacheConfig::from_yaml_str(
        r#"
levels:
  - name: l1
    capacity: 8
    default_ttl_secs: 5
  - name: l2
    capacity: 64
    default_ttl_secs: 50
sweep_interval_ms: 10
"#,
    )
    .unwrap()
}

fn build(clock: &Arc<ManualClock>) -> Arc<MultiLevelCache<String, i32>> {
    Arc::new(MultiLevelCache::from_config(&config(), clock.clone()).unwrap())
}

#[test]
fn test_sweep_purges_each_level_independently() {
    let clock = Arc::new(ManualClock::new());
    let cache = build(&clock);
    cache.set("a".to_string(), 1, None, tag_set(["t"])).unwrap();
    cache.set("b".to_string(), 2, None, TagSet::new()).unwrap();

    clock.advance(Duration::from_secs(6));
    assert_eq!(cache.sweep().unwrap(), 2);

    let stats = cache.level_stats();
    assert_eq!(stats[0].size, 0);
    assert_eq!(stats[0].metrics.evictions, 2);
    assert_eq!(stats[1].size, 2);

    clock.advance(Duration::from_secs(60));
    assert_eq!(cache.sweep().unwrap(), 2);
    assert_eq!(cache.invalidate_tag("t").unwrap(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_sweeper_runs_in_background() {
    let clock = Arc::new(ManualClock::new());
    let cache = build(&clock);
    cache.set("a".to_string(), 1, None, TagSet::new()).unwrap();

    let sweeper = ExpirySweeper::start(&cache, Duration::from_millis(10)).unwrap();
    assert_eq!(sweeper.interval(), Duration::from_millis(10));

    clock.advance(Duration::from_secs(100));
    tokio::time::sleep(Duration::from_millis(100)).await;

    for stats in cache.level_stats() {
        assert_eq!(stats.size, 0, "{} should be empty", stats.name);
    }

    sweeper.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_stopped_sweeper_leaves_entries_alone() {
    let clock = Arc::new(ManualClock::new());
    let cache = build(&clock);

    let sweeper = ExpirySweeper::start(&cache, Duration::from_millis(10)).unwrap();
    sweeper.stop().await;

    cache.set("a".to_string(), 1, None, TagSet::new()).unwrap();
    clock.advance(Duration::from_secs(100));
    tokio::time::sleep(Duration::from_millis(50)).await;

    // still stored, only discovered as expired on read
    assert_eq!(cache.level_stats()[1].size, 1);
    assert_eq!(cache.get(&"a".to_string()).unwrap(), None);
    assert_eq!(cache.level_stats()[1].size, 0);
}

#[tokio::test(start_paused = true)]
async fn test_dropping_sweeper_aborts_task() {
    let clock = Arc::new(ManualClock::new());
    let cache = build(&clock);
    let sweeper = ExpirySweeper::start(&cache, Duration::from_millis(10)).unwrap();
    drop(sweeper);

    cache.set("a".to_string(), 1, None, TagSet::new()).unwrap();
    clock.advance(Duration::from_secs(100));
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(cache.level_stats()[0].size, 1);
}

#[tokio::test(start_paused = true)]
async fn test_sweeper_from_config_uses_interval() {
    let clock = Arc::new(ManualClock::new());
    let cache = build(&clock);
    cache.set("a".to_string(), 1, None, TagSet::new()).unwrap();

    let sweeper = ExpirySweeper::from_config(&cache, &config())
        .unwrap()
        .expect("interval is configured");
    assert_eq!(sweeper.interval(), Duration::from_millis(10));

    clock.advance(Duration::from_secs(100));
    tokio::time::sleep(Duration::from_millis(25)).await;

    assert_eq!(cache.level_stats()[1].size, 0);
    sweeper.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_sweeper_from_config_disabled_without_interval() {
    let clock = Arc::new(ManualClock::new());
    let mut config = config();
    config.sweep_interval_ms = None;
    let cache: Arc<MultiLevelCache<String, i32>> =
        Arc::new(MultiLevelCache::from_config(&config, clock).unwrap());

    assert!(ExpirySweeper::from_config(&cache, &config).unwrap().is_none());
}
