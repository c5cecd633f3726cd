//! Background TTL sweep
//!
//! Expired entries are always discovered lazily on read; the sweeper additionally frees
//! them on a fixed interval. The task is owned by an [`ExpirySweeper`] handle: `stop`
//! signals it and waits for it to finish, dropping the handle aborts it, and the task
//! exits on its own once the swept cache is dropped.

use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::tier::SharedLevel;
use crate::config::CacheConfig;
use crate::core::error::{CacheError, Result};
use crate::core::policy::EvictionPolicy;

/// Something whose expired entries can be purged in one call
pub trait Sweep: Send + Sync + 'static {
    /// Remove expired entries, returning how many were removed
    fn sweep(&self) -> Result<usize>;
}

impl<K, V, P> Sweep for SharedLevel<K, V, P>
where
    K: std::hash::Hash + Eq + Clone + std::fmt::Debug + Send + 'static,
    V: Clone + Send + 'static,
    P: EvictionPolicy<K> + 'static,
{
    fn sweep(&self) -> Result<usize> {
        Ok(self.with_level(|level| level.purge_expired()))
    }
}

/// Handle to a running sweep task
pub struct ExpirySweeper {
    interval: Duration,
    stop_tx: watch::Sender<bool>,
    handle: Option<JoinHandle<()>>,
}

impl ExpirySweeper {
    /// Start sweeping `target` every `interval`
    ///
    /// Must be called from within a tokio runtime. The task holds only a weak
    /// reference, so it never keeps the cache alive.
    pub fn start<T: Sweep>(target: &Arc<T>, interval: Duration) -> Result<Self> {
        if interval.is_zero() {
            return Err(CacheError::InvalidConfig(
                "sweep interval must be greater than 0".to_string(),
            ));
        }

        info!("Starting TTL sweep task (interval={}ms)", interval.as_millis());

        let weak = Arc::downgrade(target);
        let (stop_tx, stop_rx) = watch::channel(false);
        let handle = tokio::spawn(Self::run(weak, interval, stop_rx));

        Ok(Self {
            interval,
            stop_tx,
            handle: Some(handle),
        })
    }

    /// Start a sweeper at the configured interval
    ///
    /// Returns `None` when the configuration leaves `sweep_interval_ms` unset.
    pub fn from_config<T: Sweep>(target: &Arc<T>, config: &CacheConfig) -> Result<Option<Self>> {
        match config.sweep_interval() {
            Some(interval) => Self::start(target, interval).map(Some),
            None => {
                debug!("No sweep interval configured, TTL sweep disabled");
                Ok(None)
            }
        }
    }

    async fn run<T: Sweep>(target: Weak<T>, interval: Duration, mut stop_rx: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // first tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let Some(cache) = target.upgrade() else {
                        debug!("Swept cache dropped, stopping TTL sweep task");
                        break;
                    };
                    match cache.sweep() {
                        Ok(0) => {}
                        Ok(count) => debug!("TTL sweep removed {} expired entries", count),
                        Err(e) => warn!("TTL sweep failed: {}", e),
                    }
                }
                changed = stop_rx.changed() => {
                    if changed.is_err() || *stop_rx.borrow() {
                        info!("TTL sweep task stopped");
                        break;
                    }
                }
            }
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Whether the task is still running
    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Signal the task to stop and wait for it to exit
    pub async fn stop(mut self) {
        // the task may already have exited and dropped its receiver
        let _ = self.stop_tx.send(true);
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                warn!("TTL sweep task ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for ExpirySweeper {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::ManualClock;
    use crate::core::level::SingleLevelCache;
    use crate::core::types::TagSet;

    #[tokio::test(start_paused = true)]
    async fn test_zero_interval_rejected() {
        let level = Arc::new(SharedLevel::new(
            SingleLevelCache::<String, i32>::new("l1", 4).unwrap(),
        ));
        assert!(ExpirySweeper::start(&level, Duration::ZERO).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_purges_and_stops() {
        let clock = Arc::new(ManualClock::new());
        let level = Arc::new(SharedLevel::new(
            SingleLevelCache::<String, i32>::with_clock("l1", 4, clock.clone()).unwrap(),
        ));
        level.with_level(|l| {
            l.set("a".to_string(), 1, Some(Duration::from_secs(1)), TagSet::new())
        });

        let sweeper = ExpirySweeper::start(&level, Duration::from_millis(10)).unwrap();
        clock.advance(Duration::from_secs(2));
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(level.size(), 0);
        assert!(sweeper.is_running());
        sweeper.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_task_exits_when_cache_dropped() {
        let level = Arc::new(SharedLevel::new(
            SingleLevelCache::<String, i32>::new("l1", 4).unwrap(),
        ));
        let sweeper = ExpirySweeper::start(&level, Duration::from_millis(10)).unwrap();
        drop(level);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!sweeper.is_running());
        sweeper.stop().await;
    }
}
