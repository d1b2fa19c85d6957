//! Expiry Sweeper Task
//!
//! Background task that periodically reclaims expired cache entries,
//! independent of read traffic.

use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::MemoCache;
use crate::error::{CacheError, CacheResult};

/// Handle to a running sweeper.
///
/// `stop` shuts the task down and waits for it. Dropping the handle without
/// calling `stop` also ends the task at its next wake-up.
#[derive(Debug)]
pub struct SweeperHandle {
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<u64>,
}

impl SweeperHandle {
    /// Signals the sweeper to stop and waits for it to finish.
    ///
    /// Returns the total number of entries the sweeper reclaimed.
    pub async fn stop(mut self) -> u64 {
        if let Some(shutdown) = self.shutdown.take() {
            // The task may already be gone; nothing to signal then.
            let _ = shutdown.send(());
        }

        match (&mut self.task).await {
            Ok(reclaimed) => reclaimed,
            Err(err) => {
                warn!("Sweeper task ended abnormally: {}", err);
                0
            }
        }
    }
}

/// Spawns the background sweeper for `cache`.
///
/// Every `interval` the sweeper removes expired entries in batches of at most
/// `batch_size`, releasing the cache lock and yielding between batches so
/// request handlers are never blocked behind a long sweep. The first sweep
/// runs one interval after start.
///
/// # Errors
/// - `SweeperRunning` if this cache already has a sweeper
/// - `InvalidArgument` for a zero interval or batch size
///
/// Must be called from within a tokio runtime.
///
/// # Example
/// ```ignore
/// let cache = MemoCache::<Summary>::new(Duration::from_secs(60));
/// let sweeper = spawn_sweeper(cache.clone(), Duration::from_secs(300), 1024)?;
/// // Later, during shutdown:
/// sweeper.stop().await;
/// ```
pub fn spawn_sweeper<V>(
    cache: MemoCache<V>,
    interval: Duration,
    batch_size: usize,
) -> CacheResult<SweeperHandle>
where
    V: Clone + Send + 'static,
{
    if interval.is_zero() {
        return Err(CacheError::InvalidArgument(
            "sweep interval must be positive".to_string(),
        ));
    }
    if batch_size == 0 {
        return Err(CacheError::InvalidArgument(
            "sweep batch size must be positive".to_string(),
        ));
    }
    let claim = cache.claim_sweeper().ok_or(CacheError::SweeperRunning)?;
    let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

    let task = tokio::spawn(async move {
        // Held for the task's lifetime so the cache can take a new sweeper afterwards
        let _claim = claim;
        info!(
            "Starting expiry sweeper with interval of {:?}, batch size {}",
            interval, batch_size
        );

        let mut reclaimed: u64 = 0;
        loop {
            tokio::select! {
                _ = &mut shutdown_rx => break,
                _ = tokio::time::sleep(interval) => {}
            }

            let removed = sweep(&cache, batch_size).await;
            reclaimed += removed as u64;

            if removed > 0 {
                info!("Expiry sweep: removed {} expired entries", removed);
            } else {
                debug!("Expiry sweep: no expired entries found");
            }
        }

        info!("Expiry sweeper stopped after reclaiming {} entries", reclaimed);
        reclaimed
    });

    Ok(SweeperHandle {
        shutdown: Some(shutdown_tx),
        task,
    })
}

/// Runs one sweep: batches until a batch comes back short.
///
/// Each batch runs on the blocking pool, so waiting for the lock never
/// stalls a runtime worker.
async fn sweep<V>(cache: &MemoCache<V>, batch_size: usize) -> usize
where
    V: Clone + Send + 'static,
{
    let mut total = 0;
    loop {
        let removed = cache.cleanup_batch_blocking(batch_size).await;
        total += removed;
        if removed < batch_size {
            return total;
        }
        tokio::task::yield_now().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{generate_key, KeyParams, ManualClock};
    use std::sync::Arc;

    fn cache_with_clock() -> (MemoCache<String>, ManualClock) {
        let clock = ManualClock::new(0);
        let cache = MemoCache::with_clock(Duration::from_secs(300), Arc::new(clock.clone()));
        (cache, clock)
    }

    #[tokio::test]
    async fn test_sweeper_removes_expired_entries() {
        let (cache, clock) = cache_with_clock();
        cache
            .set("expire_soon", "value".to_string(), Some(Duration::from_secs(1)))
            .unwrap();
        cache
            .set("long_lived", "value".to_string(), Some(Duration::from_secs(3600)))
            .unwrap();
        clock.advance(Duration::from_secs(2));

        let handle = spawn_sweeper(cache.clone(), Duration::from_millis(20), 16).unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;

        // Reclaimed without any read touching it
        let stats = cache.stats().unwrap();
        assert_eq!(stats.size, 1);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.expirations, 1);
        assert_eq!(cache.get("long_lived").unwrap(), Some("value".to_string()));

        assert_eq!(handle.stop().await, 1);
    }

    #[tokio::test]
    async fn test_sweeper_prunes_owner_index() {
        let (cache, clock) = cache_with_clock();
        let key = generate_key("summary", &KeyParams::new().with("userId", "u1")).unwrap();
        cache
            .set_owned("u1", &key, "v".to_string(), Some(Duration::from_secs(1)))
            .unwrap();
        clock.advance(Duration::from_secs(1));

        let handle = spawn_sweeper(cache.clone(), Duration::from_millis(20), 16).unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(cache.indexed_keys().unwrap(), 0);
        handle.stop().await;
    }

    #[tokio::test]
    async fn test_sweeper_drains_in_batches() {
        let (cache, clock) = cache_with_clock();
        for i in 0..100 {
            cache
                .set(format!("k{}", i), "v".to_string(), Some(Duration::from_secs(1)))
                .unwrap();
        }
        clock.advance(Duration::from_secs(1));

        let handle = spawn_sweeper(cache.clone(), Duration::from_millis(20), 7).unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(cache.stats().unwrap().size, 0);
        assert_eq!(handle.stop().await, 100);
    }

    #[tokio::test]
    async fn test_only_one_sweeper_per_cache() {
        let (cache, _) = cache_with_clock();

        let first = spawn_sweeper(cache.clone(), Duration::from_secs(60), 16).unwrap();
        let second = spawn_sweeper(cache.clone(), Duration::from_secs(60), 16);
        assert!(matches!(second, Err(CacheError::SweeperRunning)));

        first.stop().await;
        assert!(!cache.has_sweeper());

        let third = spawn_sweeper(cache.clone(), Duration::from_secs(60), 16).unwrap();
        third.stop().await;
    }

    #[tokio::test]
    async fn test_stop_is_prompt() {
        let (cache, _) = cache_with_clock();
        let handle = spawn_sweeper(cache, Duration::from_secs(3600), 16).unwrap();

        let stopped = tokio::time::timeout(Duration::from_secs(1), handle.stop()).await;
        assert_eq!(stopped.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_dropping_handle_ends_task() {
        let (cache, _) = cache_with_clock();
        let handle = spawn_sweeper(cache.clone(), Duration::from_secs(3600), 16).unwrap();
        drop(handle);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!cache.has_sweeper());
    }

    #[test]
    fn test_rejects_zero_interval_and_batch() {
        let (cache, _) = cache_with_clock();
        // Validation happens before spawning, so no runtime is needed
        assert!(matches!(
            spawn_sweeper(cache.clone(), Duration::ZERO, 16),
            Err(CacheError::InvalidArgument(_))
        ));
        assert!(matches!(
            spawn_sweeper(cache, Duration::from_secs(1), 0),
            Err(CacheError::InvalidArgument(_))
        ));
    }
}
