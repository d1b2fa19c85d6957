//! Shared Cache Module
//!
//! Thread-safe handle over a `CacheStore`, shared by request handlers and the
//! background sweeper.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, MutexGuard};

use crate::cache::{CacheKey, CacheStats, CacheStore, Clock, SystemClock};
use crate::config::Config;
use crate::error::{CacheError, CacheResult};

/// Default bound on waiting for the store lock.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

// == Memo Cache ==
/// Cloneable handle to one shared cache.
///
/// Every operation takes the single store lock for its whole duration, so
/// map, expiry queue, owner index and counters always change together.
/// Clones share the same store.
///
/// Locking blocks the calling thread for at most the lock timeout
/// (`LOCK_TIMEOUT_MS`, 5 s by default). Request-path operations hold the lock
/// for O(1) work and the sweeper for at most one batch, so in practice waits
/// are short; a timeout surfaces as `Unavailable`. Async callers of the
/// O(n) maintenance operations should use the `*_blocking` variants, which
/// run on tokio's blocking pool instead of a runtime worker.
#[derive(Debug)]
pub struct MemoCache<V> {
    store: Arc<Mutex<CacheStore<V>>>,
    lock_timeout: Duration,
    sweeper_active: Arc<AtomicBool>,
}

impl<V> Clone for MemoCache<V> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            lock_timeout: self.lock_timeout,
            sweeper_active: Arc::clone(&self.sweeper_active),
        }
    }
}

impl<V: Clone> MemoCache<V> {
    // == Constructors ==
    /// Creates a cache on wall-clock time.
    pub fn new(default_ttl: Duration) -> Self {
        Self::with_clock(default_ttl, Arc::new(SystemClock))
    }

    /// Creates a cache driven by the given clock.
    pub fn with_clock(default_ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            store: Arc::new(Mutex::new(CacheStore::with_clock(default_ttl, clock))),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            sweeper_active: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Creates a cache from configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.default_ttl()).with_lock_timeout(config.lock_timeout())
    }

    /// Overrides how long operations wait for the store lock.
    pub fn with_lock_timeout(mut self, lock_timeout: Duration) -> Self {
        self.lock_timeout = lock_timeout;
        self
    }

    fn try_lock(&self, op: &str) -> CacheResult<MutexGuard<'_, CacheStore<V>>> {
        self.store.try_lock_for(self.lock_timeout).ok_or_else(|| {
            CacheError::Unavailable(format!(
                "{} could not acquire the cache lock within {:?}",
                op, self.lock_timeout
            ))
        })
    }

    /// Lock for maintenance operations, where a stuck lock means a bug
    /// (deadlock or a wedged sweeper) rather than a recoverable condition.
    fn lock_or_abort(&self, op: &str) -> MutexGuard<'_, CacheStore<V>> {
        match self.store.try_lock_for(self.lock_timeout) {
            Some(guard) => guard,
            None => panic!(
                "{} could not acquire the cache lock within {:?}; cache is deadlocked",
                op, self.lock_timeout
            ),
        }
    }

    // == Get ==
    /// Returns a copy of the live value under `key`, if any.
    pub fn get(&self, key: &str) -> CacheResult<Option<V>> {
        Ok(self.try_lock("get")?.get(key))
    }

    // == Set ==
    /// Stores `value` under `key`. `None` uses the default TTL.
    pub fn set(
        &self,
        key: impl Into<String>,
        value: V,
        ttl: Option<Duration>,
    ) -> CacheResult<()> {
        self.try_lock("set")?.set(key, value, ttl)
    }

    /// Stores `value` on behalf of `owner`. Storage and owner registration
    /// happen under one lock acquisition.
    pub fn set_owned(
        &self,
        owner: &str,
        key: &CacheKey,
        value: V,
        ttl: Option<Duration>,
    ) -> CacheResult<()> {
        self.try_lock("set_owned")?.set_owned(owner, key, value, ttl)
    }

    /// Stores `value` on behalf of `owner` unless the owner was invalidated
    /// after `generation` was read. Returns whether the value was stored.
    pub fn set_owned_if_current(
        &self,
        owner: &str,
        key: &CacheKey,
        value: V,
        ttl: Option<Duration>,
        generation: u64,
    ) -> CacheResult<bool> {
        self.try_lock("set_owned")?
            .set_owned_if_current(owner, key, value, ttl, generation)
    }

    /// Reads `owner`'s invalidation generation. Read it before computing a
    /// value derived from the owner's data.
    pub fn owner_generation(&self, owner: &str) -> CacheResult<u64> {
        Ok(self.try_lock("owner_generation")?.owner_generation(owner))
    }

    // == Delete ==
    pub fn delete(&self, key: &str) -> CacheResult<bool> {
        Ok(self.try_lock("delete")?.delete(key))
    }

    // == Invalidate ==
    /// Removes every entry cached on behalf of `owner`.
    pub fn invalidate(&self, owner: &str) -> CacheResult<usize> {
        Ok(self.try_lock("invalidate")?.invalidate(owner))
    }

    /// Removes the entries cached on behalf of `owner` in one namespace.
    pub fn invalidate_namespace(&self, owner: &str, namespace: &str) -> CacheResult<usize> {
        Ok(self.try_lock("invalidate")?.invalidate_namespace(owner, namespace))
    }

    // == Maintenance ==
    /// Removes every entry and resets counters.
    ///
    /// # Panics
    /// If the lock cannot be taken within the lock timeout.
    pub fn clear(&self) {
        self.lock_or_abort("clear").clear();
    }

    /// Removes all expired entries, returning how many were removed.
    ///
    /// # Panics
    /// If the lock cannot be taken within the lock timeout.
    pub fn cleanup(&self) -> usize {
        self.lock_or_abort("cleanup").cleanup()
    }

    /// Removes up to `max` expired entries under one lock acquisition.
    ///
    /// # Panics
    /// If the lock cannot be taken within the lock timeout.
    pub fn cleanup_batch(&self, max: usize) -> usize {
        self.lock_or_abort("cleanup").cleanup_batch(max)
    }

    // == Stats ==
    pub fn stats(&self) -> CacheResult<CacheStats> {
        Ok(self.try_lock("stats")?.stats())
    }

    /// Total owner registrations across all owners.
    pub fn indexed_keys(&self) -> CacheResult<usize> {
        Ok(self.try_lock("stats")?.indexed_keys())
    }

    pub fn default_ttl(&self) -> CacheResult<Duration> {
        Ok(self.try_lock("default_ttl")?.default_ttl())
    }

    // == Sweeper Claim ==
    /// Marks this cache as having a sweeper. Returns `None` if one is already attached.
    pub(crate) fn claim_sweeper(&self) -> Option<SweeperClaim> {
        self.sweeper_active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| SweeperClaim {
                flag: Arc::clone(&self.sweeper_active),
            })
    }

    #[cfg(test)]
    pub(crate) fn lock_for_test(&self) -> MutexGuard<'_, CacheStore<V>> {
        self.store.lock()
    }

    /// Whether a sweeper is currently attached.
    pub fn has_sweeper(&self) -> bool {
        self.sweeper_active.load(Ordering::Acquire)
    }
}

impl<V: Clone + Send + 'static> MemoCache<V> {
    // == Blocking Pool Maintenance ==
    /// `clear` run on the blocking pool.
    ///
    /// # Panics
    /// If the lock cannot be taken within the lock timeout.
    pub async fn clear_blocking(&self) {
        self.run_blocking(|cache| cache.clear()).await
    }

    /// `cleanup_batch` run on the blocking pool.
    ///
    /// # Panics
    /// If the lock cannot be taken within the lock timeout.
    pub async fn cleanup_batch_blocking(&self, max: usize) -> usize {
        self.run_blocking(move |cache| cache.cleanup_batch(max)).await
    }

    async fn run_blocking<R, F>(&self, op: F) -> R
    where
        R: Send + 'static,
        F: FnOnce(&Self) -> R + Send + 'static,
    {
        let cache = self.clone();
        match tokio::task::spawn_blocking(move || op(&cache)).await {
            Ok(result) => result,
            // A deadlocked store stays fatal for the caller
            Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
            Err(err) => panic!("cache maintenance task did not run: {}", err),
        }
    }
}

/// Released when the sweeper task ends, however it ends.
#[derive(Debug)]
pub(crate) struct SweeperClaim {
    flag: Arc<AtomicBool>,
}

impl Drop for SweeperClaim {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{generate_key, KeyParams, ManualClock};
    use std::thread;

    fn cache_with_clock() -> (MemoCache<u64>, ManualClock) {
        let clock = ManualClock::new(0);
        let cache = MemoCache::with_clock(Duration::from_secs(60), Arc::new(clock.clone()));
        (cache, clock)
    }

    #[test]
    fn test_clones_share_store() {
        let (cache, _) = cache_with_clock();
        let other = cache.clone();

        cache.set("k", 7, None).unwrap();
        assert_eq!(other.get("k").unwrap(), Some(7));
    }

    #[test]
    fn test_lock_timeout_reports_unavailable() {
        let (cache, _) = cache_with_clock();
        let cache = cache.with_lock_timeout(Duration::from_millis(20));

        let _held = cache.store.lock();
        let other = cache.clone();
        let result = thread::spawn(move || other.get("k")).join().unwrap();

        assert!(matches!(result, Err(CacheError::Unavailable(_))));
    }

    #[test]
    #[should_panic(expected = "deadlocked")]
    fn test_cleanup_lock_timeout_is_fatal() {
        let (cache, _) = cache_with_clock();
        let cache = cache.with_lock_timeout(Duration::from_millis(10));

        let _held = cache.store.lock();
        // parking_lot mutexes are not reentrant, so this times out
        cache.cleanup();
    }

    #[tokio::test]
    async fn test_blocking_maintenance() {
        let (cache, clock) = cache_with_clock();
        cache.set("a", 1, Some(Duration::from_secs(1))).unwrap();
        cache.set("b", 2, Some(Duration::from_secs(1))).unwrap();
        cache.set("c", 3, None).unwrap();
        clock.advance(Duration::from_secs(1));

        assert_eq!(cache.cleanup_batch_blocking(1).await, 1);
        assert_eq!(cache.cleanup_batch_blocking(10).await, 1);

        cache.clear_blocking().await;
        assert_eq!(cache.stats().unwrap().size, 0);
    }

    #[tokio::test]
    #[should_panic(expected = "deadlocked")]
    async fn test_blocking_cleanup_lock_timeout_stays_fatal() {
        let (cache, _) = cache_with_clock();
        let cache = cache.with_lock_timeout(Duration::from_millis(10));

        let _held = cache.store.lock();
        cache.cleanup_batch_blocking(8).await;
    }

    #[test]
    fn test_stale_set_refused_after_invalidate() {
        let (cache, _) = cache_with_clock();
        let key = generate_key("summary", &KeyParams::new().with("userId", "u1")).unwrap();

        let generation = cache.owner_generation("u1").unwrap();
        cache.invalidate("u1").unwrap();
        assert!(!cache.set_owned_if_current("u1", &key, 1, None, generation).unwrap());
        assert_eq!(cache.get(key.as_str()).unwrap(), None);
    }

    #[test]
    fn test_sweeper_claim_is_exclusive() {
        let (cache, _) = cache_with_clock();

        let claim = cache.claim_sweeper().expect("first claim");
        assert!(cache.has_sweeper());
        assert!(cache.clone().claim_sweeper().is_none());

        drop(claim);
        assert!(!cache.has_sweeper());
        assert!(cache.claim_sweeper().is_some());
    }

    #[test]
    fn test_invalidate_through_handle() {
        let (cache, clock) = cache_with_clock();
        let key = generate_key("summary", &KeyParams::new().with("userId", "u1")).unwrap();

        cache.set_owned("u1", &key, 1, Some(Duration::from_secs(5))).unwrap();
        assert_eq!(cache.indexed_keys().unwrap(), 1);
        assert_eq!(cache.invalidate("u1").unwrap(), 1);
        assert_eq!(cache.get(key.as_str()).unwrap(), None);

        cache.set_owned("u1", &key, 2, Some(Duration::from_secs(5))).unwrap();
        clock.advance(Duration::from_secs(5));
        assert_eq!(cache.cleanup(), 1);
        assert_eq!(cache.indexed_keys().unwrap(), 0);
    }

    #[test]
    fn test_concurrent_writers_and_readers_keep_counts() {
        let (cache, _) = cache_with_clock();
        let writers = 8;
        let per_writer = 250;

        let mut handles = Vec::new();
        for w in 0..writers {
            let cache = cache.clone();
            handles.push(thread::spawn(move || {
                for i in 0..per_writer {
                    cache.set(format!("w{}-{}", w, i), i, None).unwrap();
                }
            }));
        }
        for r in 0..4 {
            let cache = cache.clone();
            handles.push(thread::spawn(move || {
                for i in 0..per_writer {
                    let _ = cache.get(&format!("w{}-{}", r, i)).unwrap();
                    cache.cleanup();
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        let stats = cache.stats().unwrap();
        assert_eq!(stats.size, (writers * per_writer) as usize);
        assert_eq!(stats.sets, (writers * per_writer) as u64);
        assert_eq!(stats.hits + stats.misses, 4 * per_writer as u64);
    }
}
