//! Cache Store Module
//!
//! Main cache engine combining HashMap storage with an expiry queue, usage
//! statistics and the owner key index.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::cache::{
    CacheEntry, CacheKey, CacheStats, Clock, OwnerKeyIndex, OwnerTag, SystemClock,
};
use crate::error::{CacheError, CacheResult};

// == Cache Store ==
/// Expiring key-value storage.
///
/// Single-threaded; `MemoCache` wraps it in a lock for shared use. Every entry
/// has exactly one slot in the expiry queue, and every owned entry exactly one
/// registration in the owner index.
#[derive(Debug)]
pub struct CacheStore<V> {
    /// Key-value storage
    entries: HashMap<String, CacheEntry<V>>,
    /// (expires_at, seq) -> key, earliest expiry first
    expiry: BTreeMap<(u64, u64), String>,
    /// Owner -> namespace -> keys
    index: OwnerKeyIndex,
    /// Usage statistics
    stats: CacheStats,
    /// TTL applied when a caller does not pass one
    default_ttl: Duration,
    clock: Arc<dyn Clock>,
    next_seq: u64,
}

impl<V: Clone> CacheStore<V> {
    // == Constructor ==
    /// Creates a new CacheStore using wall-clock time.
    ///
    /// # Arguments
    /// * `default_ttl` - TTL for entries set without an explicit TTL
    pub fn new(default_ttl: Duration) -> Self {
        Self::with_clock(default_ttl, Arc::new(SystemClock))
    }

    /// Creates a new CacheStore driven by the given clock.
    pub fn with_clock(default_ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: HashMap::new(),
            expiry: BTreeMap::new(),
            index: OwnerKeyIndex::new(),
            stats: CacheStats::new(),
            default_ttl,
            clock,
            next_seq: 0,
        }
    }

    // == Get ==
    /// Retrieves a copy of the value stored under `key`.
    ///
    /// Returns `None` when the key is unknown or its entry has expired. An
    /// expired entry is removed on the spot; both cases count as a miss.
    pub fn get(&mut self, key: &str) -> Option<V> {
        let now = self.clock.now_ms();

        if let Some(entry) = self.entries.get(key) {
            if !entry.is_expired(now) {
                debug!(
                    key,
                    age_ms = now.saturating_sub(entry.created_at),
                    ttl_remaining_ms = entry.ttl_remaining_ms(now),
                    "cache hit"
                );
                let value = entry.value.clone();
                self.stats.record_hit();
                return Some(value);
            }

            self.remove_entry(key);
            self.stats.record_expirations(1);
        }

        self.stats.record_miss();
        None
    }

    // == Set ==
    /// Stores a value with optional TTL.
    ///
    /// If the key already exists, value, TTL and owner registration are all
    /// replaced.
    ///
    /// # Arguments
    /// * `key` - The key to store
    /// * `value` - The value to store
    /// * `ttl` - Optional TTL (uses default_ttl if None)
    pub fn set(
        &mut self,
        key: impl Into<String>,
        value: V,
        ttl: Option<Duration>,
    ) -> CacheResult<()> {
        self.insert(key.into(), value, ttl, None)
    }

    // == Set Owned ==
    /// Stores a value on behalf of `owner`, registering the key so that
    /// `invalidate(owner)` can remove it.
    pub fn set_owned(
        &mut self,
        owner: &str,
        key: &CacheKey,
        value: V,
        ttl: Option<Duration>,
    ) -> CacheResult<()> {
        if owner.is_empty() {
            return Err(CacheError::InvalidArgument("owner cannot be empty".to_string()));
        }
        let tag = OwnerTag::new(owner, key.namespace());
        self.insert(key.as_str().to_string(), value, ttl, Some(tag))
    }

    /// Like `set_owned`, but only if `owner` has not been invalidated since
    /// `generation` was read with `owner_generation`.
    ///
    /// Returns `Ok(false)` and stores nothing when the generation moved on,
    /// so a value computed from data that has since changed never lands.
    pub fn set_owned_if_current(
        &mut self,
        owner: &str,
        key: &CacheKey,
        value: V,
        ttl: Option<Duration>,
        generation: u64,
    ) -> CacheResult<bool> {
        let current = self.index.generation(owner);
        if current != generation {
            debug!(owner, key = %key, generation, current, "stale value not cached");
            return Ok(false);
        }
        self.set_owned(owner, key, value, ttl)?;
        Ok(true)
    }

    fn insert(
        &mut self,
        key: String,
        value: V,
        ttl: Option<Duration>,
        owner: Option<OwnerTag>,
    ) -> CacheResult<()> {
        if key.is_empty() {
            return Err(CacheError::InvalidArgument("key cannot be empty".to_string()));
        }
        let ttl_ms = ttl_to_millis(ttl.unwrap_or(self.default_ttl))?;
        let now = self.clock.now_ms();

        // Overwrite drops the previous expiry slot and owner registration
        self.remove_entry(&key);

        let seq = self.next_seq;
        self.next_seq += 1;

        let entry = CacheEntry::new(value, now, ttl_ms, owner, seq);
        self.expiry.insert(entry.expiry_slot(), key.clone());
        if let Some(tag) = &entry.owner {
            self.index.register(tag, &key);
        }
        self.entries.insert(key, entry);

        self.stats.record_set();
        Ok(())
    }

    // == Delete ==
    /// Removes an entry by key.
    ///
    /// Returns whether an entry was removed. Only actual removals count as deletes.
    pub fn delete(&mut self, key: &str) -> bool {
        let removed = self.remove_entry(key).is_some();
        if removed {
            self.stats.record_delete();
        }
        removed
    }

    // == Clear ==
    /// Removes every entry and resets all counters.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.expiry.clear();
        self.index.clear();
        self.stats = CacheStats::new();
    }

    // == Cleanup Expired ==
    /// Removes all entries expired as of now.
    ///
    /// Returns the number of entries removed. Hit/miss/set/delete counters are
    /// untouched; removals are counted as expirations.
    pub fn cleanup(&mut self) -> usize {
        self.cleanup_batch(usize::MAX)
    }

    /// Removes at most `max` expired entries, earliest expiry first.
    pub fn cleanup_batch(&mut self, max: usize) -> usize {
        let now = self.clock.now_ms();
        let mut removed = 0;

        while removed < max {
            let Some(slot) = self.expiry.first_entry() else {
                break;
            };
            if slot.key().0 > now {
                break;
            }
            let key = slot.remove();
            if let Some(entry) = self.entries.remove(&key) {
                if let Some(tag) = &entry.owner {
                    self.index.unregister(tag, &key);
                }
            }
            removed += 1;
        }

        self.stats.record_expirations(removed);
        removed
    }

    // == Invalidate ==
    /// Removes every entry registered for `owner`.
    ///
    /// Returns the number of entries removed; unknown owners are a no-op.
    /// Also advances the owner's generation, even when nothing was cached.
    pub fn invalidate(&mut self, owner: &str) -> usize {
        self.index.bump_generation(owner);
        let keys = self.index.take_owner(owner);
        let removed = self.remove_keys(keys);
        debug!(owner, removed, "invalidated owner entries");
        removed
    }

    /// Removes the entries registered for `owner` within one namespace.
    ///
    /// The generation is per owner, so this advances it too.
    pub fn invalidate_namespace(&mut self, owner: &str, namespace: &str) -> usize {
        self.index.bump_generation(owner);
        let keys = self.index.take_namespace(owner, namespace);
        let removed = self.remove_keys(keys);
        debug!(owner, namespace, removed, "invalidated owner namespace entries");
        removed
    }

    fn remove_keys(&mut self, keys: Vec<String>) -> usize {
        let mut removed = 0;
        for key in keys {
            if self.remove_entry(&key).is_some() {
                self.stats.record_delete();
                removed += 1;
            }
        }
        removed
    }

    /// Removes an entry along with its expiry slot and owner registration.
    fn remove_entry(&mut self, key: &str) -> Option<CacheEntry<V>> {
        let entry = self.entries.remove(key)?;
        self.expiry.remove(&entry.expiry_slot());
        if let Some(tag) = &entry.owner {
            self.index.unregister(tag, key);
        }
        Some(entry)
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_size(self.entries.len());
        stats
    }

    /// Default TTL for entries set without one.
    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Invalidation generation of `owner`, for `set_owned_if_current`.
    pub fn owner_generation(&self, owner: &str) -> u64 {
        self.index.generation(owner)
    }

    /// Number of keys currently registered for `owner`.
    pub fn owner_key_count(&self, owner: &str) -> usize {
        self.index.owner_key_count(owner)
    }

    /// Total owner registrations across all owners.
    pub fn indexed_keys(&self) -> usize {
        self.index.len()
    }

    // == Length ==
    /// Returns the number of stored entries, expired or not.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// == TTL Validation ==
/// Converts a TTL to whole milliseconds, rejecting anything under 1ms.
pub fn ttl_to_millis(ttl: Duration) -> CacheResult<u64> {
    let ms = ttl.as_millis();
    if ms == 0 {
        return Err(CacheError::InvalidArgument(format!(
            "TTL must be at least 1ms, got {:?}",
            ttl
        )));
    }
    Ok(u64::try_from(ms).unwrap_or(u64::MAX))
}
