//! Cache Statistics Module
//!
//! Tracks cache usage counters: hits, misses, sets, deletes and TTL reclamation.

use serde::Serialize;

// == Cache Stats ==
/// Running cache counters plus a size snapshot.
///
/// Counters only grow; `CacheStore::clear` is the one place they are reset.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    /// Reads that returned a live value
    pub hits: u64,
    /// Reads that found nothing or an expired entry
    pub misses: u64,
    /// Successful writes
    pub sets: u64,
    /// Entries removed by delete or invalidation
    pub deletes: u64,
    /// Entries reclaimed because their TTL passed (lazily or by sweep)
    pub expirations: u64,
    /// Current number of stored entries
    pub size: usize,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no reads have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// Hit rate rendered as a percentage with two decimals, e.g. `"50.00%"`.
    pub fn hit_rate_percent(&self) -> String {
        format!("{:.2}%", self.hit_rate() * 100.0)
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_set(&mut self) {
        self.sets += 1;
    }

    pub fn record_delete(&mut self) {
        self.deletes += 1;
    }

    pub fn record_expirations(&mut self, count: usize) {
        self.expirations += count as u64;
    }

    // == Update Entry Count ==
    /// Updates the size snapshot.
    pub fn set_size(&mut self, size: usize) {
        self.size = size;
    }
}
