//! Cache Module
//!
//! Provides an in-memory memoization cache with TTL expiration, usage
//! statistics and owner-scoped invalidation.

mod clock;
mod entry;
mod index;
mod key;
mod shared;
mod stats;
mod store;


// Re-export public types
pub use clock::{current_timestamp_ms, Clock, ManualClock, SystemClock};
pub use entry::{CacheEntry, OwnerTag};
pub use index::OwnerKeyIndex;
pub use key::{generate_key, CacheKey, KeyParams, ParamValue, PARAM_DELIMITER, PART_SEPARATOR};
pub use shared::{MemoCache, DEFAULT_LOCK_TIMEOUT};
pub use stats::CacheStats;
pub use store::{ttl_to_millis, CacheStore};
