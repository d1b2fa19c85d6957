//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

// == Owner Tag ==
/// Records which owner and namespace an entry was cached on behalf of.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerTag {
    pub owner: String,
    pub namespace: String,
}

impl OwnerTag {
    pub fn new(owner: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            namespace: namespace.into(),
        }
    }
}

// == Cache Entry ==
/// Represents a single cache entry with value and metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The stored value
    pub value: V,
    /// Insertion timestamp (Unix milliseconds)
    pub created_at: u64,
    /// Expiration timestamp (Unix milliseconds)
    pub expires_at: u64,
    /// Owner registration, if the entry was set on behalf of one
    pub owner: Option<OwnerTag>,
    /// Insertion sequence number, disambiguates equal expiry times
    pub(crate) seq: u64,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates a new entry that expires `ttl_ms` after `now_ms`.
    pub fn new(value: V, now_ms: u64, ttl_ms: u64, owner: Option<OwnerTag>, seq: u64) -> Self {
        Self {
            value,
            created_at: now_ms,
            expires_at: now_ms.saturating_add(ttl_ms),
            owner,
            seq,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired as of `now_ms`.
    ///
    /// An entry is live strictly before `expires_at`; at the boundary it is
    /// already expired.
    pub fn is_expired(&self, now_ms: u64) -> bool {
        now_ms >= self.expires_at
    }

    // == Time To Live ==
    /// Returns remaining TTL in milliseconds, 0 once expired.
    pub fn ttl_remaining_ms(&self, now_ms: u64) -> u64 {
        self.expires_at.saturating_sub(now_ms)
    }

    /// Key into the store's expiry queue.
    pub(crate) fn expiry_slot(&self) -> (u64, u64) {
        (self.expires_at, self.seq)
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_creation() {
        let entry = CacheEntry::new("v".to_string(), 1_000, 60_000, None, 0);

        assert_eq!(entry.value, "v");
        assert_eq!(entry.created_at, 1_000);
        assert_eq!(entry.expires_at, 61_000);
        assert!(!entry.is_expired(1_000));
    }

    #[test]
    fn test_expiration_boundary_condition() {
        let entry = CacheEntry::new(1u32, 0, 1_000, None, 0);

        assert!(!entry.is_expired(999));
        assert!(entry.is_expired(1_000), "Entry should be expired at boundary");
        assert!(entry.is_expired(5_000));
    }

    #[test]
    fn test_ttl_remaining() {
        let entry = CacheEntry::new((), 0, 10_000, None, 0);

        assert_eq!(entry.ttl_remaining_ms(4_000), 6_000);
        assert_eq!(entry.ttl_remaining_ms(20_000), 0);
    }

    #[test]
    fn test_expiry_does_not_overflow() {
        let entry = CacheEntry::new((), u64::MAX - 5, 60_000, None, 0);
        assert_eq!(entry.expires_at, u64::MAX);
    }

    #[test]
    fn test_owner_tag() {
        let tag = OwnerTag::new("u1", "summary");
        let entry = CacheEntry::new((), 0, 1, Some(tag.clone()), 3);
        assert_eq!(entry.owner, Some(tag));
        assert_eq!(entry.expiry_slot(), (1, 3));
    }
}
