//! Owner Key Index Module
//!
//! Tracks which cache keys are held on behalf of which owner, per namespace,
//! so an owner's entries can be purged eagerly when their data changes.
//! Also keeps a per-owner invalidation generation, so a value computed before
//! an invalidation can be refused when it arrives after it.

use std::collections::{HashMap, HashSet};

use crate::cache::entry::OwnerTag;

// == Owner Key Index ==
/// owner -> namespace -> keys.
///
/// Empty buckets are removed as soon as they drain, so the index never holds
/// more keys than the store holds owned entries. Generations hold one counter
/// per owner ever invalidated and survive `clear`.
#[derive(Debug, Default)]
pub struct OwnerKeyIndex {
    owners: HashMap<String, HashMap<String, HashSet<String>>>,
    generations: HashMap<String, u64>,
}

impl OwnerKeyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    // == Register ==
    /// Records `key` under the tag's owner and namespace.
    pub fn register(&mut self, tag: &OwnerTag, key: &str) {
        self.owners
            .entry(tag.owner.clone())
            .or_default()
            .entry(tag.namespace.clone())
            .or_default()
            .insert(key.to_string());
    }

    // == Unregister ==
    /// Drops a single key registration, pruning emptied buckets.
    pub fn unregister(&mut self, tag: &OwnerTag, key: &str) {
        let Some(namespaces) = self.owners.get_mut(&tag.owner) else {
            return;
        };
        if let Some(keys) = namespaces.get_mut(&tag.namespace) {
            keys.remove(key);
            if keys.is_empty() {
                namespaces.remove(&tag.namespace);
            }
        }
        if namespaces.is_empty() {
            self.owners.remove(&tag.owner);
        }
    }

    // == Take ==
    /// Removes and returns every key registered for `owner`.
    pub fn take_owner(&mut self, owner: &str) -> Vec<String> {
        self.owners
            .remove(owner)
            .map(|namespaces| namespaces.into_values().flatten().collect())
            .unwrap_or_default()
    }

    /// Removes and returns the keys registered for `owner` in `namespace`.
    pub fn take_namespace(&mut self, owner: &str, namespace: &str) -> Vec<String> {
        let Some(namespaces) = self.owners.get_mut(owner) else {
            return Vec::new();
        };
        let keys = namespaces
            .remove(namespace)
            .map(|keys| keys.into_iter().collect())
            .unwrap_or_default();
        if namespaces.is_empty() {
            self.owners.remove(owner);
        }
        keys
    }

    // == Generations ==
    /// Current invalidation generation of `owner`; 0 if never invalidated.
    pub fn generation(&self, owner: &str) -> u64 {
        self.generations.get(owner).copied().unwrap_or(0)
    }

    /// Advances `owner`'s generation, returning the new value.
    pub fn bump_generation(&mut self, owner: &str) -> u64 {
        let generation = self.generations.entry(owner.to_string()).or_insert(0);
        *generation += 1;
        *generation
    }

    /// Number of keys currently registered for `owner`.
    pub fn owner_key_count(&self, owner: &str) -> usize {
        self.owners
            .get(owner)
            .map(|namespaces| namespaces.values().map(HashSet::len).sum())
            .unwrap_or(0)
    }

    /// Total number of registrations across all owners.
    pub fn len(&self) -> usize {
        self.owners
            .values()
            .flat_map(HashMap::values)
            .map(HashSet::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    /// Drops every registration. Generations are kept: resetting them would
    /// let a value computed before the clear match a later generation.
    pub fn clear(&mut self) {
        self.owners.clear();
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_take_owner() {
        let mut index = OwnerKeyIndex::new();
        index.register(&OwnerTag::new("a", "summary"), "k1");
        index.register(&OwnerTag::new("a", "report"), "k2");
        index.register(&OwnerTag::new("b", "summary"), "k3");

        let mut keys = index.take_owner("a");
        keys.sort();
        assert_eq!(keys, vec!["k1".to_string(), "k2".to_string()]);
        assert_eq!(index.owner_key_count("a"), 0);
        assert_eq!(index.owner_key_count("b"), 1);
    }

    #[test]
    fn test_take_unknown_owner_is_empty() {
        let mut index = OwnerKeyIndex::new();
        assert!(index.take_owner("nobody").is_empty());
        assert!(index.take_namespace("nobody", "summary").is_empty());
    }

    #[test]
    fn test_take_namespace_leaves_other_namespaces() {
        let mut index = OwnerKeyIndex::new();
        index.register(&OwnerTag::new("a", "summary"), "k1");
        index.register(&OwnerTag::new("a", "report"), "k2");

        assert_eq!(index.take_namespace("a", "summary"), vec!["k1".to_string()]);
        assert_eq!(index.owner_key_count("a"), 1);

        assert_eq!(index.take_namespace("a", "report"), vec!["k2".to_string()]);
        assert!(index.is_empty());
    }

    #[test]
    fn test_unregister_prunes_empty_buckets() {
        let mut index = OwnerKeyIndex::new();
        let tag = OwnerTag::new("a", "summary");
        index.register(&tag, "k1");
        index.register(&tag, "k2");

        index.unregister(&tag, "k1");
        assert_eq!(index.len(), 1);

        index.unregister(&tag, "k2");
        assert!(index.is_empty());

        // Unknown registrations are ignored
        index.unregister(&tag, "k2");
        assert!(index.is_empty());
    }

    #[test]
    fn test_generation_survives_clear() {
        let mut index = OwnerKeyIndex::new();
        assert_eq!(index.generation("a"), 0);

        assert_eq!(index.bump_generation("a"), 1);
        assert_eq!(index.bump_generation("a"), 2);
        index.clear();

        assert_eq!(index.generation("a"), 2);
        assert_eq!(index.generation("b"), 0);
    }

    #[test]
    fn test_register_is_idempotent() {
        let mut index = OwnerKeyIndex::new();
        let tag = OwnerTag::new("a", "summary");
        index.register(&tag, "k1");
        index.register(&tag, "k1");
        assert_eq!(index.len(), 1);
    }
}
