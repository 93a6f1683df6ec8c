//! Entry Store Module
//!
//! Concurrent key/value storage with per-key atomic operations.

use std::hash::Hash;
use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::cache::CacheEntry;

// == Slot State ==
/// Classification of a (key, stamp) pair against the store's current
/// contents, as seen by a queue consumer reconciling a marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// No entry for the key
    Missing,
    /// An entry exists but with a different stamp (overwritten since)
    Stale,
    /// The entry matches the stamp and its TTL has elapsed
    Expired,
    /// The entry matches the stamp and is still live
    Fresh,
}

// == Entry Store ==
/// Ground truth for "what is cached right now".
///
/// A concurrent map from key to [`CacheEntry`]. Every operation touches a
/// single key atomically (DashMap shard granularity); nothing here scans
/// the whole map, so unrelated keys never contend beyond shard hashing.
pub struct EntryStore<K, V> {
    entries: DashMap<K, CacheEntry<V>>,
}

impl<K, V> std::fmt::Debug for EntryStore<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntryStore").finish_non_exhaustive()
    }
}

impl<K, V> EntryStore<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    // == Constructor ==
    /// Creates a new empty entry store.
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    // == Upsert ==
    /// Inserts or replaces the entry for a key.
    ///
    /// The previous entry, if any, is discarded wholesale; its queued
    /// markers become stale. Returns the new entry's insertion instant so
    /// the caller can append a matching marker.
    pub fn upsert(&self, key: K, value: V) -> Instant {
        let entry = CacheEntry::new(value);
        let inserted_at = entry.inserted_at;
        self.entries.insert(key, entry);
        inserted_at
    }

    // == Get If Fresh ==
    /// Returns the value for a key if it exists and has not expired.
    ///
    /// An expired entry is removed on the spot, conditionally on the stamp
    /// observed during the read, so a concurrent overwrite that landed in
    /// between is left untouched. This is the lazy expire-on-read path; it
    /// never touches the candidate queue.
    pub fn get_if_fresh(&self, key: &K, ttl: Duration) -> Option<V> {
        let stamp = match self.entries.get(key) {
            Some(entry) if !entry.is_expired(ttl) => return Some(entry.value.clone()),
            Some(entry) => entry.inserted_at,
            None => return None,
        };

        // Read guard is released above; re-acquiring for the conditional
        // removal keeps the expired read from deadlocking its own shard.
        self.entries
            .remove_if(key, |_, entry| entry.inserted_at == stamp);
        None
    }

    // == Remove If Matches ==
    /// Conditional delete: removes the entry only if its stamp still equals
    /// the given one.
    ///
    /// Fails silently when the key is absent or was overwritten since the
    /// stamp was recorded; such races are routine contention, not faults.
    /// Returns `true` if an entry was removed.
    pub fn remove_if_matches(&self, key: &K, inserted_at: Instant) -> bool {
        self.entries
            .remove_if(key, |_, entry| entry.inserted_at == inserted_at)
            .is_some()
    }

    // == Remove ==
    /// Unconditionally removes the entry for a key, returning its value.
    pub fn remove(&self, key: &K) -> Option<V> {
        self.entries.remove(key).map(|(_, entry)| entry.value)
    }

    // == State Of ==
    /// Classifies a (key, stamp) pair against the current contents.
    ///
    /// Used by the sweep loop to decide whether a peeked marker points at
    /// garbage, an expired entry, or a live one.
    pub fn state_of(&self, key: &K, inserted_at: Instant, ttl: Duration) -> SlotState {
        match self.entries.get(key) {
            None => SlotState::Missing,
            Some(entry) if entry.inserted_at != inserted_at => SlotState::Stale,
            Some(entry) if entry.is_expired(ttl) => SlotState::Expired,
            Some(_) => SlotState::Fresh,
        }
    }

    // == Remaining TTL ==
    /// Returns the remaining lifetime of a live entry, if present and fresh.
    pub fn remaining(&self, key: &K, ttl: Duration) -> Option<Duration> {
        self.entries.get(key).and_then(|entry| {
            if entry.is_expired(ttl) {
                None
            } else {
                Some(entry.remaining(ttl))
            }
        })
    }

    // == Length ==
    /// Returns the current number of live entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    const TTL: Duration = Duration::from_secs(300);
    const SHORT_TTL: Duration = Duration::from_millis(40);

    #[test]
    fn test_store_new() {
        let store: EntryStore<String, String> = EntryStore::new();
        assert_eq!(store.len(), 0);
        assert!(store.is_empty());
    }

    #[test]
    fn test_store_upsert_and_get() {
        let store = EntryStore::new();

        store.upsert("key1".to_string(), "value1".to_string());

        assert_eq!(
            store.get_if_fresh(&"key1".to_string(), TTL),
            Some("value1".to_string())
        );
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_get_missing() {
        let store: EntryStore<String, String> = EntryStore::new();
        assert_eq!(store.get_if_fresh(&"nope".to_string(), TTL), None);
    }

    #[test]
    fn test_store_overwrite_keeps_one_entry() {
        let store = EntryStore::new();

        let first = store.upsert("key1".to_string(), 1);
        let second = store.upsert("key1".to_string(), 2);

        assert_ne!(first, second);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get_if_fresh(&"key1".to_string(), TTL), Some(2));
    }

    #[test]
    fn test_store_get_expired_removes_entry() {
        let store = EntryStore::new();

        store.upsert("key1".to_string(), 1);
        sleep(Duration::from_millis(50));

        assert_eq!(store.get_if_fresh(&"key1".to_string(), SHORT_TTL), None);
        // Lazy expire-on-read removed the entry, not just hid it
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn test_store_remove_if_matches() {
        let store = EntryStore::new();

        let stamp = store.upsert("key1".to_string(), 1);

        assert!(store.remove_if_matches(&"key1".to_string(), stamp));
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn test_store_remove_if_matches_stale_stamp() {
        let store = EntryStore::new();

        let old = store.upsert("key1".to_string(), 1);
        store.upsert("key1".to_string(), 2);

        // The old stamp no longer matches; the newer entry must survive
        assert!(!store.remove_if_matches(&"key1".to_string(), old));
        assert_eq!(store.get_if_fresh(&"key1".to_string(), TTL), Some(2));
    }

    #[test]
    fn test_store_remove_if_matches_missing_key() {
        let store: EntryStore<String, i32> = EntryStore::new();
        assert!(!store.remove_if_matches(&"nope".to_string(), Instant::now()));
    }

    #[test]
    fn test_store_remove() {
        let store = EntryStore::new();

        store.upsert("key1".to_string(), 1);

        assert_eq!(store.remove(&"key1".to_string()), Some(1));
        assert_eq!(store.remove(&"key1".to_string()), None);
        assert!(store.is_empty());
    }

    #[test]
    fn test_store_state_of() {
        let store = EntryStore::new();

        let stamp = store.upsert("key1".to_string(), 1);

        assert_eq!(
            store.state_of(&"missing".to_string(), stamp, TTL),
            SlotState::Missing
        );
        assert_eq!(
            store.state_of(&"key1".to_string(), stamp, TTL),
            SlotState::Fresh
        );

        let newer = store.upsert("key1".to_string(), 2);
        assert_eq!(
            store.state_of(&"key1".to_string(), stamp, TTL),
            SlotState::Stale
        );

        sleep(Duration::from_millis(50));
        assert_eq!(
            store.state_of(&"key1".to_string(), newer, SHORT_TTL),
            SlotState::Expired
        );
    }

    #[test]
    fn test_store_remaining() {
        let store = EntryStore::new();

        store.upsert("key1".to_string(), 1);

        let remaining = store.remaining(&"key1".to_string(), TTL).unwrap();
        assert!(remaining <= TTL);
        assert!(remaining >= TTL - Duration::from_secs(1));

        assert_eq!(store.remaining(&"missing".to_string(), TTL), None);

        sleep(Duration::from_millis(50));
        assert_eq!(store.remaining(&"key1".to_string(), SHORT_TTL), None);
    }
}
