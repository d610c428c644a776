//! Fallback Store Module
//!
//! Bounded in-process store used when the remote tier cannot serve a request.

use std::any::Any;
use std::collections::HashMap;

use crate::cache::{FallbackEntry, InsertionOrder};

// == Fallback Store ==
/// In-memory key-value store with FIFO eviction and per-entry TTL.
#[derive(Debug)]
pub struct FallbackStore {
    /// Key-value storage
    entries: HashMap<String, FallbackEntry>,
    /// First-insertion order, oldest at the front
    order: InsertionOrder,
    /// Maximum number of entries allowed
    max_entries: usize,
}

impl FallbackStore {
    // == Constructor ==
    /// Creates a new FallbackStore holding at most `max_entries` entries.
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: InsertionOrder::new(),
            max_entries,
        }
    }

    // == Get ==
    /// Returns a clone of the value under `key` if present, unexpired and of type `T`.
    ///
    /// Expired entries are removed on access.
    pub fn get<T>(&mut self, key: &str) -> Option<T>
    where
        T: Any + Clone,
    {
        let entry = self.entries.get(key)?;
        if entry.is_expired() {
            self.delete(key);
            return None;
        }
        entry.value()
    }

    // == Put ==
    /// Stores `value` under `key` with an optional TTL in seconds.
    ///
    /// When the store is full and `key` is new, the oldest inserted entry is evicted
    /// first and its key is returned.
    pub fn put<T>(&mut self, key: String, value: T, ttl: Option<u64>) -> Option<String>
    where
        T: Any + Send + Sync,
    {
        if self.max_entries == 0 {
            return None;
        }

        let mut evicted = None;
        if !self.entries.contains_key(&key) {
            while self.entries.len() >= self.max_entries {
                let Some(oldest) = self.order.pop_oldest() else {
                    break;
                };
                self.entries.remove(&oldest);
                evicted = Some(oldest);
            }
        }

        self.order.record(&key);
        self.entries.insert(key, FallbackEntry::new(value, ttl));
        evicted
    }

    // == Delete ==
    /// Removes an entry by key. Returns whether an entry was present.
    pub fn delete(&mut self, key: &str) -> bool {
        if self.entries.remove(key).is_some() {
            self.order.remove(key);
            true
        } else {
            false
        }
    }

    // == Delete Matching ==
    /// Removes `prefix` itself and every key of the form `prefix:...`.
    pub fn delete_matching(&mut self, prefix: &str) -> usize {
        let scoped = format!("{}:", prefix);
        let matching: Vec<String> = self
            .entries
            .keys()
            .filter(|key| key.as_str() == prefix || key.starts_with(&scoped))
            .cloned()
            .collect();

        for key in &matching {
            self.delete(key);
        }
        matching.len()
    }

    // == Clear ==
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    // == Purge Expired ==
    /// Removes all expired entries, returning how many were dropped.
    pub fn purge_expired(&mut self) -> usize {
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired())
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            self.delete(key);
        }
        expired.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;
    use std::time::Duration;

    #[test]
    fn test_store_new() {
        let store = FallbackStore::new(100);
        assert_eq!(store.len(), 0);
        assert!(store.is_empty());
    }

    #[test]
    fn test_put_and_get() {
        let mut store = FallbackStore::new(100);

        store.put("key1".to_string(), "value1".to_string(), None);

        assert_eq!(store.get::<String>("key1"), Some("value1".to_string()));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_get_nonexistent() {
        let mut store = FallbackStore::new(100);
        assert_eq!(store.get::<String>("nonexistent"), None);
    }

    #[test]
    fn test_get_wrong_type_is_miss() {
        let mut store = FallbackStore::new(100);

        store.put("key1".to_string(), 7u64, None);

        assert_eq!(store.get::<String>("key1"), None);
        assert_eq!(store.get::<u64>("key1"), Some(7));
    }

    #[test]
    fn test_delete_is_idempotent() {
        let mut store = FallbackStore::new(100);

        store.put("key1".to_string(), 1, None);
        assert!(store.delete("key1"));
        assert!(!store.delete("key1"));
        assert!(!store.delete("never_set"));
        assert!(store.is_empty());
    }

    #[test]
    fn test_overwrite_keeps_size() {
        let mut store = FallbackStore::new(100);

        store.put("key1".to_string(), "value1".to_string(), None);
        store.put("key1".to_string(), "value2".to_string(), None);

        assert_eq!(store.get::<String>("key1"), Some("value2".to_string()));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_fifo_eviction() {
        let mut store = FallbackStore::new(2);

        assert_eq!(store.put("A".to_string(), 1, None), None);
        assert_eq!(store.put("B".to_string(), 2, None), None);
        assert_eq!(store.put("C".to_string(), 3, None), Some("A".to_string()));

        assert_eq!(store.len(), 2);
        assert_eq!(store.get::<i32>("A"), None);
        assert_eq!(store.get::<i32>("B"), Some(2));
        assert_eq!(store.get::<i32>("C"), Some(3));
    }

    #[test]
    fn test_reads_do_not_affect_eviction_order() {
        let mut store = FallbackStore::new(2);

        store.put("A".to_string(), 1, None);
        store.put("B".to_string(), 2, None);
        // A read would save "A" under LRU, not under FIFO
        store.get::<i32>("A");
        store.put("C".to_string(), 3, None);

        assert_eq!(store.get::<i32>("A"), None);
        assert_eq!(store.get::<i32>("B"), Some(2));
    }

    #[test]
    fn test_overwrite_at_capacity_does_not_evict() {
        let mut store = FallbackStore::new(2);

        store.put("A".to_string(), 1, None);
        store.put("B".to_string(), 2, None);
        assert_eq!(store.put("A".to_string(), 10, None), None);

        assert_eq!(store.get::<i32>("A"), Some(10));
        assert_eq!(store.get::<i32>("B"), Some(2));
    }

    #[test]
    fn test_zero_capacity_stores_nothing() {
        let mut store = FallbackStore::new(0);

        store.put("A".to_string(), 1, None);

        assert!(store.is_empty());
        assert_eq!(store.get::<i32>("A"), None);
    }

    #[test]
    fn test_ttl_expiration() {
        let mut store = FallbackStore::new(100);

        store.put("key1".to_string(), "value1".to_string(), Some(1));
        assert!(store.get::<String>("key1").is_some());

        sleep(Duration::from_millis(1100));

        assert_eq!(store.get::<String>("key1"), None);
        assert!(store.is_empty(), "expired entry is removed on access");
    }

    #[test]
    fn test_purge_expired() {
        let mut store = FallbackStore::new(100);

        store.put("key1".to_string(), 1, Some(1));
        store.put("key2".to_string(), 2, Some(10));
        store.put("key3".to_string(), 3, None);

        sleep(Duration::from_millis(1100));

        assert_eq!(store.purge_expired(), 1);
        assert_eq!(store.len(), 2);
        assert_eq!(store.get::<i32>("key2"), Some(2));
    }

    #[test]
    fn test_delete_matching() {
        let mut store = FallbackStore::new(100);

        store.put("market_cap".to_string(), 1, None);
        store.put("market_cap:1a2b3c4d".to_string(), 2, None);
        store.put("market_cap:ffff0000".to_string(), 3, None);
        store.put("market_capital".to_string(), 4, None);

        assert_eq!(store.delete_matching("market_cap"), 3);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get::<i32>("market_capital"), Some(4));
    }

    #[test]
    fn test_clear() {
        let mut store = FallbackStore::new(100);

        store.put("a".to_string(), 1, None);
        store.put("b".to_string(), 2, None);
        store.clear();

        assert!(store.is_empty());
        // Capacity accounting restarts cleanly
        store.put("c".to_string(), 3, None);
        assert_eq!(store.len(), 1);
    }
}
