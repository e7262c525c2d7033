//! Explicit table cache.
//!
//! Entries are keyed by where the table came from. Writes hand back the key
//! they made stale (`WriteAck::invalidates`) and the caller applies it.
//! Store entries are never cleared implicitly; source entries are bounded
//! and the oldest is evicted first.

use crate::dataset::{SalesTable, SourceFingerprint};
use crate::database::WriteAck;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

/// Identity of a cached table
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CacheKey {
    /// Table loaded from a source file with this content fingerprint
    Source(SourceFingerprint),
    /// Table read back from the durable store, by table name
    Store(String),
}

/// Source tables kept at once; the oldest is evicted first
pub const DEFAULT_MAX_SOURCE_ENTRIES: usize = 8;

#[derive(Debug)]
pub struct TableCache {
    entries: HashMap<CacheKey, SalesTable>,
    /// Source keys in insertion order, for eviction
    source_order: VecDeque<CacheKey>,
    max_source_entries: usize,
    hits: u64,
    misses: u64,
}

impl Default for TableCache {
    fn default() -> Self {
        Self::with_max_source_entries(DEFAULT_MAX_SOURCE_ENTRIES)
    }
}

impl TableCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound the number of `CacheKey::Source` entries (at least one is kept)
    pub fn with_max_source_entries(max_source_entries: usize) -> Self {
        Self {
            entries: HashMap::new(),
            source_order: VecDeque::new(),
            max_source_entries: max_source_entries.max(1),
            hits: 0,
            misses: 0,
        }
    }

    pub fn get(&self, key: &CacheKey) -> Option<&SalesTable> {
        self.entries.get(key)
    }

    pub fn insert(&mut self, key: CacheKey, table: SalesTable) {
        self.make_room_for(&key);
        self.entries.insert(key, table);
    }

    /// Return the cached table or compute, store and return it.
    /// Errors are not cached.
    pub fn get_or_try_insert_with<E, F>(&mut self, key: CacheKey, load: F) -> Result<&SalesTable, E>
    where
        F: FnOnce() -> Result<SalesTable, E>,
    {
        if self.entries.contains_key(&key) {
            self.hits += 1;
            tracing::debug!(key = ?key, "Table cache hit");
        } else {
            self.misses += 1;
            tracing::debug!(key = ?key, "Table cache miss");
            let table = load()?;
            self.make_room_for(&key);
            self.entries.insert(key.clone(), table);
        }

        Ok(self.entries.entry(key).or_default())
    }

    pub fn invalidate(&mut self, key: &CacheKey) -> bool {
        self.source_order.retain(|k| k != key);
        let removed = self.entries.remove(key).is_some();
        if removed {
            tracing::debug!(key = ?key, "Table cache entry invalidated");
        }
        removed
    }

    /// Drop whatever a successful write made stale
    pub fn apply(&mut self, ack: &WriteAck) -> bool {
        self.invalidate(&ack.invalidates)
    }

    /// Track a new source key, evicting the oldest source entries beyond the bound
    fn make_room_for(&mut self, key: &CacheKey) {
        if !matches!(key, CacheKey::Source(_)) || self.entries.contains_key(key) {
            return;
        }
        while self.source_order.len() >= self.max_source_entries {
            let Some(oldest) = self.source_order.pop_front() else {
                break;
            };
            self.entries.remove(&oldest);
            tracing::debug!(key = ?oldest, "Table cache source entry evicted");
        }
        self.source_order.push_back(key.clone());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// (hits, misses)
    pub fn stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::CleanRecord;

    fn table(price: f64) -> SalesTable {
        SalesTable::new(vec![CleanRecord::new("Books", "Novel", price)])
    }

    #[test]
    fn test_loader_runs_once_per_key() {
        let mut cache = TableCache::new();
        let key = CacheKey::Store("sales".to_string());
        let mut calls = 0;

        for _ in 0..3 {
            let cached = cache
                .get_or_try_insert_with::<(), _>(key.clone(), || {
                    calls += 1;
                    Ok(table(10.0))
                })
                .unwrap();
            assert_eq!(cached.len(), 1);
        }

        assert_eq!(calls, 1);
        assert_eq!(cache.stats(), (2, 1));
    }

    #[test]
    fn test_errors_are_not_cached() {
        let mut cache = TableCache::new();
        let key = CacheKey::Source(SourceFingerprint("abc".to_string()));

        let result = cache.get_or_try_insert_with(key.clone(), || Err("boom"));
        assert_eq!(result.unwrap_err(), "boom");
        assert!(cache.is_empty());
    }

    #[test]
    fn test_source_entries_are_bounded() {
        let mut cache = TableCache::with_max_source_entries(2);
        let store_key = CacheKey::Store("sales".to_string());
        cache.insert(store_key.clone(), table(1.0));

        let keys: Vec<CacheKey> = (0..3)
            .map(|i| CacheKey::Source(SourceFingerprint(format!("fp{}", i))))
            .collect();
        for (i, key) in keys.iter().enumerate() {
            cache
                .get_or_try_insert_with::<(), _>(key.clone(), || Ok(table(i as f64)))
                .unwrap();
        }

        assert_eq!(cache.len(), 3);
        assert!(cache.get(&keys[0]).is_none());
        assert!(cache.get(&keys[1]).is_some());
        assert!(cache.get(&keys[2]).is_some());
        assert!(cache.get(&store_key).is_some());
    }

    #[test]
    fn test_reinserting_source_does_not_evict() {
        let mut cache = TableCache::with_max_source_entries(2);
        let a = CacheKey::Source(SourceFingerprint("a".to_string()));
        let b = CacheKey::Source(SourceFingerprint("b".to_string()));
        cache.insert(a.clone(), table(1.0));
        cache.insert(b.clone(), table(2.0));
        cache.insert(a.clone(), table(3.0));

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&a).map(|t| t.records[0].price), Some(3.0));

        assert!(cache.invalidate(&a));
        cache.insert(CacheKey::Source(SourceFingerprint("c".to_string())), table(4.0));
        assert!(cache.get(&b).is_some());
    }

    #[test]
    fn test_apply_write_ack_invalidates_store_entry() {
        let mut cache = TableCache::new();
        let store_key = CacheKey::Store("sales".to_string());
        let source_key = CacheKey::Source(SourceFingerprint("abc".to_string()));
        cache.insert(store_key.clone(), table(10.0));
        cache.insert(source_key.clone(), table(20.0));

        let ack = WriteAck {
            message: "Saved 1 rows to 'sales'".to_string(),
            rows_written: 1,
            invalidates: store_key.clone(),
        };
        assert!(cache.apply(&ack));
        assert!(cache.get(&store_key).is_none());
        assert!(cache.get(&source_key).is_some());
        assert!(!cache.apply(&ack));
    }
}
