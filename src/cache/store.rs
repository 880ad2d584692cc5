//! Cache Store Module
//!
//! Namespaced, expiring cache over a [`StorageBackend`], with oldest-first
//! eviction when the backend runs out of quota.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::cache::entry::EntryStamp;
use crate::cache::{
    CacheEntry, CacheStats, Clock, SystemClock, DEFAULT_EVICTION_BATCH, DEFAULT_EXPIRY_MS,
    DEFAULT_PREFIX,
};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::storage::StorageBackend;

// == Set Options ==
/// Per-write options.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SetOptions {
    /// Time-to-live in milliseconds, None = cache default
    pub expiry: Option<u64>,
}

impl SetOptions {
    pub fn with_expiry(expiry_ms: u64) -> Self {
        Self {
            expiry: Some(expiry_ms),
        }
    }
}

// == Storage Cache ==
/// Typed get/set/remove/clear over a string backend.
///
/// Every key is stored as `prefix + key`. Nothing outside the prefix is ever
/// read for eviction or removed. Public operations never return storage
/// errors: failures are logged and reported as `None` / `false`.
#[derive(Debug)]
pub struct StorageCache<B> {
    /// Underlying key/value store
    backend: B,
    /// Namespace prepended to every key
    prefix: String,
    /// TTL in milliseconds for writes without an explicit expiry
    default_expiry_ms: u64,
    /// Entries removed per eviction round
    eviction_batch: usize,
    /// Time source for timestamps and expiry checks
    clock: Arc<dyn Clock>,
    /// Outcome counters
    stats: CacheStats,
}

impl<B: StorageBackend> StorageCache<B> {
    // == Constructor ==
    /// Creates a cache with the default prefix, expiry and system clock.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            prefix: DEFAULT_PREFIX.to_string(),
            default_expiry_ms: DEFAULT_EXPIRY_MS,
            eviction_batch: DEFAULT_EVICTION_BATCH,
            clock: Arc::new(SystemClock),
            stats: CacheStats::new(),
        }
    }

    /// Creates a cache using the prefix, expiry and eviction batch from `config`.
    pub fn from_config(backend: B, config: &Config) -> Self {
        Self::new(backend)
            .with_prefix(config.cache_prefix.clone())
            .with_default_expiry(config.default_expiry_ms)
            .with_eviction_batch(config.eviction_batch)
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_default_expiry(mut self, expiry_ms: u64) -> Self {
        self.default_expiry_ms = expiry_ms;
        self
    }

    pub fn with_eviction_batch(mut self, count: usize) -> Self {
        self.eviction_batch = count;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Erases the backend type so differently-backed caches can share a slot.
    pub fn boxed(self) -> StorageCache<Box<dyn StorageBackend>>
    where
        B: 'static,
    {
        StorageCache {
            backend: Box::new(self.backend),
            prefix: self.prefix,
            default_expiry_ms: self.default_expiry_ms,
            eviction_batch: self.eviction_batch,
            clock: self.clock,
            stats: self.stats,
        }
    }

    // == Accessors ==
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Raw access to the backend, bypassing prefixing and expiry.
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    fn storage_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    // == Get ==
    /// Retrieves a value by key.
    ///
    /// Returns None when the entry is missing, expired, unparsable or does
    /// not decode as `T`. Expired and unreadable entries are deleted.
    pub fn get<T: DeserializeOwned>(&mut self, key: &str) -> Option<T> {
        let storage_key = self.storage_key(key);

        match self.read_entry(&storage_key) {
            Ok(Some(value)) => {
                self.stats.record_hit();
                Some(value)
            }
            Ok(None) => {
                self.stats.record_miss();
                None
            }
            Err(e) => {
                match &e {
                    CacheError::Serialization(_) => {
                        warn!(key = %storage_key, "Discarding corrupt cache entry: {}", e)
                    }
                    _ => error!(key = %storage_key, "Cache read failed: {}", e),
                }
                self.discard(&storage_key);
                self.stats.record_miss();
                None
            }
        }
    }

    fn read_entry<T: DeserializeOwned>(&mut self, storage_key: &str) -> Result<Option<T>> {
        let Some(raw) = self.backend.get_item(storage_key)? else {
            return Ok(None);
        };

        let entry: CacheEntry<T> = serde_json::from_str(&raw)?;
        if entry.is_expired(self.clock.now_ms(), self.default_expiry_ms) {
            debug!(key = %storage_key, "Cache entry expired, removing");
            self.backend.remove_item(storage_key)?;
            return Ok(None);
        }

        Ok(Some(entry.value))
    }

    /// Best-effort removal after a failed read.
    fn discard(&mut self, storage_key: &str) {
        if let Err(e) = self.backend.remove_item(storage_key) {
            error!(key = %storage_key, "Failed to remove unreadable entry: {}", e);
        }
    }

    // == Set ==
    /// Stores a value, stamped with the current time.
    ///
    /// On a quota error, evicts the oldest entries under the prefix and
    /// retries once. Returns false if the write could not be made.
    pub fn set<T: Serialize + ?Sized>(&mut self, key: &str, value: &T, options: SetOptions) -> bool {
        match self.try_set(key, value, options) {
            Ok(()) => true,
            Err(e) => {
                error!(key = %key, "Cache write failed: {}", e);
                self.stats.record_failed_write();
                false
            }
        }
    }

    fn try_set<T: Serialize + ?Sized>(
        &mut self,
        key: &str,
        value: &T,
        options: SetOptions,
    ) -> Result<()> {
        let storage_key = self.storage_key(key);
        let expiry = options.expiry.unwrap_or(self.default_expiry_ms);
        let entry = CacheEntry::new(value, self.clock.now_ms(), expiry);
        let raw = serde_json::to_string(&entry)?;

        match self.backend.set_item(&storage_key, &raw) {
            Err(e) if e.is_quota_exceeded() => {
                warn!(key = %storage_key, "Storage quota exceeded, evicting oldest entries");
                let evicted = self.clear_oldest(self.eviction_batch)?;
                self.backend.set_item(&storage_key, &raw).map_err(|e| {
                    CacheError::WriteRejected(format!(
                        "{} still failed after evicting {} entries: {}",
                        storage_key, evicted, e
                    ))
                })
            }
            other => other,
        }
    }

    // == Remove ==
    /// Removes an entry by key. Returns false if the backend failed.
    pub fn remove(&mut self, key: &str) -> bool {
        let storage_key = self.storage_key(key);
        match self.backend.remove_item(&storage_key) {
            Ok(()) => true,
            Err(e) => {
                error!(key = %storage_key, "Cache remove failed: {}", e);
                false
            }
        }
    }

    // == Clear All ==
    /// Removes every entry under the prefix, leaving other keys alone.
    pub fn clear_all(&mut self) -> bool {
        let keys = self.prefixed_keys();
        match self.backend.remove_items(&keys) {
            Ok(()) => true,
            Err(e) => {
                error!(prefix = %self.prefix, "Cache clear failed: {}", e);
                false
            }
        }
    }

    // == Clear Oldest ==
    /// Removes the `count` entries with the smallest write timestamps.
    ///
    /// Entries whose text is not a valid entry sort as timestamp 0 and go
    /// first. Returns how many entries were removed. Entries removed before a
    /// backend failure still count as evictions.
    fn clear_oldest(&mut self, count: usize) -> Result<usize> {
        let mut stamped: Vec<(u64, String)> = self
            .prefixed_keys()
            .into_iter()
            .map(|k| {
                let timestamp = self
                    .backend
                    .get_item(&k)
                    .ok()
                    .flatten()
                    .as_deref()
                    .and_then(EntryStamp::parse)
                    .map(|s| s.timestamp)
                    .unwrap_or(0);
                (timestamp, k)
            })
            .collect();
        stamped.sort_by_key(|(timestamp, _)| *timestamp);

        let victims: Vec<String> = stamped.into_iter().take(count).map(|(_, k)| k).collect();
        if let Err(e) = self.backend.remove_items(&victims) {
            let removed = self.count_gone(&victims);
            self.stats.record_evictions(removed);
            warn!(prefix = %self.prefix, removed, "Eviction stopped early: {}", e);
            return Err(e);
        }

        let removed = victims.len();
        self.stats.record_evictions(removed);
        debug!(prefix = %self.prefix, removed, "Evicted oldest cache entries");
        Ok(removed)
    }

    /// How many of `keys` are no longer present in the backend.
    fn count_gone(&self, keys: &[String]) -> usize {
        keys.iter()
            .filter(|k| matches!(self.backend.get_item(k), Ok(None)))
            .count()
    }

    // == Purge Expired ==
    /// Removes every expired or unparsable entry under the prefix.
    ///
    /// Returns the number of entries removed.
    pub fn purge_expired(&mut self) -> usize {
        let now = self.clock.now_ms();

        let stale: Vec<String> = self
            .prefixed_keys()
            .into_iter()
            .filter(|key| match self.backend.get_item(key) {
                Ok(Some(raw)) => EntryStamp::parse(&raw)
                    .map_or(true, |stamp| stamp.is_expired(now, self.default_expiry_ms)),
                Ok(None) => false,
                Err(e) => {
                    warn!(key = %key, "Skipping unreadable entry during purge: {}", e);
                    false
                }
            })
            .collect();
        if stale.is_empty() {
            return 0;
        }

        match self.backend.remove_items(&stale) {
            Ok(()) => stale.len(),
            Err(e) => {
                error!(prefix = %self.prefix, "Failed to purge expired entries: {}", e);
                self.count_gone(&stale)
            }
        }
    }

    // == Keys ==
    /// Keys held under the prefix, with the prefix stripped.
    pub fn keys(&self) -> Vec<String> {
        self.prefixed_keys()
            .into_iter()
            .filter_map(|k| k.strip_prefix(&self.prefix).map(str::to_string))
            .collect()
    }

    fn prefixed_keys(&self) -> Vec<String> {
        self.backend
            .keys()
            .into_iter()
            .filter(|k| k.starts_with(&self.prefix))
            .collect()
    }

    // == Length ==
    /// Number of entries under the prefix, expired ones included.
    pub fn len(&self) -> usize {
        self.prefixed_keys().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.len());
        stats
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManualClock;
    use crate::storage::testing::QuotaFailingStorage;
    use crate::storage::{FileStorage, MemoryStorage};
    use serde::Deserialize;
    use serde_json::{json, Value};
    use std::collections::BTreeMap;

    const HOUR_MS: u64 = 60 * 60 * 1000;
    const START_MS: u64 = 1_700_000_000_000;

    fn test_cache() -> (StorageCache<MemoryStorage>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(START_MS));
        let cache = StorageCache::new(MemoryStorage::new()).with_clock(clock.clone());
        (cache, clock)
    }

    /// A backend whose every call fails, like disabled browser storage.
    #[derive(Debug)]
    struct DisabledStorage;

    impl StorageBackend for DisabledStorage {
        fn get_item(&self, _key: &str) -> Result<Option<String>> {
            Err(CacheError::Unavailable("storage disabled".to_string()))
        }

        fn set_item(&mut self, _key: &str, _value: &str) -> Result<()> {
            Err(CacheError::Unavailable("storage disabled".to_string()))
        }

        fn remove_item(&mut self, _key: &str) -> Result<()> {
            Err(CacheError::Unavailable("storage disabled".to_string()))
        }

        fn len(&self) -> usize {
            0
        }

        fn key(&self, _index: usize) -> Option<String> {
            None
        }
    }

    #[test]
    fn test_set_and_get_round_trip() {
        let (mut cache, _) = test_cache();

        assert!(cache.set("b", &json!({"x": 1}), SetOptions::with_expiry(1000)));
        assert_eq!(cache.get::<Value>("b"), Some(json!({"x": 1})));
    }

    #[test]
    fn test_typed_payload() {
        #[derive(Debug, PartialEq, Serialize, Deserialize)]
        struct Progress {
            post_id: u32,
            percent: f32,
        }

        let (mut cache, _) = test_cache();
        let progress = Progress {
            post_id: 13,
            percent: 66.5,
        };

        assert!(cache.set("reading-progress-13", &progress, SetOptions::default()));
        assert_eq!(cache.get::<Progress>("reading-progress-13"), Some(progress));
    }

    #[test]
    fn test_keys_are_prefixed_in_backend() {
        let (mut cache, _) = test_cache();
        cache.set("a", &1, SetOptions::default());

        let raw = cache.backend().get_item("horror-blog-a").unwrap().unwrap();
        let stored: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(stored["value"], json!(1));
        assert_eq!(stored["timestamp"], json!(START_MS));
        assert_eq!(stored["expiry"], json!(24 * HOUR_MS));
    }

    #[test]
    fn test_default_expiry_after_25_hours() {
        let (mut cache, clock) = test_cache();

        cache.set("a", &json!({"x": 1}), SetOptions::default());
        clock.advance(25 * HOUR_MS);

        assert_eq!(cache.get::<Value>("a"), None);
        assert_eq!(cache.backend().get_item("horror-blog-a").unwrap(), None);
    }

    #[test]
    fn test_live_until_expiry_boundary() {
        let (mut cache, clock) = test_cache();

        cache.set("a", &"v", SetOptions::with_expiry(1000));
        clock.advance(1000);
        assert_eq!(cache.get::<String>("a"), Some("v".to_string()));

        clock.advance(1);
        assert_eq!(cache.get::<String>("a"), None);
    }

    #[test]
    fn test_get_missing() {
        let (mut cache, _) = test_cache();
        assert_eq!(cache.get::<Value>("nothing"), None);
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_corrupt_entry_is_removed() {
        let (mut cache, _) = test_cache();
        cache
            .backend_mut()
            .set_item("horror-blog-bad", "{not valid json")
            .unwrap();

        assert_eq!(cache.get::<Value>("bad"), None);
        assert_eq!(cache.backend().get_item("horror-blog-bad").unwrap(), None);
    }

    #[test]
    fn test_wrong_shape_is_removed() {
        let (mut cache, _) = test_cache();
        cache.set("n", &json!({"x": 1}), SetOptions::default());

        assert_eq!(cache.get::<u32>("n"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_remove() {
        let (mut cache, _) = test_cache();
        cache.set("a", &1, SetOptions::default());

        assert!(cache.remove("a"));
        assert_eq!(cache.get::<i32>("a"), None);
        assert!(cache.remove("a"), "Removing a missing key still succeeds");
    }

    #[test]
    fn test_clear_all_keeps_foreign_keys() {
        let (mut cache, _) = test_cache();
        cache.set("a", &1, SetOptions::default());
        cache.set("b", &2, SetOptions::default());
        cache.backend_mut().set_item("theme", "dark").unwrap();
        cache
            .backend_mut()
            .set_item("other-app-a", "keep")
            .unwrap();

        assert!(cache.clear_all());

        assert!(cache.is_empty());
        assert_eq!(cache.backend().len(), 2);
        assert_eq!(cache.backend().get_item("theme").unwrap(), Some("dark".to_string()));
    }

    #[test]
    fn test_two_prefixes_share_backend() {
        let mut storage = MemoryStorage::new();
        {
            let mut progress = StorageCache::new(&mut storage).with_prefix("progress-");
            progress.set("a", &1, SetOptions::default());
        }
        {
            let mut cache = StorageCache::new(&mut storage);
            cache.set("a", &2, SetOptions::default());
            assert!(cache.clear_all());
        }

        assert_eq!(storage.get_item("horror-blog-a").unwrap(), None);
        assert!(storage.get_item("progress-a").unwrap().is_some());
    }

    #[test]
    fn test_quota_evicts_exactly_five_oldest() {
        let clock = Arc::new(ManualClock::new(START_MS));
        let mut cache = StorageCache::new(QuotaFailingStorage::default()).with_clock(clock.clone());

        for i in 0..8 {
            assert!(cache.set(&format!("e{}", i), &i, SetOptions::default()));
            clock.advance(10);
        }
        cache.backend_mut().inner.set_item("theme", "dark").unwrap();
        cache.backend_mut().fail_next(1);
        let calls_before = cache.backend().set_calls();

        assert!(cache.set("new", &"value", SetOptions::default()));

        assert_eq!(cache.backend().set_calls() - calls_before, 2, "One retry only");
        let mut keys = cache.keys();
        keys.sort();
        assert_eq!(keys, vec!["e5", "e6", "e7", "new"]);
        assert_eq!(cache.backend().get_item("theme").unwrap(), Some("dark".to_string()));
        assert_eq!(cache.stats().evictions, 5);
    }

    #[test]
    fn test_quota_with_fewer_entries_than_batch_evicts_all() {
        let clock = Arc::new(ManualClock::new(START_MS));
        let mut cache = StorageCache::new(QuotaFailingStorage::default()).with_clock(clock.clone());
        cache.set("a", &1, SetOptions::default());
        clock.advance(10);
        cache.set("b", &2, SetOptions::default());
        cache.backend_mut().fail_next(1);
        let calls_before = cache.backend().set_calls();

        assert!(cache.set("c", &3, SetOptions::default()));

        assert_eq!(cache.backend().set_calls() - calls_before, 2, "One retry only");
        assert_eq!(cache.keys(), vec!["c".to_string()]);
        assert_eq!(cache.stats().evictions, 2);
        assert_eq!(cache.stats().failed_writes, 0);
    }

    #[test]
    fn test_partial_eviction_still_counted() {
        let clock = Arc::new(ManualClock::new(START_MS));
        let mut cache = StorageCache::new(QuotaFailingStorage::default()).with_clock(clock.clone());
        for i in 0..8 {
            cache.set(&format!("e{}", i), &i, SetOptions::default());
            clock.advance(10);
        }
        cache.backend_mut().fail_removals_after(3);
        cache.backend_mut().fail_next(1);

        assert!(!cache.set("new", &"value", SetOptions::default()));

        let stats = cache.stats();
        assert_eq!(stats.evictions, 3);
        assert_eq!(stats.failed_writes, 1);
        let mut keys = cache.keys();
        keys.sort();
        assert_eq!(keys, vec!["e3", "e4", "e5", "e6", "e7"]);
    }

    #[test]
    fn test_bulk_operations_flush_file_once() {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(ManualClock::new(START_MS));
        let storage = FileStorage::open(dir.path().join("local-storage.json"), None);
        let mut cache = StorageCache::new(storage).with_clock(clock.clone());

        for i in 0..40 {
            cache.set(&format!("short-{}", i), &i, SetOptions::with_expiry(100));
            cache.set(&format!("long-{}", i), &i, SetOptions::default());
        }
        clock.advance(101);

        let before = cache.backend().flush_count();
        assert_eq!(cache.purge_expired(), 40);
        assert_eq!(cache.backend().flush_count() - before, 1);

        let before = cache.backend().flush_count();
        assert!(cache.clear_all());
        assert_eq!(cache.backend().flush_count() - before, 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_corrupt_entries_evicted_first() {
        let clock = Arc::new(ManualClock::new(START_MS));
        let mut cache = StorageCache::new(QuotaFailingStorage::default())
            .with_clock(clock.clone())
            .with_eviction_batch(1);

        cache.set("old", &1, SetOptions::default());
        clock.advance(10);
        cache.backend_mut().inner.set_item("horror-blog-zz", "garbage").unwrap();
        cache.backend_mut().fail_next(1);

        assert!(cache.set("new", &2, SetOptions::default()));

        assert_eq!(cache.backend().get_item("horror-blog-zz").unwrap(), None);
        assert_eq!(cache.get::<i32>("old"), Some(1));
    }

    #[test]
    fn test_always_full_storage_rejects_after_eviction() {
        let mut items = BTreeMap::new();
        for i in 0..7u64 {
            let entry = CacheEntry::new(i, START_MS + i, HOUR_MS);
            items.insert(
                format!("horror-blog-k{}", i),
                serde_json::to_string(&entry).unwrap(),
            );
        }
        let storage = MemoryStorage::from_items(items, Some(0));
        let (_, clock) = test_cache();
        let mut cache = StorageCache::new(storage).with_clock(clock);

        assert!(!cache.set("x", &json!({"x": 1}), SetOptions::default()));

        let stats = cache.stats();
        assert_eq!(stats.evictions, 5);
        assert_eq!(stats.failed_writes, 1);
        let mut keys = cache.keys();
        keys.sort();
        assert_eq!(keys, vec!["k5", "k6"]);
    }

    #[test]
    fn test_disabled_storage_degrades() {
        let mut cache = StorageCache::new(DisabledStorage);

        assert!(!cache.set("a", &1, SetOptions::default()));
        assert_eq!(cache.get::<i32>("a"), None);
        assert!(!cache.remove("a"));
        assert!(cache.clear_all(), "Nothing under the prefix to clear");
        assert_eq!(cache.purge_expired(), 0);
    }

    #[test]
    fn test_purge_expired() {
        let (mut cache, clock) = test_cache();
        cache.set("short", &1, SetOptions::with_expiry(100));
        cache.set("long", &2, SetOptions::with_expiry(10 * HOUR_MS));
        cache.backend_mut().set_item("horror-blog-junk", "[]").unwrap();
        cache.backend_mut().set_item("theme", "dark").unwrap();
        clock.advance(101);

        assert_eq!(cache.purge_expired(), 2);
        assert_eq!(cache.keys(), vec!["long".to_string()]);
        assert_eq!(cache.backend().get_item("theme").unwrap(), Some("dark".to_string()));
    }

    #[test]
    fn test_from_config() {
        let config = Config {
            cache_prefix: "test-".to_string(),
            default_expiry_ms: 50,
            ..Config::default()
        };
        let clock = Arc::new(ManualClock::new(START_MS));
        let mut cache = StorageCache::from_config(MemoryStorage::new(), &config)
            .with_clock(clock.clone());

        cache.set("a", &1, SetOptions::default());
        assert_eq!(cache.prefix(), "test-");
        assert!(cache.backend().get_item("test-a").unwrap().is_some());

        clock.advance(51);
        assert_eq!(cache.get::<i32>("a"), None);
    }

    #[test]
    fn test_stats_counts() {
        let (mut cache, _) = test_cache();
        cache.set("a", &1, SetOptions::default());
        cache.get::<i32>("a");
        cache.get::<i32>("b");

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.total_entries, 1);
    }
}
