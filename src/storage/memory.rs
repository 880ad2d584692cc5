//! In-Memory Storage
//!
//! Session-scoped backend with an optional byte quota.

use std::collections::BTreeMap;

use crate::error::{CacheError, Result};
use crate::storage::StorageBackend;

// == Memory Storage ==
/// Ordered in-memory string store.
///
/// Usage is measured as the sum of `key.len() + value.len()` over all items.
/// A write that would push usage past the quota fails with `QuotaExceeded`
/// and leaves the store unchanged.
#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    /// Stored items, ordered by key
    items: BTreeMap<String, String>,
    /// Maximum usage in bytes, None = unbounded
    quota_bytes: Option<usize>,
    /// Current usage in bytes
    used_bytes: usize,
}

impl MemoryStorage {
    // == Constructor ==
    /// Creates an empty, unbounded store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty store that rejects writes beyond `quota_bytes`.
    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            quota_bytes: Some(quota_bytes),
            ..Self::default()
        }
    }

    /// Builds a store from existing items, bypassing the quota check.
    pub(crate) fn from_items(items: BTreeMap<String, String>, quota_bytes: Option<usize>) -> Self {
        let used_bytes = items.iter().map(|(k, v)| item_size(k, v)).sum();
        Self {
            items,
            quota_bytes,
            used_bytes,
        }
    }

    pub(crate) fn items(&self) -> &BTreeMap<String, String> {
        &self.items
    }

    // == Usage ==
    /// Bytes currently in use.
    pub fn used_bytes(&self) -> usize {
        self.used_bytes
    }

    /// Configured quota, if any.
    pub fn quota_bytes(&self) -> Option<usize> {
        self.quota_bytes
    }
}

impl StorageBackend for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.items.get(key).cloned())
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<()> {
        let previous = self.items.get(key).map(|v| item_size(key, v)).unwrap_or(0);
        let projected = self.used_bytes - previous + item_size(key, value);

        if let Some(quota) = self.quota_bytes {
            if projected > quota {
                return Err(CacheError::QuotaExceeded);
            }
        }

        self.items.insert(key.to_string(), value.to_string());
        self.used_bytes = projected;
        Ok(())
    }

    fn remove_item(&mut self, key: &str) -> Result<()> {
        if let Some(value) = self.items.remove(key) {
            self.used_bytes -= item_size(key, &value);
        }
        Ok(())
    }

    fn len(&self) -> usize {
        self.items.len()
    }

    fn key(&self, index: usize) -> Option<String> {
        self.items.keys().nth(index).cloned()
    }

    fn keys(&self) -> Vec<String> {
        self.items.keys().cloned().collect()
    }
}

fn item_size(key: &str, value: &str) -> usize {
    key.len() + value.len()
}
