//! Test backends shared by unit and property tests.

use crate::error::{CacheError, Result};
use crate::storage::{MemoryStorage, StorageBackend};

/// Memory storage that fails a configurable number of upcoming writes with
/// `QuotaExceeded`, and optionally starts failing removals.
#[derive(Debug, Default)]
pub(crate) struct QuotaFailingStorage {
    pub inner: MemoryStorage,
    failures_left: usize,
    set_calls: usize,
    /// Removals still allowed before every removal fails, None = unlimited
    removals_left: Option<usize>,
}

impl QuotaFailingStorage {
    /// Makes the next `count` writes fail.
    pub fn fail_next(&mut self, count: usize) {
        self.failures_left = count;
    }

    /// Lets `count` more removals succeed, then fails the rest.
    pub fn fail_removals_after(&mut self, count: usize) {
        self.removals_left = Some(count);
    }

    /// Total `set_item` calls, failed ones included.
    pub fn set_calls(&self) -> usize {
        self.set_calls
    }
}

impl StorageBackend for QuotaFailingStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        self.inner.get_item(key)
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<()> {
        self.set_calls += 1;
        if self.failures_left > 0 {
            self.failures_left -= 1;
            return Err(CacheError::QuotaExceeded);
        }
        self.inner.set_item(key, value)
    }

    fn remove_item(&mut self, key: &str) -> Result<()> {
        match self.removals_left.as_mut() {
            Some(0) => {
                return Err(CacheError::Unavailable("removal refused".to_string()));
            }
            Some(left) => *left -= 1,
            None => {}
        }
        self.inner.remove_item(key)
    }

    fn len(&self) -> usize {
        self.inner.len()
    }

    fn key(&self, index: usize) -> Option<String> {
        self.inner.key(index)
    }
}
