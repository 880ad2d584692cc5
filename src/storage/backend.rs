//! Storage Backend Trait
//!
//! The synchronous getItem/setItem/removeItem/length/key(index) contract.

use crate::error::Result;

// == Storage Backend ==
/// A synchronous string key/value store with indexed key enumeration.
///
/// Implementations report a full store through
/// [`CacheError::QuotaExceeded`](crate::error::CacheError::QuotaExceeded)
/// from `set_item`; every other failure uses the remaining error variants.
pub trait StorageBackend: Send + Sync {
    /// Returns the raw stored string, or None if the key is absent.
    fn get_item(&self, key: &str) -> Result<Option<String>>;

    /// Stores a raw string under `key`, replacing any previous value.
    fn set_item(&mut self, key: &str, value: &str) -> Result<()>;

    /// Removes `key`. Removing a missing key is not an error.
    fn remove_item(&mut self, key: &str) -> Result<()>;

    /// Number of stored items.
    fn len(&self) -> usize;

    /// Key at position `index`, or None when out of range.
    fn key(&self, index: usize) -> Option<String>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of every key, enumerated through `len` and `key`.
    ///
    /// Backends with cheaper enumeration than repeated `key(i)` override this.
    fn keys(&self) -> Vec<String> {
        (0..self.len()).filter_map(|i| self.key(i)).collect()
    }

    /// Removes several keys, stopping at the first failure.
    ///
    /// Backends that persist on every mutation override this to persist once.
    fn remove_items(&mut self, keys: &[String]) -> Result<()> {
        keys.iter().try_for_each(|k| self.remove_item(k))
    }
}

impl<B: StorageBackend + ?Sized> StorageBackend for Box<B> {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        (**self).get_item(key)
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<()> {
        (**self).set_item(key, value)
    }

    fn remove_item(&mut self, key: &str) -> Result<()> {
        (**self).remove_item(key)
    }

    fn len(&self) -> usize {
        (**self).len()
    }

    fn key(&self, index: usize) -> Option<String> {
        (**self).key(index)
    }

    fn keys(&self) -> Vec<String> {
        (**self).keys()
    }

    fn remove_items(&mut self, keys: &[String]) -> Result<()> {
        (**self).remove_items(keys)
    }
}

impl<B: StorageBackend + ?Sized> StorageBackend for &mut B {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        (**self).get_item(key)
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<()> {
        (**self).set_item(key, value)
    }

    fn remove_item(&mut self, key: &str) -> Result<()> {
        (**self).remove_item(key)
    }

    fn len(&self) -> usize {
        (**self).len()
    }

    fn key(&self, index: usize) -> Option<String> {
        (**self).key(index)
    }

    fn keys(&self) -> Vec<String> {
        (**self).keys()
    }

    fn remove_items(&mut self, keys: &[String]) -> Result<()> {
        (**self).remove_items(keys)
    }
}
