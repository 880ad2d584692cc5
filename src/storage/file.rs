//! File-Backed Storage
//!
//! Persistent backend: a [`MemoryStorage`] mirrored to a JSON file that is
//! rewritten after every mutation.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{CacheError, Result};
use crate::storage::{MemoryStorage, StorageBackend};

// == File Storage ==
/// Persistent string store flushed to disk on every write.
#[derive(Debug)]
pub struct FileStorage {
    /// In-memory view of the file contents
    inner: MemoryStorage,
    /// Location of the JSON document
    path: PathBuf,
    /// Completed flushes since open
    flushes: u64,
}

impl FileStorage {
    // == Constructor ==
    /// Opens (or lazily creates) the store at `path`.
    ///
    /// A missing file starts empty. An unreadable or corrupt file is logged
    /// and also starts empty; it is overwritten by the next flush.
    pub fn open(path: impl Into<PathBuf>, quota_bytes: Option<usize>) -> Self {
        let path = path.into();
        let items = Self::load_from_disk(&path);
        debug!(path = %path.display(), items = items.len(), "Opened file storage");
        Self {
            inner: MemoryStorage::from_items(items, quota_bytes),
            path,
            flushes: 0,
        }
    }

    pub(crate) fn flush_count(&self) -> u64 {
        self.flushes
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_from_disk(path: &Path) -> BTreeMap<String, String> {
        match std::fs::read_to_string(path) {
            Ok(data) => match serde_json::from_str(&data) {
                Ok(items) => items,
                Err(e) => {
                    warn!("Storage file {} is corrupt, starting empty: {}", path.display(), e);
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                warn!("Failed to read storage file {}, starting empty: {}", path.display(), e);
                BTreeMap::new()
            }
        }
    }

    // == Flush ==
    /// Writes the full item map to a temporary file, then renames it over
    /// the target.
    ///
    /// A storage directory that cannot be created makes the store unusable
    /// and is reported as `Unavailable`.
    fn flush(&mut self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    CacheError::Unavailable(format!(
                        "cannot create storage directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }
        let data = serde_json::to_string_pretty(self.inner.items())?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, data)?;
        std::fs::rename(&tmp, &self.path)?;
        self.flushes += 1;
        Ok(())
    }

    /// Puts `key` back to `previous` after a failed flush.
    fn restore(&mut self, key: &str, previous: Option<String>) {
        let restored = match previous {
            Some(value) => self.inner.set_item(key, &value),
            None => self.inner.remove_item(key),
        };
        if let Err(e) = restored {
            warn!("Failed to restore {} after flush error: {}", key, e);
        }
    }
}

impl StorageBackend for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        self.inner.get_item(key)
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<()> {
        let previous = self.inner.get_item(key)?;
        self.inner.set_item(key, value)?;
        if let Err(e) = self.flush() {
            self.restore(key, previous);
            return Err(e);
        }
        Ok(())
    }

    fn remove_item(&mut self, key: &str) -> Result<()> {
        let previous = self.inner.get_item(key)?;
        if previous.is_none() {
            return Ok(());
        }
        self.inner.remove_item(key)?;
        if let Err(e) = self.flush() {
            self.restore(key, previous);
            return Err(e);
        }
        Ok(())
    }

    fn len(&self) -> usize {
        self.inner.len()
    }

    fn key(&self, index: usize) -> Option<String> {
        self.inner.key(index)
    }

    fn keys(&self) -> Vec<String> {
        self.inner.keys()
    }

    /// Removes all present keys, then flushes once.
    fn remove_items(&mut self, keys: &[String]) -> Result<()> {
        let mut removed = Vec::new();
        for key in keys {
            if let Some(value) = self.inner.get_item(key)? {
                self.inner.remove_item(key)?;
                removed.push((key.as_str(), value));
            }
        }
        if removed.is_empty() {
            return Ok(());
        }

        if let Err(e) = self.flush() {
            for (key, value) in removed {
                self.restore(key, Some(value));
            }
            return Err(e);
        }
        Ok(())
    }
}
