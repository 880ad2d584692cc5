//! Cache Statistics Module
//!
//! Tracks cache outcomes: hits, misses, evictions and rejected writes.

use serde::Serialize;

// == Cache Stats ==
/// Counters for one cache instance.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct CacheStats {
    /// Reads that returned a value
    pub hits: u64,
    /// Reads that found nothing usable (missing, expired or corrupt)
    pub misses: u64,
    /// Entries removed by quota-driven eviction
    pub evictions: u64,
    /// Writes that returned false
    pub failed_writes: u64,
    /// Current number of entries under the cache prefix
    pub total_entries: usize,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Returns hits / (hits + misses), or 0.0 if no reads have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    /// Adds `count` evicted entries.
    pub fn record_evictions(&mut self, count: usize) {
        self.evictions += count as u64;
    }

    pub fn record_failed_write(&mut self) {
        self.failed_writes += 1;
    }

    pub fn set_total_entries(&mut self, count: usize) {
        self.total_entries = count;
    }
}
