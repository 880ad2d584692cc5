//! Cache Entry Module
//!
//! Defines the stored record: a payload plus write time and time-to-live.

use serde::{Deserialize, Serialize};

// == Cache Entry ==
/// A single cached value with expiry metadata.
///
/// Stored as the JSON object `{"value": ..., "timestamp": ..., "expiry": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    /// The stored value
    pub value: T,
    /// Write timestamp (Unix milliseconds)
    pub timestamp: u64,
    /// Time-to-live in milliseconds, None = use the cache default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<u64>,
}

impl<T> CacheEntry<T> {
    // == Constructor ==
    /// Creates an entry written at `timestamp` that lives for `expiry_ms`.
    pub fn new(value: T, timestamp: u64, expiry_ms: u64) -> Self {
        Self {
            value,
            timestamp,
            expiry: Some(expiry_ms),
        }
    }

    // == Expires At ==
    /// Last instant (Unix milliseconds) at which the entry is still live.
    pub fn expires_at(&self, default_expiry_ms: u64) -> u64 {
        self.timestamp
            .saturating_add(self.expiry.unwrap_or(default_expiry_ms))
    }

    // == Is Expired ==
    /// Checks if the entry has expired at `now_ms`.
    ///
    /// Boundary condition: an entry read exactly at `timestamp + expiry` is
    /// still live; it expires once `now` is strictly past that instant.
    pub fn is_expired(&self, now_ms: u64, default_expiry_ms: u64) -> bool {
        now_ms > self.expires_at(default_expiry_ms)
    }
}

// == Entry Stamp ==
/// The metadata of a stored entry, decoded without touching its payload.
///
/// Used by eviction and expiry sweeps, which never need the value itself.
#[derive(Debug, Deserialize)]
pub(crate) struct EntryStamp {
    pub timestamp: u64,
    #[serde(default)]
    pub expiry: Option<u64>,
}

impl EntryStamp {
    /// Parses raw stored text; None if it is not an entry.
    pub fn parse(raw: &str) -> Option<Self> {
        serde_json::from_str(raw).ok()
    }

    pub fn is_expired(&self, now_ms: u64, default_expiry_ms: u64) -> bool {
        now_ms > self
            .timestamp
            .saturating_add(self.expiry.unwrap_or(default_expiry_ms))
    }
}
