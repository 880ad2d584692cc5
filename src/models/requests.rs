//! Request DTOs for the cache HTTP API
//!
//! Defines path parameters and incoming request bodies.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 256;

/// Which cache instance a request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheScope {
    /// Persistent, file-backed cache
    Local,
    /// Process-lifetime, in-memory cache
    Session,
}

impl fmt::Display for CacheScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheScope::Local => f.write_str("local"),
            CacheScope::Session => f.write_str("session"),
        }
    }
}

/// Request body for PUT /cache/:scope/:key
///
/// # Fields
/// - `value`: Any JSON value to store
/// - `expiry`: Optional time-to-live in milliseconds (uses default if not specified)
#[derive(Debug, Clone, Deserialize)]
pub struct SetRequest {
    /// The value to store
    pub value: Value,
    /// Optional TTL in milliseconds
    #[serde(default)]
    pub expiry: Option<u64>,
}

impl SetRequest {
    /// Validates the request against the target key.
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self, key: &str) -> Option<String> {
        if key.is_empty() {
            return Some("Key cannot be empty".to_string());
        }
        if key.len() > MAX_KEY_LENGTH {
            return Some(format!(
                "Key exceeds maximum length of {} bytes",
                MAX_KEY_LENGTH
            ));
        }
        None
    }
}
