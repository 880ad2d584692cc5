//! Configuration Module
//!
//! Handles loading and managing cache and server configuration from
//! environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::cache::{DEFAULT_EVICTION_BATCH, DEFAULT_EXPIRY_MS, DEFAULT_PREFIX};
use crate::storage::DEFAULT_QUOTA_BYTES;

/// Cache and server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Namespace prepended to every cache key
    pub cache_prefix: String,
    /// Default TTL in milliseconds for writes without explicit expiry
    pub default_expiry_ms: u64,
    /// Entries evicted per round when storage is full
    pub eviction_batch: usize,
    /// Byte quota for each storage backend, None = unbounded
    pub storage_quota_bytes: Option<usize>,
    /// JSON file backing the persistent ("local") cache
    pub local_storage_path: PathBuf,
    /// HTTP server port
    pub server_port: u16,
    /// Background expiry sweep interval in seconds
    pub cleanup_interval: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_PREFIX` - Key namespace (default: `horror-blog-`)
    /// - `DEFAULT_EXPIRY_MS` - Default TTL in milliseconds (default: 86400000)
    /// - `EVICTION_BATCH` - Entries evicted on quota errors (default: 5)
    /// - `STORAGE_QUOTA_BYTES` - Per-backend quota, 0 disables (default: 5242880)
    /// - `LOCAL_STORAGE_PATH` - Persistent store file (default: `data/local-storage.json`)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CLEANUP_INTERVAL` - Expiry sweep frequency in seconds (default: 60)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let quota: usize = parse_var("STORAGE_QUOTA_BYTES").unwrap_or(DEFAULT_QUOTA_BYTES);

        Self {
            cache_prefix: env::var("CACHE_PREFIX").unwrap_or(defaults.cache_prefix),
            default_expiry_ms: parse_var("DEFAULT_EXPIRY_MS").unwrap_or(defaults.default_expiry_ms),
            eviction_batch: parse_var("EVICTION_BATCH").unwrap_or(defaults.eviction_batch),
            storage_quota_bytes: (quota > 0).then_some(quota),
            local_storage_path: env::var("LOCAL_STORAGE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.local_storage_path),
            server_port: parse_var("SERVER_PORT").unwrap_or(defaults.server_port),
            cleanup_interval: parse_var("CLEANUP_INTERVAL").unwrap_or(defaults.cleanup_interval),
        }
    }
}

fn parse_var<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_prefix: DEFAULT_PREFIX.to_string(),
            default_expiry_ms: DEFAULT_EXPIRY_MS,
            eviction_batch: DEFAULT_EVICTION_BATCH,
            storage_quota_bytes: Some(DEFAULT_QUOTA_BYTES),
            local_storage_path: PathBuf::from("data/local-storage.json"),
            server_port: 3000,
            cleanup_interval: 60,
        }
    }
}
