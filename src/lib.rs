//! Storage Cache - a namespaced key/value cache over web-storage style backends
//!
//! Provides per-entry expiry, oldest-first eviction on quota errors, and an
//! HTTP service exposing a persistent and a session-scoped cache.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod storage;
pub mod tasks;

pub use api::AppState;
pub use cache::{SetOptions, StorageCache};
pub use config::Config;
pub use tasks::spawn_cleanup_task;
