//! API Handlers
//!
//! HTTP request handlers for each cache endpoint.

use std::sync::Arc;
use tokio::sync::RwLock;

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::Value;
use tracing::info;

use crate::cache::{SetOptions, StorageCache};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::models::{
    CacheScope, ClearResponse, DeleteResponse, GetResponse, HealthResponse, KeysResponse,
    SetRequest, SetResponse, StatsResponse,
};
use crate::storage::{FileStorage, MemoryStorage, StorageBackend};

/// A cache instance shared between handlers and background tasks.
pub type SharedCache = Arc<RwLock<StorageCache<Box<dyn StorageBackend>>>>;

/// Application state shared across all handlers.
///
/// Holds the two cache instances built at startup: a persistent one and a
/// session-scoped one.
#[derive(Clone)]
pub struct AppState {
    /// Persistent cache
    pub local: SharedCache,
    /// In-memory cache, lost on restart
    pub session: SharedCache,
}

impl AppState {
    /// Creates a new AppState from two cache instances.
    pub fn new<L, S>(local: StorageCache<L>, session: StorageCache<S>) -> Self
    where
        L: StorageBackend + 'static,
        S: StorageBackend + 'static,
    {
        Self {
            local: Arc::new(RwLock::new(local.boxed())),
            session: Arc::new(RwLock::new(session.boxed())),
        }
    }

    /// Creates a new AppState from configuration.
    ///
    /// The local cache is backed by the configured JSON file, the session
    /// cache by memory. Both share the prefix, expiry and quota settings.
    pub fn from_config(config: &Config) -> Self {
        let local_storage =
            FileStorage::open(&config.local_storage_path, config.storage_quota_bytes);
        let session_storage = match config.storage_quota_bytes {
            Some(quota) => MemoryStorage::with_quota(quota),
            None => MemoryStorage::new(),
        };
        info!(
            path = %config.local_storage_path.display(),
            entries = local_storage.len(),
            "Opened persistent storage"
        );

        Self::new(
            StorageCache::from_config(local_storage, config),
            StorageCache::from_config(session_storage, config),
        )
    }

    /// Returns the cache instance for a scope.
    pub fn cache(&self, scope: CacheScope) -> &SharedCache {
        match scope {
            CacheScope::Local => &self.local,
            CacheScope::Session => &self.session,
        }
    }
}

/// Handler for PUT /cache/:scope/:key
///
/// Stores a JSON value with optional expiry.
pub async fn set_handler(
    State(state): State<AppState>,
    Path((scope, key)): Path<(CacheScope, String)>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    if let Some(error_msg) = req.validate(&key) {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let options = SetOptions { expiry: req.expiry };
    let stored = state.cache(scope).write().await.set(&key, &req.value, options);

    if stored {
        Ok(Json(SetResponse::new(key)))
    } else {
        Err(CacheError::WriteRejected(format!("{} cache could not store '{}'", scope, key)))
    }
}

/// Handler for GET /cache/:scope/:key
///
/// Retrieves a live value. Missing, expired and corrupt entries are all 404.
pub async fn get_handler(
    State(state): State<AppState>,
    Path((scope, key)): Path<(CacheScope, String)>,
) -> Result<Json<GetResponse>> {
    // Write lock: reads may delete expired entries and update stats
    let value = state.cache(scope).write().await.get::<Value>(&key);

    match value {
        Some(value) => Ok(Json(GetResponse::new(key, value))),
        None => Err(CacheError::NotFound(key)),
    }
}

/// Handler for DELETE /cache/:scope/:key
pub async fn delete_handler(
    State(state): State<AppState>,
    Path((scope, key)): Path<(CacheScope, String)>,
) -> Json<DeleteResponse> {
    let removed = state.cache(scope).write().await.remove(&key);
    Json(DeleteResponse::new(key, removed))
}

/// Handler for DELETE /cache/:scope
///
/// Removes every entry under the cache prefix.
pub async fn clear_handler(
    State(state): State<AppState>,
    Path(scope): Path<CacheScope>,
) -> Json<ClearResponse> {
    let cleared = state.cache(scope).write().await.clear_all();
    Json(ClearResponse { scope, cleared })
}

/// Handler for GET /cache/:scope
///
/// Lists keys under the cache prefix, expired entries included until swept.
pub async fn keys_handler(
    State(state): State<AppState>,
    Path(scope): Path<CacheScope>,
) -> Json<KeysResponse> {
    let mut keys = state.cache(scope).read().await.keys();
    keys.sort();
    Json(KeysResponse { scope, keys })
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let local = state.local.read().await.stats();
    let session = state.session.read().await.stats();

    Json(StatsResponse {
        local: local.into(),
        session: session.into(),
    })
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
