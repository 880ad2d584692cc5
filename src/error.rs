//! Error types for the storage cache
//!
//! Provides unified error handling using thiserror. Backends and cache
//! internals return these; the public cache API logs them and degrades.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Cache Error Enum ==
/// Unified error type for storage backends, the cache and the HTTP layer.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Key not found (or expired, or corrupt) in cache
    #[error("Key not found: {0}")]
    NotFound(String),

    /// The backend has no room left for the write
    #[error("Storage quota exceeded")]
    QuotaExceeded,

    /// The backend cannot be used at all, e.g. its storage directory cannot
    /// be created
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// Stored text could not be encoded or decoded as an entry
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Disk-backed storage failed to read or flush
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The cache gave up on a write after eviction and retry
    #[error("Write rejected: {0}")]
    WriteRejected(String),
}

impl CacheError {
    /// True for the condition that triggers oldest-first eviction.
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, CacheError::QuotaExceeded)
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CacheError::QuotaExceeded | CacheError::WriteRejected(_) => {
                StatusCode::INSUFFICIENT_STORAGE
            }
            CacheError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            CacheError::Serialization(_) | CacheError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(ErrorResponse::new(self.to_string()));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the storage cache.
pub type Result<T> = std::result::Result<T, CacheError>;
