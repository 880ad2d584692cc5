//! API Module
//!
//! HTTP handlers and routing exposing the local and session caches.
//!
//! # Endpoints
//! - `PUT|GET|DELETE /cache/:scope/:key` - Write, read or remove an entry
//! - `GET|DELETE /cache/:scope` - List or clear a cache
//! - `GET /stats` - Cache statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
