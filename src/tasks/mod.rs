//! Background Tasks Module
//!
//! Contains background tasks that run periodically during server operation.
//!
//! # Tasks
//! - Expiry sweep: purges expired entries from both caches at a fixed interval

mod cleanup;

pub use cleanup::spawn_cleanup_task;
