//! Cache Module
//!
//! Namespaced key/value caching with per-entry expiry and quota eviction.

mod clock;
mod entry;
mod stats;
mod store;


// Re-export public types
pub use clock::{Clock, ManualClock, SystemClock};
pub use entry::CacheEntry;
pub use stats::CacheStats;
pub use store::{SetOptions, StorageCache};

// == Public Constants ==
/// Namespace prepended to every key unless configured otherwise
pub const DEFAULT_PREFIX: &str = "horror-blog-";

/// Default time-to-live in milliseconds
pub const DEFAULT_EXPIRY_MS: u64 = 24 * 60 * 60 * 1000; // 24 hours

/// Number of entries removed per eviction round
pub const DEFAULT_EVICTION_BATCH: usize = 5;
