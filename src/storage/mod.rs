//! Storage Module
//!
//! Web-storage style key/value backends the cache is layered over.

mod backend;
mod file;
mod memory;

#[cfg(test)]
pub(crate) mod testing;

pub use backend::StorageBackend;
pub use file::FileStorage;
pub use memory::MemoryStorage;

// == Public Constants ==
/// Default quota in bytes, matching the usual browser localStorage allowance
pub const DEFAULT_QUOTA_BYTES: usize = 5 * 1024 * 1024; // 5 MiB
