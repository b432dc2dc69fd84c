//! Cache Module
//!
//! Provides the MRU cache engine with TTL and idle-survival expiration.

pub(crate) mod engine;
mod entry;
mod recency;
mod stats;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use engine::CacheEngine;
pub use entry::{EntryOptions, EntrySnapshot};
pub use stats::{CacheInfo, CacheStats};
