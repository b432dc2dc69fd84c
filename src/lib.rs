//! MRU Cache - A thread-safe recency-tracked cache engine
//!
//! Provides strict LRU eviction, per-entry TTL and idle-survival expiration,
//! hit/miss statistics and a cooperative background sweeper, plus a small
//! HTTP front end for monitoring and manual access.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod tasks;

pub use api::AppState;
pub use cache::{CacheEngine, CacheInfo, CacheStats, EntryOptions, EntrySnapshot};
pub use config::Config;
pub use error::{CacheError, Result};
