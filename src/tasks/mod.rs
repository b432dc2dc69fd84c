//! Background Tasks Module
//!
//! Contains background work that runs alongside the cache engine.
//!
//! # Tasks
//! - Sweeper: Removes expired cache entries at a configured interval

pub(crate) mod sweeper;

pub use sweeper::DEFAULT_SWEEPER_NAME;
