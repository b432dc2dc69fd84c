//! Cache Statistics Module
//!
//! Tracks request, hit, eviction and expiration counters and derives the
//! hit rate and fill rate.

use std::fmt;

use serde::Serialize;

// == Stats Tracker ==
/// Counters updated inside the engine's critical section.
#[derive(Debug, Clone, Default)]
pub(crate) struct StatsTracker {
    requests: u64,
    hits: u64,
    evictions: u64,
    expirations: u64,
}

impl StatsTracker {
    // == Constructor ==
    /// Creates a new tracker with all counters at zero.
    pub(crate) fn new() -> Self {
        Self::default()
    }

    // == Record ==
    pub(crate) fn record_request(&mut self) {
        self.requests += 1;
    }

    pub(crate) fn record_hit(&mut self) {
        self.hits += 1;
    }

    /// Counts capacity-driven removals of the tail.
    pub(crate) fn record_evictions(&mut self, count: usize) {
        self.evictions += count as u64;
    }

    /// Counts TTL or idle-survival removals.
    pub(crate) fn record_expirations(&mut self, count: usize) {
        self.expirations += count as u64;
    }

    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }

    // == Hit Rate ==
    /// hits / requests, or 1.0 when no request has been made.
    pub(crate) fn hit_rate(&self) -> f64 {
        if self.requests == 0 {
            1.0
        } else {
            self.hits as f64 / self.requests as f64
        }
    }

    /// Builds the public snapshot for the given occupancy.
    pub(crate) fn snapshot(&self, size: usize, capacity: usize) -> CacheStats {
        CacheStats {
            requests: self.requests,
            hits: self.hits,
            misses: self.requests - self.hits,
            evictions: self.evictions,
            expirations: self.expirations,
            size,
            capacity,
            hit_rate: self.hit_rate(),
            fill_rate: fill_rate(size, capacity),
        }
    }
}

// == Fill Rate ==
/// size / capacity, or 1.0 for a zero-capacity cache.
pub(crate) fn fill_rate(size: usize, capacity: usize) -> f64 {
    if capacity == 0 {
        1.0
    } else {
        size as f64 / capacity as f64
    }
}

// == Cache Stats ==
/// Point-in-time copy of the engine counters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    /// Number of lookups (`get`, `get_or_create`, `get_if_newer`)
    pub requests: u64,
    /// Lookups that returned a value
    pub hits: u64,
    /// Lookups that returned nothing
    pub misses: u64,
    /// Entries removed to honor the capacity
    pub evictions: u64,
    /// Entries removed because their TTL or idle time ran out
    pub expirations: u64,
    /// Current number of entries
    pub size: usize,
    /// Maximum number of entries
    pub capacity: usize,
    pub hit_rate: f64,
    pub fill_rate: f64,
}

// == Cache Info ==
/// Diagnostic snapshot meant for logging and monitoring.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheInfo {
    pub capacity: usize,
    pub size: usize,
    pub fill_rate: f64,
    pub hit_rate: f64,
    /// Whether the background sweeper is active
    pub sweep_running: bool,
    /// Sweep interval in milliseconds, 0 if never configured
    pub interval_ms: u64,
    /// Default idle survival in milliseconds, 0 if never configured
    pub survive_time_ms: u64,
}

impl fmt::Display for CacheInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "capacity={} size={} fill_rate={:.3} hit_rate={:.3} sweep_running={} interval_ms={} survive_time_ms={}",
            self.capacity,
            self.size,
            self.fill_rate,
            self.hit_rate,
            self.sweep_running,
            self.interval_ms,
            self.survive_time_ms
        )
    }
}
