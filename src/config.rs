//! Configuration Module
//!
//! Handles loading engine and server configuration from environment variables.

use std::env;
use std::time::Duration;

/// Engine and server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum number of entries the cache can hold
    pub capacity: usize,
    /// Whether a hit refreshes the entry's last-access time
    pub update_time_on_hit: bool,
    /// Sweep interval in milliseconds, 0 disables the sweeper
    pub sweep_interval_ms: u64,
    /// Default idle survival time in milliseconds
    pub survive_time_ms: u64,
    /// HTTP server port
    pub server_port: u16,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_CAPACITY` - Maximum cache entries (default: 1000)
    /// - `UPDATE_TIME_ON_HIT` - Refresh access time on hit (default: true)
    /// - `SWEEP_INTERVAL_MS` - Sweep frequency in milliseconds (default: 1000)
    /// - `SURVIVE_TIME_MS` - Default idle survival in milliseconds (default: 300000)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            capacity: parse_var("CACHE_CAPACITY").unwrap_or(defaults.capacity),
            update_time_on_hit: parse_var("UPDATE_TIME_ON_HIT")
                .unwrap_or(defaults.update_time_on_hit),
            sweep_interval_ms: parse_var("SWEEP_INTERVAL_MS")
                .unwrap_or(defaults.sweep_interval_ms),
            survive_time_ms: parse_var("SURVIVE_TIME_MS").unwrap_or(defaults.survive_time_ms),
            server_port: parse_var("SERVER_PORT").unwrap_or(defaults.server_port),
        }
    }

    /// Sweep interval as a Duration.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }

    /// Default survive time as a Duration.
    pub fn survive_time(&self) -> Duration {
        Duration::from_millis(self.survive_time_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            capacity: 1000,
            update_time_on_hit: true,
            sweep_interval_ms: 1000,
            survive_time_ms: 300_000,
            server_port: 3000,
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}
