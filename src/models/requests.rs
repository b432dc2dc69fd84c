//! Request DTOs for the cache server API
//!
//! Defines the structure of incoming HTTP request bodies.

use std::time::Duration;

use serde::Deserialize;

use crate::cache::EntryOptions;

/// Maximum accepted key length in bytes
pub const MAX_KEY_LENGTH: usize = 256;

/// Request body for the SET operation (PUT /set)
///
/// # Fields
/// - `key`: The cache key to store the value under
/// - `value`: The value to store
/// - `ttl_ms`: Optional absolute lifetime in milliseconds
/// - `survive_ms`: Optional idle survival override in milliseconds
#[derive(Debug, Clone, Deserialize)]
pub struct SetRequest {
    /// The cache key
    pub key: String,
    /// The value to store
    pub value: String,
    /// Optional TTL in milliseconds
    #[serde(default)]
    pub ttl_ms: Option<u64>,
    /// Optional idle survival in milliseconds
    #[serde(default)]
    pub survive_ms: Option<u64>,
}

impl SetRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.key.is_empty() {
            return Some("Key cannot be empty".to_string());
        }
        if self.key.len() > MAX_KEY_LENGTH {
            return Some(format!(
                "Key exceeds maximum length of {} characters",
                MAX_KEY_LENGTH
            ));
        }
        None
    }

    /// Entry options carried by this request.
    pub fn entry_options(&self) -> EntryOptions {
        let mut options = EntryOptions::new();
        if let Some(ttl) = self.ttl_ms {
            options = options.ttl(Duration::from_millis(ttl));
        }
        if let Some(survive) = self.survive_ms {
            options = options.survive_time(Duration::from_millis(survive));
        }
        options
    }
}

/// Request body for the capacity operation (PUT /capacity)
#[derive(Debug, Clone, Deserialize)]
pub struct CapacityRequest {
    /// New capacity, negative values are rejected
    pub capacity: i64,
}
