//! Response DTOs for the cache server API
//!
//! Outgoing bodies for the key operations. Statistics and diagnostics are
//! served straight from the engine snapshots.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cache::EntrySnapshot;

fn as_millis(duration: std::time::Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Body of a cache hit (GET /get/:key)
#[derive(Debug, Clone, Serialize)]
pub struct GetResponse {
    pub key: String,
    pub value: String,
    /// Hits recorded for the entry, including this one
    pub hit_count: u64,
    /// Milliseconds of TTL left, omitted for entries without TTL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl_remaining_ms: Option<u64>,
    pub inserted_at: DateTime<Utc>,
}

impl GetResponse {
    /// Builds the body from the value and the entry metadata read alongside it.
    pub fn from_snapshot(key: String, value: String, snapshot: &EntrySnapshot) -> Self {
        Self {
            key,
            value,
            hit_count: snapshot.hit_count,
            ttl_remaining_ms: snapshot.ttl_remaining.map(as_millis),
            inserted_at: snapshot.inserted_at,
        }
    }
}

/// Body returned after storing an entry (PUT /set)
#[derive(Debug, Clone, Serialize)]
pub struct SetResponse {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub survive_ms: Option<u64>,
    /// Entries held once the write completed
    pub size: usize,
}

/// Body returned after removing an entry (DELETE /del/:key)
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    pub key: String,
    pub removed: bool,
    pub size: usize,
}

/// Liveness report (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub sweep_running: bool,
    pub timestamp: DateTime<Utc>,
}

impl HealthResponse {
    pub fn healthy(sweep_running: bool) -> Self {
        Self {
            status: "healthy",
            sweep_running,
            timestamp: Utc::now(),
        }
    }
}

/// Error body shared by every failing endpoint
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn snapshot(ttl_remaining: Option<Duration>) -> EntrySnapshot {
        EntrySnapshot {
            hit_count: 3,
            age: Duration::from_millis(40),
            idle: Duration::from_millis(5),
            ttl_remaining,
            survive_time: None,
            context: None,
            sub_context: None,
            inserted_at: Utc::now(),
        }
    }

    #[test]
    fn test_get_response_carries_entry_metadata() {
        let resp = GetResponse::from_snapshot(
            "user:1".to_string(),
            "alice".to_string(),
            &snapshot(Some(Duration::from_millis(1500))),
        );
        let json = serde_json::to_value(&resp).unwrap();

        assert_eq!(json["value"], "alice");
        assert_eq!(json["hit_count"], 3);
        assert_eq!(json["ttl_remaining_ms"], 1500);
        assert!(json["inserted_at"].is_string());
    }

    #[test]
    fn test_get_response_omits_missing_ttl() {
        let resp = GetResponse::from_snapshot("k".to_string(), "v".to_string(), &snapshot(None));
        let json = serde_json::to_value(&resp).unwrap();
        assert!(json.get("ttl_remaining_ms").is_none());
    }

    #[test]
    fn test_set_response_skips_unset_durations() {
        let resp = SetResponse {
            key: "k".to_string(),
            ttl_ms: Some(100),
            survive_ms: None,
            size: 1,
        };
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["ttl_ms"], 100);
        assert!(json.get("survive_ms").is_none());
    }

    #[test]
    fn test_health_response_serialize() {
        let json = serde_json::to_value(HealthResponse::healthy(true)).unwrap();
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["sweep_running"], true);
        assert!(json["timestamp"].is_string());
    }

    #[test]
    fn test_error_response_serialize() {
        let json = serde_json::to_string(&ErrorResponse::new("capacity must be >= 0")).unwrap();
        assert_eq!(json, r#"{"error":"capacity must be >= 0"}"#);
    }
}
