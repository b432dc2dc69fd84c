//! Error types for the cache engine and its HTTP front end
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Cache Error Enum ==
/// Unified error type for the cache engine.
///
/// A cache miss is never an error at the engine level; only the HTTP layer
/// turns a miss into [`CacheError::NotFound`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Requested capacity was negative
    #[error("Invalid capacity: {0} (must be >= 0)")]
    InvalidCapacity(i64),

    /// Key not found in cache
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::InvalidCapacity(_) => StatusCode::BAD_REQUEST,
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        };

        let body = Json(ErrorResponse::new(self.to_string()));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache engine.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_capacity_message() {
        let err = CacheError::InvalidCapacity(-3);
        assert!(err.to_string().contains("-3"));
    }

    #[test]
    fn test_error_status_codes() {
        let cases = vec![
            (CacheError::InvalidCapacity(-1), StatusCode::BAD_REQUEST),
            (CacheError::NotFound("k".to_string()), StatusCode::NOT_FOUND),
            (CacheError::InvalidRequest("bad".to_string()), StatusCode::BAD_REQUEST),
        ];

        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }
}
