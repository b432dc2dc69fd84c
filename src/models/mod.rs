//! HTTP request and response bodies
//!
//! `/stats` and `/info` serialize the engine's `CacheStats` and `CacheInfo`
//! directly and have no DTO of their own.

pub mod requests;
pub mod responses;

pub use requests::{CapacityRequest, SetRequest, MAX_KEY_LENGTH};
pub use responses::{DeleteResponse, ErrorResponse, GetResponse, HealthResponse, SetResponse};
