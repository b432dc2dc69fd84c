//! HTTP front end for a `CacheEngine<String, String>`
//!
//! Key operations (`/set`, `/get/:key`, `/del/:key`) go through the normal
//! engine API and therefore update recency and statistics. The admin
//! endpoints (`/capacity`, `/stats`, `/info`, `/health`) expose the engine's
//! resize and diagnostics operations.

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
