//! Request and Response models for the cache server API
//!
//! Request-side header parsing and the JSON bodies of the service
//! endpoints.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::{RequestMeta, GZIP_ENCODING};
pub use responses::{ErrorResponse, HealthResponse, StatsResponse};
