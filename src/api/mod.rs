//! API Module
//!
//! HTTP handlers, middleware chain and routing for the cache server.
//!
//! # Endpoints
//! - `GET /objects/:bucket/*key` - Read an object (cached)
//! - `PUT /objects/:bucket/*key` - Write an object (invalidates)
//! - `DELETE /objects/:bucket/*key` - Delete an object (invalidates)
//! - `HEAD /objects/:bucket/*key` - Object metadata
//! - `GET /stats` - Cache statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod middleware;
pub mod routes;

pub use handlers::*;
pub use middleware::{apply_chain, AccessControl};
pub use routes::create_router;
