//! Error types for the cache server
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Object Error Enum ==
/// Error taxonomy surfaced to HTTP clients.
#[derive(Error, Debug)]
pub enum ObjectError {
    /// Malformed path or body
    #[error("Invalid request: {0}")]
    Validation(String),

    /// Bucket policy denies the operation
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Object absent upstream
    #[error("Not found: {0}")]
    NotFound(String),

    /// Backend or unexpected failure
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ObjectError {
    /// Machine-readable error class.
    pub fn class(&self) -> &'static str {
        match self {
            ObjectError::Validation(_) => "validation_error",
            ObjectError::Forbidden(_) => "forbidden",
            ObjectError::NotFound(_) => "not_found",
            ObjectError::Internal(_) => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ObjectError::Validation(_) => StatusCode::BAD_REQUEST,
            ObjectError::Forbidden(_) => StatusCode::FORBIDDEN,
            ObjectError::NotFound(_) => StatusCode::NOT_FOUND,
            ObjectError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for ObjectError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse::new(self.class(), self.to_string()));

        (self.status(), body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache server.
pub type Result<T> = std::result::Result<T, ObjectError>;
