//! Error types for the caching engine
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
/// Unified error type shared by every cache implementation.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Key absent or expired
    #[error("Cache miss: {0}")]
    CacheMiss(String),

    /// Operation attempted while the cache is disabled
    #[error("Cache is inactive")]
    Inactive,

    /// Neither a remote store nor a local cache is wired in
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Counter operation on a non-numeric value
    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    /// Decrement of an unsigned counter below zero
    #[error("Counter underflow: {0}")]
    Underflow(String),

    /// Counter stepped past the bounds of its width
    #[error("Counter overflow: {0}")]
    Overflow(String),

    /// Delete or move on an absent key
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Payload or list node that cannot be interpreted
    #[error("Corrupt payload: {0}")]
    CorruptPayload(String),

    /// Binary object codec failure
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Cache is full and the write was not admitted
    #[error("Cache full: {0}")]
    CacheFull(String),

    /// Failure reported by the remote store client
    #[error("Remote store error: {0}")]
    Remote(#[source] anyhow::Error),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CacheError {
    /// Returns true for the expected, non-fatal miss outcome.
    pub fn is_miss(&self) -> bool {
        matches!(self, CacheError::CacheMiss(_))
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::CacheMiss(_) | CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CacheError::TypeMismatch(_) | CacheError::Underflow(_) | CacheError::Overflow(_) => {
                StatusCode::CONFLICT
            }
            CacheError::Inactive | CacheError::CacheFull(_) => StatusCode::SERVICE_UNAVAILABLE,
            CacheError::Configuration(_)
            | CacheError::CorruptPayload(_)
            | CacheError::Serialization(_)
            | CacheError::Remote(_)
            | CacheError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(ErrorResponse::new(self.to_string()));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the caching engine.
pub type Result<T> = std::result::Result<T, CacheError>;
