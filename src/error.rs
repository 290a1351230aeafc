//! Error types for the cache facade
//!
//! Provides unified error handling using thiserror. Plain cache misses are
//! never errors; everything here is either a store failure, a wiring mistake
//! or an HTTP-level rejection.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Cache Error Enum ==
/// Unified error type for caches, stores and the registry.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Filesystem failure reported by a store
    #[error("Store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Value could not be encoded for storage
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Failure reported by a memory-object backend
    #[error("Backend error: {0}")]
    Backend(String),

    /// A store with this name is already registered
    #[error("Store already defined: {0}")]
    StoreDefined(String),

    /// A cache with this name is already registered
    #[error("Cache already defined: {0}")]
    CacheDefined(String),

    /// No store registered under this name
    #[error("No store registered: {0}")]
    NoStore(String),

    /// No cache registered under this name
    #[error("No cache registered: {0}")]
    NoCache(String),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Key not found (or not fresh) in cache
    #[error("Key not found: {0}")]
    NotFound(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::NotFound(_) | CacheError::NoCache(_) | CacheError::NoStore(_) => {
                StatusCode::NOT_FOUND
            }
            CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CacheError::StoreDefined(_) | CacheError::CacheDefined(_) => StatusCode::CONFLICT,
            CacheError::Backend(_) => StatusCode::SERVICE_UNAVAILABLE,
            CacheError::Io(_)
            | CacheError::Serialization(_)
            | CacheError::InvalidConfig(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(ErrorResponse::new(self.to_string()));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache crate.
pub type Result<T> = std::result::Result<T, CacheError>;
