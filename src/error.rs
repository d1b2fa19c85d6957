//! Error types for the summary cache
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
/// Errors raised by the cache itself.
///
/// None of these are meant to reach an end user: the summary service treats
/// `Unavailable` as a forced miss and recomputes from the ledger.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Rejected input (non-positive TTL, malformed key parts)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The store could not be reached in time
    #[error("Cache unavailable: {0}")]
    Unavailable(String),

    /// A sweeper is already attached to this cache
    #[error("Sweeper already running for this cache")]
    SweeperRunning,
}

// == App Error Enum ==
/// Error type for the summary service and its HTTP surface.
#[derive(Error, Debug)]
pub enum AppError {
    /// Requested record does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<CacheError> for AppError {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::InvalidArgument(msg) => AppError::InvalidRequest(msg),
            other => AppError::Internal(other.to_string()),
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        (status, Json(ErrorResponse::new(message))).into_response()
    }
}

// == Result Type Aliases ==
/// Result type for cache operations.
pub type CacheResult<T> = std::result::Result<T, CacheError>;

/// Convenience Result type for the service layer.
pub type Result<T> = std::result::Result<T, AppError>;
