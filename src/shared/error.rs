//! Shared Error Types
//!
//! This module defines the error types shared by the value layer and the
//! client-side sync machinery.
//!
//! # Error Categories
//!
//! - `NetworkError` - closed set of backend/transport failure kinds
//! - `SharedError` - validation and serialization failures
//!
//! # Usage
//!
//! ```rust
//! use basket_sync::shared::error::{NetworkError, SharedError};
//!
//! let error = SharedError::validation("name", "Name must not be empty");
//! assert_eq!(NetworkError::from_status(404), NetworkError::NotFound);
//! ```
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure kinds reported by the remote procedure transport.
///
/// The set is closed: every failure coming back from the backend is folded
/// into one of these kinds before it reaches the sync layer.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NetworkError {
    #[error("request timed out")]
    RequestTimeout,
    #[error("unauthorized")]
    Unauthorized,
    #[error("conflict")]
    Conflict,
    #[error("too many requests")]
    TooManyRequests,
    #[error("no internet connection")]
    NoInternet,
    #[error("payload too large")]
    PayloadTooLarge,
    #[error("server error")]
    ServerError,
    #[error("could not decode response")]
    Serialization,
    #[error("unknown error")]
    Unknown,
    #[error("not found")]
    NotFound,
}

impl NetworkError {
    /// Map an HTTP status code of a failed RPC call to an error kind.
    ///
    /// Only the statuses the backend documents are distinguished; everything
    /// else collapses to `Unknown`.
    pub fn from_status(status: u16) -> Self {
        match status {
            401 => Self::Unauthorized,
            404 => Self::NotFound,
            409 => Self::Conflict,
            408 => Self::RequestTimeout,
            413 => Self::PayloadTooLarge,
            500..=599 => Self::ServerError,
            _ => Self::Unknown,
        }
    }

    /// Wire name of the kind, as the backend spells it.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RequestTimeout => "REQUEST_TIMEOUT",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Conflict => "CONFLICT",
            Self::TooManyRequests => "TOO_MANY_REQUESTS",
            Self::NoInternet => "NO_INTERNET",
            Self::PayloadTooLarge => "PAYLOAD_TOO_LARGE",
            Self::ServerError => "SERVER_ERROR",
            Self::Serialization => "SERIALIZATION",
            Self::Unknown => "UNKNOWN",
            Self::NotFound => "NOT_FOUND",
        }
    }
}

/// Result of a single remote procedure call.
pub type RpcResult<T> = Result<T, NetworkError>;

/// Shared error types for value-level failures
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SharedError {
    /// JSON serialization or deserialization error
    #[error("Serialization error: {message}")]
    SerializationError {
        /// Human-readable error message
        message: String,
    },

    /// Data validation error
    #[error("Validation error in field '{field}': {message}")]
    ValidationError {
        /// The field that failed validation
        field: String,
        /// Human-readable error message
        message: String,
    },
}

impl SharedError {
    /// Create a new serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::SerializationError {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ValidationError {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for SharedError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(format!("JSON error: {}", err))
    }
}
