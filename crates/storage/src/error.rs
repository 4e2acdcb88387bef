//! Storage Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::io::Error as IoError;

/// A storage error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for storage operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Object does not exist
    #[display("object not found: {_0}")]
    NotFound(#[error(not(source))] String),
    /// Access denied (permissions or credentials)
    #[display("permission denied: {_0}")]
    PermissionDenied(#[error(not(source))] String),
    /// Underlying I/O error
    #[display("I/O error: {_0}")]
    Io(IoError),
    /// Network-related error (connection refused, TLS, DNS, etc.)
    #[display("network error: {_0}")]
    Network(#[error(not(source))] String),
    /// The remote endpoint answered, but refused the request.
    #[display("upload rejected with status {_0}")]
    Rejected(#[error(not(source))] u16),
    /// Key contains invalid characters or escapes the storage root
    #[display("invalid key: {_0}")]
    InvalidKey(#[error(not(source))] String),
    /// Backend-specific error
    #[display("backend error: {_0}")]
    BackendError(#[error(not(source))] String),
    /// The backend cannot perform this operation at all.
    #[display("{_0} is not supported by this backend")]
    Unsupported(#[error(not(source))] &'static str),
}
impl From<IoError> for ErrorKind {
    fn from(err: IoError) -> Self {
        Self::Io(err)
    }
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Io(_) | Self::Network(_) | Self::BackendError(_) => true,
            // Throttling and server-side hiccups are worth another go, the
            // rest of the 4xx range is not.
            Self::Rejected(status) => *status == 408 || *status == 429 || *status >= 500,
            _ => false,
        }
    }
}
