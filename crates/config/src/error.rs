//! Configuration Error Types

use derive_more::{Display, Error};

/// A configuration error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for configuration operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// An explicitly requested config file does not exist.
    #[display("config file not found: {_0}")]
    NotFound(#[error(not(source))] String),
    /// Config files must end in `.toml`, `.yaml`, `.yml` or `.json`.
    #[display("unsupported config format: {_0}")]
    UnsupportedFormat(#[error(not(source))] String),
    /// The merged configuration could not be deserialized.
    #[display("cannot parse configuration: {_0}")]
    Parse(#[error(not(source))] String),
    /// The configuration parsed, but a value is out of range.
    #[display("invalid configuration: {_0}")]
    Invalid(#[error(not(source))] String),
    /// The configured storage backend could not be set up.
    #[display("cannot set up storage backend {_0}")]
    Backend(#[error(not(source))] String),
    /// The backend type exists, but support for it was not compiled in.
    #[display("storage type {_0} requires the `{_0}` feature")]
    FeatureDisabled(#[error(not(source))] &'static str),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Backend(_))
    }
}
