//! Upload Error Types
//!
//! Per-file upload failures are *not* errors: they are recorded on the item
//! (see [`ItemState::Failed`](crate::ItemState::Failed)) and reported through
//! the [`Summary`](crate::Summary). The kinds below cover reading local
//! files and calling [`Uploader`](crate::Uploader) operations on items that
//! are in the wrong state.

use derive_more::{Display, Error};

/// An upload error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for upload operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// A local file could not be opened or read.
    #[display("cannot read {_0}")]
    Read(#[error(not(source))] String),
    /// A preview could not be produced for the named file.
    #[display("cannot build a preview of {_0}")]
    Preview(#[error(not(source))] String),
    /// No valid object key could be derived.
    #[display("cannot derive an object key for {_0}")]
    Naming(#[error(not(source))] String),
    /// Position is past the end of the batch.
    #[display("no item at position {_0}")]
    NoSuchItem(#[error(not(source))] usize),
    /// Only failed items hold on to their file and can be retried.
    #[display("item at position {_0} has not failed")]
    NotRetryable(#[error(not(source))] usize),
    /// Items cannot be removed while their upload is in flight.
    #[display("item at position {_0} is still uploading")]
    StillUploading(#[error(not(source))] usize),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Read(_) | Self::StillUploading(_))
    }
}
