//! Storage backend trait and implementations.
//!
//! This module defines the `StorageBackend` trait, the single seam between
//! the upload pipeline and wherever listing assets end up (local disk,
//! S3-compatible buckets, a hosted blob API).

#[cfg(feature = "http")]
mod http;
mod local;
#[cfg(feature = "mock")]
mod mock;
#[cfg(feature = "s3")]
mod s3;

#[cfg(feature = "http")]
pub use self::http::HttpBackend;
pub use self::local::LocalBackend;
#[cfg(feature = "mock")]
pub use self::mock::MockBackend;
#[cfg(feature = "s3")]
pub use self::s3::S3Backend;
use crate::error::{ErrorKind, Result};
use crate::object::{PutOptions, StoredObject};
use async_trait::async_trait;

/// Unified interface for storage backends.
///
/// All storage operations are asynchronous; uploads are network-bound and
/// the batch runner multiplexes several of them on one task.
///
/// # Keys
/// All keys are relative to the storage root and must be validated using
/// [`validate_key`](crate::validate_key) before use. Implementations enforce
/// this validation.
///
/// # Examples
///
/// ```
/// use brick_storage::{PutOptions, StorageBackend, error::Result};
///
/// async fn publish(backend: &dyn StorageBackend, jpeg: &[u8]) -> Result<String> {
///     let options = PutOptions::default().with_content_type("image/jpeg");
///     let stored = backend.put("my-home/gallery/1700000000000-0.jpg", jpeg, &options).await?;
///     Ok(stored.url)
/// }
/// ```
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Name of the configured backend. Used for logging only.
    fn name(&self) -> &str;

    /// Write an object, creating or overwriting it.
    ///
    /// Returns where the object can be fetched from. This is the only
    /// operation the upload pipeline depends on; everything else exists for
    /// tooling and tests.
    async fn put(&self, key: &str, data: &[u8], options: &PutOptions) -> Result<StoredObject>;

    /// Check if an object exists.
    async fn exists(&self, key: &str) -> Result<bool> {
        let _ = key;
        exn::bail!(ErrorKind::Unsupported("exists"))
    }

    /// Read an object's contents.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the object
    /// does not exist.
    async fn read(&self, key: &str) -> Result<Vec<u8>> {
        let _ = key;
        exn::bail!(ErrorKind::Unsupported("read"))
    }

    /// Delete an object.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the object
    /// does not exist.
    async fn delete(&self, key: &str) -> Result<()> {
        let _ = key;
        exn::bail!(ErrorKind::Unsupported("delete"))
    }
}
