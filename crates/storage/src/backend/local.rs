//! Local filesystem storage backend.
//!
//! This module provides a storage backend implementation for the local
//! filesystem. Objects are stored in a configured directory (typically one a
//! web server already exposes) and accessed via `tokio::fs` for async I/O.

use crate::error::{ErrorKind, Result};
use crate::object::{Access, PutOptions, StoredObject, join_url};
use crate::{StorageBackend, path::validate as validate_key};
use async_trait::async_trait;
use std::fs::create_dir_all as sync_create_dir;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Local filesystem storage backend.
///
/// Stores objects in a directory on the local filesystem. All keys are
/// relative to the configured root directory, and public URLs are built by
/// appending the key to `base_url`.
///
/// # Examples
///
/// ```no_run
/// use brick_storage::backend::LocalBackend;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = LocalBackend::new("local", "/srv/www/uploads", "https://example.com/uploads")?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct LocalBackend {
    name: String,
    /// Root directory objects are written under
    root: PathBuf,
    base_url: String,
}
impl LocalBackend {
    /// Create a new local filesystem backend.
    ///
    /// # Arguments
    /// * `root` - Absolute path to the storage root directory
    /// * `base_url` - URL prefix the root directory is served from
    ///
    /// # Errors
    ///
    /// Returns an error if the path is not absolute, or exists but is not a
    /// directory.
    pub fn new(name: impl Into<String>, root: impl AsRef<Path>, base_url: impl Into<String>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_absolute() {
            exn::bail!(ErrorKind::InvalidKey(root.display().to_string()));
        }
        if root.exists() {
            if !root.is_dir() {
                exn::bail!(ErrorKind::InvalidKey(root.display().to_string()));
            }
        } else {
            // Runs once, when the backend is configured.
            sync_create_dir(&root).map_err(|e| Self::map_io_error(e, &root.display().to_string()))?;
        }
        Ok(Self {
            name: name.into(),
            root,
            base_url: base_url.into(),
        })
    }

    /// Get the absolute path for an object key.
    ///
    /// Validates the key and joins it with the root directory.
    fn absolute_path(&self, key: &str) -> Result<(String, PathBuf)> {
        let validated = validate_key(key)?;
        let path = self.root.join(&validated);
        Ok((validated, path))
    }

    fn map_io_error(e: std::io::Error, key: &str) -> ErrorKind {
        match e.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::NotFound(key.to_string()),
            std::io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied(key.to_string()),
            _ => ErrorKind::Io(e),
        }
    }
}

#[async_trait]
impl StorageBackend for LocalBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn put(&self, key: &str, data: &[u8], options: &PutOptions) -> Result<StoredObject> {
        let (key, abs_path) = self.absolute_path(key)?;
        if options.access == Access::Private {
            // Whoever serves the root decides visibility; nothing to enforce here.
            tracing::debug!(backend = %self.name, key = %key, "Private access requested on local backend");
        }
        // Create parent directories if needed, to keep behaviour consistent
        // with object stores that have no concept of directories.
        if let Some(parent) = abs_path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| Self::map_io_error(e, &key))?;
        }
        fs::write(&abs_path, data).await.map_err(|e| Self::map_io_error(e, &key))?;
        Ok(StoredObject {
            url: join_url(&self.base_url, &key),
            size: data.len() as u64,
            key,
        })
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let (_, abs_path) = self.absolute_path(key)?;
        Ok(fs::try_exists(&abs_path).await.map_err(ErrorKind::Io)?)
    }

    async fn read(&self, key: &str) -> Result<Vec<u8>> {
        let (key, abs_path) = self.absolute_path(key)?;
        Ok(fs::read(&abs_path).await.map_err(|e| Self::map_io_error(e, &key))?)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let (key, abs_path) = self.absolute_path(key)?;
        Ok(fs::remove_file(&abs_path).await.map_err(|e| Self::map_io_error(e, &key))?)
    }
}
