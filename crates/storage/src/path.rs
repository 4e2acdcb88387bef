//! Object key validation.
//!
//! Keys double as filesystem paths for [`LocalBackend`](crate::backend::LocalBackend)
//! and as URL paths for every other backend, so they must never escape the
//! storage root and are always rendered with forward slashes.

use crate::error::{ErrorKind, Result};
use std::path::{Component, Path};

/// Validates an object key for security and correctness.
/// Ensures that keys don't escape the storage root (no `..` traversal).
///
/// > **Note:** This does **not** normalize backslashes or platform-specific
/// >           weirdness. Null bytes and non-UTF8 segments are rejected.
///
/// # Returns
/// Returns the normalized key if valid, or [`InvalidKey`](crate::error::ErrorKind::InvalidKey)
/// if invalid.
///
/// # Examples
///
/// ```
/// use brick_storage::validate_key;
/// // Valid keys
/// assert!(validate_key("my-home/gallery/1700000000000-0.jpg").is_ok());
/// assert!(validate_key("a/../brochure.pdf").is_ok()); // (never leaves storage root)
/// // Invalid keys
/// assert!(validate_key("../etc/passwd").is_err());
/// assert!(validate_key("a/../../b").is_err());
/// assert!(validate_key("a\0b").is_err());
/// // Keys get resolved
/// assert_eq!(
///     validate_key("/wrong/../still-wrong/.././gallery//./0.jpg/").unwrap(),
///     "gallery/0.jpg"
/// );
/// ```
pub fn validate(key: impl AsRef<Path>) -> Result<String> {
    let key = key.as_ref();
    let invalid = || ErrorKind::InvalidKey(key.to_string_lossy().into_owned());
    let mut segments: Vec<&str> = Vec::new();
    for component in key.components() {
        match component {
            Component::Normal(s) => {
                // NUL survives Path::components() on Unix but truncates in syscalls.
                if s.as_encoded_bytes().contains(&0) {
                    exn::bail!(invalid());
                }
                let Some(segment) = s.to_str() else {
                    exn::bail!(invalid());
                };
                segments.push(segment);
            },
            Component::CurDir | Component::RootDir => {},
            Component::Prefix(_) => exn::bail!(invalid()),
            Component::ParentDir => {
                if segments.pop().is_none() {
                    exn::bail!(invalid());
                }
            },
        }
    }
    match segments.is_empty() {
        true => exn::bail!(invalid()),
        false => Ok(segments.join("/")),
    }
}
