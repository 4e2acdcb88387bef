//! Types exchanged with storage backends when writing objects.

use derive_more::Display;

/// Visibility of a stored object.
///
/// Listing assets are served straight to browsers, so everything brick
/// writes is [`Public`](Self::Public) unless configured otherwise.
#[derive(Clone, Copy, Debug, Default, Display, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Access {
    #[default]
    #[display("public")]
    Public,
    #[display("private")]
    Private,
}

/// Options accompanying a single [`put`](crate::StorageBackend::put).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PutOptions {
    pub access: Access,
    /// Media type recorded with the object (e.g. `image/jpeg`).
    pub content_type: Option<String>,
}
impl PutOptions {
    pub fn new(access: Access) -> Self {
        Self { access, content_type: None }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// An object that has been written to a backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredObject {
    /// Normalized key the object was stored under.
    pub key: String,
    /// Where the object can be fetched from.
    pub url: String,
    /// Size in bytes.
    pub size: u64,
}

/// Joins a base URL and an object key with exactly one slash between them.
pub(crate) fn join_url(base: &str, key: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), key.trim_start_matches('/'))
}
