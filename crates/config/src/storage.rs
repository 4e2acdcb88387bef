use crate::error::{ErrorKind, Result};
use brick_storage::BackendHandle;
use brick_storage::backend::LocalBackend;
use directories::ProjectDirs;
use exn::ResultExt;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

/// Where uploaded objects are written.
///
/// Selected by the `type` key of the `[storage]` section.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageConfig {
    /// A directory on this machine, served from `base_url`.
    Local { root: PathBuf, base_url: String },
    /// An S3-compatible bucket.
    S3 {
        bucket: String,
        #[serde(default)]
        prefix: Option<String>,
        #[serde(default = "default_region")]
        region: String,
        #[serde(default)]
        endpoint: Option<String>,
        key_id: String,
        key_secret: String,
        public_url: String,
    },
    /// A hosted blob API reached through the web application's upload route.
    Http {
        handle_upload_url: String,
        #[serde(default)]
        token: Option<String>,
    },
}

impl Default for StorageConfig {
    fn default() -> Self {
        let root = ProjectDirs::from("", "", "brick")
            .map(|dirs| dirs.data_dir().join("objects"))
            .unwrap_or_else(|| std::env::temp_dir().join("brick"));
        Self::Local {
            base_url: format!("file://{}", root.display()),
            root,
        }
    }
}

fn default_region() -> String {
    "us-east-1".to_string()
}

impl StorageConfig {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Local { .. } => "local",
            Self::S3 { .. } => "s3",
            Self::Http { .. } => "http",
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        match self {
            Self::Local { root, .. } if !root.is_absolute() => {
                exn::bail!(ErrorKind::Invalid(format!("storage.root must be absolute, got {}", root.display())))
            },
            Self::S3 { bucket, .. } if bucket.is_empty() => {
                exn::bail!(ErrorKind::Invalid("storage.bucket must not be empty".to_string()))
            },
            Self::Http { handle_upload_url, .. } if handle_upload_url.is_empty() => {
                exn::bail!(ErrorKind::Invalid("storage.handle_upload_url must not be empty".to_string()))
            },
            _ => Ok(()),
        }
    }

    /// Construct the configured backend.
    #[tracing::instrument(skip(self), fields(storage = self.type_name()))]
    pub async fn build(&self) -> Result<BackendHandle> {
        let name = self.type_name();
        match self {
            Self::Local { root, base_url } => {
                let backend = LocalBackend::new(name, root, base_url).or_raise(|| ErrorKind::Backend(name.to_string()))?;
                Ok(Arc::new(backend))
            },
            #[cfg(feature = "s3")]
            Self::S3 {
                bucket,
                prefix,
                region,
                endpoint,
                key_id,
                key_secret,
                public_url,
            } => {
                let backend = brick_storage::backend::S3Backend::new(
                    name,
                    bucket,
                    prefix.clone(),
                    region,
                    endpoint.as_deref(),
                    key_id,
                    key_secret,
                    public_url,
                )
                .await
                .or_raise(|| ErrorKind::Backend(name.to_string()))?;
                Ok(Arc::new(backend))
            },
            #[cfg(not(feature = "s3"))]
            Self::S3 { .. } => exn::bail!(ErrorKind::FeatureDisabled("s3")),
            #[cfg(feature = "http")]
            Self::Http { handle_upload_url, token } => {
                let mut backend = brick_storage::backend::HttpBackend::new(name, handle_upload_url);
                if let Some(token) = token {
                    backend = backend.with_token(token);
                }
                Ok(Arc::new(backend))
            },
            #[cfg(not(feature = "http"))]
            Self::Http { .. } => exn::bail!(ErrorKind::FeatureDisabled("http")),
        }
    }
}
