use crate::error::{ErrorKind, Result};
use brick_storage::Access;
use brick_upload::policy::{Limits, MediaKind};
use brick_upload::{DEFAULT_CONCURRENCY, Settings};
use serde::{Deserialize, Serialize};

/// The `[upload]` section.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub concurrency: usize,
    pub access: Access,
    pub images: Limits,
    pub documents: Limits,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            access: Access::default(),
            images: Limits::images(),
            documents: Limits::documents(),
        }
    }
}

impl UploadConfig {
    pub fn limits(&self, kind: MediaKind) -> Limits {
        match kind {
            MediaKind::Image => self.images,
            MediaKind::Document => self.documents,
        }
    }

    /// Uploader settings for a batch of `kind`.
    pub fn settings(&self, kind: MediaKind) -> Settings {
        Settings::new(kind)
            .with_limits(self.limits(kind))
            .with_concurrency(self.concurrency)
            .with_access(self.access)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            exn::bail!(ErrorKind::Invalid("upload.concurrency must be at least 1".to_string()));
        }
        for (section, limits) in [("images", &self.images), ("documents", &self.documents)] {
            if limits.max_file_bytes == 0 {
                exn::bail!(ErrorKind::Invalid(format!("upload.{section}.max_file_bytes must be at least 1")));
            }
            if limits.max_items == 0 {
                exn::bail!(ErrorKind::Invalid(format!("upload.{section}.max_items must be at least 1")));
            }
            if limits.max_batch_bytes == Some(0) {
                exn::bail!(ErrorKind::Invalid(format!("upload.{section}.max_batch_bytes must be at least 1")));
            }
        }
        Ok(())
    }
}
