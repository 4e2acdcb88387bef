use crate::source::SourceFile;
use brick_storage::{Access, PutOptions, StorageBackend};

/// Result of a single upload attempt.
#[derive(Clone, Debug)]
pub enum Outcome {
    Uploaded { url: String },
    /// The file is handed back so the attempt can be repeated.
    Failed { file: SourceFile, reason: String },
}
impl Outcome {
    pub fn is_uploaded(&self) -> bool {
        matches!(self, Self::Uploaded { .. })
    }
}

/// Upload one file to `key`.
///
/// Exactly one [`put`](StorageBackend::put) is attempted. Failing to read the
/// file or to store it never surfaces as an error; it becomes
/// [`Outcome::Failed`] carrying the file back to the caller.
#[tracing::instrument(skip_all, fields(backend = backend.name(), key = %key, file = file.name()))]
pub async fn upload_one(backend: &dyn StorageBackend, file: SourceFile, key: &str, access: Access) -> Outcome {
    let data = match file.read().await {
        Ok(data) => data,
        Err(err) => {
            let reason = (*err).to_string();
            tracing::warn!(%reason, "Could not read file for upload");
            return Outcome::Failed { file, reason };
        },
    };
    let options = PutOptions::new(access).with_content_type(file.media_type());
    match backend.put(key, &data, &options).await {
        Ok(object) => {
            tracing::debug!(url = %object.url, bytes = object.size, "Uploaded");
            Outcome::Uploaded { url: object.url }
        },
        Err(err) => {
            let reason = (*err).to_string();
            tracing::warn!(%reason, retryable = err.is_retryable(), "Upload failed");
            Outcome::Failed { file, reason }
        },
    }
}
