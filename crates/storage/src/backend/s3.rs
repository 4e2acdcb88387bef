//! S3-compatible storage backend.
//!
//! This module provides a storage backend implementation for S3-compatible
//! services including AWS S3, Backblaze B2, Cloudflare R2, MinIO and others.
//!
//! # Credentials
//!
//! Credentials are provided explicitly via the configuration file.
//!
//! # Public URLs
//!
//! Object URLs are built from `public_url` (a CDN or the bucket's public
//! endpoint), never from the API endpoint, since the two rarely coincide for
//! S3-compatible providers.

use crate::error::{ErrorKind, Result};
use crate::object::{Access, PutOptions, StoredObject, join_url};
use crate::{StorageBackend, validate_key};
use async_trait::async_trait;
use aws_sdk_s3::{
    Client,
    config::{BehaviorVersion, Credentials, Region, http::HttpResponse, retry::RetryConfig},
    error::SdkError,
    primitives::ByteStream,
    types::ObjectCannedAcl,
};
use exn::ResultExt;
use std::fmt::Debug;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Generous default for concurrent S3 requests. The batch runner keeps its
/// own (much lower) ceiling; this only guards against many runners sharing
/// one backend.
const DEFAULT_CONCURRENT_REQUESTS: usize = 100;

/// S3-compatible storage backend.
///
/// Stores objects in an S3 bucket, optionally under a key prefix. All keys
/// are relative to the configured prefix (if any).
///
/// # Examples
///
/// ```no_run
/// use brick_storage::backend::S3Backend;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = S3Backend::new(
///     "listings",
///     "listing-assets",
///     Some("uploads/".to_string()),
///     "auto",
///     Some("https://account.r2.cloudflarestorage.com".to_string()),
///     "access_key_id",
///     "secret_access_key",
///     "https://assets.example.com",
/// ).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct S3Backend {
    name: String,
    client: Client,
    bucket: String,
    prefix: Option<String>,
    public_url: String,
    /// Rate limiter for concurrent S3 requests.
    rate_limiter: Arc<Semaphore>,
}

impl S3Backend {
    /// Create a new S3 storage backend.
    ///
    /// # Arguments
    /// * `name` - A name for this backend (used in logging)
    /// * `bucket` - S3 bucket name
    /// * `prefix` - Optional key prefix (acts as virtual directory)
    /// * `region` - AWS region or provider-specific region (e.g., "auto" for R2)
    /// * `endpoint` - Custom endpoint URL for S3-compatible services
    /// * `key_id` - AWS/provider access key ID
    /// * `key_secret` - AWS/provider secret access key
    /// * `public_url` - URL prefix objects are publicly served from
    #[allow(clippy::too_many_arguments)]
    pub async fn new(
        name: impl Into<String>,
        bucket: impl Into<String>,
        prefix: Option<String>,
        region: impl Into<String>,
        endpoint: Option<impl Into<String>>,
        key_id: impl Into<String>,
        key_secret: impl Into<String>,
        public_url: impl Into<String>,
    ) -> Result<Self> {
        let prefix = prefix.map(validate_key).transpose()?;
        let credentials = Credentials::new(key_id, key_secret, None, None, "brick-config");
        let mut config_builder = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(Region::new(region.into()))
            // Retrying is left to the user, one failed item at a time.
            .retry_config(RetryConfig::disabled())
            // Use path-style addressing for better compatibility with
            // S3-compatible services (Backblaze, MinIO, etc.)
            .force_path_style(true);
        if let Some(endpoint_url) = endpoint {
            config_builder = config_builder.endpoint_url(endpoint_url);
        }
        Ok(Self {
            name: name.into(),
            client: Client::from_conf(config_builder.build()),
            bucket: bucket.into(),
            prefix,
            public_url: public_url.into(),
            rate_limiter: Arc::new(Semaphore::new(DEFAULT_CONCURRENT_REQUESTS)),
        })
    }

    /// Construct the full S3 key from a validated relative key.
    fn full_key(&self, key: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix}/{key}"),
            None => key.to_string(),
        }
    }

    /// Acquire a rate limiter permit before making an S3 API call.
    async fn acquire_permit(&self) -> Result<OwnedSemaphorePermit> {
        self.rate_limiter
            .clone()
            .acquire_owned()
            .await
            .or_raise(|| ErrorKind::BackendError("S3 rate limiter closed".to_string()))
    }

    fn map_sdk_error<E: Debug>(err: SdkError<E, HttpResponse>, key: &str) -> ErrorKind {
        match err.raw_response().map(|response| response.status().as_u16()) {
            Some(404) => ErrorKind::NotFound(key.to_string()),
            Some(401 | 403) => ErrorKind::PermissionDenied(key.to_string()),
            Some(status) => ErrorKind::Rejected(status),
            // No response at all: construction, dispatch or timeout failure.
            None => ErrorKind::Network(format!("{err:?}")),
        }
    }
}

#[async_trait]
impl StorageBackend for S3Backend {
    fn name(&self) -> &str {
        &self.name
    }

    #[tracing::instrument(skip_all, fields(backend = %self.name, key = %key, bytes = data.len()))]
    async fn put(&self, key: &str, data: &[u8], options: &PutOptions) -> Result<StoredObject> {
        let key = validate_key(key)?;
        let full_key = self.full_key(&key);
        let _permit = self.acquire_permit().await?;
        let mut request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(&full_key)
            .body(ByteStream::from(data.to_vec()));
        if let Some(content_type) = &options.content_type {
            request = request.content_type(content_type);
        }
        if options.access == Access::Public {
            request = request.acl(ObjectCannedAcl::PublicRead);
        }
        request.send().await.map_err(|e| Self::map_sdk_error(e, &key))?;
        Ok(StoredObject {
            url: join_url(&self.public_url, &full_key),
            size: data.len() as u64,
            key,
        })
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let key = validate_key(key)?;
        let _permit = self.acquire_permit().await?;
        match self.client.head_object().bucket(&self.bucket).key(self.full_key(&key)).send().await {
            Ok(_) => Ok(true),
            Err(e) => match Self::map_sdk_error(e, &key) {
                ErrorKind::NotFound(_) => Ok(false),
                kind => Err(kind.into()),
            },
        }
    }

    async fn read(&self, key: &str) -> Result<Vec<u8>> {
        let key = validate_key(key)?;
        let _permit = self.acquire_permit().await?;
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(self.full_key(&key))
            .send()
            .await
            .map_err(|e| Self::map_sdk_error(e, &key))?;
        let data = output.body.collect().await.or_raise(|| ErrorKind::Network(format!("reading body of {key}")))?;
        Ok(data.into_bytes().to_vec())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let key = validate_key(key)?;
        let _permit = self.acquire_permit().await?;
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(self.full_key(&key))
            .send()
            .await
            .map_err(|e| Self::map_sdk_error(e, &key))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn backend(prefix: Option<&str>) -> S3Backend {
        S3Backend::new(
            "s3",
            "bucket",
            prefix.map(str::to_string),
            "auto",
            Some("http://127.0.0.1:9000"),
            "key",
            "secret",
            "https://assets.example.com/",
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_full_key_without_prefix() {
        let backend = backend(None).await;
        assert_eq!(backend.full_key("my-home/gallery/1-0.jpg"), "my-home/gallery/1-0.jpg");
    }

    #[tokio::test]
    async fn test_full_key_with_prefix() {
        let backend = backend(Some("uploads")).await;
        assert_eq!(backend.full_key("my-home/gallery/1-0.jpg"), "uploads/my-home/gallery/1-0.jpg");
    }

    #[tokio::test]
    async fn test_prefix_is_normalized() {
        let backend = backend(Some("/uploads//listings/")).await;
        assert_eq!(backend.full_key("a.pdf"), "uploads/listings/a.pdf");
    }

    #[tokio::test]
    async fn test_invalid_prefix_rejected() {
        let result = S3Backend::new(
            "s3",
            "bucket",
            Some("../escape".to_string()),
            "auto",
            None::<String>,
            "key",
            "secret",
            "https://assets.example.com",
        )
        .await;
        assert!(result.is_err());
    }
}
