//! Hosted blob API backend.
//!
//! Uploads go through a two-step handshake:
//!
//! 1. `POST {handle_upload_url}` with `{ "pathname", "contentType", "access" }`.
//!    The route authorizes the upload server-side and answers with
//!    `{ "uploadUrl", "url" }`: where to send the bytes, and where the object
//!    will be publicly reachable afterwards.
//! 2. `PUT {uploadUrl}` with the raw bytes.
//!
//! Any non-2xx answer in either step becomes [`ErrorKind::Rejected`]; failing
//! to reach the server at all becomes [`ErrorKind::Network`].

use crate::error::{ErrorKind, Result};
use crate::object::{Access, PutOptions, StoredObject};
use crate::{StorageBackend, validate_key};
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UploadRequest<'a> {
    pathname: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    content_type: Option<&'a str>,
    access: Access,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadTicket {
    upload_url: String,
    url: String,
}

/// Storage backend talking to a hosted blob API through an upload-handling
/// route of the web application.
///
/// Only [`put`](StorageBackend::put) is supported; the hosted API is
/// write-only from the uploader's point of view.
#[derive(Clone)]
pub struct HttpBackend {
    name: String,
    client: reqwest::Client,
    handle_upload_url: String,
    token: Option<String>,
}
impl HttpBackend {
    pub fn new(name: impl Into<String>, handle_upload_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            client: reqwest::Client::new(),
            handle_upload_url: handle_upload_url.into(),
            token: None,
        }
    }

    /// Bearer token sent to the upload-handling route.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    fn network(err: reqwest::Error) -> ErrorKind {
        ErrorKind::Network(err.to_string())
    }

    async fn request_ticket(&self, key: &str, options: &PutOptions) -> Result<UploadTicket> {
        let body = UploadRequest {
            pathname: key,
            content_type: options.content_type.as_deref(),
            access: options.access,
        };
        let mut request = self.client.post(&self.handle_upload_url).json(&body);
        if let Some(token) = &self.token {
            request = request.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        let response = request.send().await.map_err(Self::network)?;
        let status = response.status();
        if !status.is_success() {
            exn::bail!(ErrorKind::Rejected(status.as_u16()));
        }
        Ok(response.json::<UploadTicket>().await.map_err(|e| ErrorKind::BackendError(e.to_string()))?)
    }
}

#[async_trait]
impl StorageBackend for HttpBackend {
    fn name(&self) -> &str {
        &self.name
    }

    #[tracing::instrument(skip_all, fields(backend = %self.name, key = %key, bytes = data.len()))]
    async fn put(&self, key: &str, data: &[u8], options: &PutOptions) -> Result<StoredObject> {
        let key = validate_key(key)?;
        let ticket = self.request_ticket(&key, options).await?;
        let mut request = self.client.put(&ticket.upload_url).body(data.to_vec());
        if let Some(content_type) = &options.content_type {
            request = request.header(CONTENT_TYPE, content_type);
        }
        let response = request.send().await.map_err(Self::network)?;
        let status = response.status();
        if !status.is_success() {
            exn::bail!(ErrorKind::Rejected(status.as_u16()));
        }
        tracing::debug!(url = %ticket.url, "Object uploaded");
        Ok(StoredObject {
            url: ticket.url,
            size: data.len() as u64,
            key,
        })
    }
}
