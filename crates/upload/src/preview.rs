//! Local previews.
//!
//! A preview is the file itself as a `data:` URI, so a thumbnail can be shown
//! the moment a file is picked, before (and regardless of whether) the upload
//! reaches the server.

use crate::error::{ErrorKind, Result};
use crate::source::SourceFile;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use exn::ResultExt;

/// Encode `file` as `data:{media_type};base64,{contents}`.
///
/// Reading happens on the async runtime; the caller is suspended, not
/// blocked. Fails with [`ErrorKind::Preview`] when the file cannot be read.
#[tracing::instrument(skip_all, fields(file = file.name(), bytes = file.size()))]
pub async fn encode(file: &SourceFile) -> Result<String> {
    let data = file.read().await.or_raise(|| ErrorKind::Preview(file.name().to_string()))?;
    Ok(data_uri(file.media_type(), &data))
}

/// Format raw bytes as a base64 `data:` URI.
pub fn data_uri(media_type: &str, data: &[u8]) -> String {
    let mut uri = String::with_capacity(media_type.len() + 13 + data.len().div_ceil(3) * 4);
    uri.push_str("data:");
    uri.push_str(media_type);
    uri.push_str(";base64,");
    STANDARD.encode_string(data, &mut uri);
    uri
}
