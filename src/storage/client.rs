//! Immutable-file fetching with compressed-sibling negotiation.

use std::sync::Arc;

use thiserror::Error;

use crate::config::StorageConfig;
use crate::observability::metrics;
use crate::rtv::Rtv;
use crate::storage::object::{ContentEncoding, ServedFile, StoredObject};
use crate::storage::paths::immutable_file_url;
use crate::storage::{ObjectStorage, StorageResult};

/// A non-success answer from backing storage, relayed to the client as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("🌩 {status} Error: {status_text}")]
pub struct FetchError {
    pub status: u16,
    pub status_text: String,
}

impl FetchError {
    pub fn new(status: u16, status_text: impl Into<String>) -> Self {
        Self {
            status,
            status_text: status_text.into(),
        }
    }

    pub fn not_found() -> Self {
        Self::new(404, "Not Found")
    }
}

/// Reads immutable runtime files out of backing storage.
#[derive(Clone)]
pub struct StorageClient {
    backend: Arc<dyn ObjectStorage>,
    base_url: String,
    compressed_suffix: String,
}

impl StorageClient {
    pub fn new(backend: Arc<dyn ObjectStorage>, config: &StorageConfig) -> Self {
        Self {
            backend,
            base_url: config.base_url.clone(),
            compressed_suffix: config.compressed_suffix.clone(),
        }
    }

    /// Storage URL of a runtime file.
    pub fn file_url(&self, rtv: &Rtv, path: &str) -> String {
        immutable_file_url(&self.base_url, rtv, path)
    }

    /// Fetch a runtime file of build `rtv`.
    pub async fn fetch_immutable_file(
        &self,
        rtv: &Rtv,
        path: &str,
        accepts_compression: bool,
    ) -> Result<ServedFile, FetchError> {
        self.fetch_immutable_url(&self.file_url(rtv, path), accepts_compression)
            .await
    }

    /// Fetch an immutable object by absolute URL.
    ///
    /// When the client accepts compression, the plain object and its
    /// pre-compressed sibling are requested concurrently and the sibling wins
    /// if it exists. The content type always comes from the plain object.
    pub async fn fetch_immutable_url(
        &self,
        url: &str,
        accepts_compression: bool,
    ) -> Result<ServedFile, FetchError> {
        if !accepts_compression {
            let plain = require_success(url, self.backend.fetch(url).await)?;
            return Ok(ServedFile::plain(plain.body, plain.content_type));
        }

        let compressed_url = format!("{url}{}", self.compressed_suffix);
        let (plain, compressed) = tokio::join!(
            self.backend.fetch(url),
            self.backend.fetch(&compressed_url)
        );
        let plain = require_success(url, plain)?;

        match compressed {
            Ok(compressed) if compressed.is_success() => {
                metrics::record_upstream_fetch("compressed", compressed.status);
                tracing::debug!(url = %compressed_url, "Serving pre-compressed sibling");
                Ok(ServedFile {
                    body: Some(compressed.body),
                    content_type: plain.content_type,
                    content_encoding: Some(ContentEncoding::Brotli),
                })
            }
            Ok(compressed) => {
                metrics::record_upstream_fetch("compressed", compressed.status);
                tracing::debug!(
                    url = %compressed_url,
                    status = compressed.status,
                    "No pre-compressed sibling"
                );
                Ok(ServedFile::plain(plain.body, plain.content_type))
            }
            Err(e) => {
                tracing::warn!(
                    url = %compressed_url,
                    error = %e,
                    "Pre-compressed fetch failed, serving plain"
                );
                Ok(ServedFile::plain(plain.body, plain.content_type))
            }
        }
    }
}

fn require_success(
    url: &str,
    result: StorageResult<StoredObject>,
) -> Result<StoredObject, FetchError> {
    match result {
        Ok(object) => {
            metrics::record_upstream_fetch("plain", object.status);
            if object.is_success() {
                Ok(object)
            } else {
                tracing::info!(url, status = object.status, "Upstream fetch unsuccessful");
                Err(FetchError::new(object.status, object.status_text))
            }
        }
        Err(e) => {
            tracing::error!(url, error = %e, "Upstream fetch failed");
            metrics::record_upstream_fetch("plain", 502);
            Err(FetchError::new(502, "Bad Gateway"))
        }
    }
}
