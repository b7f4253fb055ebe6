//! HTTP object storage backend.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;

use crate::storage::{ObjectStorage, StorageResult, StoredObject};

/// Fetches objects from a public HTTP(S) bucket.
///
/// Runtime files are immutable, so upstream HTTP caching is left to the
/// bucket's own headers.
#[derive(Clone)]
pub struct HttpObjectStorage {
    client: reqwest::Client,
}

impl HttpObjectStorage {
    pub fn new(timeout: Duration) -> StorageResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("rtv-edge/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ObjectStorage for HttpObjectStorage {
    async fn fetch(&self, url: &str) -> StorageResult<StoredObject> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await?;

        Ok(StoredObject {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or("Unknown").to_string(),
            body,
            content_type,
        })
    }
}
