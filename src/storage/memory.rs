//! In-process object storage.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;

use crate::storage::{ObjectStorage, StorageResult, StoredObject};

/// Object storage held in memory, keyed by absolute URL.
///
/// Unknown URLs answer `404 Not Found`, like a bucket would. The most recent
/// fetched URLs are recorded so callers can inspect the access pattern.
#[derive(Default)]
pub struct MemoryObjectStorage {
    objects: DashMap<String, StoredObject>,
    requests: Mutex<VecDeque<String>>,
}

/// Number of fetched URLs kept by [`MemoryObjectStorage::requests`].
pub const MAX_RECORDED_REQUESTS: usize = 1024;

impl MemoryObjectStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a successful object.
    pub fn insert(
        &self,
        url: impl Into<String>,
        body: impl Into<Bytes>,
        content_type: Option<&str>,
    ) {
        self.objects.insert(
            url.into(),
            StoredObject {
                status: 200,
                status_text: "OK".to_string(),
                body: body.into(),
                content_type: content_type.map(str::to_string),
            },
        );
    }

    /// Make a URL answer with an error status.
    pub fn insert_status(&self, url: impl Into<String>, status: u16, status_text: &str) {
        self.objects.insert(
            url.into(),
            StoredObject {
                status,
                status_text: status_text.to_string(),
                body: Bytes::new(),
                content_type: None,
            },
        );
    }

    /// Most recently fetched URLs, oldest first.
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .map(|requests| requests.iter().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ObjectStorage for MemoryObjectStorage {
    async fn fetch(&self, url: &str) -> StorageResult<StoredObject> {
        if let Ok(mut requests) = self.requests.lock() {
            if requests.len() == MAX_RECORDED_REQUESTS {
                requests.pop_front();
            }
            requests.push_back(url.to_string());
        }

        Ok(self
            .objects
            .get(url)
            .map(|object| object.value().clone())
            .unwrap_or_else(|| StoredObject {
                status: 404,
                status_text: "Not Found".to_string(),
                body: Bytes::new(),
                content_type: None,
            }))
    }
}
