//! Blob storage backing the injected-content cache.

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;

use crate::cache::CacheResult;
use crate::storage::{ContentEncoding, ServedFile};

/// A cached response body with the headers it is replayed with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub body: Bytes,
    pub content_type: Option<String>,
    pub content_encoding: Option<ContentEncoding>,
    /// Cache-Control recorded at store time. Replaced by route policy when served.
    pub cache_control: String,
}

impl CacheEntry {
    pub fn into_served_file(self) -> ServedFile {
        ServedFile {
            body: Some(self.body),
            content_type: self.content_type,
            content_encoding: self.content_encoding,
        }
    }
}

/// Key-addressed storage for cache entries.
#[async_trait]
pub trait BlobCache: Send + Sync {
    async fn get(&self, key: &str) -> CacheResult<Option<CacheEntry>>;

    async fn put(&self, key: &str, entry: CacheEntry) -> CacheResult<()>;
}

/// In-process blob cache with a cap on resident entries.
///
/// When full, an arbitrary entry is evicted to make room. Entries are
/// deterministic for their key, so losing one only costs a recomputation.
pub struct MemoryBlobCache {
    entries: DashMap<String, CacheEntry>,
    max_entries: usize,
}

impl MemoryBlobCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            max_entries: max_entries.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    fn evict_one(&self) {
        let victim = self.entries.iter().next().map(|entry| entry.key().clone());
        if let Some(key) = victim {
            self.entries.remove(&key);
            tracing::debug!(key = %key, "Evicted injected cache entry");
        }
    }
}

#[async_trait]
impl BlobCache for MemoryBlobCache {
    async fn get(&self, key: &str) -> CacheResult<Option<CacheEntry>> {
        Ok(self.entries.get(key).map(|entry| entry.value().clone()))
    }

    async fn put(&self, key: &str, entry: CacheEntry) -> CacheResult<()> {
        if !self.entries.contains_key(key) {
            while self.entries.len() >= self.max_entries {
                self.evict_one();
            }
        }
        self.entries.insert(key.to_string(), entry);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(body: &'static str) -> CacheEntry {
        CacheEntry {
            body: Bytes::from_static(body.as_bytes()),
            content_type: Some("text/javascript".to_string()),
            content_encoding: None,
            cache_control: "public, max-age=31536000".to_string(),
        }
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let cache = MemoryBlobCache::new(8);
        assert!(cache.get("a").await.unwrap().is_none());

        cache.put("a", entry("one")).await.unwrap();
        assert_eq!(cache.get("a").await.unwrap(), Some(entry("one")));

        cache.put("a", entry("two")).await.unwrap();
        assert_eq!(cache.get("a").await.unwrap(), Some(entry("two")));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_capacity_is_enforced() {
        let cache = MemoryBlobCache::new(2);
        cache.put("a", entry("a")).await.unwrap();
        cache.put("b", entry("b")).await.unwrap();
        cache.put("c", entry("c")).await.unwrap();

        assert_eq!(cache.len(), 2);
        assert!(cache.contains("c"));
    }
}
