//! Dual plain/brotli storage of injected files.

use std::sync::Arc;

use crate::cache::{
    BackgroundTasks, BlobCache, CacheEntry, CacheError, CacheResult, CompressionEngine,
};
use crate::http::response::CachePolicy;
use crate::observability::metrics;
use crate::storage::{ContentEncoding, ServedFile};

/// Key of the identity-encoded copy.
pub fn cache_key(url: &str, key: &str) -> String {
    format!("{url};{key}")
}

/// Key of the brotli-compressed copy.
pub fn compressed_cache_key(url: &str, key: &str) -> String {
    format!("{url};{key};{}", ContentEncoding::Brotli.as_str())
}

/// Cache of files after dynamic content was injected into them.
///
/// Addressed by the storage URL of the source file plus a dynamic key that
/// captures every per-request input the injection depended on.
#[derive(Clone)]
pub struct InjectedCache {
    blobs: Arc<dyn BlobCache>,
    compressor: Arc<dyn CompressionEngine>,
    tasks: BackgroundTasks,
    quality: u32,
}

impl InjectedCache {
    pub fn new(
        blobs: Arc<dyn BlobCache>,
        compressor: Arc<dyn CompressionEngine>,
        tasks: BackgroundTasks,
        quality: u32,
    ) -> Self {
        Self {
            blobs,
            compressor,
            tasks,
            quality,
        }
    }

    /// Find a previously injected file.
    ///
    /// Clients accepting brotli get the compressed copy when there is one and
    /// the plain copy otherwise. Backend errors count as misses.
    pub async fn lookup(
        &self,
        url: &str,
        key: &str,
        accepts_compression: bool,
    ) -> Option<ServedFile> {
        if accepts_compression {
            if let Some(entry) = self.get(&compressed_cache_key(url, key)).await {
                metrics::record_cache_lookup("compressed_hit");
                return Some(entry.into_served_file());
            }
        }

        match self.get(&cache_key(url, key)).await {
            Some(entry) => {
                metrics::record_cache_lookup("plain_hit");
                Some(entry.into_served_file())
            }
            None => {
                metrics::record_cache_lookup("miss");
                None
            }
        }
    }

    async fn get(&self, key: &str) -> Option<CacheEntry> {
        match self.blobs.get(key).await {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(key, error = %e, "Injected cache read failed");
                None
            }
        }
    }

    /// Schedule `file` to be cached and return without waiting.
    ///
    /// `file` must be identity-encoded.
    pub fn enqueue_store(&self, file: &ServedFile, url: &str, key: &str) -> CacheResult<()> {
        if file.body.is_none() {
            tracing::error!(url, key, "Refusing to cache a file without a body");
            return Err(CacheError::MissingBody);
        }

        let cache = self.clone();
        let file = file.clone();
        let url = url.to_string();
        let key = key.to_string();
        self.tasks.extend(async move {
            if let Err(e) = cache.store(&file, &url, &key).await {
                tracing::warn!(url = %url, key = %key, error = %e, "Injected cache write failed");
            }
        });
        Ok(())
    }

    /// Write the plain and compressed copies of `file`.
    pub async fn store(&self, file: &ServedFile, url: &str, key: &str) -> CacheResult<()> {
        let body = file.body.clone().ok_or(CacheError::MissingBody)?;
        tracing::debug!(url, key, "Caching injected file");

        let plain = CacheEntry {
            body: body.clone(),
            content_type: file.content_type.clone(),
            content_encoding: None,
            cache_control: CachePolicy::StaticRtvFile.header_value().to_string(),
        };
        let plain_key = cache_key(url, key);
        let plain_write = self.blobs.put(&plain_key, plain);

        let compressed_write = async {
            let compressed = self.compressor.compress(body.clone(), self.quality).await?;
            let entry = CacheEntry {
                body: compressed,
                content_type: file.content_type.clone(),
                content_encoding: Some(ContentEncoding::Brotli),
                cache_control: CachePolicy::StaticRtvFile.header_value().to_string(),
            };
            self.blobs.put(&compressed_cache_key(url, key), entry).await
        };

        let (plain, compressed) = tokio::join!(plain_write, compressed_write);
        metrics::record_cache_write("plain", plain.is_ok());
        metrics::record_cache_write("compressed", compressed.is_ok());
        plain?;
        compressed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{BackgroundExecutor, BrotliEngine, MemoryBlobCache};
    use async_trait::async_trait;
    use std::time::Duration;
    use tokio::sync::broadcast;

    /// Blob cache whose writes never finish.
    struct StalledBlobs;

    #[async_trait]
    impl BlobCache for StalledBlobs {
        async fn get(&self, _key: &str) -> CacheResult<Option<CacheEntry>> {
            Ok(None)
        }

        async fn put(&self, _key: &str, _entry: CacheEntry) -> CacheResult<()> {
            std::future::pending().await
        }
    }

    /// Blob cache whose writes always fail.
    struct BrokenBlobs;

    #[async_trait]
    impl BlobCache for BrokenBlobs {
        async fn get(&self, _key: &str) -> CacheResult<Option<CacheEntry>> {
            Ok(None)
        }

        async fn put(&self, _key: &str, _entry: CacheEntry) -> CacheResult<()> {
            Err(CacheError::Backend("bucket unavailable".to_string()))
        }
    }

    fn cache_over(blobs: Arc<dyn BlobCache>) -> (InjectedCache, broadcast::Sender<()>) {
        let (executor, tasks) = BackgroundExecutor::new(Duration::from_secs(1));
        let (tx, shutdown) = broadcast::channel(1);
        tokio::spawn(executor.run(shutdown));
        (InjectedCache::new(blobs, Arc::new(BrotliEngine), tasks, 11), tx)
    }

    const URL: &str = "https://storage.example.com/rtv/012105150310000/v0.js";

    fn cache_with_blobs() -> (InjectedCache, Arc<MemoryBlobCache>, broadcast::Sender<()>) {
        let (executor, tasks) = BackgroundExecutor::new(Duration::from_secs(1));
        let (tx, shutdown) = broadcast::channel(1);
        tokio::spawn(executor.run(shutdown));

        let blobs = Arc::new(MemoryBlobCache::new(64));
        let cache = InjectedCache::new(blobs.clone(), Arc::new(BrotliEngine), tasks, 11);
        (cache, blobs, tx)
    }

    fn file() -> ServedFile {
        ServedFile::plain("self.AMP_EXP={};", Some("text/javascript".to_string()))
    }

    #[test]
    fn test_cache_keys() {
        assert_eq!(cache_key("u", "k"), "u;k");
        assert_eq!(compressed_cache_key("u", "k"), "u;k;br");
    }

    #[tokio::test]
    async fn test_store_writes_both_copies() {
        let (cache, blobs, _tx) = cache_with_blobs();
        cache.store(&file(), URL, "abc").await.unwrap();

        let plain = blobs.get(&cache_key(URL, "abc")).await.unwrap().unwrap();
        assert_eq!(plain.body, file().body_bytes());
        assert_eq!(plain.content_encoding, None);
        assert_eq!(plain.cache_control, "public, max-age=31536000");

        let compressed = blobs
            .get(&compressed_cache_key(URL, "abc"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(compressed.content_encoding, Some(ContentEncoding::Brotli));
        assert_eq!(compressed.content_type.as_deref(), Some("text/javascript"));
        assert_ne!(compressed.body, plain.body);
    }

    #[tokio::test]
    async fn test_lookup_prefers_compressed_copy() {
        let (cache, _blobs, _tx) = cache_with_blobs();
        cache.store(&file(), URL, "abc").await.unwrap();

        let hit = cache.lookup(URL, "abc", true).await.unwrap();
        assert_eq!(hit.content_encoding, Some(ContentEncoding::Brotli));

        let hit = cache.lookup(URL, "abc", false).await.unwrap();
        assert_eq!(hit, file());
    }

    #[tokio::test]
    async fn test_lookup_falls_back_to_plain_copy() {
        let (cache, blobs, _tx) = cache_with_blobs();
        blobs
            .put(
                &cache_key(URL, "abc"),
                CacheEntry {
                    body: file().body_bytes(),
                    content_type: file().content_type,
                    content_encoding: None,
                    cache_control: "public, max-age=31536000".to_string(),
                },
            )
            .await
            .unwrap();

        let hit = cache.lookup(URL, "abc", true).await.unwrap();
        assert_eq!(hit.content_encoding, None);
        assert!(cache.lookup(URL, "other", true).await.is_none());
    }

    #[tokio::test]
    async fn test_enqueue_store_is_deferred() {
        let (cache, blobs, _tx) = cache_with_blobs();
        cache.enqueue_store(&file(), URL, "abc").unwrap();

        cache.tasks.wait_idle().await;
        assert!(blobs.contains(&cache_key(URL, "abc")));
        assert!(blobs.contains(&compressed_cache_key(URL, "abc")));
    }

    #[tokio::test]
    async fn test_missing_body_is_rejected() {
        let (cache, blobs, _tx) = cache_with_blobs();
        let file = ServedFile {
            body: None,
            content_type: None,
            content_encoding: None,
        };

        assert!(matches!(
            cache.enqueue_store(&file, URL, "abc"),
            Err(CacheError::MissingBody)
        ));
        assert!(blobs.is_empty());
    }

    #[tokio::test]
    async fn test_enqueue_store_does_not_wait_for_writes() {
        let (cache, _tx) = cache_over(Arc::new(StalledBlobs));

        cache.enqueue_store(&file(), URL, "abc").unwrap();
        tokio::task::yield_now().await;

        assert_eq!(cache.tasks.in_flight(), 1);
        assert!(cache.lookup(URL, "abc", true).await.is_none());
    }

    #[tokio::test]
    async fn test_failed_writes_stay_in_background() {
        let (cache, _tx) = cache_over(Arc::new(BrokenBlobs));

        assert!(cache.store(&file(), URL, "abc").await.is_err());

        cache.enqueue_store(&file(), URL, "abc").unwrap();
        cache.tasks.wait_idle().await;
        assert!(cache.lookup(URL, "abc", false).await.is_none());
    }
}
