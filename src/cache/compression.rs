//! Brotli compression of injected bodies.

use std::io;

use async_compression::tokio::write::BrotliEncoder;
use async_compression::Level;
use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::AsyncWriteExt;
use tokio::runtime::Handle;

/// Compresses bodies for the pre-encoded cache variant.
#[async_trait]
pub trait CompressionEngine: Send + Sync {
    async fn compress(&self, data: Bytes, quality: u32) -> io::Result<Bytes>;
}

/// Brotli via `async-compression`.
///
/// Encoding at high quality is CPU-bound, so it runs on the blocking pool and
/// never occupies a runtime worker.
#[derive(Debug, Clone, Copy, Default)]
pub struct BrotliEngine;

#[async_trait]
impl CompressionEngine for BrotliEngine {
    async fn compress(&self, data: Bytes, quality: u32) -> io::Result<Bytes> {
        let handle = Handle::current();
        tokio::task::spawn_blocking(move || handle.block_on(encode(&data, quality)))
            .await
            .map_err(|e| io::Error::other(format!("spawn_blocking failed: {e}")))?
    }
}

/// Encode into memory. The writer never waits, so this completes in one poll.
async fn encode(data: &[u8], quality: u32) -> io::Result<Bytes> {
    let quality = i32::try_from(quality.min(11)).unwrap_or(11);
    let mut encoder = BrotliEncoder::with_quality(Vec::new(), Level::Precise(quality));
    encoder.write_all(data).await?;
    encoder.shutdown().await?;
    Ok(Bytes::from(encoder.into_inner()))
}
