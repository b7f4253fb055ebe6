//! Cache of injected runtime files.
//!
//! # Data Flow
//! ```text
//! handler (cache miss)
//!     → injected.rs enqueue_store()        returns immediately
//!     → background.rs executor runs:
//!           plain copy   → blob.rs put("{url};{key}")
//!           compression.rs brotli → put("{url};{key};br")
//!
//! handler (next request)
//!     → injected.rs lookup()               br first, then plain
//! ```
//!
//! # Design Decisions
//! - Entries are deterministic for their key; concurrent misses may
//!   recompute and overwrite each other harmlessly
//! - Route cache policy is applied when serving, never when storing
//! - Write failures are logged and counted, never surfaced to clients

pub mod background;
pub mod blob;
pub mod compression;
pub mod injected;

use thiserror::Error;

pub use background::{BackgroundExecutor, BackgroundTasks};
pub use blob::{BlobCache, CacheEntry, MemoryBlobCache};
pub use compression::{BrotliEngine, CompressionEngine};
pub use injected::InjectedCache;

/// Errors raised by the injected-content cache.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Response has no body")]
    MissingBody,

    #[error("compression failed: {0}")]
    Compression(#[from] std::io::Error),

    #[error("cache backend error: {0}")]
    Backend(String),
}

pub type CacheResult<T> = Result<T, CacheError>;
