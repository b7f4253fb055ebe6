//! Backing object storage for immutable runtime builds.
//!
//! # Data Flow
//! ```text
//! handler
//!     → client.rs (URL construction, plain + compressed sibling)
//!     → ObjectStorage backend (http.rs in production, memory.rs in tests)
//!     → ServedFile or FetchError
//! ```
//!
//! # Design Decisions
//! - Objects are immutable: the URL of a build file never changes content
//! - Transport failures and non-success statuses are kept apart so the
//!   client can map the former to 502 and relay the latter

pub mod client;
pub mod http;
pub mod memory;
pub mod object;
pub mod paths;

use async_trait::async_trait;
use thiserror::Error;

pub use client::{FetchError, StorageClient};
pub use http::HttpObjectStorage;
pub use memory::MemoryObjectStorage;
pub use object::{ContentEncoding, ServedFile, StoredObject};

/// Errors that prevented storage from answering at all.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Read access to objects addressed by absolute URL.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn fetch(&self, url: &str) -> StorageResult<StoredObject>;
}
