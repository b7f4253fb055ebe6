//! Key-value stores for channel versions and dynamic configuration.
//!
//! # Data Flow
//! ```text
//! external syncer
//!     → writes versions.json / config.json snapshots
//!     → watcher.rs notices the change
//!     → kv.rs swaps in the new snapshot atomically
//!     → VersionStore / ConfigStore readers see the new values
//! ```
//!
//! # Design Decisions
//! - The edge only reads; nothing here writes back to the snapshots
//! - Readers never lock: snapshots are swapped whole via arc-swap
//! - Eventually consistent: a request may see the previous snapshot

pub mod kv;
pub mod watcher;

use async_trait::async_trait;
use thiserror::Error;

pub use kv::KvNamespace;
pub use watcher::SnapshotWatcher;

/// Errors raised while loading or reading a store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read snapshot {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse snapshot {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("snapshot {0} is not a JSON object")]
    NotAnObject(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Channel name → RTV lookups.
#[async_trait]
pub trait VersionStore: Send + Sync {
    /// Look up the RTV a channel currently points at.
    async fn get(&self, channel: &str) -> StoreResult<Option<String>>;

    /// Every `(channel, rtv)` pair in the store.
    async fn list(&self) -> StoreResult<Vec<(String, String)>>;
}

/// Arbitrary JSON configuration lookups.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    async fn get_json(&self, key: &str) -> StoreResult<Option<serde_json::Value>>;
}
