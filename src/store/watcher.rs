//! Snapshot file watcher for hot reload.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};

use crate::observability::metrics;
use crate::store::KvNamespace;

/// A watcher that reloads a namespace whenever its snapshot file changes.
pub struct SnapshotWatcher {
    path: PathBuf,
    namespace: Arc<KvNamespace>,
}

impl SnapshotWatcher {
    /// Create a new SnapshotWatcher.
    pub fn new(path: &Path, namespace: Arc<KvNamespace>) -> Self {
        Self {
            path: path.to_path_buf(),
            namespace,
        }
    }

    /// Start watching the file in a background thread.
    ///
    /// The parent directory is watched rather than the file itself, so a
    /// snapshot replaced by rename is picked up every time. The returned
    /// watcher must be kept alive for reloads to continue.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let path = self.path.clone();
        let namespace = self.namespace.clone();
        let file_name = self.path.file_name().map(OsStr::to_os_string);
        let directory = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    let relevant = event.kind.is_modify() || event.kind.is_create();
                    let touches_snapshot = event
                        .paths
                        .iter()
                        .any(|p| p.file_name() == file_name.as_deref());
                    if relevant && touches_snapshot {
                        reload(&namespace, &path);
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&directory, RecursiveMode::NonRecursive)?;

        tracing::info!(
            path = ?self.path,
            namespace = %self.namespace.name(),
            "Snapshot watcher started"
        );
        Ok(watcher)
    }
}

fn reload(namespace: &KvNamespace, path: &Path) {
    tracing::info!(namespace = %namespace.name(), "Snapshot change detected, reloading...");
    match namespace.reload_from(path) {
        Ok(()) => metrics::record_store_reload(namespace.name(), true),
        Err(e) => {
            tracing::error!(
                namespace = %namespace.name(),
                error = %e,
                "Failed to reload snapshot. Keeping current entries."
            );
            metrics::record_store_reload(namespace.name(), false);
        }
    }
}
