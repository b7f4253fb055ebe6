//! Snapshot-backed key-value namespace.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use arc_swap::ArcSwap;
use async_trait::async_trait;
use serde_json::Value;

use crate::store::{ConfigStore, StoreError, StoreResult, VersionStore};

type Snapshot = BTreeMap<String, Value>;

/// A namespace of JSON values, replaced as a whole on reload.
///
/// Serves as both the version store (string values) and the config store
/// (arbitrary JSON values), mirroring how both live in one store family.
pub struct KvNamespace {
    name: String,
    entries: ArcSwap<Snapshot>,
}

impl KvNamespace {
    /// Create an empty namespace.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: ArcSwap::from_pointee(Snapshot::new()),
        }
    }

    /// Create a namespace holding the given entries.
    pub fn from_entries<I, K, V>(name: impl Into<String>, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let namespace = Self::new(name);
        namespace.replace(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        namespace
    }

    /// Load a namespace from a JSON object file.
    pub fn load_from_file(name: impl Into<String>, path: &Path) -> StoreResult<Self> {
        let namespace = Self::new(name);
        namespace.reload_from(path)?;
        Ok(namespace)
    }

    /// Re-read the snapshot file and swap it in.
    ///
    /// On error the current snapshot stays in place.
    pub fn reload_from(&self, path: &Path) -> StoreResult<()> {
        let path_str = path.display().to_string();
        let content = fs::read_to_string(path).map_err(|source| StoreError::Io {
            path: path_str.clone(),
            source,
        })?;
        let value: Value = serde_json::from_str(&content).map_err(|source| StoreError::Parse {
            path: path_str.clone(),
            source,
        })?;
        let Value::Object(map) = value else {
            return Err(StoreError::NotAnObject(path_str));
        };

        let count = map.len();
        self.replace(map.into_iter().collect());
        tracing::info!(
            namespace = %self.name,
            path = %path_str,
            entries = count,
            "Snapshot loaded"
        );
        Ok(())
    }

    /// Swap in a new snapshot.
    pub fn replace(&self, entries: BTreeMap<String, Value>) {
        self.entries.store(Arc::new(entries));
    }

    /// Number of keys in the current snapshot.
    pub fn len(&self) -> usize {
        self.entries.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl VersionStore for KvNamespace {
    async fn get(&self, channel: &str) -> StoreResult<Option<String>> {
        let entries = self.entries.load();
        Ok(match entries.get(channel) {
            Some(Value::String(rtv)) if !rtv.is_empty() => Some(rtv.clone()),
            Some(Value::String(_)) | None | Some(Value::Null) => None,
            Some(other) => {
                tracing::warn!(
                    namespace = %self.name,
                    channel,
                    value = %other,
                    "Non-string channel value ignored"
                );
                None
            }
        })
    }

    async fn list(&self) -> StoreResult<Vec<(String, String)>> {
        Ok(self
            .entries
            .load()
            .iter()
            .filter_map(|(k, v)| v.as_str().map(|rtv| (k.clone(), rtv.to_string())))
            .collect())
    }
}

#[async_trait]
impl ConfigStore for KvNamespace {
    async fn get_json(&self, key: &str) -> StoreResult<Option<Value>> {
        Ok(self
            .entries
            .load()
            .get(key)
            .filter(|v| !v.is_null())
            .cloned())
    }
}
