//! # Scoped Plugin Storage
//!
//! Per-plugin namespaced key/value storage with a synchronous in-memory
//! read path and an asynchronous durable write path.
//!
//! ## Overview
//!
//! Plugins only ever see a façade bound to their own name; the backing
//! store is one process-wide resource owned by the runtime. Keys from
//! different plugins cannot collide because every key is namespaced with
//! the owning plugin's name before it touches the shared map.
//!
//! ## Durability
//!
//! The durable layer is one JSON document per plugin under the
//! configured storage directory, rewritten after every `set`. Reads are
//! served from memory only; `hydrate` repopulates memory from disk when
//! a plugin loads. A failed durable write is logged and does not fail
//! the `set`; the in-memory layer has already accepted the value, which
//! is the contract plugins observe.
//!
//! Write frequency is additionally rate-limited at the dispatch layer,
//! not here.

use dashmap::DashMap;
use std::collections::HashMap;
use std::path::PathBuf;

/// Separator between the plugin namespace and the plugin-chosen key.
/// An ASCII unit separator cannot appear in either side.
const NS: char = '\u{1f}';

/// The shared scoped store; one instance per runtime.
#[derive(Debug)]
pub struct ScopedStorage {
    entries: DashMap<String, String>,
    storage_dir: PathBuf,
}

impl ScopedStorage {
    pub fn new(storage_dir: impl Into<PathBuf>) -> Self {
        Self {
            entries: DashMap::new(),
            storage_dir: storage_dir.into(),
        }
    }

    fn namespaced(plugin: &str, key: &str) -> String {
        format!("{plugin}{NS}{key}")
    }

    fn document_path(&self, plugin: &str) -> PathBuf {
        // Display names may contain path-hostile characters; the
        // document name keeps only a safe subset.
        let stem: String = plugin
            .to_lowercase()
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '-' })
            .collect();
        self.storage_dir.join(format!("{stem}.json"))
    }

    /// Synchronous read from the in-memory layer.
    pub fn get(&self, plugin: &str, key: &str) -> Option<String> {
        self.entries
            .get(&Self::namespaced(plugin, key))
            .map(|entry| entry.clone())
    }

    /// Write a key and persist the plugin's document.
    ///
    /// Always succeeds from the plugin's perspective; durable-layer
    /// failures are logged and retried implicitly by the next write.
    pub async fn set(&self, plugin: &str, key: &str, value: &str) -> bool {
        self.entries
            .insert(Self::namespaced(plugin, key), value.to_string());
        if let Err(e) = self.persist(plugin).await {
            tracing::warn!(plugin, key = %key, error = %e, "durable storage write failed");
        }
        true
    }

    /// Remove every key owned by a plugin, returning the count removed.
    /// The plugin's durable document is deleted as well.
    pub async fn clear(&self, plugin: &str) -> usize {
        let prefix = format!("{plugin}{NS}");
        let keys: Vec<String> = self
            .entries
            .iter()
            .filter(|entry| entry.key().starts_with(&prefix))
            .map(|entry| entry.key().clone())
            .collect();
        for key in &keys {
            self.entries.remove(key);
        }
        if let Err(e) = tokio::fs::remove_file(self.document_path(plugin)).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(plugin, error = %e, "failed to delete storage document");
            }
        }
        keys.len()
    }

    /// Repopulate the in-memory layer from the plugin's durable document.
    /// Missing documents are fine; corrupt ones are logged and skipped.
    pub async fn hydrate(&self, plugin: &str) {
        let path = self.document_path(plugin);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return,
            Err(e) => {
                tracing::warn!(plugin, error = %e, "failed to read storage document");
                return;
            }
        };
        match serde_json::from_str::<HashMap<String, String>>(&content) {
            Ok(document) => {
                for (key, value) in document {
                    self.entries.insert(Self::namespaced(plugin, &key), value);
                }
            }
            Err(e) => {
                tracing::warn!(plugin, path = %path.display(), error = %e, "corrupt storage document ignored")
            }
        }
    }

    /// The plugin-visible keys currently held for a plugin.
    pub fn keys_for(&self, plugin: &str) -> Vec<String> {
        let prefix = format!("{plugin}{NS}");
        self.entries
            .iter()
            .filter(|entry| entry.key().starts_with(&prefix))
            .map(|entry| entry.key()[prefix.len()..].to_string())
            .collect()
    }

    async fn persist(&self, plugin: &str) -> std::io::Result<()> {
        let prefix = format!("{plugin}{NS}");
        let document: HashMap<String, String> = self
            .entries
            .iter()
            .filter(|entry| entry.key().starts_with(&prefix))
            .map(|entry| {
                (
                    entry.key()[prefix.len()..].to_string(),
                    entry.value().clone(),
                )
            })
            .collect();
        tokio::fs::create_dir_all(&self.storage_dir).await?;
        let payload = serde_json::to_vec_pretty(&document).map_err(std::io::Error::other)?;
        tokio::fs::write(self.document_path(plugin), payload).await
    }

    #[cfg(test)]
    fn document_exists(&self, plugin: &str) -> bool {
        self.document_path(plugin).exists()
    }
}
