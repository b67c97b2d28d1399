//! # Cross-Plugin Permission Manager
//!
//! Decides whether plugin A may invoke method M handled by plugin B.
//! The source of truth is a trusted oracle that materialises
//! `cross_plugin_access` grants for a caller (in this runtime, from the
//! validated manifest store); results are cached per caller and
//! invalidated when that plugin unloads.
//!
//! A denial is one of the few errors that surfaces to plugin code, and
//! it is deliberately actionable: the message embeds the exact manifest
//! fragment the plugin author must add.

use crate::event_bus::CrossPluginGate;
use async_trait::async_trait;
use auricle_plugin_sdk::error::HostError;
use auricle_plugin_sdk::manifest::{CrossPluginAccess, Manifest};
use dashmap::DashMap;
use serde_json::json;
use std::sync::Arc;

/// Trusted source of cross-plugin grants for a caller.
#[async_trait]
pub trait PermissionOracle: Send + Sync {
    /// The grants held by `caller`; empty when the caller is unknown.
    async fn permissions_for(&self, caller: &str) -> Vec<CrossPluginAccess>;
}

/// Oracle backed by the runtime's validated manifest store.
pub struct ManifestOracle {
    manifests: Arc<DashMap<String, Manifest>>,
}

impl ManifestOracle {
    pub fn new(manifests: Arc<DashMap<String, Manifest>>) -> Self {
        Self { manifests }
    }
}

#[async_trait]
impl PermissionOracle for ManifestOracle {
    async fn permissions_for(&self, caller: &str) -> Vec<CrossPluginAccess> {
        self.manifests
            .get(caller)
            .map(|manifest| manifest.cross_plugin_access.clone())
            .unwrap_or_default()
    }
}

/// Caching front of the oracle, consulted on every cross-plugin request.
pub struct CrossPluginPermissions {
    oracle: Arc<dyn PermissionOracle>,
    cache: DashMap<String, Vec<CrossPluginAccess>>,
}

impl CrossPluginPermissions {
    pub fn new(oracle: Arc<dyn PermissionOracle>) -> Self {
        Self {
            oracle,
            cache: DashMap::new(),
        }
    }

    /// Whether `caller` may invoke `method` on `target`; denials carry
    /// the manifest fragment that would grant the call.
    pub async fn check(&self, caller: &str, target: &str, method: &str) -> Result<(), HostError> {
        let grants = match self.cache.get(caller) {
            Some(grants) => grants.clone(),
            None => {
                let grants = self.oracle.permissions_for(caller).await;
                self.cache.insert(caller.to_string(), grants.clone());
                grants
            }
        };

        let allowed = grants
            .iter()
            .any(|grant| grant.plugin == target && grant.methods.iter().any(|m| m == method));

        if allowed {
            return Ok(());
        }

        let manifest_fragment = json!({
            "cross_plugin_access": [{ "plugin": target, "methods": [method] }]
        })
        .to_string();

        tracing::warn!(caller, target, method, "cross-plugin access denied");
        Err(HostError::CrossPluginDenied {
            caller: caller.to_string(),
            target: target.to_string(),
            method: method.to_string(),
            manifest_fragment,
        })
    }

    /// Drop the cached grants for a caller; called when it unloads.
    pub fn invalidate(&self, caller: &str) {
        self.cache.remove(caller);
    }

    /// Whether a caller currently has a cache entry; used by tests.
    pub fn is_cached(&self, caller: &str) -> bool {
        self.cache.contains_key(caller)
    }
}

#[async_trait]
impl CrossPluginGate for CrossPluginPermissions {
    async fn check(&self, caller: &str, target: &str, method: &str) -> Result<(), HostError> {
        CrossPluginPermissions::check(self, caller, target, method).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingOracle {
        grants: Vec<CrossPluginAccess>,
        lookups: AtomicUsize,
    }

    #[async_trait]
    impl PermissionOracle for CountingOracle {
        async fn permissions_for(&self, _caller: &str) -> Vec<CrossPluginAccess> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            self.grants.clone()
        }
    }

    fn manager_with(grants: Vec<CrossPluginAccess>) -> (CrossPluginPermissions, Arc<CountingOracle>) {
        let oracle = Arc::new(CountingOracle {
            grants,
            lookups: AtomicUsize::new(0),
        });
        (
            CrossPluginPermissions::new(Arc::clone(&oracle) as Arc<dyn PermissionOracle>),
            oracle,
        )
    }

    #[tokio::test]
    async fn granted_method_passes() {
        let (manager, _) = manager_with(vec![CrossPluginAccess {
            plugin: "Search".to_string(),
            methods: vec!["search.query".to_string()],
        }]);
        manager.check("A", "Search", "search.query").await.unwrap();
    }

    #[tokio::test]
    async fn denial_includes_the_required_manifest_fragment() {
        let (manager, _) = manager_with(vec![]);
        let err = manager
            .check("A", "Search", "search.query")
            .await
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains(r#""plugin":"Search""#));
        assert!(message.contains(r#""methods":["search.query"]"#));
    }

    #[tokio::test]
    async fn grants_are_cached_per_caller_until_invalidated() {
        let (manager, oracle) = manager_with(vec![CrossPluginAccess {
            plugin: "B".to_string(),
            methods: vec!["op".to_string()],
        }]);

        manager.check("A", "B", "op").await.unwrap();
        manager.check("A", "B", "op").await.unwrap();
        assert_eq!(oracle.lookups.load(Ordering::SeqCst), 1);
        assert!(manager.is_cached("A"));

        manager.invalidate("A");
        assert!(!manager.is_cached("A"));
        manager.check("A", "B", "op").await.unwrap();
        assert_eq!(oracle.lookups.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn grant_on_other_method_still_denies() {
        let (manager, _) = manager_with(vec![CrossPluginAccess {
            plugin: "B".to_string(),
            methods: vec!["other.op".to_string()],
        }]);
        assert!(manager.check("A", "B", "op").await.is_err());
    }

    #[tokio::test]
    async fn manifest_oracle_reads_the_store() {
        let manifests = Arc::new(DashMap::new());
        let raw = serde_json::json!({
            "name": "A",
            "version": "1.0.0",
            "author": "t",
            "type": "script",
            "entry": "index.js",
            "cross_plugin_access": [{ "plugin": "B", "methods": ["op"] }]
        });
        manifests.insert("A".to_string(), Manifest::from_value(&raw).unwrap());

        let oracle = ManifestOracle::new(Arc::clone(&manifests));
        let grants = oracle.permissions_for("A").await;
        assert_eq!(grants.len(), 1);
        assert!(oracle.permissions_for("Unknown").await.is_empty());
    }
}
