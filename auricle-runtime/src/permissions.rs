//! # Permission Ledger
//!
//! The single source of truth for which permission tags each plugin has
//! actually been granted. Consulted twice per capability: once when the
//! API surface is composed at load time, and again on every dispatch as
//! defence in depth.
//!
//! Grants are idempotent unions of tags from the closed vocabulary; a
//! revoke removes the whole plugin's entry. Because [`Permission`] is a
//! closed enum, nothing outside the vocabulary can ever be retained.

use auricle_plugin_sdk::manifest::Permission;
use dashmap::DashMap;
use std::collections::HashSet;

/// Maps plugin names to their deduplicated granted permission sets.
#[derive(Debug, Default)]
pub struct PermissionLedger {
    grants: DashMap<String, HashSet<Permission>>,
}

impl PermissionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant tags to a plugin; unions idempotently with existing grants.
    pub fn grant(&self, plugin: &str, permissions: impl IntoIterator<Item = Permission>) {
        let mut entry = self.grants.entry(plugin.to_string()).or_default();
        for permission in permissions {
            entry.insert(permission);
        }
    }

    /// Remove every grant held by a plugin.
    pub fn revoke_all(&self, plugin: &str) {
        self.grants.remove(plugin);
        tracing::debug!(plugin, "revoked all permissions");
    }

    /// Whether the plugin currently holds a tag.
    pub fn has(&self, plugin: &str, permission: Permission) -> bool {
        self.grants
            .get(plugin)
            .map(|set| set.contains(&permission))
            .unwrap_or(false)
    }

    /// Snapshot of a plugin's granted set; empty when unknown.
    pub fn granted_for(&self, plugin: &str) -> HashSet<Permission> {
        self.grants
            .get(plugin)
            .map(|set| set.clone())
            .unwrap_or_default()
    }
}
