//! The loaded-plugin record: one exists per plugin from successful load
//! until destruction.
//!
//! Granted permissions live in the permission ledger and scoped storage
//! behind its namespaced façade; the record carries everything else the
//! dispatcher and lifecycle manager need: the instance handle, the
//! enabled flag, the rate-limiter pair and the type-specific
//! bookkeeping used at teardown.

use crate::loader::{NativeMemoryHandle, ScriptHandle};
use crate::rate_limit::RateLimiterPair;
use auricle_plugin_sdk::instance::PluginInstance;
use auricle_plugin_sdk::manifest::{Manifest, PluginType};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Type-specific bookkeeping kept for teardown.
pub enum LoadedKind {
    /// Script plugin: the injected-script handle and the well-known
    /// globals to purge on unload
    Script {
        handle: ScriptHandle,
        globals: Vec<String>,
    },
    /// Native plugin: the module's linear memory, dropped on unload
    Native {
        memory: Mutex<Option<NativeMemoryHandle>>,
    },
}

impl std::fmt::Debug for LoadedKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadedKind::Script { handle, .. } => {
                f.debug_struct("Script").field("handle", handle).finish()
            }
            LoadedKind::Native { memory } => f
                .debug_struct("Native")
                .field(
                    "memory",
                    &memory.lock().map(|m| m.is_some()).unwrap_or(false),
                )
                .finish(),
        }
    }
}

/// One plugin's record in the runtime's plugins map.
pub struct LoadedPlugin {
    pub manifest: Manifest,
    pub instance: Arc<dyn PluginInstance>,
    enabled: AtomicBool,
    pub loaded_at: DateTime<Utc>,
    pub limiters: RateLimiterPair,
    pub kind: LoadedKind,
}

impl LoadedPlugin {
    pub fn new(
        manifest: Manifest,
        instance: Arc<dyn PluginInstance>,
        limiters: RateLimiterPair,
        kind: LoadedKind,
    ) -> Self {
        Self {
            manifest,
            instance,
            enabled: AtomicBool::new(true),
            loaded_at: Utc::now(),
            limiters,
            kind,
        }
    }

    pub fn name(&self) -> &str {
        &self.manifest.name
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn is_script(&self) -> bool {
        self.manifest.plugin_type == PluginType::Script
    }

    /// The injected-script handle, for script plugins.
    pub fn script_handle(&self) -> Option<&ScriptHandle> {
        match &self.kind {
            LoadedKind::Script { handle, .. } => Some(handle),
            LoadedKind::Native { .. } => None,
        }
    }

    /// The well-known globals a script plugin may have populated.
    pub fn legacy_globals(&self) -> &[String] {
        match &self.kind {
            LoadedKind::Script { globals, .. } => globals,
            LoadedKind::Native { .. } => &[],
        }
    }

    /// Drop the reference to a native module's linear memory; returns
    /// whether anything was held.
    pub fn drop_native_memory(&self) -> bool {
        match &self.kind {
            LoadedKind::Native { memory } => memory
                .lock()
                .map(|mut slot| slot.take().is_some())
                .unwrap_or(false),
            LoadedKind::Script { .. } => false,
        }
    }

    /// Whether a native module's memory reference is still held.
    pub fn holds_native_memory(&self) -> bool {
        match &self.kind {
            LoadedKind::Native { memory } => {
                memory.lock().map(|slot| slot.is_some()).unwrap_or(false)
            }
            LoadedKind::Script { .. } => false,
        }
    }
}

impl std::fmt::Debug for LoadedPlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedPlugin")
            .field("name", &self.manifest.name)
            .field("type", &self.manifest.plugin_type)
            .field("enabled", &self.is_enabled())
            .field("loaded_at", &self.loaded_at)
            .field("kind", &self.kind)
            .finish()
    }
}

/// The runtime's authoritative plugins map, shared with the dispatcher.
pub type PluginsMap = Arc<DashMap<String, Arc<LoadedPlugin>>>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RateLimitConfig;
    use crate::loader::ScriptHandle;
    use async_trait::async_trait;
    use auricle_plugin_sdk::api::PluginApi;
    use auricle_plugin_sdk::error::HostError;

    struct Inert;

    #[async_trait]
    impl PluginInstance for Inert {
        async fn init(&self, _api: PluginApi) -> Result<(), HostError> {
            Ok(())
        }
    }

    fn manifest(plugin_type: &str) -> Manifest {
        Manifest::from_value(&serde_json::json!({
            "name": "Probe",
            "version": "0.1.0",
            "author": "tests",
            "type": plugin_type,
            "entry": "e",
        }))
        .unwrap()
    }

    fn record(kind: LoadedKind, plugin_type: &str) -> LoadedPlugin {
        LoadedPlugin::new(
            manifest(plugin_type),
            Arc::new(Inert),
            crate::rate_limit::RateLimiterPair::new(&RateLimitConfig::default()),
            kind,
        )
    }

    #[test]
    fn native_memory_drops_exactly_once() {
        let record = record(
            LoadedKind::Native {
                memory: Mutex::new(Some(Arc::new(vec![0u8; 4]))),
            },
            "native",
        );
        assert!(record.holds_native_memory());
        assert!(record.drop_native_memory());
        assert!(!record.holds_native_memory());
        assert!(!record.drop_native_memory());
        assert!(record.script_handle().is_none());
    }

    #[test]
    fn script_record_exposes_handle_and_globals() {
        let record = record(
            LoadedKind::Script {
                handle: ScriptHandle {
                    id: "probe".to_string(),
                },
                globals: vec!["plugin".to_string()],
            },
            "script",
        );
        assert!(record.is_script());
        assert_eq!(record.script_handle().unwrap().id, "probe");
        assert_eq!(record.legacy_globals(), ["plugin".to_string()]);
        assert!(!record.drop_native_memory());
        assert!(record.is_enabled());
        record.set_enabled(false);
        assert!(!record.is_enabled());
    }
}
