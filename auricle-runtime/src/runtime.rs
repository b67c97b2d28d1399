//! # Plugin Lifecycle Manager
//!
//! The top level of the runtime: validates manifests, loads plugins,
//! enables and disables them, and owns the only authoritative plugins
//! map. Every other component (ledger, storage, bus, slot registry,
//! resolver registry, dispatcher) is wired here and torn down from
//! here.
//!
//! ## States
//!
//! ```text
//! absent → loaded → enabled ↔ disabled → destroyed
//! ```
//!
//! A freshly loaded plugin is implicitly enabled; `start` is invoked by
//! the conventional `enable_plugin` call, not by `load_plugin`.
//!
//! ## Teardown ordering
//!
//! `unload_plugin` releases resources in a strict order: instance
//! hooks first, then bus subscriptions, UI entries, scoped storage
//! (awaited), resolvers, limiters, the script element or native memory,
//! permissions, the record itself, and finally the cross-plugin cache.
//! A failing step is caught and later steps still run, so a plugin that
//! misbehaves during teardown cannot leak the resources after it.
//!
//! ## Failure semantics
//!
//! Load errors propagate to the caller. A plugin whose `init` throws
//! stays in the map, enabled: its capability object is already live and
//! scheduled events may already be flowing, so the eviction decision is
//! host policy, not runtime policy. Enable/disable/unload hook failures
//! are caught, logged and routed to the configured error callback.
//! The periodic sweeper handles anything a crashed unload left behind.

use crate::config::RuntimeConfig;
use crate::cross_plugin::{CrossPluginPermissions, ManifestOracle};
use crate::dispatcher::HostDispatcher;
use crate::error::RuntimeError;
use crate::event_bus::{CrossPluginGate, EventBus};
use crate::loader::{ArtifactSource, NativeEngine, PluginLoader, ScriptEngine};
use crate::permissions::PermissionLedger;
use crate::plugin::{LoadedPlugin, PluginsMap};
use crate::rate_limit::RateLimiterPair;
use crate::storage::ScopedStorage;
use crate::stream_resolver::StreamResolverRegistry;
use crate::surface;
use crate::ui_slots::SlotRegistry;
use auricle_plugin_sdk::api::{EventBusPort, HostDispatch};
use auricle_plugin_sdk::error::HostError;
use auricle_plugin_sdk::host::HostServices;
use auricle_plugin_sdk::manifest::Manifest;
use dashmap::DashMap;
use serde_json::Value;
use std::sync::{Arc, Mutex};

/// Callback invoked when a plugin lifecycle hook fails; receives the
/// plugin name, the phase and the error.
pub type ErrorCallback = Box<dyn Fn(&str, &str, &HostError) + Send + Sync>;

/// The runtime: owner of the plugins map and every shared registry.
pub struct PluginRuntime {
    config: RuntimeConfig,
    plugins: PluginsMap,
    manifests: Arc<DashMap<String, Manifest>>,
    ledger: Arc<PermissionLedger>,
    storage: Arc<ScopedStorage>,
    bus: Arc<EventBus>,
    slots: Arc<SlotRegistry>,
    resolvers: Arc<StreamResolverRegistry>,
    cross_plugin: Arc<CrossPluginPermissions>,
    dispatcher: Arc<HostDispatcher>,
    loader: PluginLoader,
    on_error: Mutex<Option<ErrorCallback>>,
}

impl PluginRuntime {
    /// Wire a runtime over the given host services and engines, reading
    /// artifacts from the configured plugin directory.
    pub fn new(
        config: RuntimeConfig,
        services: Arc<dyn HostServices>,
        script_engine: Arc<dyn ScriptEngine>,
        native_engine: Arc<dyn NativeEngine>,
    ) -> Arc<Self> {
        let artifacts = ArtifactSource::Directory(config.plugin_root.clone());
        Self::with_artifacts(config, services, script_engine, native_engine, artifacts)
    }

    /// Wire a runtime with an explicit artifact source (remote mirror,
    /// test directory).
    pub fn with_artifacts(
        config: RuntimeConfig,
        services: Arc<dyn HostServices>,
        script_engine: Arc<dyn ScriptEngine>,
        native_engine: Arc<dyn NativeEngine>,
        artifacts: ArtifactSource,
    ) -> Arc<Self> {
        let plugins: PluginsMap = Arc::new(DashMap::new());
        let manifests: Arc<DashMap<String, Manifest>> = Arc::new(DashMap::new());
        let ledger = Arc::new(PermissionLedger::new());
        let storage = Arc::new(ScopedStorage::new(config.storage_dir.clone()));
        let slots = Arc::new(SlotRegistry::new());
        let resolvers = Arc::new(StreamResolverRegistry::new());
        let cross_plugin = Arc::new(CrossPluginPermissions::new(Arc::new(ManifestOracle::new(
            Arc::clone(&manifests),
        ))));
        let gate: Arc<dyn CrossPluginGate> = Arc::clone(&cross_plugin) as Arc<dyn CrossPluginGate>;
        let bus = Arc::new(EventBus::new(gate));
        let dispatcher = Arc::new(HostDispatcher::new(
            Arc::clone(&plugins),
            Arc::clone(&ledger),
            Arc::clone(&storage),
            Arc::clone(&slots),
            Arc::clone(&resolvers),
            Arc::clone(&bus),
            services,
        ));
        let loader = PluginLoader::new(artifacts, script_engine, native_engine);

        Arc::new(Self {
            config,
            plugins,
            manifests,
            ledger,
            storage,
            bus,
            slots,
            resolvers,
            cross_plugin,
            dispatcher,
            loader,
            on_error: Mutex::new(None),
        })
    }

    /// Install the callback lifecycle-hook failures are reported to.
    pub fn set_error_callback(&self, callback: ErrorCallback) {
        *self.on_error.lock().unwrap() = Some(callback);
    }

    fn report(&self, plugin: &str, phase: &str, error: &HostError) {
        tracing::error!(plugin, phase, error = %error, "plugin lifecycle hook failed");
        if let Some(callback) = &*self.on_error.lock().unwrap() {
            callback(plugin, phase, error);
        }
    }

    /// Validate untyped manifest data and load the plugin it describes.
    pub async fn load_plugin_value(&self, raw: &Value) -> Result<(), RuntimeError> {
        let manifest = Manifest::from_value(raw)?;
        self.load_plugin(manifest).await
    }

    /// Load one plugin: fetch and execute its entry artifact, grant its
    /// manifest permissions, insert the record, and hand `init` its
    /// capability object.
    ///
    /// Rejects a second plugin of the same name. An `init` failure is
    /// reported but leaves the plugin loaded and enabled; see the
    /// module docs.
    pub async fn load_plugin(&self, manifest: Manifest) -> Result<(), RuntimeError> {
        let name = manifest.name.clone();
        if self.plugins.contains_key(&name) {
            return Err(RuntimeError::DuplicatePlugin { name });
        }

        let (instance, kind) = self
            .loader
            .load(
                &manifest,
                &manifest.permissions,
                self.dispatch_port(),
            )
            .await?;

        self.storage.hydrate(&name).await;
        self.ledger.grant(&name, manifest.permissions.iter().copied());
        self.manifests.insert(name.clone(), manifest.clone());

        let record = Arc::new(LoadedPlugin::new(
            manifest,
            Arc::clone(&instance),
            RateLimiterPair::new(&self.config.rate_limits),
            kind,
        ));
        // Inserted before init so init-time capability calls pass the
        // dispatch existence check.
        self.plugins.insert(name.clone(), record);

        let api = surface::build_api(&name, &self.ledger, self.dispatch_port(), self.bus_port());
        if let Err(e) = instance.init(api).await {
            self.report(&name, "init", &e);
        }

        tracing::info!(plugin = %name, "plugin loaded");
        Ok(())
    }

    /// Load a batch in the given order, collecting per-plugin outcomes.
    /// No dependency ordering is applied between entries.
    pub async fn load_all(
        &self,
        manifests: Vec<Manifest>,
    ) -> Vec<(String, Result<(), RuntimeError>)> {
        let mut results = Vec::with_capacity(manifests.len());
        for manifest in manifests {
            let name = manifest.name.clone();
            let result = self.load_plugin(manifest).await;
            if let Err(e) = &result {
                tracing::error!(plugin = %name, error = %e, "plugin failed to load");
            }
            results.push((name, result));
        }
        results
    }

    /// Flip a plugin to enabled and invoke its `start`; hook failures
    /// are reported, not propagated.
    pub async fn enable_plugin(&self, name: &str) -> Result<(), RuntimeError> {
        let record = self.record(name)?;
        record.set_enabled(true);
        if let Err(e) = record.instance.start().await {
            self.report(name, "start", &e);
        }
        Ok(())
    }

    /// Flip a plugin to disabled and invoke its `stop`; hook failures
    /// are reported, not propagated.
    pub async fn disable_plugin(&self, name: &str) -> Result<(), RuntimeError> {
        let record = self.record(name)?;
        record.set_enabled(false);
        if let Err(e) = record.instance.stop().await {
            self.report(name, "stop", &e);
        }
        Ok(())
    }

    /// The destructive path: release every resource the plugin owns, in
    /// strict order, continuing past failures. Unloading an absent
    /// plugin is a no-op.
    pub async fn unload_plugin(&self, name: &str) -> Result<(), RuntimeError> {
        let record = match self.plugins.get(name) {
            Some(record) => Arc::clone(&record),
            None => {
                tracing::debug!(plugin = name, "unload of absent plugin ignored");
                return Ok(());
            }
        };

        // 1. Script plugins get a final stop.
        if record.is_script() {
            if let Err(e) = record.instance.stop().await {
                self.report(name, "stop", &e);
            }
        }

        // 2. Destroy.
        if let Err(e) = record.instance.destroy().await {
            self.report(name, "destroy", &e);
        }

        // 3. Bus subscriptions and request handlers.
        self.bus.remove_plugin_listeners(name);

        // 4. UI entries across every slot.
        self.slots.remove_owner(name);

        // 5. Scoped storage, awaited before later steps.
        let removed = self.storage.clear(name).await;
        tracing::debug!(plugin = name, keys = removed, "scoped storage cleared");

        // 6. Stream resolvers owned by this plugin.
        self.resolvers.unregister_owner(name);

        // 7. Rate limiters back to full.
        record.limiters.reset();

        // 8. Script element and well-known globals.
        if let Some(handle) = record.script_handle() {
            self.loader.script_engine().remove(handle);
            for global in record.legacy_globals() {
                self.loader.script_engine().purge_global(global);
            }
        }

        // 9. Native linear memory.
        record.drop_native_memory();

        // 10. Permissions.
        self.ledger.revoke_all(name);

        // 11. The record itself.
        self.plugins.remove(name);
        self.manifests.remove(name);

        // 12. Cross-plugin permission cache.
        self.cross_plugin.invalidate(name);

        tracing::info!(plugin = name, "plugin unloaded");
        Ok(())
    }

    /// Belt-and-braces pass against crashed unloads: remove injected
    /// scripts and UI entries whose owner is no longer loaded.
    pub fn cleanup_detached_resources(&self) {
        for handle in self.loader.script_engine().handles() {
            let owned = self
                .plugins
                .iter()
                .any(|record| record.manifest.safe_name == handle.id);
            if !owned {
                tracing::warn!(element = %handle.id, "removing detached script element");
                self.loader.script_engine().remove(&handle);
            }
        }

        let purged = self
            .slots
            .retain_owners(|owner| self.plugins.contains_key(owner));
        if purged > 0 {
            tracing::warn!(purged, "removed detached ui slot entries");
        }
    }

    /// Run the sweeper on the configured interval until the runtime is
    /// dropped.
    pub fn spawn_sweeper(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let runtime = Arc::downgrade(self);
        let interval = self.config.sweep_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await; // immediate first tick is uninteresting
            loop {
                ticker.tick().await;
                match runtime.upgrade() {
                    Some(runtime) => runtime.cleanup_detached_resources(),
                    None => break,
                }
            }
        })
    }

    // --- host-facing surface ---

    /// Emit a host event onto the shared bus.
    pub fn emit_event(&self, event: &str, payload: Value) {
        self.bus.emit(event, payload);
    }

    /// Resolve a non-local track to a playable URL; `None` means
    /// unplayable. Called by the playback engine.
    pub async fn resolve_stream_url(
        &self,
        source_type: &str,
        external_id: &str,
        options: Value,
    ) -> Option<String> {
        self.resolvers.resolve(source_type, external_id, options).await
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.plugins.contains_key(name)
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.plugins
            .get(name)
            .map(|record| record.is_enabled())
            .unwrap_or(false)
    }

    /// Names of every loaded plugin.
    pub fn plugin_names(&self) -> Vec<String> {
        self.plugins.iter().map(|r| r.key().clone()).collect()
    }

    pub fn plugin_count(&self) -> usize {
        self.plugins.len()
    }

    // --- component access for the host and tests ---

    pub fn events(&self) -> &Arc<EventBus> {
        &self.bus
    }

    pub fn ledger(&self) -> &Arc<PermissionLedger> {
        &self.ledger
    }

    pub fn storage(&self) -> &Arc<ScopedStorage> {
        &self.storage
    }

    pub fn slots(&self) -> &Arc<SlotRegistry> {
        &self.slots
    }

    pub fn resolvers(&self) -> &Arc<StreamResolverRegistry> {
        &self.resolvers
    }

    pub fn cross_plugin(&self) -> &Arc<CrossPluginPermissions> {
        &self.cross_plugin
    }

    pub fn script_engine(&self) -> &Arc<dyn ScriptEngine> {
        self.loader.script_engine()
    }

    /// The dispatch seam as capability objects see it.
    pub fn dispatch_port(&self) -> Arc<dyn HostDispatch> {
        Arc::clone(&self.dispatcher) as Arc<dyn HostDispatch>
    }

    fn bus_port(&self) -> Arc<dyn EventBusPort> {
        Arc::clone(&self.bus) as Arc<dyn EventBusPort>
    }

    fn record(&self, name: &str) -> Result<Arc<LoadedPlugin>, RuntimeError> {
        self.plugins
            .get(name)
            .map(|record| Arc::clone(&record))
            .ok_or_else(|| RuntimeError::UnknownPlugin {
                name: name.to_string(),
            })
    }

    /// Rate-limiter state for assertions; `None` when not loaded.
    pub fn api_tokens_available(&self, name: &str) -> Option<u32> {
        self.plugins
            .get(name)
            .map(|record| record.limiters.api_calls.available())
    }
}

impl std::fmt::Debug for PluginRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginRuntime")
            .field("plugins", &self.plugin_count())
            .field("plugin_root", &self.config.plugin_root)
            .finish()
    }
}
