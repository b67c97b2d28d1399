//! Shared fixtures for the integration suites.
#![allow(dead_code)]

use async_trait::async_trait;
use auricle_plugin_sdk::api::PluginApi;
use auricle_plugin_sdk::error::HostError;
use auricle_plugin_sdk::host::HostServices;
use auricle_plugin_sdk::instance::PluginInstance;
use auricle_plugin_sdk::manifest::Manifest;
use auricle_runtime::config::RateLimitConfig;
use auricle_runtime::loader::{NativeEngine, ScriptEngine};
use auricle_runtime::test_host::{InlineScriptEngine, StubNativeEngine, TestHost};
use auricle_runtime::{PluginRuntime, RuntimeConfig};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::atomic::AtomicUsize;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

/// Hook run inside `RecordingPlugin::init` with the freshly composed
/// capability object.
pub type InitHook = Box<dyn Fn(&PluginApi) + Send + Sync>;

/// Plugin instance that captures its capability object and counts its
/// lifecycle hooks.
#[derive(Default)]
pub struct RecordingPlugin {
    pub api: Mutex<Option<PluginApi>>,
    pub starts: AtomicUsize,
    pub stops: AtomicUsize,
    pub destroys: AtomicUsize,
    pub init_hook: Mutex<Option<InitHook>>,
    pub fail_init: Mutex<Option<String>>,
}

impl RecordingPlugin {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_init_hook(hook: InitHook) -> Arc<Self> {
        let plugin = Self::default();
        *plugin.init_hook.lock().unwrap() = Some(hook);
        Arc::new(plugin)
    }

    pub fn failing_init(message: &str) -> Arc<Self> {
        let plugin = Self::default();
        *plugin.fail_init.lock().unwrap() = Some(message.to_string());
        Arc::new(plugin)
    }

    /// The captured capability object; panics when `init` never ran.
    pub fn api(&self) -> PluginApi {
        self.api.lock().unwrap().clone().expect("init was called")
    }
}

#[async_trait]
impl PluginInstance for RecordingPlugin {
    async fn init(&self, api: PluginApi) -> Result<(), HostError> {
        if let Some(message) = self.fail_init.lock().unwrap().clone() {
            return Err(HostError::service(message));
        }
        if let Some(hook) = &*self.init_hook.lock().unwrap() {
            hook(&api);
        }
        *self.api.lock().unwrap() = Some(api);
        Ok(())
    }

    async fn start(&self) -> Result<(), HostError> {
        self.starts.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&self) -> Result<(), HostError> {
        self.stops.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Ok(())
    }

    async fn destroy(&self) -> Result<(), HostError> {
        self.destroys
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Ok(())
    }
}

/// Everything a test needs to drive the runtime end to end.
pub struct Fixture {
    pub runtime: Arc<PluginRuntime>,
    pub host: Arc<TestHost>,
    pub scripts: Arc<InlineScriptEngine>,
    pub natives: Arc<StubNativeEngine>,
    // Held so the directories outlive the runtime.
    _plugin_root: TempDir,
    _storage_dir: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_rate_limits(RateLimitConfig::default())
    }

    /// Fixture with explicit token-bucket parameters, for rate-limit
    /// scenarios.
    pub fn with_rate_limits(rate_limits: RateLimitConfig) -> Self {
        let plugin_root = TempDir::new().unwrap();
        let storage_dir = TempDir::new().unwrap();
        let config = RuntimeConfig {
            plugin_root: plugin_root.path().to_path_buf(),
            storage_dir: storage_dir.path().to_path_buf(),
            rate_limits,
            sweep_interval: Duration::from_secs(30),
            http_timeout: Duration::from_secs(5),
        };

        let host = Arc::new(TestHost::new());
        let scripts = Arc::new(InlineScriptEngine::new());
        let natives = Arc::new(StubNativeEngine::new());
        let runtime = PluginRuntime::new(
            config,
            Arc::clone(&host) as Arc<dyn HostServices>,
            Arc::clone(&scripts) as Arc<dyn ScriptEngine>,
            Arc::clone(&natives) as Arc<dyn NativeEngine>,
        );

        Self {
            runtime,
            host,
            scripts,
            natives,
            _plugin_root: plugin_root,
            _storage_dir: storage_dir,
        }
    }

    /// Drop a script artifact where the loader expects it.
    pub fn install_artifact(&self, safe_name: &str, entry: &str, source: &str) {
        let dir = self._plugin_root.path().join(safe_name);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(entry), source).unwrap();
    }

    /// Program a script plugin's instance and install a placeholder
    /// artifact, then load it.
    pub async fn load_script_plugin(
        &self,
        manifest: Manifest,
        instance: Arc<RecordingPlugin>,
    ) -> Result<(), auricle_runtime::RuntimeError> {
        self.install_artifact(&manifest.safe_name, &manifest.entry, "register(instance);");
        self.scripts.program(&manifest.safe_name, instance);
        self.runtime.load_plugin(manifest).await
    }

    pub fn storage_path(&self) -> &Path {
        self._storage_dir.path()
    }
}

/// A validated script manifest with the given permissions.
pub fn script_manifest(name: &str, permissions: &[&str]) -> Manifest {
    manifest_value(name, "script", permissions, json!(null))
}

/// A validated manifest with explicit cross-plugin grants.
pub fn script_manifest_with_cross(
    name: &str,
    permissions: &[&str],
    cross: Value,
) -> Manifest {
    manifest_value(name, "script", permissions, cross)
}

pub fn native_manifest(name: &str, permissions: &[&str]) -> Manifest {
    manifest_value(name, "native", permissions, json!(null))
}

fn manifest_value(name: &str, plugin_type: &str, permissions: &[&str], cross: Value) -> Manifest {
    let mut raw = json!({
        "name": name,
        "version": "1.0.0",
        "author": "tests",
        "type": plugin_type,
        "entry": if plugin_type == "script" { "index.js" } else { "module.bin" },
        "permissions": permissions,
        "category": "utility",
    });
    if !cross.is_null() {
        raw["cross_plugin_access"] = cross;
    }
    Manifest::from_value(&raw).unwrap()
}

/// A local library track.
pub fn track(id: &str, title: &str) -> auricle_plugin_sdk::models::Track {
    auricle_plugin_sdk::models::Track {
        id: id.to_string(),
        title: title.to_string(),
        artist: "Test Artist".to_string(),
        album: None,
        duration: 200.0,
        source_type: "local".to_string(),
        external_id: None,
        cover_url: None,
        path: None,
    }
}
