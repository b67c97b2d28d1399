//! # Plugin Loader and Module Host
//!
//! Turns a validated manifest into a live plugin instance. Two load
//! paths exist, both ending in a fully populated record but neither
//! calling `init`; that is the lifecycle manager's job.
//!
//! ## Script plugins
//!
//! The entry artifact is fetched as text and executed through the
//! host-provided [`ScriptEngine`] behind a sandboxed wrapper: the loader
//! generates a fresh registration key, installs a one-shot
//! pending-instance slot for it, and wraps the source so the execution
//! environment exposes a local `register(instance)` sink bound to that
//! key. After execution, exactly one registration is consumed from the
//! slot. If the plugin never registered, the loader falls back to the
//! engine's well-known globals for legacy plugins, then fails. The
//! wrapper indirection means no dynamic code evaluation primitive is
//! ever needed, so a strict content-security policy can stay enabled.
//!
//! ## Native plugins
//!
//! The entry artifact is fetched as bytes and instantiated through the
//! host-provided [`NativeEngine`] with an import table built from the
//! plugin's granted permissions: only permitted host bridges are
//! imported, others are simply absent. The module's exported lifecycle
//! handles and optional linear memory come back as a [`NativeModule`].
//!
//! ## Artifact sources
//!
//! Artifacts live at `<safe_name>/<entry>` under either a local plugin
//! directory or a remote base URL; [`ArtifactSource`] hides the
//! difference.

use crate::plugin::LoadedKind;
use async_trait::async_trait;
use auricle_plugin_sdk::api::HostDispatch;
use auricle_plugin_sdk::calls::{CallGate, HostCall};
use auricle_plugin_sdk::error::HostError;
use auricle_plugin_sdk::instance::PluginInstance;
use auricle_plugin_sdk::manifest::{Manifest, Permission, PluginType};
use auricle_plugin_sdk::models::{DownloadRequest, ProxyRequest, Track};
use dashmap::DashMap;
use futures::future::BoxFuture;
use serde_json::Value;
use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

/// Well-known globals legacy script plugins may expose their instance
/// through instead of completing the handoff.
const LEGACY_GLOBALS: [&str; 2] = ["AuriclePlugin", "plugin"];

/// Handle to one injected script; `id` doubles as the script element id
/// and always equals the plugin's `safe_name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptHandle {
    pub id: String,
}

/// Opaque reference to a native module's linear memory; dropped on
/// unload.
pub type NativeMemoryHandle = Arc<dyn Any + Send + Sync>;

/// What a [`NativeEngine`] hands back after instantiation.
pub struct NativeModule {
    /// Adapter over the module's exported init/start/stop/destroy
    pub instance: Arc<dyn PluginInstance>,
    /// The module's exported linear memory, if it has one
    pub memory: Option<NativeMemoryHandle>,
}

/// A script artifact after wrapping, ready for engine execution.
#[derive(Debug, Clone)]
pub struct WrappedScript {
    /// Script element id, equal to the plugin's `safe_name`
    pub element_id: String,
    /// The one-shot key the wrapper's `register` sink is bound to
    pub registration_key: String,
    /// Wrapper plus the plugin's source
    pub source: String,
}

/// The one-shot registration sink handed to the script engine.
///
/// The wrapper's `register(instance)` resolves here; only the first
/// registration for a key is kept.
#[derive(Clone)]
pub struct Registrar {
    key: String,
    plugin: String,
    pending: Arc<DashMap<String, Arc<dyn PluginInstance>>>,
}

impl Registrar {
    /// Deliver the plugin's instance. Returns `false` when something
    /// already registered under this key.
    pub fn register(&self, instance: Arc<dyn PluginInstance>) -> bool {
        if self.pending.contains_key(&self.key) {
            tracing::warn!(plugin = %self.plugin, "duplicate handoff registration ignored");
            return false;
        }
        self.pending.insert(self.key.clone(), instance);
        true
    }

    /// The registration key this sink is bound to.
    pub fn key(&self) -> &str {
        &self.key
    }
}

/// Host-provided execution environment for script plugins.
///
/// The engine must bind the wrapper's `__auricleHandoff(key)` lookup to
/// the [`Registrar`] it receives, so the wrapped source's local
/// `register` lands in the loader's pending slot.
#[async_trait]
pub trait ScriptEngine: Send + Sync {
    /// Execute a wrapped artifact; resolves after the script's top-level
    /// code (and its `onload` analog) has run.
    async fn execute(
        &self,
        plugin: &str,
        wrapped: &WrappedScript,
        registrar: Registrar,
    ) -> Result<ScriptHandle, HostError>;

    /// Remove an injected script.
    fn remove(&self, handle: &ScriptHandle);

    /// Read a well-known global; the legacy handoff fallback.
    fn read_global(&self, name: &str) -> Option<Arc<dyn PluginInstance>>;

    /// Purge a well-known global a plugin may have set.
    fn purge_global(&self, name: &str);

    /// Handles of every script currently injected; consumed by the
    /// detached-resource sweeper.
    fn handles(&self) -> Vec<ScriptHandle>;
}

/// Host-provided instantiation environment for native plugins.
#[async_trait]
pub trait NativeEngine: Send + Sync {
    async fn instantiate(
        &self,
        plugin: &str,
        artifact: &[u8],
        imports: ImportTable,
    ) -> Result<NativeModule, HostError>;
}

/// One permission-filtered host bridge importable by a native module.
pub type HostBridgeFn =
    Arc<dyn Fn(Value) -> BoxFuture<'static, Result<Value, HostError>> + Send + Sync>;

/// The imports object for one native instantiation: only bridges whose
/// permission gate the plugin satisfies are present, others are absent
/// rather than stubbed.
#[derive(Default)]
pub struct ImportTable {
    bridges: HashMap<&'static str, HostBridgeFn>,
}

impl ImportTable {
    /// The bridge for a method name, if imported.
    pub fn get(&self, method: &str) -> Option<&HostBridgeFn> {
        self.bridges.get(method)
    }

    /// Imported method names, sorted.
    pub fn methods(&self) -> Vec<&'static str> {
        let mut methods: Vec<_> = self.bridges.keys().copied().collect();
        methods.sort_unstable();
        methods
    }

    pub fn len(&self) -> usize {
        self.bridges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bridges.is_empty()
    }
}

/// The data-only methods a native module may import, with their gates.
/// Resolver registration is absent: native resolvers would have to be
/// module exports, which this host does not support.
const BRIDGEABLE: [(&str, CallGate); 28] = [
    ("player.getState", CallGate::Requires(Permission::PlayerRead)),
    ("player.getCurrentTrack", CallGate::Requires(Permission::PlayerRead)),
    ("player.getCurrentTime", CallGate::Requires(Permission::PlayerRead)),
    ("player.getQueue", CallGate::Requires(Permission::PlayerRead)),
    ("player.togglePlay", CallGate::Requires(Permission::PlayerControl)),
    ("player.next", CallGate::Requires(Permission::PlayerControl)),
    ("player.previous", CallGate::Requires(Permission::PlayerControl)),
    ("player.seek", CallGate::Requires(Permission::PlayerControl)),
    ("player.queueAdd", CallGate::Requires(Permission::PlayerControl)),
    ("player.queueRemove", CallGate::Requires(Permission::PlayerControl)),
    ("player.queueReorder", CallGate::Requires(Permission::PlayerControl)),
    ("player.queueClearUpcoming", CallGate::Requires(Permission::PlayerControl)),
    ("player.setTrack", CallGate::Requires(Permission::PlayerControl)),
    ("library.getTracks", CallGate::Requires(Permission::LibraryRead)),
    ("library.getPlaylists", CallGate::Requires(Permission::LibraryRead)),
    ("library.addExternalTrack", CallGate::Requires(Permission::LibraryWrite)),
    ("library.createPlaylist", CallGate::Requires(Permission::LibraryWrite)),
    ("library.addToPlaylist", CallGate::Requires(Permission::LibraryWrite)),
    ("library.updatePlaylistCover", CallGate::Requires(Permission::LibraryWrite)),
    ("library.updateTrackCover", CallGate::Requires(Permission::LibraryWrite)),
    ("library.downloadTrack", CallGate::Requires(Permission::LibraryWrite)),
    ("lyrics.get", CallGate::Requires(Permission::LyricsRead)),
    ("lyrics.set", CallGate::Requires(Permission::LyricsWrite)),
    ("notify.show", CallGate::Requires(Permission::Notifications)),
    ("storage.get", CallGate::Requires(Permission::ScopedStorage)),
    ("storage.set", CallGate::Requires(Permission::ScopedStorage)),
    ("http.fetch", CallGate::Requires(Permission::NetworkFetch)),
    ("theme.refresh", CallGate::Open),
];

/// Reconstruct a typed call from a bridged method name and JSON
/// arguments. Unknown names and malformed arguments yield `None`; the
/// bridge logs and replies with `null`.
fn parse_call(method: &str, args: &Value) -> Option<HostCall> {
    fn field<T: serde::de::DeserializeOwned>(args: &Value, name: &str) -> Option<T> {
        serde_json::from_value(args.get(name)?.clone()).ok()
    }

    match method {
        "player.getState" => Some(HostCall::PlayerGetState),
        "player.getCurrentTrack" => Some(HostCall::PlayerGetCurrentTrack),
        "player.getCurrentTime" => Some(HostCall::PlayerGetCurrentTime),
        "player.getQueue" => Some(HostCall::PlayerGetQueue),
        "player.togglePlay" => Some(HostCall::PlayerTogglePlay),
        "player.next" => Some(HostCall::PlayerNext),
        "player.previous" => Some(HostCall::PlayerPrevious),
        "player.seek" => Some(HostCall::PlayerSeek {
            position: field(args, "position")?,
        }),
        "player.queueAdd" => Some(HostCall::PlayerQueueAdd {
            track: field::<Track>(args, "track")?,
        }),
        "player.queueRemove" => Some(HostCall::PlayerQueueRemove {
            index: field(args, "index")?,
        }),
        "player.queueReorder" => Some(HostCall::PlayerQueueReorder {
            from: field(args, "from")?,
            to: field(args, "to")?,
        }),
        "player.queueClearUpcoming" => Some(HostCall::PlayerQueueClearUpcoming),
        "player.setTrack" => Some(HostCall::PlayerSetTrack {
            track: field::<Track>(args, "track")?,
        }),
        "library.getTracks" => Some(HostCall::LibraryGetTracks),
        "library.getPlaylists" => Some(HostCall::LibraryGetPlaylists),
        "library.addExternalTrack" => Some(HostCall::LibraryAddExternalTrack {
            track: field::<Track>(args, "track")?,
        }),
        "library.createPlaylist" => Some(HostCall::LibraryCreatePlaylist {
            name: field(args, "name")?,
        }),
        "library.addToPlaylist" => Some(HostCall::LibraryAddToPlaylist {
            playlist_id: field(args, "playlist_id")?,
            track_id: field(args, "track_id")?,
        }),
        "library.updatePlaylistCover" => Some(HostCall::LibraryUpdatePlaylistCover {
            playlist_id: field(args, "playlist_id")?,
            cover_url: field(args, "cover_url")?,
        }),
        "library.updateTrackCover" => Some(HostCall::LibraryUpdateTrackCover {
            track_id: field(args, "track_id")?,
            cover_url: field(args, "cover_url")?,
        }),
        "library.downloadTrack" => Some(HostCall::LibraryDownloadTrack {
            request: DownloadRequest {
                url: field(args, "url")?,
                filename: field(args, "filename")?,
            },
        }),
        "lyrics.get" => Some(HostCall::LyricsGet {
            track_id: field(args, "track_id")?,
        }),
        "lyrics.set" => Some(HostCall::LyricsSet {
            track_id: field(args, "track_id")?,
            text: field(args, "text")?,
        }),
        "notify.show" => Some(HostCall::NotifyShow {
            title: field(args, "title")?,
            body: field(args, "body")?,
        }),
        "storage.get" => Some(HostCall::StorageGet {
            key: field(args, "key")?,
        }),
        "storage.set" => Some(HostCall::StorageSet {
            key: field(args, "key")?,
            value: field(args, "value")?,
        }),
        "http.fetch" => Some(HostCall::HttpFetch {
            request: serde_json::from_value::<ProxyRequest>(args.clone()).ok()?,
        }),
        "theme.refresh" => Some(HostCall::ThemeRefresh),
        _ => None,
    }
}

/// Build the permission-filtered imports object for one native plugin.
pub fn build_import_table(
    plugin: &str,
    permissions: &HashSet<Permission>,
    dispatch: Arc<dyn HostDispatch>,
) -> ImportTable {
    let mut table = ImportTable::default();
    for (method, gate) in BRIDGEABLE {
        if !gate.satisfied_by(|p| permissions.contains(&p)) {
            continue;
        }
        let dispatch = Arc::clone(&dispatch);
        let plugin = plugin.to_string();
        let bridge: HostBridgeFn = Arc::new(move |args: Value| {
            let dispatch = Arc::clone(&dispatch);
            let plugin = plugin.clone();
            Box::pin(async move {
                match parse_call(method, &args) {
                    Some(call) => dispatch.dispatch(&plugin, call).await,
                    None => {
                        tracing::warn!(plugin = %plugin, method, "unparseable bridge call");
                        Ok(Value::Null)
                    }
                }
            })
        });
        table.bridges.insert(method, bridge);
    }
    table
}

/// Where entry artifacts are fetched from.
pub enum ArtifactSource {
    /// `<root>/<safe_name>/<entry>` on the local filesystem
    Directory(PathBuf),
    /// `<base_url>/<safe_name>/<entry>` over HTTP
    Remote {
        base_url: String,
        client: reqwest::Client,
    },
}

impl ArtifactSource {
    /// A remote source with its own request budget.
    pub fn remote(base_url: impl Into<String>, timeout: Duration) -> Result<Self, HostError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(ArtifactSource::Remote {
            base_url: base_url.into(),
            client,
        })
    }

    /// Fetch a script artifact as text.
    pub async fn fetch_text(&self, safe_name: &str, entry: &str) -> Result<String, HostError> {
        match self {
            ArtifactSource::Directory(root) => {
                let path = root.join(safe_name).join(entry);
                tokio::fs::read_to_string(&path)
                    .await
                    .map_err(|e| HostError::ArtifactFetch {
                        plugin: safe_name.to_string(),
                        message: format!("{}: {e}", path.display()),
                    })
            }
            ArtifactSource::Remote { base_url, client } => {
                let url = format!("{base_url}/{safe_name}/{entry}");
                let response = client.get(&url).send().await?;
                if !response.status().is_success() {
                    return Err(HostError::ArtifactFetch {
                        plugin: safe_name.to_string(),
                        message: format!("{url}: HTTP {}", response.status().as_u16()),
                    });
                }
                Ok(response.text().await?)
            }
        }
    }

    /// Fetch a native artifact as bytes.
    pub async fn fetch_bytes(&self, safe_name: &str, entry: &str) -> Result<Vec<u8>, HostError> {
        match self {
            ArtifactSource::Directory(root) => {
                let path = root.join(safe_name).join(entry);
                tokio::fs::read(&path)
                    .await
                    .map_err(|e| HostError::ArtifactFetch {
                        plugin: safe_name.to_string(),
                        message: format!("{}: {e}", path.display()),
                    })
            }
            ArtifactSource::Remote { base_url, client } => {
                let url = format!("{base_url}/{safe_name}/{entry}");
                let response = client.get(&url).send().await?;
                if !response.status().is_success() {
                    return Err(HostError::ArtifactFetch {
                        plugin: safe_name.to_string(),
                        message: format!("{url}: HTTP {}", response.status().as_u16()),
                    });
                }
                Ok(response.bytes().await?.to_vec())
            }
        }
    }
}

/// The well-known global names a legacy script plugin may use, most
/// specific first.
fn legacy_global_names(safe_name: &str) -> Vec<String> {
    let mut names = vec![camel_case(safe_name)];
    names.extend(LEGACY_GLOBALS.iter().map(|s| s.to_string()));
    names
}

fn camel_case(safe_name: &str) -> String {
    let mut out = String::with_capacity(safe_name.len());
    let mut upper_next = false;
    for c in safe_name.chars() {
        if c == '-' || c == '_' {
            upper_next = true;
        } else if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Wrap plugin source so the execution environment exposes a local
/// `register(instance)` sink bound to the loader's one-shot key.
fn wrap_script(safe_name: &str, registration_key: &str, source: &str) -> WrappedScript {
    WrappedScript {
        element_id: safe_name.to_string(),
        registration_key: registration_key.to_string(),
        source: format!(
            "(() => {{\n  const register = globalThis.__auricleHandoff(\"{registration_key}\");\n{source}\n}})();"
        ),
    }
}

/// Loads plugins; owns the pending-instance slots for in-flight script
/// handoffs.
pub struct PluginLoader {
    artifacts: ArtifactSource,
    script_engine: Arc<dyn ScriptEngine>,
    native_engine: Arc<dyn NativeEngine>,
    pending: Arc<DashMap<String, Arc<dyn PluginInstance>>>,
}

impl PluginLoader {
    pub fn new(
        artifacts: ArtifactSource,
        script_engine: Arc<dyn ScriptEngine>,
        native_engine: Arc<dyn NativeEngine>,
    ) -> Self {
        Self {
            artifacts,
            script_engine,
            native_engine,
            pending: Arc::new(DashMap::new()),
        }
    }

    /// Load one plugin per its manifest, returning the instance and the
    /// type-specific bookkeeping. Does not call `init`.
    pub async fn load(
        &self,
        manifest: &Manifest,
        permissions: &HashSet<Permission>,
        dispatch: Arc<dyn HostDispatch>,
    ) -> Result<(Arc<dyn PluginInstance>, LoadedKind), HostError> {
        match manifest.plugin_type {
            PluginType::Script => self.load_script(manifest).await,
            PluginType::Native => self.load_native(manifest, permissions, dispatch).await,
        }
    }

    async fn load_script(
        &self,
        manifest: &Manifest,
    ) -> Result<(Arc<dyn PluginInstance>, LoadedKind), HostError> {
        let source = self
            .artifacts
            .fetch_text(&manifest.safe_name, &manifest.entry)
            .await?;

        let key = Uuid::new_v4().to_string();
        let wrapped = wrap_script(&manifest.safe_name, &key, &source);
        let registrar = Registrar {
            key: key.clone(),
            plugin: manifest.name.clone(),
            pending: Arc::clone(&self.pending),
        };

        let executed = self
            .script_engine
            .execute(&manifest.name, &wrapped, registrar)
            .await;
        let handle = match executed {
            Ok(handle) => handle,
            Err(e) => {
                // Nothing may leak into the next attempt's slot.
                self.pending.remove(&key);
                return Err(e);
            }
        };

        // Consume exactly one registration; the slot is cleared either way.
        let instance = match self.pending.remove(&key) {
            Some((_, instance)) => Some(instance),
            None => self.legacy_lookup(&manifest.safe_name),
        };

        match instance {
            Some(instance) => {
                tracing::info!(plugin = %manifest.name, "script plugin instantiated");
                Ok((
                    instance,
                    LoadedKind::Script {
                        handle,
                        globals: legacy_global_names(&manifest.safe_name),
                    },
                ))
            }
            None => {
                self.script_engine.remove(&handle);
                Err(HostError::HandoffMissing {
                    plugin: manifest.name.clone(),
                })
            }
        }
    }

    fn legacy_lookup(&self, safe_name: &str) -> Option<Arc<dyn PluginInstance>> {
        for name in legacy_global_names(safe_name) {
            if let Some(instance) = self.script_engine.read_global(&name) {
                tracing::warn!(
                    plugin = safe_name,
                    global = %name,
                    "plugin used legacy global handoff; the register() sink is preferred"
                );
                return Some(instance);
            }
        }
        None
    }

    async fn load_native(
        &self,
        manifest: &Manifest,
        permissions: &HashSet<Permission>,
        dispatch: Arc<dyn HostDispatch>,
    ) -> Result<(Arc<dyn PluginInstance>, LoadedKind), HostError> {
        let artifact = self
            .artifacts
            .fetch_bytes(&manifest.safe_name, &manifest.entry)
            .await?;

        let imports = build_import_table(&manifest.name, permissions, dispatch);
        tracing::debug!(
            plugin = %manifest.name,
            imports = imports.len(),
            "instantiating native module"
        );

        let module = self
            .native_engine
            .instantiate(&manifest.name, &artifact, imports)
            .await?;

        tracing::info!(plugin = %manifest.name, "native plugin instantiated");
        Ok((
            module.instance,
            LoadedKind::Native {
                memory: Mutex::new(module.memory),
            },
        ))
    }

    /// The script engine, shared with the lifecycle manager's teardown
    /// and sweeper paths.
    pub fn script_engine(&self) -> &Arc<dyn ScriptEngine> {
        &self.script_engine
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use auricle_plugin_sdk::api::PluginApi;

    struct InertInstance;

    #[async_trait]
    impl PluginInstance for InertInstance {
        async fn init(&self, _api: PluginApi) -> Result<(), HostError> {
            Ok(())
        }
    }

    struct NullDispatch;

    #[async_trait]
    impl HostDispatch for NullDispatch {
        async fn dispatch(&self, _caller: &str, _call: HostCall) -> Result<Value, HostError> {
            Ok(Value::Null)
        }
    }

    #[test]
    fn camel_case_derivation() {
        assert_eq!(camel_case("keyboard-shortcuts"), "keyboardShortcuts");
        assert_eq!(camel_case("theme_editor"), "themeEditor");
        assert_eq!(camel_case("plain"), "plain");
    }

    #[test]
    fn wrapper_binds_the_registration_key() {
        let wrapped = wrap_script("kb", "key-123", "register({});");
        assert_eq!(wrapped.element_id, "kb");
        assert!(wrapped.source.contains("__auricleHandoff(\"key-123\")"));
        assert!(wrapped.source.contains("register({});"));
    }

    #[test]
    fn registrar_is_one_shot() {
        let pending = Arc::new(DashMap::new());
        let registrar = Registrar {
            key: "k".to_string(),
            plugin: "p".to_string(),
            pending: Arc::clone(&pending),
        };
        assert!(registrar.register(Arc::new(InertInstance)));
        assert!(!registrar.register(Arc::new(InertInstance)));
        assert_eq!(pending.len(), 1);
    }

    #[test]
    fn import_table_contains_only_permitted_bridges() {
        let permissions: HashSet<Permission> =
            [Permission::PlayerRead, Permission::ScopedStorage]
                .into_iter()
                .collect();
        let table = build_import_table("p", &permissions, Arc::new(NullDispatch));

        assert!(table.get("player.getState").is_some());
        assert!(table.get("storage.get").is_some());
        // Ungated methods are always importable.
        assert!(table.get("theme.refresh").is_some());
        // Unpermitted bridges are absent, not stubbed.
        assert!(table.get("player.togglePlay").is_none());
        assert!(table.get("http.fetch").is_none());
        // Resolver registration is never bridgeable.
        assert!(table.get("stream.registerResolver").is_none());
    }

    #[tokio::test]
    async fn bridge_parses_arguments_into_typed_calls() {
        let permissions: HashSet<Permission> = [Permission::PlayerControl].into_iter().collect();
        let table = build_import_table("p", &permissions, Arc::new(NullDispatch));
        let bridge = table.get("player.seek").unwrap();
        // Well-formed arguments dispatch; the stub replies null.
        let reply = bridge(serde_json::json!({"position": 12.5})).await.unwrap();
        assert!(reply.is_null());
        // Malformed arguments degrade to null instead of erroring.
        let reply = bridge(serde_json::json!({"position": "zero"})).await.unwrap();
        assert!(reply.is_null());
    }

    #[test]
    fn unknown_bridge_method_parses_to_none() {
        assert!(parse_call("player.unknownOp", &Value::Null).is_none());
    }

    #[tokio::test]
    async fn directory_source_reports_missing_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let source = ArtifactSource::Directory(dir.path().to_path_buf());
        let err = source.fetch_text("ghost", "index.js").await.unwrap_err();
        assert!(matches!(err, HostError::ArtifactFetch { .. }));
    }

    #[tokio::test]
    async fn directory_source_reads_entry_under_safe_name() {
        let dir = tempfile::tempdir().unwrap();
        let plugin_dir = dir.path().join("kb");
        std::fs::create_dir_all(&plugin_dir).unwrap();
        std::fs::write(plugin_dir.join("index.js"), "register({})").unwrap();

        let source = ArtifactSource::Directory(dir.path().to_path_buf());
        let text = source.fetch_text("kb", "index.js").await.unwrap();
        assert_eq!(text, "register({})");
    }

    #[tokio::test]
    async fn remote_source_fetches_over_http() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/kb/index.js"))
            .respond_with(ResponseTemplate::new(200).set_body_string("register({})"))
            .mount(&server)
            .await;

        let source = ArtifactSource::remote(server.uri(), Duration::from_secs(5)).unwrap();
        let text = source.fetch_text("kb", "index.js").await.unwrap();
        assert_eq!(text, "register({})");

        let err = source.fetch_text("kb", "missing.js").await.unwrap_err();
        assert!(matches!(err, HostError::ArtifactFetch { .. }));
    }
}
