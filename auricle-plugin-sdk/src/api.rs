//! # Plugin Capability Surface
//!
//! The per-plugin capability object and the permission-tagged builders
//! that compose it. A [`PluginApi`] is produced once at load time from
//! the permission ledger's view of the plugin; the runtime hands it to
//! the plugin's `init` and then forgets it. Every method is a thin
//! adapter that submits one [`HostCall`] through the dispatcher; the
//! adapters close over nothing but the plugin's name and the two
//! operation pointers, so a forgotten capability object cannot keep the
//! runtime alive after unload.
//!
//! ## Composition
//!
//! Sub-groups map one-to-one onto the permission vocabulary:
//!
//! | Field | Present when |
//! |-------|--------------|
//! | `events` | always |
//! | `requests` | always |
//! | `theme` | always |
//! | `player` | `player-read` |
//! | `player_control` | `player-control` |
//! | `stream` | `player-control` |
//! | `library` | `library-read` |
//! | `library_write` | `library-write` |
//! | `storage` | `scoped-storage` |
//! | `lyrics` | `lyrics-read` |
//! | `lyrics_write` | `lyrics-write` |
//! | `notify` | `notifications` |
//! | `ui` | `ui-inject` |
//! | `fetch` | `network-fetch` |
//! | `settings` | `settings-write` or `scoped-storage` |
//!
//! A method a plugin was not granted simply does not exist on its
//! capability object; the dispatcher additionally re-checks the gate on
//! every call.
//!
//! ## Neutral failures
//!
//! Rate-limited and precondition-failed calls come back as JSON `null`
//! from the dispatcher. Read adapters surface that as `None`/empty,
//! write adapters as `false` or `Ok(())`; no adapter turns a neutral
//! failure into an error.

use crate::calls::{HostCall, StreamResolver};
use crate::error::HostError;
use crate::manifest::Permission;
use crate::models::{DownloadRequest, Playlist, PlaybackState, ProxyRequest, Track};
use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::Value;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

/// A bus listener owned by a plugin. Returning an error is caught and
/// logged by the bus; it never stops delivery to later listeners.
pub type EventListenerFn = Arc<dyn Fn(Value) -> Result<(), HostError> + Send + Sync>;

/// An asynchronous handler for one named request.
pub type RequestHandlerFn =
    Arc<dyn Fn(Value) -> BoxFuture<'static, Result<Value, HostError>> + Send + Sync>;

/// The dispatch seam between a capability object and the runtime.
///
/// Implemented by the runtime's host dispatcher; capability adapters
/// hold it as `Arc<dyn HostDispatch>` and nothing else.
#[async_trait]
pub trait HostDispatch: Send + Sync {
    /// Route one call from `caller` to the host, applying rate limits
    /// and permission re-checks. Neutral failures come back as `null`.
    async fn dispatch(&self, caller: &str, call: HostCall) -> Result<Value, HostError>;
}

/// The event-bus seam between a capability object and the runtime.
#[async_trait]
pub trait EventBusPort: Send + Sync {
    /// Register a listener owned by `owner`; returns the subscription id.
    fn subscribe(&self, owner: &str, event: &str, listener: EventListenerFn, once: bool) -> u64;

    /// Remove one subscription by id.
    fn unsubscribe(&self, event: &str, subscription: u64);

    /// Install `owner`'s handler for a named request, replacing any
    /// previous handler for that name.
    fn register_request_handler(&self, owner: &str, name: &str, handler: RequestHandlerFn);

    /// Invoke the handler registered for `name`, enforcing cross-plugin
    /// grants when the handler belongs to another plugin.
    async fn request(&self, caller: &str, name: &str, data: Value) -> Result<Value, HostError>;
}

/// Shared inner of every dispatching sub-api.
#[derive(Clone)]
struct CallPort {
    plugin: String,
    dispatch: Arc<dyn HostDispatch>,
}

impl CallPort {
    async fn call(&self, call: HostCall) -> Result<Value, HostError> {
        self.dispatch.dispatch(&self.plugin, call).await
    }

    async fn call_opt<T: serde::de::DeserializeOwned>(
        &self,
        call: HostCall,
    ) -> Result<Option<T>, HostError> {
        let value = self.call(call).await?;
        if value.is_null() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_value(value)?))
    }
}

/// Event subscription methods, always present. `on`/`once` inject the
/// plugin's name as the subscription owner.
#[derive(Clone)]
pub struct EventsApi {
    plugin: String,
    bus: Arc<dyn EventBusPort>,
}

impl EventsApi {
    /// Subscribe to a host event; returns the subscription id for `off`.
    pub fn on(&self, event: &str, listener: EventListenerFn) -> u64 {
        self.bus.subscribe(&self.plugin, event, listener, false)
    }

    /// Subscribe for a single delivery; the subscription is removed
    /// before the listener is invoked.
    pub fn once(&self, event: &str, listener: EventListenerFn) -> u64 {
        self.bus.subscribe(&self.plugin, event, listener, true)
    }

    /// Remove a subscription previously returned by `on`/`once`.
    pub fn off(&self, event: &str, subscription: u64) {
        self.bus.unsubscribe(event, subscription)
    }
}

/// Request/response channel methods, always present. Cross-plugin
/// requests pass the cross-plugin permission check inside the bus.
#[derive(Clone)]
pub struct RequestsApi {
    plugin: String,
    bus: Arc<dyn EventBusPort>,
}

impl RequestsApi {
    /// Await the registered handler for `name`. Fails immediately with
    /// [`HostError::NoRequestHandler`] when no handler exists.
    pub async fn request(&self, name: &str, data: Value) -> Result<Value, HostError> {
        self.bus.request(&self.plugin, name, data).await
    }

    /// Install this plugin's handler for `name`, replacing any previous
    /// handler.
    pub fn handle_request(&self, name: &str, handler: RequestHandlerFn) {
        self.bus.register_request_handler(&self.plugin, name, handler)
    }
}

/// Playback reads, gated by `player-read`.
#[derive(Clone)]
pub struct PlayerReadApi {
    port: CallPort,
}

impl PlayerReadApi {
    pub async fn state(&self) -> Result<Option<PlaybackState>, HostError> {
        self.port.call_opt(HostCall::PlayerGetState).await
    }

    pub async fn current_track(&self) -> Result<Option<Track>, HostError> {
        self.port.call_opt(HostCall::PlayerGetCurrentTrack).await
    }

    pub async fn current_time(&self) -> Result<Option<f64>, HostError> {
        self.port.call_opt(HostCall::PlayerGetCurrentTime).await
    }

    pub async fn queue(&self) -> Result<Vec<Track>, HostError> {
        Ok(self
            .port
            .call_opt(HostCall::PlayerGetQueue)
            .await?
            .unwrap_or_default())
    }
}

/// Transport and queue control, gated by `player-control`. Control
/// calls are no-ops when their precondition is unmet.
#[derive(Clone)]
pub struct PlayerControlApi {
    port: CallPort,
}

impl PlayerControlApi {
    pub async fn toggle_play(&self) -> Result<(), HostError> {
        self.port.call(HostCall::PlayerTogglePlay).await.map(drop)
    }

    pub async fn next(&self) -> Result<(), HostError> {
        self.port.call(HostCall::PlayerNext).await.map(drop)
    }

    pub async fn previous(&self) -> Result<(), HostError> {
        self.port.call(HostCall::PlayerPrevious).await.map(drop)
    }

    pub async fn seek(&self, position: f64) -> Result<(), HostError> {
        self.port
            .call(HostCall::PlayerSeek { position })
            .await
            .map(drop)
    }

    pub async fn queue_add(&self, track: Track) -> Result<(), HostError> {
        self.port
            .call(HostCall::PlayerQueueAdd { track })
            .await
            .map(drop)
    }

    pub async fn queue_remove(&self, index: usize) -> Result<(), HostError> {
        self.port
            .call(HostCall::PlayerQueueRemove { index })
            .await
            .map(drop)
    }

    pub async fn queue_reorder(&self, from: usize, to: usize) -> Result<(), HostError> {
        self.port
            .call(HostCall::PlayerQueueReorder { from, to })
            .await
            .map(drop)
    }

    pub async fn queue_clear_upcoming(&self) -> Result<(), HostError> {
        self.port
            .call(HostCall::PlayerQueueClearUpcoming)
            .await
            .map(drop)
    }

    /// Install a new current track. The host emits `trackChange` with
    /// the previous value before this returns.
    pub async fn set_track(&self, track: Track) -> Result<(), HostError> {
        self.port
            .call(HostCall::PlayerSetTrack { track })
            .await
            .map(drop)
    }
}

/// Library reads, gated by `library-read`.
#[derive(Clone)]
pub struct LibraryReadApi {
    port: CallPort,
}

impl LibraryReadApi {
    pub async fn tracks(&self) -> Result<Vec<Track>, HostError> {
        Ok(self
            .port
            .call_opt(HostCall::LibraryGetTracks)
            .await?
            .unwrap_or_default())
    }

    pub async fn playlists(&self) -> Result<Vec<Playlist>, HostError> {
        Ok(self
            .port
            .call_opt(HostCall::LibraryGetPlaylists)
            .await?
            .unwrap_or_default())
    }
}

/// Library mutation, gated by `library-write`.
#[derive(Clone)]
pub struct LibraryWriteApi {
    port: CallPort,
}

impl LibraryWriteApi {
    pub async fn add_external_track(&self, track: Track) -> Result<Option<Track>, HostError> {
        self.port
            .call_opt(HostCall::LibraryAddExternalTrack { track })
            .await
    }

    pub async fn create_playlist(&self, name: &str) -> Result<Option<Playlist>, HostError> {
        self.port
            .call_opt(HostCall::LibraryCreatePlaylist {
                name: name.to_string(),
            })
            .await
    }

    pub async fn add_to_playlist(&self, playlist_id: &str, track_id: &str) -> Result<(), HostError> {
        self.port
            .call(HostCall::LibraryAddToPlaylist {
                playlist_id: playlist_id.to_string(),
                track_id: track_id.to_string(),
            })
            .await
            .map(drop)
    }

    pub async fn update_playlist_cover(
        &self,
        playlist_id: &str,
        cover_url: &str,
    ) -> Result<(), HostError> {
        self.port
            .call(HostCall::LibraryUpdatePlaylistCover {
                playlist_id: playlist_id.to_string(),
                cover_url: cover_url.to_string(),
            })
            .await
            .map(drop)
    }

    pub async fn update_track_cover(
        &self,
        track_id: &str,
        cover_url: &str,
    ) -> Result<(), HostError> {
        self.port
            .call(HostCall::LibraryUpdateTrackCover {
                track_id: track_id.to_string(),
                cover_url: cover_url.to_string(),
            })
            .await
            .map(drop)
    }

    /// Download an audio payload; returns the saved path. A library
    /// rescan is triggered by the host afterwards and cannot fail the
    /// download.
    pub async fn download_track(
        &self,
        url: &str,
        filename: &str,
    ) -> Result<Option<String>, HostError> {
        self.port
            .call_opt(HostCall::LibraryDownloadTrack {
                request: DownloadRequest {
                    url: url.to_string(),
                    filename: filename.to_string(),
                },
            })
            .await
    }
}

/// Scoped key/value storage, gated by `scoped-storage`.
#[derive(Clone)]
pub struct StorageApi {
    port: CallPort,
}

impl StorageApi {
    /// Read a key from this plugin's namespace.
    pub async fn get(&self, key: &str) -> Result<Option<String>, HostError> {
        self.port
            .call_opt(HostCall::StorageGet {
                key: key.to_string(),
            })
            .await
    }

    /// Write a key; returns `false` when the storage-write budget is
    /// exhausted.
    pub async fn set(&self, key: &str, value: &str) -> Result<bool, HostError> {
        let reply = self
            .port
            .call(HostCall::StorageSet {
                key: key.to_string(),
                value: value.to_string(),
            })
            .await?;
        Ok(reply.as_bool().unwrap_or(false))
    }
}

/// Lyrics reads, gated by `lyrics-read`.
#[derive(Clone)]
pub struct LyricsReadApi {
    port: CallPort,
}

impl LyricsReadApi {
    pub async fn get(&self, track_id: &str) -> Result<Option<String>, HostError> {
        self.port
            .call_opt(HostCall::LyricsGet {
                track_id: track_id.to_string(),
            })
            .await
    }
}

/// Lyrics writes, gated by `lyrics-write`.
#[derive(Clone)]
pub struct LyricsWriteApi {
    port: CallPort,
}

impl LyricsWriteApi {
    pub async fn set(&self, track_id: &str, text: &str) -> Result<(), HostError> {
        self.port
            .call(HostCall::LyricsSet {
                track_id: track_id.to_string(),
                text: text.to_string(),
            })
            .await
            .map(drop)
    }
}

/// System notifications, gated by `notifications`.
#[derive(Clone)]
pub struct NotifyApi {
    port: CallPort,
}

impl NotifyApi {
    pub async fn show(&self, title: &str, body: &str) -> Result<(), HostError> {
        self.port
            .call(HostCall::NotifyShow {
                title: title.to_string(),
                body: body.to_string(),
            })
            .await
            .map(drop)
    }
}

/// UI slot injection, gated by `ui-inject`.
#[derive(Clone)]
pub struct UiApi {
    port: CallPort,
}

impl UiApi {
    /// Default priority assigned when `register_slot` is called without one.
    pub const DEFAULT_PRIORITY: i32 = 50;

    /// Place a visual fragment into a named slot. A second registration
    /// by the same plugin in the same slot replaces the first.
    pub async fn register_slot(
        &self,
        slot: &str,
        html: &str,
        priority: Option<i32>,
    ) -> Result<bool, HostError> {
        let reply = self
            .port
            .call(HostCall::UiInject {
                slot: slot.to_string(),
                html: html.to_string(),
                priority: priority.unwrap_or(Self::DEFAULT_PRIORITY),
            })
            .await?;
        Ok(reply.as_bool().unwrap_or(false))
    }

    /// Remove this plugin's fragment from a slot.
    pub async fn unregister_slot(&self, slot: &str) -> Result<(), HostError> {
        self.port
            .call(HostCall::UiRemove {
                slot: slot.to_string(),
            })
            .await
            .map(drop)
    }
}

/// Stream resolver registration, gated by `player-control`.
#[derive(Clone)]
pub struct StreamApi {
    port: CallPort,
}

impl StreamApi {
    /// Register this plugin's resolver for a source-type tag
    /// (last-writer-wins across plugins).
    pub async fn register_resolver(
        &self,
        source_type: &str,
        resolver: StreamResolver,
    ) -> Result<bool, HostError> {
        let reply = self
            .port
            .call(HostCall::StreamRegisterResolver {
                source_type: source_type.to_string(),
                resolver,
            })
            .await?;
        Ok(reply.as_bool().unwrap_or(false))
    }

    /// Unregister the resolver for a source-type tag; only succeeds when
    /// this plugin owns it.
    pub async fn unregister_resolver(&self, source_type: &str) -> Result<bool, HostError> {
        let reply = self
            .port
            .call(HostCall::StreamUnregisterResolver {
                source_type: source_type.to_string(),
            })
            .await?;
        Ok(reply.as_bool().unwrap_or(false))
    }
}

/// The reply shape handed back by [`FetchApi::fetch`].
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct FetchResponse {
    pub ok: bool,
    pub status: u16,
    pub headers: HashMap<String, String>,
    body: String,
}

impl FetchResponse {
    /// The response body as text.
    pub fn text(&self) -> &str {
        &self.body
    }

    /// The response body parsed as JSON.
    pub fn json(&self) -> Result<Value, HostError> {
        Ok(serde_json::from_str(&self.body)?)
    }
}

/// Proxied outbound HTTP, gated by `network-fetch`.
#[derive(Clone)]
pub struct FetchApi {
    port: CallPort,
}

impl FetchApi {
    /// Execute an HTTP request through the host proxy. Returns `None`
    /// when the call was rate-limited.
    pub async fn fetch(&self, request: ProxyRequest) -> Result<Option<FetchResponse>, HostError> {
        self.port.call_opt(HostCall::HttpFetch { request }).await
    }
}

/// Host settings writes, gated by `settings-write` or `scoped-storage`.
#[derive(Clone)]
pub struct SettingsApi {
    port: CallPort,
}

impl SettingsApi {
    /// Update the host's download location; returns whether the setter
    /// was available in this embedding.
    pub async fn set_download_location(&self, path: &str) -> Result<bool, HostError> {
        let reply = self
            .port
            .call(HostCall::SettingsSetDownloadLocation {
                path: path.to_string(),
            })
            .await?;
        Ok(reply.as_bool().unwrap_or(false))
    }
}

/// Theme control, always present so plugins can revert custom theming
/// during teardown.
#[derive(Clone)]
pub struct ThemeApi {
    port: CallPort,
}

impl ThemeApi {
    pub async fn refresh(&self) -> Result<(), HostError> {
        self.port.call(HostCall::ThemeRefresh).await.map(drop)
    }
}

/// The per-plugin capability object.
///
/// Composed once at load time from the ledger's granted permissions;
/// never stored or inspected by the runtime afterwards.
#[derive(Clone)]
pub struct PluginApi {
    plugin: String,
    pub events: EventsApi,
    pub requests: RequestsApi,
    pub theme: ThemeApi,
    pub player: Option<PlayerReadApi>,
    pub player_control: Option<PlayerControlApi>,
    pub library: Option<LibraryReadApi>,
    pub library_write: Option<LibraryWriteApi>,
    pub storage: Option<StorageApi>,
    pub lyrics: Option<LyricsReadApi>,
    pub lyrics_write: Option<LyricsWriteApi>,
    pub notify: Option<NotifyApi>,
    pub ui: Option<UiApi>,
    pub stream: Option<StreamApi>,
    pub fetch: Option<FetchApi>,
    pub settings: Option<SettingsApi>,
}

impl PluginApi {
    /// Compose a capability object from one plugin's granted permissions.
    ///
    /// Each sub-group is built by its own permission-tagged branch so the
    /// projection from vocabulary to surface stays auditable in one
    /// screenful.
    pub fn compose(
        plugin: &str,
        permissions: &HashSet<Permission>,
        dispatch: Arc<dyn HostDispatch>,
        bus: Arc<dyn EventBusPort>,
    ) -> PluginApi {
        let has = |p: Permission| permissions.contains(&p);
        let port = CallPort {
            plugin: plugin.to_string(),
            dispatch,
        };
        let sub = |present: bool| -> Option<CallPort> { present.then(|| port.clone()) };

        PluginApi {
            plugin: plugin.to_string(),
            events: EventsApi {
                plugin: plugin.to_string(),
                bus: Arc::clone(&bus),
            },
            requests: RequestsApi {
                plugin: plugin.to_string(),
                bus,
            },
            theme: ThemeApi { port: port.clone() },
            player: sub(has(Permission::PlayerRead)).map(|port| PlayerReadApi { port }),
            player_control: sub(has(Permission::PlayerControl))
                .map(|port| PlayerControlApi { port }),
            library: sub(has(Permission::LibraryRead)).map(|port| LibraryReadApi { port }),
            library_write: sub(has(Permission::LibraryWrite)).map(|port| LibraryWriteApi { port }),
            storage: sub(has(Permission::ScopedStorage)).map(|port| StorageApi { port }),
            lyrics: sub(has(Permission::LyricsRead)).map(|port| LyricsReadApi { port }),
            lyrics_write: sub(has(Permission::LyricsWrite)).map(|port| LyricsWriteApi { port }),
            notify: sub(has(Permission::Notifications)).map(|port| NotifyApi { port }),
            ui: sub(has(Permission::UiInject)).map(|port| UiApi { port }),
            stream: sub(has(Permission::PlayerControl)).map(|port| StreamApi { port }),
            fetch: sub(has(Permission::NetworkFetch)).map(|port| FetchApi { port }),
            settings: sub(has(Permission::SettingsWrite) || has(Permission::ScopedStorage))
                .map(|port| SettingsApi { port }),
        }
    }

    /// The owning plugin's name.
    pub fn plugin_name(&self) -> &str {
        &self.plugin
    }

    /// The method-group keys present on this object.
    pub fn method_keys(&self) -> BTreeSet<&'static str> {
        let mut keys = BTreeSet::from(["events", "requests", "theme"]);
        if self.player.is_some() {
            keys.insert("player.read");
        }
        if self.player_control.is_some() {
            keys.insert("player.control");
        }
        if self.library.is_some() {
            keys.insert("library.read");
        }
        if self.library_write.is_some() {
            keys.insert("library.write");
        }
        if self.storage.is_some() {
            keys.insert("storage");
        }
        if self.lyrics.is_some() {
            keys.insert("lyrics.read");
        }
        if self.lyrics_write.is_some() {
            keys.insert("lyrics.write");
        }
        if self.notify.is_some() {
            keys.insert("notify");
        }
        if self.ui.is_some() {
            keys.insert("ui");
        }
        if self.stream.is_some() {
            keys.insert("stream");
        }
        if self.fetch.is_some() {
            keys.insert("fetch");
        }
        if self.settings.is_some() {
            keys.insert("settings");
        }
        keys
    }
}

/// The host-defined projection from a permission set to the method-group
/// keys its capability object must carry. Used to assert capability
/// closure.
pub fn expected_method_keys(permissions: &HashSet<Permission>) -> BTreeSet<&'static str> {
    let has = |p: Permission| permissions.contains(&p);
    let mut keys = BTreeSet::from(["events", "requests", "theme"]);
    if has(Permission::PlayerRead) {
        keys.insert("player.read");
    }
    if has(Permission::PlayerControl) {
        keys.insert("player.control");
        keys.insert("stream");
    }
    if has(Permission::LibraryRead) {
        keys.insert("library.read");
    }
    if has(Permission::LibraryWrite) {
        keys.insert("library.write");
    }
    if has(Permission::ScopedStorage) {
        keys.insert("storage");
        keys.insert("settings");
    }
    if has(Permission::LyricsRead) {
        keys.insert("lyrics.read");
    }
    if has(Permission::LyricsWrite) {
        keys.insert("lyrics.write");
    }
    if has(Permission::Notifications) {
        keys.insert("notify");
    }
    if has(Permission::UiInject) {
        keys.insert("ui");
    }
    if has(Permission::NetworkFetch) {
        keys.insert("fetch");
    }
    if has(Permission::SettingsWrite) {
        keys.insert("settings");
    }
    keys
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Dispatcher stub that records method names and replies with null.
    struct RecordingDispatch {
        calls: Mutex<Vec<&'static str>>,
    }

    #[async_trait]
    impl HostDispatch for RecordingDispatch {
        async fn dispatch(&self, _caller: &str, call: HostCall) -> Result<Value, HostError> {
            self.calls.lock().unwrap().push(call.method());
            Ok(Value::Null)
        }
    }

    struct NullBus;

    #[async_trait]
    impl EventBusPort for NullBus {
        fn subscribe(
            &self,
            _owner: &str,
            _event: &str,
            _listener: EventListenerFn,
            _once: bool,
        ) -> u64 {
            0
        }

        fn unsubscribe(&self, _event: &str, _subscription: u64) {}

        fn register_request_handler(
            &self,
            _owner: &str,
            _name: &str,
            _handler: RequestHandlerFn,
        ) {
        }

        async fn request(
            &self,
            _caller: &str,
            name: &str,
            _data: Value,
        ) -> Result<Value, HostError> {
            Err(HostError::NoRequestHandler {
                name: name.to_string(),
            })
        }
    }

    fn compose_with(permissions: &[Permission]) -> PluginApi {
        let dispatch = Arc::new(RecordingDispatch {
            calls: Mutex::new(Vec::new()),
        });
        PluginApi::compose(
            "test-plugin",
            &permissions.iter().copied().collect(),
            dispatch,
            Arc::new(NullBus),
        )
    }

    #[test]
    fn capability_closure_matches_projection_for_every_single_permission() {
        for permission in Permission::ALL {
            let permissions: HashSet<Permission> = [permission].into_iter().collect();
            let api = compose_with(&[permission]);
            assert_eq!(
                api.method_keys(),
                expected_method_keys(&permissions),
                "closure mismatch for {}",
                permission.tag()
            );
        }
    }

    #[test]
    fn empty_grant_still_carries_events_requests_and_theme() {
        let api = compose_with(&[]);
        assert_eq!(
            api.method_keys(),
            BTreeSet::from(["events", "requests", "theme"])
        );
        assert!(api.player.is_none());
        assert!(api.storage.is_none());
        assert!(api.fetch.is_none());
    }

    #[test]
    fn scoped_storage_alone_enables_settings() {
        let api = compose_with(&[Permission::ScopedStorage]);
        assert!(api.settings.is_some());
        assert!(api.storage.is_some());
    }

    #[tokio::test]
    async fn null_reply_reads_as_neutral_failure() {
        let api = compose_with(&[Permission::PlayerRead, Permission::ScopedStorage]);
        let player = api.player.as_ref().unwrap();
        assert!(player.current_time().await.unwrap().is_none());
        assert!(player.queue().await.unwrap().is_empty());

        let storage = api.storage.as_ref().unwrap();
        assert!(!storage.set("k", "v").await.unwrap());
    }

    #[test]
    fn fetch_response_exposes_text_and_json() {
        let response = FetchResponse {
            ok: true,
            status: 200,
            headers: HashMap::new(),
            body: r#"{"hits":3}"#.to_string(),
        };
        assert_eq!(response.text(), r#"{"hits":3}"#);
        assert_eq!(response.json().unwrap()["hits"], 3);
    }
}
