//! # Host Call Catalogue
//!
//! The closed enumeration of host-method calls a capability object can
//! submit to the dispatcher. The original host-call surface was keyed on
//! method-name strings; here every method is one [`HostCall`] variant
//! with a typed argument payload, and the stable string name survives as
//! [`HostCall::method`] for logging, permission-denial messages and the
//! native bridge import table.
//!
//! ## Gating
//!
//! Each call names its gate through [`HostCall::required_permission`]:
//! most require exactly one permission tag, `settings.setDownloadLocation`
//! accepts either of two, and `theme.refresh` is open. The dispatcher
//! re-checks the gate on every dispatch even though the capability
//! surface already filtered by permission at composition time.

use crate::error::HostError;
use crate::manifest::Permission;
use crate::models::{DownloadRequest, ProxyRequest, Track};
use futures::future::BoxFuture;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// A plugin-provided function mapping an opaque external id (plus
/// options) to a playable URL.
pub type StreamResolverFn =
    Arc<dyn Fn(String, Value) -> BoxFuture<'static, Result<String, HostError>> + Send + Sync>;

/// Newtype around [`StreamResolverFn`] so calls carrying a resolver stay
/// debuggable.
#[derive(Clone)]
pub struct StreamResolver(pub StreamResolverFn);

impl StreamResolver {
    /// Wrap a resolver closure.
    pub fn new<F>(resolver: F) -> Self
    where
        F: Fn(String, Value) -> BoxFuture<'static, Result<String, HostError>>
            + Send
            + Sync
            + 'static,
    {
        StreamResolver(Arc::new(resolver))
    }

    /// Invoke the resolver.
    pub fn resolve(
        &self,
        external_id: String,
        options: Value,
    ) -> BoxFuture<'static, Result<String, HostError>> {
        (self.0)(external_id, options)
    }
}

impl fmt::Debug for StreamResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StreamResolver")
    }
}

/// The permission gate on one host call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallGate {
    /// No permission required
    Open,
    /// Exactly this permission
    Requires(Permission),
    /// Either of these permissions
    Either(Permission, Permission),
}

impl CallGate {
    /// Whether a granted-permission predicate satisfies this gate.
    pub fn satisfied_by(&self, mut has: impl FnMut(Permission) -> bool) -> bool {
        match *self {
            CallGate::Open => true,
            CallGate::Requires(p) => has(p),
            CallGate::Either(a, b) => has(a) || has(b),
        }
    }
}

/// One host-method call with its typed arguments.
#[derive(Debug, Clone)]
pub enum HostCall {
    // player reads
    PlayerGetState,
    PlayerGetCurrentTrack,
    PlayerGetCurrentTime,
    PlayerGetQueue,
    // player control
    PlayerTogglePlay,
    PlayerNext,
    PlayerPrevious,
    PlayerSeek { position: f64 },
    PlayerQueueAdd { track: Track },
    PlayerQueueRemove { index: usize },
    PlayerQueueReorder { from: usize, to: usize },
    PlayerQueueClearUpcoming,
    PlayerSetTrack { track: Track },
    // library
    LibraryGetTracks,
    LibraryGetPlaylists,
    LibraryAddExternalTrack { track: Track },
    LibraryCreatePlaylist { name: String },
    LibraryAddToPlaylist { playlist_id: String, track_id: String },
    LibraryUpdatePlaylistCover { playlist_id: String, cover_url: String },
    LibraryUpdateTrackCover { track_id: String, cover_url: String },
    LibraryDownloadTrack { request: DownloadRequest },
    // lyrics
    LyricsGet { track_id: String },
    LyricsSet { track_id: String, text: String },
    // notifications
    NotifyShow { title: String, body: String },
    // ui slots
    UiInject { slot: String, html: String, priority: i32 },
    UiRemove { slot: String },
    // scoped storage
    StorageGet { key: String },
    StorageSet { key: String, value: String },
    // settings
    SettingsSetDownloadLocation { path: String },
    // stream resolvers
    StreamRegisterResolver { source_type: String, resolver: StreamResolver },
    StreamUnregisterResolver { source_type: String },
    // outbound fetch
    HttpFetch { request: ProxyRequest },
    // theming
    ThemeRefresh,
}

impl HostCall {
    /// The stable string name of this method, as script plugins know it.
    pub fn method(&self) -> &'static str {
        match self {
            HostCall::PlayerGetState => "player.getState",
            HostCall::PlayerGetCurrentTrack => "player.getCurrentTrack",
            HostCall::PlayerGetCurrentTime => "player.getCurrentTime",
            HostCall::PlayerGetQueue => "player.getQueue",
            HostCall::PlayerTogglePlay => "player.togglePlay",
            HostCall::PlayerNext => "player.next",
            HostCall::PlayerPrevious => "player.previous",
            HostCall::PlayerSeek { .. } => "player.seek",
            HostCall::PlayerQueueAdd { .. } => "player.queueAdd",
            HostCall::PlayerQueueRemove { .. } => "player.queueRemove",
            HostCall::PlayerQueueReorder { .. } => "player.queueReorder",
            HostCall::PlayerQueueClearUpcoming => "player.queueClearUpcoming",
            HostCall::PlayerSetTrack { .. } => "player.setTrack",
            HostCall::LibraryGetTracks => "library.getTracks",
            HostCall::LibraryGetPlaylists => "library.getPlaylists",
            HostCall::LibraryAddExternalTrack { .. } => "library.addExternalTrack",
            HostCall::LibraryCreatePlaylist { .. } => "library.createPlaylist",
            HostCall::LibraryAddToPlaylist { .. } => "library.addToPlaylist",
            HostCall::LibraryUpdatePlaylistCover { .. } => "library.updatePlaylistCover",
            HostCall::LibraryUpdateTrackCover { .. } => "library.updateTrackCover",
            HostCall::LibraryDownloadTrack { .. } => "library.downloadTrack",
            HostCall::LyricsGet { .. } => "lyrics.get",
            HostCall::LyricsSet { .. } => "lyrics.set",
            HostCall::NotifyShow { .. } => "notify.show",
            HostCall::UiInject { .. } => "ui.inject",
            HostCall::UiRemove { .. } => "ui.remove",
            HostCall::StorageGet { .. } => "storage.get",
            HostCall::StorageSet { .. } => "storage.set",
            HostCall::SettingsSetDownloadLocation { .. } => "settings.setDownloadLocation",
            HostCall::StreamRegisterResolver { .. } => "stream.registerResolver",
            HostCall::StreamUnregisterResolver { .. } => "stream.unregisterResolver",
            HostCall::HttpFetch { .. } => "http.fetch",
            HostCall::ThemeRefresh => "theme.refresh",
        }
    }

    /// The permission gate the dispatcher re-checks for this call.
    pub fn required_permission(&self) -> CallGate {
        use Permission::*;
        match self {
            HostCall::PlayerGetState
            | HostCall::PlayerGetCurrentTrack
            | HostCall::PlayerGetCurrentTime
            | HostCall::PlayerGetQueue => CallGate::Requires(PlayerRead),

            HostCall::PlayerTogglePlay
            | HostCall::PlayerNext
            | HostCall::PlayerPrevious
            | HostCall::PlayerSeek { .. }
            | HostCall::PlayerQueueAdd { .. }
            | HostCall::PlayerQueueRemove { .. }
            | HostCall::PlayerQueueReorder { .. }
            | HostCall::PlayerQueueClearUpcoming
            | HostCall::PlayerSetTrack { .. } => CallGate::Requires(PlayerControl),

            HostCall::LibraryGetTracks | HostCall::LibraryGetPlaylists => {
                CallGate::Requires(LibraryRead)
            }

            HostCall::LibraryAddExternalTrack { .. }
            | HostCall::LibraryCreatePlaylist { .. }
            | HostCall::LibraryAddToPlaylist { .. }
            | HostCall::LibraryUpdatePlaylistCover { .. }
            | HostCall::LibraryUpdateTrackCover { .. }
            | HostCall::LibraryDownloadTrack { .. } => CallGate::Requires(LibraryWrite),

            HostCall::LyricsGet { .. } => CallGate::Requires(LyricsRead),
            HostCall::LyricsSet { .. } => CallGate::Requires(LyricsWrite),

            HostCall::NotifyShow { .. } => CallGate::Requires(Notifications),

            HostCall::UiInject { .. } | HostCall::UiRemove { .. } => CallGate::Requires(UiInject),

            HostCall::StorageGet { .. } | HostCall::StorageSet { .. } => {
                CallGate::Requires(ScopedStorage)
            }

            HostCall::SettingsSetDownloadLocation { .. } => {
                CallGate::Either(SettingsWrite, ScopedStorage)
            }

            HostCall::StreamRegisterResolver { .. } | HostCall::StreamUnregisterResolver { .. } => {
                CallGate::Requires(PlayerControl)
            }

            HostCall::HttpFetch { .. } => CallGate::Requires(NetworkFetch),

            HostCall::ThemeRefresh => CallGate::Open,
        }
    }
}
