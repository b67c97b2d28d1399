//! # Host Dispatcher
//!
//! The single switch every capability-object method routes through. All
//! cross-cutting concerns live here, so the capability surface stays a
//! set of thin adapters and correctness audits stay local:
//!
//! 1. the caller must be a loaded plugin; a call from anything else
//!    fails softly with a `null` reply and a warning trace;
//! 2. one api token is consumed from the caller's bucket; exhaustion is
//!    the same soft failure, never an exception;
//! 3. the call's permission gate is re-checked against the ledger, even
//!    though the capability surface was already permission-filtered at
//!    composition time;
//! 4. the typed host action runs.
//!
//! ## Side effects worth knowing
//!
//! - `player.setTrack` emits `trackChange` carrying the previous track
//!   before the dispatch returns.
//! - a successful `library.downloadTrack` triggers a rescan of the
//!   download directory; a rescan failure is logged and does not fail
//!   the download.
//! - `storage.set` consumes a storage-write token on top of the api
//!   token and reports exhaustion as `false`.

use crate::event_bus::EventBus;
use crate::permissions::PermissionLedger;
use crate::plugin::PluginsMap;
use crate::storage::ScopedStorage;
use crate::stream_resolver::StreamResolverRegistry;
use crate::ui_slots::{SlotRegistry, UiSlot};
use async_trait::async_trait;
use auricle_plugin_sdk::api::HostDispatch;
use auricle_plugin_sdk::calls::HostCall;
use auricle_plugin_sdk::error::HostError;
use auricle_plugin_sdk::events::{names, TrackChange};
use auricle_plugin_sdk::host::HostServices;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;

/// Routes capability calls to host services; one per runtime.
pub struct HostDispatcher {
    plugins: PluginsMap,
    ledger: Arc<PermissionLedger>,
    storage: Arc<ScopedStorage>,
    slots: Arc<SlotRegistry>,
    resolvers: Arc<StreamResolverRegistry>,
    bus: Arc<EventBus>,
    services: Arc<dyn HostServices>,
}

impl HostDispatcher {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        plugins: PluginsMap,
        ledger: Arc<PermissionLedger>,
        storage: Arc<ScopedStorage>,
        slots: Arc<SlotRegistry>,
        resolvers: Arc<StreamResolverRegistry>,
        bus: Arc<EventBus>,
        services: Arc<dyn HostServices>,
    ) -> Self {
        Self {
            plugins,
            ledger,
            storage,
            slots,
            resolvers,
            bus,
            services,
        }
    }

    /// Route one call from `caller`, applying existence, rate and
    /// permission checks before the host action.
    pub async fn dispatch(&self, caller: &str, call: HostCall) -> Result<Value, HostError> {
        let method = call.method();

        // The guard must not be held across the host action's awaits.
        let record = match self.plugins.get(caller) {
            Some(record) => Arc::clone(&record),
            None => {
                tracing::warn!(caller, method, "host call from unknown plugin");
                return Ok(Value::Null);
            }
        };

        if !record.limiters.api_calls.try_consume() {
            tracing::warn!(caller, method, "api rate limit exceeded");
            return Ok(Value::Null);
        }

        let gate = call.required_permission();
        if !gate.satisfied_by(|p| self.ledger.has(caller, p)) {
            tracing::warn!(caller, method, "host call without required permission");
            return Ok(Value::Null);
        }

        tracing::debug!(caller, method, "dispatching host call");
        self.execute(caller, &record, call).await
    }

    async fn execute(
        &self,
        caller: &str,
        record: &crate::plugin::LoadedPlugin,
        call: HostCall,
    ) -> Result<Value, HostError> {
        match call {
            // --- player reads ---
            HostCall::PlayerGetState => to_value(self.services.playback_state().await),
            HostCall::PlayerGetCurrentTrack => match self.services.current_track().await {
                Some(track) => to_value(track),
                None => Ok(Value::Null),
            },
            HostCall::PlayerGetCurrentTime => {
                Ok(json!(self.services.playback_state().await.position))
            }
            HostCall::PlayerGetQueue => to_value(self.services.queue().await),

            // --- player control ---
            HostCall::PlayerTogglePlay => {
                self.services.toggle_play().await?;
                Ok(Value::Null)
            }
            HostCall::PlayerNext => {
                self.services.next_track().await?;
                Ok(Value::Null)
            }
            HostCall::PlayerPrevious => {
                self.services.previous_track().await?;
                Ok(Value::Null)
            }
            HostCall::PlayerSeek { position } => {
                self.services.seek(position).await?;
                Ok(Value::Null)
            }
            HostCall::PlayerQueueAdd { track } => {
                self.services.queue_add(track).await?;
                Ok(Value::Null)
            }
            HostCall::PlayerQueueRemove { index } => {
                self.services.queue_remove(index).await?;
                Ok(Value::Null)
            }
            HostCall::PlayerQueueReorder { from, to } => {
                self.services.queue_reorder(from, to).await?;
                Ok(Value::Null)
            }
            HostCall::PlayerQueueClearUpcoming => {
                self.services.queue_clear_upcoming().await?;
                Ok(Value::Null)
            }
            HostCall::PlayerSetTrack { track } => {
                let previous = self.services.set_track(track.clone()).await?;
                // Delivered before the triggering call returns control.
                self.bus.emit(
                    names::TRACK_CHANGE,
                    serde_json::to_value(TrackChange {
                        previous,
                        current: Some(track),
                    })?,
                );
                Ok(Value::Null)
            }

            // --- library ---
            HostCall::LibraryGetTracks => to_value(self.services.library_tracks().await?),
            HostCall::LibraryGetPlaylists => to_value(self.services.library_playlists().await?),
            HostCall::LibraryAddExternalTrack { track } => {
                to_value(self.services.add_external_track(track).await?)
            }
            HostCall::LibraryCreatePlaylist { name } => {
                to_value(self.services.create_playlist(&name).await?)
            }
            HostCall::LibraryAddToPlaylist {
                playlist_id,
                track_id,
            } => {
                self.services
                    .add_to_playlist(&playlist_id, &track_id)
                    .await?;
                Ok(Value::Null)
            }
            HostCall::LibraryUpdatePlaylistCover {
                playlist_id,
                cover_url,
            } => {
                self.services
                    .update_playlist_cover(&playlist_id, &cover_url)
                    .await?;
                Ok(Value::Null)
            }
            HostCall::LibraryUpdateTrackCover {
                track_id,
                cover_url,
            } => {
                self.services
                    .update_track_cover(&track_id, &cover_url)
                    .await?;
                Ok(Value::Null)
            }
            HostCall::LibraryDownloadTrack { request } => {
                let saved = self.services.download_track(request).await?;
                let rescan_dir = saved
                    .parent()
                    .map(PathBuf::from)
                    .or_else(|| self.services.download_location());
                if let Some(dir) = rescan_dir {
                    if let Err(e) = self.services.rescan_directory(&dir).await {
                        tracing::warn!(caller, dir = %dir.display(), error = %e, "post-download rescan failed");
                    }
                }
                Ok(json!(saved.to_string_lossy()))
            }

            // --- lyrics ---
            HostCall::LyricsGet { track_id } => match self.services.lyrics(&track_id).await? {
                Some(text) => Ok(json!(text)),
                None => Ok(Value::Null),
            },
            HostCall::LyricsSet { track_id, text } => {
                self.services.set_lyrics(&track_id, &text).await?;
                Ok(Value::Null)
            }

            // --- notifications ---
            HostCall::NotifyShow { title, body } => {
                self.services.show_notification(&title, &body).await?;
                Ok(Value::Null)
            }

            // --- ui slots ---
            HostCall::UiInject {
                slot,
                html,
                priority,
            } => match UiSlot::parse(&slot) {
                Some(slot) => {
                    self.slots.add(slot, caller, &html, priority);
                    Ok(Value::Bool(true))
                }
                None => {
                    tracing::warn!(caller, slot = %slot, "ui.inject into unknown slot");
                    Ok(Value::Null)
                }
            },
            HostCall::UiRemove { slot } => match UiSlot::parse(&slot) {
                Some(slot) => Ok(Value::Bool(self.slots.remove(slot, caller))),
                None => {
                    tracing::warn!(caller, slot = %slot, "ui.remove from unknown slot");
                    Ok(Value::Null)
                }
            },

            // --- scoped storage ---
            HostCall::StorageGet { key } => match self.storage.get(caller, &key) {
                Some(value) => Ok(json!(value)),
                None => Ok(Value::Null),
            },
            HostCall::StorageSet { key, value } => {
                if !record.limiters.storage_writes.try_consume() {
                    tracing::warn!(caller, key = %key, "storage write rate limit exceeded");
                    return Ok(Value::Bool(false));
                }
                Ok(Value::Bool(self.storage.set(caller, &key, &value).await))
            }

            // --- settings ---
            HostCall::SettingsSetDownloadLocation { path } => Ok(Value::Bool(
                self.services.set_download_location(PathBuf::from(path)),
            )),

            // --- stream resolvers ---
            HostCall::StreamRegisterResolver {
                source_type,
                resolver,
            } => {
                self.resolvers.register(&source_type, caller, resolver);
                Ok(Value::Bool(true))
            }
            HostCall::StreamUnregisterResolver { source_type } => {
                Ok(Value::Bool(self.resolvers.unregister(&source_type, caller)))
            }

            // --- outbound fetch ---
            HostCall::HttpFetch { request } => {
                let response = self.services.proxy_http(request).await?;
                // Mirrors the FetchResponse wire shape the SDK exposes.
                Ok(json!({
                    "ok": response.ok(),
                    "status": response.status,
                    "headers": response.headers,
                    "body": response.body,
                }))
            }

            // --- theming ---
            HostCall::ThemeRefresh => {
                self.services.refresh_theme();
                Ok(Value::Null)
            }
        }
    }
}

fn to_value<T: serde::Serialize>(value: T) -> Result<Value, HostError> {
    Ok(serde_json::to_value(value)?)
}

#[async_trait]
impl HostDispatch for HostDispatcher {
    async fn dispatch(&self, caller: &str, call: HostCall) -> Result<Value, HostError> {
        HostDispatcher::dispatch(self, caller, call).await
    }
}
