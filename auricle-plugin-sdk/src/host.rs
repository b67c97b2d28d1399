//! # Host Services Contract
//!
//! The abstract interface the runtime's dispatcher consumes from the
//! embedding host application. The playback engine, library store,
//! settings layer and notification surface are external collaborators;
//! they appear to the runtime only through this trait.
//!
//! ## Overview
//!
//! One implementation exists per embedding:
//! - the real host application wires these operations to its playback
//!   engine and library database
//! - tests use the in-memory host shipped with the runtime crate
//!
//! Control operations are expected to be no-ops when their precondition
//! is unmet (pausing while paused, `next` on an empty queue); they only
//! error when the underlying service genuinely fails. All methods that
//! cross into host-native work are async suspension points.
//!
//! ## Outbound HTTP
//!
//! Plugins never talk to the network directly. `proxy_http` is the single
//! egress point; [`crate::bridge::HttpBridge`] is the stock
//! implementation hosts can delegate to.

use crate::error::HostError;
use crate::models::{DownloadRequest, Playlist, PlaybackState, ProxyRequest, ProxyResponse, Track};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Host capabilities the dispatcher routes plugin calls onto.
#[async_trait]
pub trait HostServices: Send + Sync {
    // --- playback reads ---

    /// Current observable playback state.
    async fn playback_state(&self) -> PlaybackState;

    /// The current track, if any.
    async fn current_track(&self) -> Option<Track>;

    /// The upcoming queue in play order.
    async fn queue(&self) -> Vec<Track>;

    // --- playback control ---

    /// Toggle between playing and paused.
    async fn toggle_play(&self) -> Result<(), HostError>;

    /// Advance to the next queued track.
    async fn next_track(&self) -> Result<(), HostError>;

    /// Return to the previous track.
    async fn previous_track(&self) -> Result<(), HostError>;

    /// Move the playhead to `position` seconds.
    async fn seek(&self, position: f64) -> Result<(), HostError>;

    /// Append a track to the upcoming queue.
    async fn queue_add(&self, track: Track) -> Result<(), HostError>;

    /// Remove the queue entry at `index`; out-of-range is a no-op.
    async fn queue_remove(&self, index: usize) -> Result<(), HostError>;

    /// Move the queue entry at `from` to `to`; out-of-range is a no-op.
    async fn queue_reorder(&self, from: usize, to: usize) -> Result<(), HostError>;

    /// Drop every upcoming queue entry.
    async fn queue_clear_upcoming(&self) -> Result<(), HostError>;

    /// Install a new current track, returning the one it replaced.
    ///
    /// The dispatcher emits `trackChange` with the returned previous
    /// value; implementations only swap state.
    async fn set_track(&self, track: Track) -> Result<Option<Track>, HostError>;

    // --- library ---

    async fn library_tracks(&self) -> Result<Vec<Track>, HostError>;

    async fn library_playlists(&self) -> Result<Vec<Playlist>, HostError>;

    /// Add an external (non-local) track to the library.
    async fn add_external_track(&self, track: Track) -> Result<Track, HostError>;

    async fn create_playlist(&self, name: &str) -> Result<Playlist, HostError>;

    async fn add_to_playlist(&self, playlist_id: &str, track_id: &str) -> Result<(), HostError>;

    async fn update_playlist_cover(
        &self,
        playlist_id: &str,
        cover_url: &str,
    ) -> Result<(), HostError>;

    async fn update_track_cover(&self, track_id: &str, cover_url: &str) -> Result<(), HostError>;

    /// Download an audio payload into the host's download location,
    /// returning the path it was saved to.
    async fn download_track(&self, request: DownloadRequest) -> Result<PathBuf, HostError>;

    /// Rescan a directory for new library content.
    async fn rescan_directory(&self, dir: &Path) -> Result<(), HostError>;

    // --- lyrics ---

    async fn lyrics(&self, track_id: &str) -> Result<Option<String>, HostError>;

    async fn set_lyrics(&self, track_id: &str, text: &str) -> Result<(), HostError>;

    // --- system surfaces ---

    /// Raise a system notification.
    async fn show_notification(&self, title: &str, body: &str) -> Result<(), HostError>;

    /// Proxy an outbound HTTP request on behalf of a plugin.
    async fn proxy_http(&self, request: ProxyRequest) -> Result<ProxyResponse, HostError>;

    /// Re-evaluate the active theme; used by plugins reverting custom
    /// theming on teardown.
    fn refresh_theme(&self);

    /// The configured download location, if the host exposes one.
    fn download_location(&self) -> Option<PathBuf>;

    /// Update the download location; returns whether the setter was
    /// available in this embedding.
    fn set_download_location(&self, path: PathBuf) -> bool;
}
