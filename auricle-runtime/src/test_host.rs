//! In-memory host services and engines for exercising the runtime
//! without a real player, script interpreter or module loader. Used by
//! the crate's own tests and available to embedders for theirs.

use crate::loader::{NativeEngine, NativeModule, Registrar, ScriptEngine, ScriptHandle, WrappedScript};
use async_trait::async_trait;
use auricle_plugin_sdk::error::HostError;
use auricle_plugin_sdk::host::HostServices;
use auricle_plugin_sdk::instance::PluginInstance;
use auricle_plugin_sdk::models::{
    DownloadRequest, Playlist, PlaybackState, ProxyRequest, ProxyResponse, Track,
};
use dashmap::DashMap;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// In-memory [`HostServices`] with programmable state and recorded
/// side effects.
#[derive(Default)]
pub struct TestHost {
    playback: Mutex<PlaybackState>,
    current: Mutex<Option<Track>>,
    queue: Mutex<Vec<Track>>,
    tracks: Mutex<Vec<Track>>,
    playlists: Mutex<Vec<Playlist>>,
    lyrics: Mutex<HashMap<String, String>>,
    notifications: Mutex<Vec<(String, String)>>,
    download_dir: Mutex<PathBuf>,
    download_setter_available: AtomicBool,
    downloads: Mutex<Vec<DownloadRequest>>,
    rescans: Mutex<Vec<PathBuf>>,
    fail_rescans: AtomicBool,
    proxy_replies: Mutex<VecDeque<ProxyResponse>>,
    theme_refreshes: AtomicUsize,
    playlist_seq: AtomicUsize,
}

impl TestHost {
    pub fn new() -> Self {
        let host = TestHost::default();
        host.download_setter_available.store(true, Ordering::SeqCst);
        *host.download_dir.lock().unwrap() = PathBuf::from("/music/downloads");
        host
    }

    // --- programming hooks ---

    pub fn set_position(&self, position: f64) {
        self.playback.lock().unwrap().position = position;
    }

    pub fn seed_library(&self, tracks: Vec<Track>) {
        *self.tracks.lock().unwrap() = tracks;
    }

    pub fn push_proxy_reply(&self, response: ProxyResponse) {
        self.proxy_replies.lock().unwrap().push_back(response);
    }

    pub fn fail_rescans(&self, fail: bool) {
        self.fail_rescans.store(fail, Ordering::SeqCst);
    }

    pub fn disable_download_setter(&self) {
        self.download_setter_available.store(false, Ordering::SeqCst);
    }

    // --- assertions ---

    pub fn notifications(&self) -> Vec<(String, String)> {
        self.notifications.lock().unwrap().clone()
    }

    pub fn downloads(&self) -> Vec<DownloadRequest> {
        self.downloads.lock().unwrap().clone()
    }

    pub fn rescans(&self) -> Vec<PathBuf> {
        self.rescans.lock().unwrap().clone()
    }

    pub fn theme_refreshes(&self) -> usize {
        self.theme_refreshes.load(Ordering::SeqCst)
    }

    pub fn lyrics_for(&self, track_id: &str) -> Option<String> {
        self.lyrics.lock().unwrap().get(track_id).cloned()
    }
}

#[async_trait]
impl HostServices for TestHost {
    async fn playback_state(&self) -> PlaybackState {
        *self.playback.lock().unwrap()
    }

    async fn current_track(&self) -> Option<Track> {
        self.current.lock().unwrap().clone()
    }

    async fn queue(&self) -> Vec<Track> {
        self.queue.lock().unwrap().clone()
    }

    async fn toggle_play(&self) -> Result<(), HostError> {
        let mut playback = self.playback.lock().unwrap();
        playback.playing = !playback.playing;
        Ok(())
    }

    async fn next_track(&self) -> Result<(), HostError> {
        let mut queue = self.queue.lock().unwrap();
        if !queue.is_empty() {
            *self.current.lock().unwrap() = Some(queue.remove(0));
        }
        Ok(())
    }

    async fn previous_track(&self) -> Result<(), HostError> {
        // No history model; restarting the track is close enough here.
        self.playback.lock().unwrap().position = 0.0;
        Ok(())
    }

    async fn seek(&self, position: f64) -> Result<(), HostError> {
        self.playback.lock().unwrap().position = position;
        Ok(())
    }

    async fn queue_add(&self, track: Track) -> Result<(), HostError> {
        self.queue.lock().unwrap().push(track);
        Ok(())
    }

    async fn queue_remove(&self, index: usize) -> Result<(), HostError> {
        let mut queue = self.queue.lock().unwrap();
        if index < queue.len() {
            queue.remove(index);
        }
        Ok(())
    }

    async fn queue_reorder(&self, from: usize, to: usize) -> Result<(), HostError> {
        let mut queue = self.queue.lock().unwrap();
        if from < queue.len() && to < queue.len() {
            let track = queue.remove(from);
            queue.insert(to, track);
        }
        Ok(())
    }

    async fn queue_clear_upcoming(&self) -> Result<(), HostError> {
        self.queue.lock().unwrap().clear();
        Ok(())
    }

    async fn set_track(&self, track: Track) -> Result<Option<Track>, HostError> {
        Ok(self.current.lock().unwrap().replace(track))
    }

    async fn library_tracks(&self) -> Result<Vec<Track>, HostError> {
        Ok(self.tracks.lock().unwrap().clone())
    }

    async fn library_playlists(&self) -> Result<Vec<Playlist>, HostError> {
        Ok(self.playlists.lock().unwrap().clone())
    }

    async fn add_external_track(&self, track: Track) -> Result<Track, HostError> {
        self.tracks.lock().unwrap().push(track.clone());
        Ok(track)
    }

    async fn create_playlist(&self, name: &str) -> Result<Playlist, HostError> {
        let playlist = Playlist {
            id: format!("pl-{}", self.playlist_seq.fetch_add(1, Ordering::SeqCst)),
            name: name.to_string(),
            track_ids: Vec::new(),
            cover_url: None,
        };
        self.playlists.lock().unwrap().push(playlist.clone());
        Ok(playlist)
    }

    async fn add_to_playlist(&self, playlist_id: &str, track_id: &str) -> Result<(), HostError> {
        let mut playlists = self.playlists.lock().unwrap();
        match playlists.iter_mut().find(|p| p.id == playlist_id) {
            Some(playlist) => {
                playlist.track_ids.push(track_id.to_string());
                Ok(())
            }
            None => Err(HostError::service(format!(
                "no such playlist: {playlist_id}"
            ))),
        }
    }

    async fn update_playlist_cover(
        &self,
        playlist_id: &str,
        cover_url: &str,
    ) -> Result<(), HostError> {
        let mut playlists = self.playlists.lock().unwrap();
        match playlists.iter_mut().find(|p| p.id == playlist_id) {
            Some(playlist) => {
                playlist.cover_url = Some(cover_url.to_string());
                Ok(())
            }
            None => Err(HostError::service(format!(
                "no such playlist: {playlist_id}"
            ))),
        }
    }

    async fn update_track_cover(&self, track_id: &str, cover_url: &str) -> Result<(), HostError> {
        let mut tracks = self.tracks.lock().unwrap();
        match tracks.iter_mut().find(|t| t.id == track_id) {
            Some(track) => {
                track.cover_url = Some(cover_url.to_string());
                Ok(())
            }
            None => Err(HostError::service(format!("no such track: {track_id}"))),
        }
    }

    async fn download_track(&self, request: DownloadRequest) -> Result<PathBuf, HostError> {
        let path = self.download_dir.lock().unwrap().join(&request.filename);
        self.downloads.lock().unwrap().push(request);
        Ok(path)
    }

    async fn rescan_directory(&self, dir: &Path) -> Result<(), HostError> {
        if self.fail_rescans.load(Ordering::SeqCst) {
            return Err(HostError::service("scanner unavailable"));
        }
        self.rescans.lock().unwrap().push(dir.to_path_buf());
        Ok(())
    }

    async fn lyrics(&self, track_id: &str) -> Result<Option<String>, HostError> {
        Ok(self.lyrics.lock().unwrap().get(track_id).cloned())
    }

    async fn set_lyrics(&self, track_id: &str, text: &str) -> Result<(), HostError> {
        self.lyrics
            .lock()
            .unwrap()
            .insert(track_id.to_string(), text.to_string());
        Ok(())
    }

    async fn show_notification(&self, title: &str, body: &str) -> Result<(), HostError> {
        self.notifications
            .lock()
            .unwrap()
            .push((title.to_string(), body.to_string()));
        Ok(())
    }

    async fn proxy_http(&self, request: ProxyRequest) -> Result<ProxyResponse, HostError> {
        match self.proxy_replies.lock().unwrap().pop_front() {
            Some(response) => Ok(response),
            None => Err(HostError::service(format!(
                "no programmed reply for {}",
                request.url
            ))),
        }
    }

    fn refresh_theme(&self) {
        self.theme_refreshes.fetch_add(1, Ordering::SeqCst);
    }

    fn download_location(&self) -> Option<PathBuf> {
        Some(self.download_dir.lock().unwrap().clone())
    }

    fn set_download_location(&self, path: PathBuf) -> bool {
        if !self.download_setter_available.load(Ordering::SeqCst) {
            return false;
        }
        *self.download_dir.lock().unwrap() = path;
        true
    }
}

/// Script engine that hands back pre-programmed instances instead of
/// interpreting source text. The registration handoff, legacy-global
/// fallback and handle bookkeeping behave like the real thing.
#[derive(Default)]
pub struct InlineScriptEngine {
    programmed: DashMap<String, Arc<dyn PluginInstance>>,
    globals: DashMap<String, Arc<dyn PluginInstance>>,
    injected: Mutex<Vec<ScriptHandle>>,
    fail_execution: DashMap<String, String>,
}

impl InlineScriptEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Program the instance `execute` will register for a plugin's
    /// element id (its `safe_name`).
    pub fn program(&self, element_id: &str, instance: Arc<dyn PluginInstance>) {
        self.programmed.insert(element_id.to_string(), instance);
    }

    /// Expose an instance through a well-known global instead of the
    /// handoff; exercises the legacy fallback.
    pub fn program_legacy_global(&self, name: &str, instance: Arc<dyn PluginInstance>) {
        self.globals.insert(name.to_string(), instance);
    }

    /// Make `execute` fail for an element id.
    pub fn fail_execution(&self, element_id: &str, message: &str) {
        self.fail_execution
            .insert(element_id.to_string(), message.to_string());
    }

    /// Simulate the leftovers of a crashed unload.
    pub fn force_handle(&self, element_id: &str) {
        self.injected.lock().unwrap().push(ScriptHandle {
            id: element_id.to_string(),
        });
    }

    pub fn has_handle(&self, element_id: &str) -> bool {
        self.injected
            .lock()
            .unwrap()
            .iter()
            .any(|h| h.id == element_id)
    }

    pub fn has_global(&self, name: &str) -> bool {
        self.globals.contains_key(name)
    }
}

#[async_trait]
impl ScriptEngine for InlineScriptEngine {
    async fn execute(
        &self,
        plugin: &str,
        wrapped: &WrappedScript,
        registrar: Registrar,
    ) -> Result<ScriptHandle, HostError> {
        if let Some(message) = self.fail_execution.get(&wrapped.element_id) {
            return Err(HostError::Instantiation {
                plugin: plugin.to_string(),
                message: message.clone(),
            });
        }

        if let Some(instance) = self.programmed.get(&wrapped.element_id) {
            registrar.register(Arc::clone(&instance));
        }

        let handle = ScriptHandle {
            id: wrapped.element_id.clone(),
        };
        self.injected.lock().unwrap().push(handle.clone());
        Ok(handle)
    }

    fn remove(&self, handle: &ScriptHandle) {
        self.injected.lock().unwrap().retain(|h| h != handle);
    }

    fn read_global(&self, name: &str) -> Option<Arc<dyn PluginInstance>> {
        self.globals.get(name).map(|entry| Arc::clone(&entry))
    }

    fn purge_global(&self, name: &str) {
        self.globals.remove(name);
    }

    fn handles(&self) -> Vec<ScriptHandle> {
        self.injected.lock().unwrap().clone()
    }
}

/// Native engine returning pre-programmed modules; records the import
/// tables it was handed so tests can assert the permission filter.
#[derive(Default)]
pub struct StubNativeEngine {
    programmed: DashMap<String, Arc<dyn PluginInstance>>,
    memories: DashMap<String, Arc<Vec<u8>>>,
    imports_seen: Mutex<HashMap<String, Vec<&'static str>>>,
}

impl StubNativeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn program(&self, plugin: &str, instance: Arc<dyn PluginInstance>, memory_bytes: usize) {
        self.programmed.insert(plugin.to_string(), instance);
        self.memories
            .insert(plugin.to_string(), Arc::new(vec![0u8; memory_bytes]));
    }

    /// The import-table methods the engine saw for a plugin.
    pub fn imports_for(&self, plugin: &str) -> Vec<&'static str> {
        self.imports_seen
            .lock()
            .unwrap()
            .get(plugin)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl NativeEngine for StubNativeEngine {
    async fn instantiate(
        &self,
        plugin: &str,
        _artifact: &[u8],
        imports: crate::loader::ImportTable,
    ) -> Result<NativeModule, HostError> {
        self.imports_seen
            .lock()
            .unwrap()
            .insert(plugin.to_string(), imports.methods());

        let instance = self
            .programmed
            .get(plugin)
            .map(|entry| Arc::clone(&entry))
            .ok_or_else(|| HostError::Instantiation {
                plugin: plugin.to_string(),
                message: "no programmed module".to_string(),
            })?;

        let memory = self.memories.get(plugin).map(|entry| {
            let handle: crate::loader::NativeMemoryHandle =
                Arc::clone(&*entry) as crate::loader::NativeMemoryHandle;
            handle
        });

        Ok(NativeModule { instance, memory })
    }
}
