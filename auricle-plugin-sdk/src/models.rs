//! Domain models shared across the plugin boundary.
//!
//! These are the payload shapes plugins see when reading host state and
//! the records they hand back when mutating it. All of them serialize as
//! plain JSON so script plugins and native bridges observe identical
//! shapes.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One track as the host exposes it to plugins.
///
/// `source_type` is `"local"` for library files; any other tag marks an
/// external track whose playable URL must come from a registered stream
/// resolver keyed on that tag, with `external_id` as the opaque input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub title: String,
    pub artist: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    /// Track length in seconds
    #[serde(default)]
    pub duration: f64,
    /// `"local"` or a resolver source-type tag
    #[serde(default = "Track::local_source")]
    pub source_type: String,
    /// Opaque external id understood by the matching stream resolver
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
    /// On-disk path for local tracks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl Track {
    fn local_source() -> String {
        "local".to_string()
    }

    /// Whether this track plays from the local library without resolution.
    pub fn is_local(&self) -> bool {
        self.source_type == "local"
    }
}

/// Observable playback state mirrored to `player.getState`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlaybackState {
    pub playing: bool,
    /// Playhead position in seconds
    pub position: f64,
    /// Current track length in seconds, 0 when nothing is loaded
    pub duration: f64,
    /// Linear volume in `[0.0, 1.0]`
    pub volume: f32,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            playing: false,
            position: 0.0,
            duration: 0.0,
            volume: 1.0,
        }
    }
}

/// A playlist summary as exposed to `library.getPlaylists`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Playlist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub track_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
}

/// An outbound HTTP request proxied through the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyRequest {
    pub url: String,
    /// HTTP method, uppercase; defaults to GET
    #[serde(default = "ProxyRequest::default_method")]
    pub method: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl ProxyRequest {
    fn default_method() -> String {
        "GET".to_string()
    }

    /// A GET request with no headers or body.
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: Self::default_method(),
            headers: HashMap::new(),
            body: None,
        }
    }
}

/// The host proxy's reply to a [`ProxyRequest`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyResponse {
    pub status: u16,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl ProxyResponse {
    /// Whether the status is in the 2xx range.
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// A download request handed to `library.downloadTrack`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadRequest {
    /// Source URL of the audio payload
    pub url: String,
    /// Target filename inside the host's download location
    pub filename: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn track_defaults_to_local_source() {
        let track: Track = serde_json::from_value(serde_json::json!({
            "id": "t1",
            "title": "Song",
            "artist": "Artist"
        }))
        .unwrap();
        assert!(track.is_local());
        assert_eq!(track.duration, 0.0);
    }

    #[test]
    fn proxy_response_ok_covers_2xx_only() {
        let mut response = ProxyResponse {
            status: 204,
            headers: HashMap::new(),
            body: String::new(),
        };
        assert!(response.ok());
        response.status = 301;
        assert!(!response.ok());
        response.status = 500;
        assert!(!response.ok());
    }
}
