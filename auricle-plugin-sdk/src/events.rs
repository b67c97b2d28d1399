//! # Host Event Contracts
//!
//! Names and payload shapes for the events the host emits onto the shared
//! bus. Plugins subscribe by name through their capability object; the
//! payload arrives as JSON and deserializes into the structs below.
//!
//! ## Events
//!
//! | Name | Payload | Emitted when |
//! |------|---------|--------------|
//! | `trackChange` | [`TrackChange`] | the current track is replaced |
//! | `playStateChange` | [`PlayStateChange`] | playback starts or stops |
//! | `timeUpdate` | [`TimeUpdate`] | the playhead advances |
//! | `queueChange` | [`QueueChange`] | the upcoming queue is mutated |
//! | `seeked` | [`Seeked`] | a seek completes |
//!
//! `trackChange` carries the previous track alongside the new one, and is
//! delivered synchronously before the triggering `player.setTrack` call
//! returns control to the plugin.

use crate::models::Track;
use serde::{Deserialize, Serialize};

/// Event name constants, stable across plugin API versions.
pub mod names {
    pub const TRACK_CHANGE: &str = "trackChange";
    pub const PLAY_STATE_CHANGE: &str = "playStateChange";
    pub const TIME_UPDATE: &str = "timeUpdate";
    pub const QUEUE_CHANGE: &str = "queueChange";
    pub const SEEKED: &str = "seeked";
}

/// Payload of `trackChange`: the track being replaced and its successor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackChange {
    /// The track that was current before the change, if any
    pub previous: Option<Track>,
    /// The newly installed current track, if any
    pub current: Option<Track>,
}

/// Payload of `playStateChange`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayStateChange {
    pub playing: bool,
}

/// Payload of `timeUpdate`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeUpdate {
    /// Playhead position in seconds
    pub position: f64,
    /// Current track length in seconds
    pub duration: f64,
}

/// Payload of `queueChange`: the full upcoming queue after the mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueChange {
    pub queue: Vec<Track>,
}

/// Payload of `seeked`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Seeked {
    /// Position in seconds the playhead landed on
    pub position: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn track_change_serializes_both_sides() {
        let change = TrackChange {
            previous: None,
            current: Some(Track {
                id: "t2".to_string(),
                title: "Next".to_string(),
                artist: "Artist".to_string(),
                album: None,
                duration: 180.0,
                source_type: "local".to_string(),
                external_id: None,
                cover_url: None,
                path: None,
            }),
        };
        let value = serde_json::to_value(&change).unwrap();
        assert!(value["previous"].is_null());
        assert_eq!(value["current"]["id"], "t2");
        let back: TrackChange = serde_json::from_value(value).unwrap();
        assert_eq!(back, change);
    }
}
