//! Playback state and partial updates
//!
//! A host owns one [`PlaybackState`]. Hosts publish changes as a
//! [`PlaybackStatePatch`], which is shallow-merged into the cached state:
//! fields absent from the patch keep their previous value.

use serde::{Deserialize, Serialize};

use super::lenient;

/// Full playback state of a host
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlaybackState {
    /// Ordered track identifiers
    #[serde(deserialize_with = "lenient::field")]
    pub song_list: Vec<String>,

    /// Track currently loaded, if any
    #[serde(deserialize_with = "lenient::field")]
    pub current_song: Option<String>,

    /// Whether the host is playing
    #[serde(deserialize_with = "lenient::field")]
    pub playing: bool,

    /// Offset into `current_song`, in seconds
    #[serde(deserialize_with = "lenient::field")]
    pub current_time: f64,
}

impl PlaybackState {
    /// Merge a partial update into this state
    pub fn apply(&mut self, patch: &PlaybackStatePatch) {
        if let Some(ref songs) = patch.song_list {
            self.song_list = songs.clone();
        }
        if let Some(ref song) = patch.current_song {
            self.current_song = song.clone();
        }
        if let Some(playing) = patch.playing {
            self.playing = playing;
        }
        if let Some(time) = patch.current_time {
            self.current_time = time;
        }
    }
}

/// Partial playback state carried by `state-update`
///
/// `current_song` is doubly optional so that an explicit `null` clears the
/// track while an absent field leaves it untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackStatePatch {
    #[serde(
        default,
        deserialize_with = "lenient::field",
        skip_serializing_if = "Option::is_none"
    )]
    pub song_list: Option<Vec<String>>,

    #[serde(
        default,
        deserialize_with = "lenient::present",
        skip_serializing_if = "Option::is_none"
    )]
    pub current_song: Option<Option<String>>,

    #[serde(
        default,
        deserialize_with = "lenient::field",
        skip_serializing_if = "Option::is_none"
    )]
    pub playing: Option<bool>,

    #[serde(
        default,
        deserialize_with = "lenient::field",
        skip_serializing_if = "Option::is_none"
    )]
    pub current_time: Option<f64>,
}

impl PlaybackStatePatch {
    /// Patch that only touches the playing flag and position
    pub fn transport(playing: bool, current_time: Option<f64>) -> Self {
        Self {
            playing: Some(playing),
            current_time,
            ..Default::default()
        }
    }

    /// Whether the patch carries no field at all
    pub fn is_empty(&self) -> bool {
        self.song_list.is_none()
            && self.current_song.is_none()
            && self.playing.is_none()
            && self.current_time.is_none()
    }
}

impl From<PlaybackState> for PlaybackStatePatch {
    fn from(state: PlaybackState) -> Self {
        Self {
            song_list: Some(state.song_list),
            current_song: Some(state.current_song),
            playing: Some(state.playing),
            current_time: Some(state.current_time),
        }
    }
}
