//! Connection entry
//!
//! Per-connection state stored in the registry: display name, follow target
//! and, for hosts, the cached playback state.

use serde::{Deserialize, Deserializer, Serialize};
use tokio::time::Instant;

use crate::protocol::{PlaybackState, PlaybackStatePatch};

/// Opaque connection identifier assigned by the transport
///
/// Serialized as a number. Numeric strings (`"12"`) are accepted on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ConnectionId(pub u64);

impl<'de> Deserialize<'de> for ConnectionId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(id) => Ok(Self(id)),
            Raw::Text(text) => text
                .trim()
                .parse()
                .map(Self)
                .map_err(|_| serde::de::Error::custom(format!("invalid connection id: {:?}", text))),
        }
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ConnectionId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Last known playback state of a host
#[derive(Debug, Clone)]
pub struct CachedState {
    pub state: PlaybackState,

    /// When the cache was last written
    pub updated_at: Instant,
}

impl CachedState {
    fn new(state: PlaybackState) -> Self {
        Self {
            state,
            updated_at: Instant::now(),
        }
    }

    /// Copy of the cached state, optionally advanced to "now"
    ///
    /// With `extrapolate`, a playing state has its position moved forward by
    /// the time elapsed since the cache was written.
    pub fn snapshot(&self, extrapolate: bool) -> PlaybackState {
        let mut state = self.state.clone();
        if extrapolate && state.playing {
            state.current_time += self.updated_at.elapsed().as_secs_f64();
        }
        state
    }
}

/// Entry for a single connection in the registry
#[derive(Debug)]
pub struct Connection {
    /// Transport-assigned identifier
    pub id: ConnectionId,

    /// Display name
    pub name: String,

    /// Whether the connection has announced itself (joined the roster)
    pub announced: bool,

    /// Host currently followed, if any
    pub follow_target: Option<ConnectionId>,

    /// Cached playback state (None until the connection publishes one)
    pub state: Option<CachedState>,

    /// When the transport registered the connection
    pub connected_at: Instant,
}

impl Connection {
    pub(super) fn new(id: ConnectionId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            announced: false,
            follow_target: None,
            state: None,
            connected_at: Instant::now(),
        }
    }

    /// Whether a playback state has been cached for this connection
    pub fn has_state(&self) -> bool {
        self.state.is_some()
    }

    /// Merge a partial update into the cache, starting from defaults if empty
    pub fn apply_patch(&mut self, patch: &PlaybackStatePatch) -> &PlaybackState {
        let cached = self
            .state
            .get_or_insert_with(|| CachedState::new(PlaybackState::default()));
        cached.state.apply(patch);
        cached.updated_at = Instant::now();
        &cached.state
    }

    /// Replace the cache with a full state
    pub fn replace_state(&mut self, state: PlaybackState) {
        self.state = Some(CachedState::new(state));
    }

    /// Whether this connection currently follows `host`
    pub fn is_following(&self, host: ConnectionId) -> bool {
        self.follow_target == Some(host)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_connection_id_accepts_numeric_strings() {
        let id: ConnectionId = serde_json::from_str("\"12\"").unwrap();
        assert_eq!(id, ConnectionId(12));

        let id: ConnectionId = serde_json::from_str("7").unwrap();
        assert_eq!(id, ConnectionId(7));
        assert_eq!(serde_json::to_string(&id).unwrap(), "7");

        assert!(serde_json::from_str::<ConnectionId>("\"abc\"").is_err());
        assert!(serde_json::from_str::<ConnectionId>("-1").is_err());
    }

    #[test]
    fn test_new_connection_defaults() {
        let conn = Connection::new(ConnectionId(1), "guest");

        assert_eq!(conn.name, "guest");
        assert!(!conn.announced);
        assert!(conn.follow_target.is_none());
        assert!(!conn.has_state());
    }

    #[test]
    fn test_apply_patch_creates_cache() {
        let mut conn = Connection::new(ConnectionId(1), "guest");

        let state = conn.apply_patch(&PlaybackStatePatch::transport(true, Some(3.0)));

        assert!(state.playing);
        assert_eq!(state.current_time, 3.0);
        assert!(conn.has_state());
    }

    #[tokio::test(start_paused = true)]
    async fn test_snapshot_extrapolates_only_when_playing() {
        let mut conn = Connection::new(ConnectionId(1), "guest");
        conn.apply_patch(&PlaybackStatePatch::transport(true, Some(10.0)));

        tokio::time::advance(Duration::from_secs(5)).await;

        let cached = conn.state.as_ref().unwrap();
        assert_eq!(cached.snapshot(false).current_time, 10.0);
        assert_eq!(cached.snapshot(true).current_time, 15.0);

        conn.apply_patch(&PlaybackStatePatch::transport(false, None));
        tokio::time::advance(Duration::from_secs(5)).await;

        let cached = conn.state.as_ref().unwrap();
        assert_eq!(cached.snapshot(true).current_time, 10.0);
    }
}
