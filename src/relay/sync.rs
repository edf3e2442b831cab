//! State cache & relay
//!
//! Hosts publish playback changes; the relay merges them into the host's
//! cached state and forwards them to the host's listeners in the order they
//! arrive. Late joiners get the cached snapshot instead of the history.

use serde_json::Value;

use super::{Outbox, Relay};
use crate::protocol::{MediaEvent, PlaybackState, PlaybackStatePatch, ServerEvent};
use crate::registry::ConnectionId;

impl Relay {
    /// Merge a partial state into the host's cache and relay it to listeners
    ///
    /// The host itself does not get its own update echoed back.
    pub fn update_state(&mut self, host: ConnectionId, patch: PlaybackStatePatch) -> Outbox {
        let mut outbox = Outbox::new();

        if patch.is_empty() {
            tracing::debug!(host = %host, "Empty state update ignored");
            return outbox;
        }
        let Some(conn) = self.registry.get_mut(host) else {
            return outbox;
        };
        conn.apply_patch(&patch);

        outbox.multicast(
            self.groups.listeners_of(host),
            ServerEvent::StateUpdated(patch),
        );
        outbox
    }

    /// Record a play/pause/seek event and relay it verbatim to listeners
    ///
    /// `playing` becomes true only for a "play" event; `currentTime` is taken
    /// from `payload.time` when it is a number.
    pub fn media_event(&mut self, host: ConnectionId, event_type: &str, payload: Value) -> Outbox {
        let mut outbox = Outbox::new();

        let Some(conn) = self.registry.get_mut(host) else {
            return outbox;
        };
        let playing = event_type.eq_ignore_ascii_case("play");
        let time = payload.get("time").and_then(Value::as_f64);
        conn.apply_patch(&PlaybackStatePatch::transport(playing, time));

        tracing::debug!(host = %host, event_type, ?time, "Media event");

        outbox.multicast(
            self.groups.listeners_of(host),
            ServerEvent::MediaEvent(MediaEvent {
                event_type: event_type.to_string(),
                payload,
            }),
        );
        outbox
    }

    /// Replace the host's cache and send the full state to one listener
    ///
    /// The recipient must currently follow the host; otherwise only the
    /// cache is updated.
    pub fn push_sync(&mut self, host: ConnectionId, to: ConnectionId, state: PlaybackState) -> Outbox {
        let mut outbox = Outbox::new();

        let Some(conn) = self.registry.get_mut(host) else {
            return outbox;
        };
        conn.replace_state(state.clone());

        if self.groups.listeners_of(host).contains(&to) {
            outbox.send(to, ServerEvent::SyncState(state));
        } else {
            tracing::debug!(host = %host, to = %to, "Sync target is not a listener");
        }
        outbox
    }

    /// Cached state of a host, if any
    pub fn cached_state(&self, host: ConnectionId) -> Option<&PlaybackState> {
        self.registry
            .get(host)
            .and_then(|c| c.state.as_ref())
            .map(|cached| &cached.state)
    }
}
