//! Typed event schemas
//!
//! Every frame on the wire is `{"event": <name>, "data": <payload>}`.
//! [`ClientIntent`] covers what connections send, [`ServerEvent`] what the
//! relay emits. Inbound payload fields are all optional or defaulted; the
//! codec fills in whatever a client leaves out.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::lenient;
use super::state::{PlaybackState, PlaybackStatePatch};
use crate::registry::ConnectionId;

/// An intent sent by a connection
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientIntent {
    /// Join the roster under a display name
    Announce(AnnouncePayload),
    /// Start mirroring a host
    Follow(FollowPayload),
    /// Stop mirroring a host
    Unfollow(UnfollowPayload),
    /// Host publishes a (partial) state change
    StateUpdate(StateUpdatePayload),
    /// Host publishes a play/pause/seek event
    MediaEvent(MediaEventPayload),
    /// Chat inside a host group
    ChatMessage(ChatPayload),
    /// Host pushes a full snapshot to one listener
    SyncState(SyncStatePayload),
}

impl ClientIntent {
    /// Wire name of the intent
    pub fn name(&self) -> &'static str {
        match self {
            ClientIntent::Announce(_) => "announce",
            ClientIntent::Follow(_) => "follow",
            ClientIntent::Unfollow(_) => "unfollow",
            ClientIntent::StateUpdate(_) => "state-update",
            ClientIntent::MediaEvent(_) => "media-event",
            ClientIntent::ChatMessage(_) => "chat-message",
            ClientIntent::SyncState(_) => "sync-state",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnouncePayload {
    #[serde(deserialize_with = "lenient::field")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FollowPayload {
    #[serde(alias = "to", deserialize_with = "lenient::field")]
    pub target_host_id: Option<ConnectionId>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UnfollowPayload {
    #[serde(deserialize_with = "lenient::field")]
    pub host_id: Option<ConnectionId>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateUpdatePayload {
    #[serde(deserialize_with = "lenient::field")]
    pub state: PlaybackStatePatch,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MediaEventPayload {
    /// "play", "pause", "seek", ...
    #[serde(alias = "type", deserialize_with = "lenient::field")]
    pub event_type: String,

    /// Opaque body relayed verbatim; `time` is read for the state cache
    pub payload: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChatPayload {
    #[serde(deserialize_with = "lenient::field")]
    pub message: String,
    #[serde(deserialize_with = "lenient::field")]
    pub host_id: Option<ConnectionId>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncStatePayload {
    #[serde(deserialize_with = "lenient::field")]
    pub to: Option<ConnectionId>,
    #[serde(deserialize_with = "lenient::field")]
    pub state: PlaybackState,
}

/// An event emitted by the relay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerEvent {
    /// Full roster, sent to the global group
    PresenceList(Vec<Participant>),
    /// Someone announced for the first time
    UserJoined(Participant),
    /// Someone in the roster disconnected
    UserLeft {
        id: ConnectionId,
    },
    /// Host snapshot, sent point-to-point to a follower
    SyncState(PlaybackState),
    /// Host state change, sent to the host's listeners
    StateUpdated(PlaybackStatePatch),
    /// Raw host media event, sent to the host's listeners
    MediaEvent(MediaEvent),
    /// Current listeners of a host, sent to that host only
    ListenerListUpdate(Vec<Participant>),
    /// A new listener started following, sent to the host only
    NewFollower(Participant),
    /// The host disconnected; its group is about to be disbanded
    HostLeft {
        #[serde(rename = "hostId")]
        host_id: ConnectionId,
    },
    /// Chat line relayed inside a host group
    ChatMessage(ChatMessage),
}

impl ServerEvent {
    /// Wire name of the event
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::PresenceList(_) => "presence-list",
            ServerEvent::UserJoined(_) => "user-joined",
            ServerEvent::UserLeft { .. } => "user-left",
            ServerEvent::SyncState(_) => "sync-state",
            ServerEvent::StateUpdated(_) => "state-updated",
            ServerEvent::MediaEvent(_) => "media-event",
            ServerEvent::ListenerListUpdate(_) => "listener-list-update",
            ServerEvent::NewFollower(_) => "new-follower",
            ServerEvent::HostLeft { .. } => "host-left",
            ServerEvent::ChatMessage(_) => "chat-message",
        }
    }
}

/// Roster entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ConnectionId,
    pub name: String,
}

impl Participant {
    pub fn new(id: ConnectionId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Media event as relayed to listeners, `{type, payload}` on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaEvent {
    #[serde(rename = "type", alias = "eventType")]
    pub event_type: String,
    pub payload: Value,
}

/// Chat line as delivered to a host group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Sender display name
    pub from: String,
    pub message: String,
    /// Server timestamp, milliseconds since the Unix epoch
    pub time: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_server_event_wire_shape() {
        let event = ServerEvent::PresenceList(vec![Participant::new(ConnectionId(3), "Alice")]);

        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({"event": "presence-list", "data": [{"id": 3, "name": "Alice"}]})
        );
    }

    #[test]
    fn test_host_left_wire_shape() {
        let event = ServerEvent::HostLeft {
            host_id: ConnectionId(9),
        };

        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({"event": "host-left", "data": {"hostId": 9}})
        );
    }

    #[test]
    fn test_event_names_match_serialized_tag() {
        let events = vec![
            ServerEvent::UserLeft { id: ConnectionId(1) },
            ServerEvent::SyncState(PlaybackState::default()),
            ServerEvent::ListenerListUpdate(vec![]),
            ServerEvent::ChatMessage(ChatMessage {
                from: "Bob".into(),
                message: "hi".into(),
                time: 1,
            }),
        ];

        for event in events {
            let value = serde_json::to_value(&event).unwrap();
            assert_eq!(value["event"], event.name());
        }
    }

    #[test]
    fn test_media_event_payload_accepts_legacy_type_field() {
        let payload: MediaEventPayload =
            serde_json::from_value(json!({"type": "pause", "payload": {"time": 4}})).unwrap();

        assert_eq!(payload.event_type, "pause");
        assert_eq!(payload.payload["time"], 4);
    }

    #[test]
    fn test_media_event_wire_shape() {
        let event = ServerEvent::MediaEvent(MediaEvent {
            event_type: "seek".into(),
            payload: json!({"time": 8}),
        });

        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({"event": "media-event", "data": {"type": "seek", "payload": {"time": 8}}})
        );
    }

    #[test]
    fn test_chat_payload_keeps_message_when_host_id_is_bad() {
        let payload: ChatPayload =
            serde_json::from_value(json!({"message": "hi", "hostId": "not-an-id"})).unwrap();

        assert_eq!(payload.message, "hi");
        assert_eq!(payload.host_id, None);
    }

    #[test]
    fn test_intent_serializes_with_event_tag() {
        let intent = ClientIntent::Follow(FollowPayload {
            target_host_id: Some(ConnectionId(2)),
        });

        assert_eq!(
            serde_json::to_value(&intent).unwrap(),
            json!({"event": "follow", "data": {"targetHostId": 2}})
        );
        assert_eq!(intent.name(), "follow");
    }
}
