//! Relay engine
//!
//! [`Relay`] owns the connection registry and the multicast groups and turns
//! inbound intents into addressed outbound events. It is a plain `&mut self`
//! state machine: whoever owns it serialises intents, and each call runs to
//! completion before the next one starts.
//!
//! # Architecture
//!
//! ```text
//!                     Relay
//!        ┌──────────────────────────────┐
//!        │ registry: ConnectionRegistry │  names, follow targets, state cache
//!        │ groups:   GroupManager       │  "jam", "host:<id>"
//!        └──────────────┬───────────────┘
//!                       │
//!   announce / follow / unfollow      ──► follow.rs
//!   state-update / media-event / sync ──► sync.rs
//!   chat-message                      ──► chat.rs
//!   (transport) disconnect            ──► disconnect.rs
//!   roster refresh                    ──► presence.rs
//!                       │
//!                       ▼
//!                 Outbox { Dispatch { recipients, event } }
//! ```
//!
//! A reference to a connection that no longer exists is never an error: the
//! affected sub-step is skipped and the rest of the operation proceeds.

pub mod chat;
pub mod config;
pub mod disconnect;
pub mod follow;
pub mod outbox;
pub mod presence;
pub mod sync;

pub use config::RelayConfig;
pub use outbox::{Dispatch, Outbox};

use crate::group::{GroupKey, GroupManager};
use crate::protocol::ClientIntent;
use crate::registry::{ConnectionId, ConnectionRegistry};
use crate::stats::RelayStats;

/// The relay engine
#[derive(Debug)]
pub struct Relay {
    /// Live connections
    registry: ConnectionRegistry,

    /// Multicast group membership
    groups: GroupManager,

    /// Configuration
    config: RelayConfig,

    connections_total: u64,
    intents_handled: u64,
    events_dispatched: u64,
}

impl Relay {
    /// Create a relay with default configuration
    pub fn new() -> Self {
        Self::with_config(RelayConfig::default())
    }

    /// Create a relay with custom configuration
    pub fn with_config(config: RelayConfig) -> Self {
        Self {
            registry: ConnectionRegistry::with_default_name(config.default_name.clone()),
            groups: GroupManager::new(),
            config,
            connections_total: 0,
            intents_handled: 0,
            events_dispatched: 0,
        }
    }

    /// Get the relay configuration
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Read access to the connection registry
    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// Read access to group membership
    pub fn groups(&self) -> &GroupManager {
        &self.groups
    }

    /// Register a new transport connection
    ///
    /// The connection gets the default name and no state; nothing is
    /// broadcast until it announces itself.
    pub fn connect(&mut self, id: ConnectionId) {
        self.registry.register(id);
        self.connections_total += 1;
    }

    /// Handle one inbound intent from `from`
    pub fn handle(&mut self, from: ConnectionId, intent: ClientIntent) -> Outbox {
        if !self.registry.contains(from) {
            tracing::debug!(
                connection = %from,
                intent = intent.name(),
                "Intent from unknown connection ignored"
            );
            return Outbox::new();
        }

        tracing::debug!(connection = %from, intent = intent.name(), "Handling intent");

        let outbox = match intent {
            ClientIntent::Announce(p) => self.announce(from, p.name),
            ClientIntent::Follow(p) => match p.target_host_id {
                Some(host) => self.follow(from, host),
                None => {
                    tracing::debug!(connection = %from, "Follow without target ignored");
                    Outbox::new()
                }
            },
            ClientIntent::Unfollow(p) => match p.host_id.or_else(|| self.follow_target(from)) {
                Some(host) => self.unfollow(from, host),
                None => Outbox::new(),
            },
            ClientIntent::StateUpdate(p) => self.update_state(from, p.state),
            ClientIntent::MediaEvent(p) => self.media_event(from, &p.event_type, p.payload),
            ClientIntent::ChatMessage(p) => {
                let host = p
                    .host_id
                    .or_else(|| self.follow_target(from))
                    .unwrap_or(from);
                self.send_chat(host, from, p.message)
            }
            ClientIntent::SyncState(p) => match p.to {
                Some(to) => self.push_sync(from, to, p.state),
                None => {
                    tracing::debug!(connection = %from, "Sync without recipient ignored");
                    Outbox::new()
                }
            },
        };

        self.intents_handled += 1;
        self.record(&outbox);
        outbox
    }

    /// Current statistics
    pub fn stats(&self) -> RelayStats {
        RelayStats {
            connections_total: self.connections_total,
            connections_active: self.registry.len() as u64,
            participants: self.groups.members_of(&GroupKey::Global).len() as u64,
            host_groups: self.groups.host_group_count() as u64,
            intents_handled: self.intents_handled,
            events_dispatched: self.events_dispatched,
            slow_consumers_dropped: 0,
        }
    }

    /// Host a connection currently follows
    pub fn follow_target(&self, id: ConnectionId) -> Option<ConnectionId> {
        self.registry.get(id).and_then(|c| c.follow_target)
    }

    fn record(&mut self, outbox: &Outbox) {
        self.events_dispatched += outbox.recipient_count() as u64;
    }
}

impl Default for Relay {
    fn default() -> Self {
        Self::new()
    }
}


#[cfg(test)]
mod tests {
    use super::testing::join;
    use super::*;
    use crate::protocol::{
        decode_intent, ChatPayload, FollowPayload, Participant, PlaybackStatePatch, ServerEvent,
        StateUpdatePayload, UnfollowPayload,
    };

    fn follow(relay: &mut Relay, from: ConnectionId, host: ConnectionId) -> Outbox {
        relay.handle(
            from,
            ClientIntent::Follow(FollowPayload {
                target_host_id: Some(host),
            }),
        )
    }

    #[test]
    fn test_intent_from_unknown_connection_ignored() {
        let mut relay = Relay::new();
        let outbox = follow(&mut relay, ConnectionId(1), ConnectionId(2));

        assert!(outbox.is_empty());
        assert_eq!(relay.stats().intents_handled, 0);
    }

    #[test]
    fn test_alice_bob_scenario() {
        let mut relay = Relay::new();
        let h = join(&mut relay, 1, "Alice");
        let f = join(&mut relay, 2, "Bob");

        // Bob follows Alice: no snapshot yet
        let outbox = follow(&mut relay, f, h);
        assert!(!outbox
            .events_for(f)
            .iter()
            .any(|e| matches!(e, ServerEvent::SyncState(_))));

        // Alice publishes state; Bob receives it, Alice does not
        let patch = PlaybackStatePatch::transport(true, Some(0.0));
        let outbox = relay.handle(
            h,
            ClientIntent::StateUpdate(StateUpdatePayload {
                state: patch.clone(),
            }),
        );
        assert_eq!(outbox.events_for(f), vec![&ServerEvent::StateUpdated(patch)]);
        assert!(outbox.events_for(h).is_empty());

        // Alice disconnects
        let outbox = relay.disconnect(h);
        let bob_events = outbox.events_for(f);
        assert_eq!(bob_events[0], &ServerEvent::HostLeft { host_id: h });
        assert!(bob_events.contains(&&ServerEvent::PresenceList(vec![Participant::new(f, "Bob")])));
        assert!(!relay.groups().is_member(&GroupKey::Host(h), f));
        assert_eq!(relay.follow_target(f), None);
    }

    #[test]
    fn test_chat_scenario() {
        let mut relay = Relay::new();
        let h = join(&mut relay, 1, "Alice");
        let f = join(&mut relay, 2, "Bob");
        follow(&mut relay, f, h);

        let outbox = relay.handle(
            f,
            ClientIntent::ChatMessage(ChatPayload {
                message: "hi".into(),
                host_id: Some(h),
            }),
        );

        for id in [h, f] {
            let events = outbox.events_for(id);
            assert_eq!(events.len(), 1);
            match events[0] {
                ServerEvent::ChatMessage(chat) => {
                    assert_eq!(chat.from, "Bob");
                    assert_eq!(chat.message, "hi");
                    assert!(chat.time > 0);
                }
                other => panic!("unexpected event: {:?}", other),
            }
        }
    }

    #[test]
    fn test_follow_then_unfollow_restores_listeners() {
        let mut relay = Relay::new();
        let h = join(&mut relay, 1, "Alice");
        let a = join(&mut relay, 2, "Bob");
        let b = join(&mut relay, 3, "Carol");
        follow(&mut relay, a, h);

        let before = relay.groups().listeners_of(h);
        follow(&mut relay, b, h);
        relay.handle(b, ClientIntent::Unfollow(UnfollowPayload { host_id: Some(h) }));

        assert_eq!(relay.groups().listeners_of(h), before);
    }

    #[test]
    fn test_unfollow_defaults_to_current_target() {
        let mut relay = Relay::new();
        let h = join(&mut relay, 1, "Alice");
        let f = join(&mut relay, 2, "Bob");
        follow(&mut relay, f, h);

        relay.handle(f, ClientIntent::Unfollow(UnfollowPayload::default()));

        assert!(relay.groups().listeners_of(h).is_empty());
        assert_eq!(relay.follow_target(f), None);
    }

    #[test]
    fn test_chat_without_host_goes_to_followed_group() {
        let mut relay = Relay::new();
        let h = join(&mut relay, 1, "Alice");
        let f = join(&mut relay, 2, "Bob");
        follow(&mut relay, f, h);

        let outbox = relay.handle(
            f,
            ClientIntent::ChatMessage(ChatPayload {
                message: "yo".into(),
                host_id: None,
            }),
        );

        assert_eq!(outbox.events_for(h).len(), 1);
        assert_eq!(outbox.events_for(f).len(), 1);
    }

    #[test]
    fn test_stats() {
        let mut relay = Relay::new();
        let h = join(&mut relay, 1, "Alice");
        let f = join(&mut relay, 2, "Bob");
        follow(&mut relay, f, h);
        relay.disconnect(f);

        let stats = relay.stats();
        assert_eq!(stats.connections_total, 2);
        assert_eq!(stats.connections_active, 1);
        assert_eq!(stats.participants, 1);
        assert_eq!(stats.host_groups, 1);
        assert_eq!(stats.intents_handled, 3);
        assert!(stats.events_dispatched > 0);
    }

    #[test]
    fn test_chat_with_string_host_id_keeps_message() {
        let mut relay = Relay::new();
        let h = join(&mut relay, 1, "Alice");
        let f = join(&mut relay, 2, "Bob");
        follow(&mut relay, f, h);

        let intent =
            decode_intent(r#"{"event":"chat-message","data":{"message":"hi","hostId":"1"}}"#)
                .unwrap();
        let outbox = relay.handle(f, intent);

        match outbox.events_for(h).as_slice() {
            [ServerEvent::ChatMessage(chat)] => {
                assert_eq!(chat.from, "Bob");
                assert_eq!(chat.message, "hi");
            }
            other => panic!("unexpected events: {:?}", other),
        }
    }

    #[test]
    fn test_state_update_with_bad_field_still_relayed() {
        let mut relay = Relay::new();
        let h = join(&mut relay, 1, "Alice");
        let f = join(&mut relay, 2, "Bob");
        follow(&mut relay, f, h);

        let intent = decode_intent(
            r#"{"event":"state-update","data":{"state":{"playing":true,"currentTime":"5"}}}"#,
        )
        .unwrap();
        let outbox = relay.handle(h, intent);

        assert_eq!(
            outbox.events_for(f),
            vec![&ServerEvent::StateUpdated(PlaybackStatePatch::transport(true, None))]
        );
        let cached = relay.cached_state(h).unwrap();
        assert!(cached.playing);
        assert_eq!(cached.current_time, 0.0);
    }
}
