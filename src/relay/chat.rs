//! Chat relay
//!
//! Transient chat inside a host group: no history, no validation.

use std::time::{SystemTime, UNIX_EPOCH};

use super::{Outbox, Relay};
use crate::group::GroupKey;
use crate::protocol::{ChatMessage, ServerEvent};
use crate::registry::ConnectionId;

impl Relay {
    /// Relay a chat line to the whole group of `host`, host included
    ///
    /// The timestamp is assigned here; clients cannot supply one.
    pub fn send_chat(&mut self, host: ConnectionId, from: ConnectionId, message: String) -> Outbox {
        let mut outbox = Outbox::new();

        let members = self.groups.members_of(&GroupKey::Host(host)).to_vec();
        if members.is_empty() {
            tracing::debug!(host = %host, from = %from, "Chat for empty group dropped");
            return outbox;
        }

        let chat = ChatMessage {
            from: self.participant(from).name,
            message,
            time: unix_timestamp_millis(),
        };
        outbox.multicast(members, ServerEvent::ChatMessage(chat));
        outbox
    }
}

fn unix_timestamp_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
