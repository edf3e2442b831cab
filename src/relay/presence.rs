//! Presence service
//!
//! Full-refresh roster: whenever global membership changes the complete
//! participant list is rebuilt and sent to every global member.

use super::{Outbox, Relay};
use crate::group::GroupKey;
use crate::protocol::{Participant, ServerEvent};
use crate::registry::ConnectionId;

impl Relay {
    /// Roster entry for a connection, falling back to the default name
    pub(super) fn participant(&self, id: ConnectionId) -> Participant {
        let name = self
            .registry
            .name_of(id)
            .unwrap_or(self.registry.default_name());
        Participant::new(id, name)
    }

    /// Current roster, in join order
    pub fn presence_list(&self) -> Vec<Participant> {
        self.groups
            .members_of(&GroupKey::Global)
            .iter()
            .map(|id| self.participant(*id))
            .collect()
    }

    /// Queue the full roster for every global member
    pub(super) fn broadcast_presence(&self, outbox: &mut Outbox) {
        let members = self.groups.members_of(&GroupKey::Global).to_vec();
        if members.is_empty() {
            return;
        }
        outbox.multicast(members, ServerEvent::PresenceList(self.presence_list()));
    }
}
