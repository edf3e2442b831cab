//! Disconnect cascade
//!
//! Cleanup when a connection goes away, as an ordered list of steps. Every
//! step tolerates targets that are already gone and none of them can fail.
//!
//! 1. Tell the connection's own listeners the host left, then disband its group.
//! 2. Drop the registry entry.
//! 3. Leave the roster and refresh it for everyone else.
//! 4. Leave any followed host group and refresh that host's listener list.

use super::{Outbox, Relay};
use crate::group::GroupKey;
use crate::protocol::ServerEvent;
use crate::registry::{Connection, ConnectionId};

impl Relay {
    /// Run the cascade for a lost connection
    pub fn disconnect(&mut self, id: ConnectionId) -> Outbox {
        let mut outbox = Outbox::new();

        self.disband_own_group(id, &mut outbox);
        let removed = self.registry.remove(id);
        self.leave_roster(id, &mut outbox);
        self.leave_followed_groups(id, removed.as_ref(), &mut outbox);

        match removed {
            Some(conn) => tracing::info!(
                connection = %id,
                name = %conn.name,
                connected_secs = conn.connected_at.elapsed().as_secs(),
                "Connection removed"
            ),
            None => tracing::debug!(connection = %id, "Disconnect of unknown connection"),
        }

        self.record(&outbox);
        outbox
    }

    fn disband_own_group(&mut self, id: ConnectionId, outbox: &mut Outbox) {
        let listeners = self.groups.members_except(&GroupKey::Host(id), id);
        outbox.multicast(listeners.clone(), ServerEvent::HostLeft { host_id: id });

        self.groups.disband_host_group(id);
        for listener in &listeners {
            self.registry.clear_follow_target_if(*listener, id);
        }

        if !listeners.is_empty() {
            tracing::info!(host = %id, listeners = listeners.len(), "Host left, group disbanded");
        }
    }

    fn leave_roster(&mut self, id: ConnectionId, outbox: &mut Outbox) {
        if !self.groups.leave_global(id) {
            return;
        }
        self.broadcast_presence(outbox);
        outbox.multicast(
            self.groups.members_of(&GroupKey::Global).to_vec(),
            ServerEvent::UserLeft { id },
        );
    }

    fn leave_followed_groups(
        &mut self,
        id: ConnectionId,
        removed: Option<&Connection>,
        outbox: &mut Outbox,
    ) {
        let mut hosts = self.groups.remove_everywhere(id);
        if let Some(target) = removed.and_then(|c| c.follow_target) {
            if !hosts.contains(&target) {
                hosts.push(target);
            }
        }

        for host in hosts {
            self.send_listener_list(host, outbox);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::join;
    use super::*;
    use crate::protocol::Participant;

    fn count_host_left(outbox: &Outbox, id: ConnectionId) -> usize {
        outbox
            .events_for(id)
            .iter()
            .filter(|e| matches!(e, ServerEvent::HostLeft { .. }))
            .count()
    }

    #[test]
    fn test_host_disconnect_notifies_each_listener_once() {
        let mut relay = Relay::new();
        let h = join(&mut relay, 1, "Alice");
        let listeners: Vec<_> = (2..6)
            .map(|i| join(&mut relay, i, &format!("L{}", i)))
            .collect();
        for l in &listeners {
            relay.follow(*l, h);
        }

        let outbox = relay.disconnect(h);

        for l in &listeners {
            assert_eq!(count_host_left(&outbox, *l), 1);
            // host-left comes before anything else
            assert_eq!(outbox.events_for(*l)[0], &ServerEvent::HostLeft { host_id: h });
            assert_eq!(relay.follow_target(*l), None);
        }
        assert!(relay.groups().members_of(&GroupKey::Host(h)).is_empty());
        assert!(relay.registry().get(h).is_none());
    }

    #[test]
    fn test_follower_disconnect_updates_host_listener_list() {
        let mut relay = Relay::new();
        let h = join(&mut relay, 1, "Alice");
        let a = join(&mut relay, 2, "Bob");
        let b = join(&mut relay, 3, "Carol");
        relay.follow(a, h);
        relay.follow(b, h);

        let outbox = relay.disconnect(a);

        assert!(outbox
            .events_for(h)
            .contains(&&ServerEvent::ListenerListUpdate(vec![Participant::new(b, "Carol")])));
        assert_eq!(relay.groups().listeners_of(h), vec![b]);
        assert_eq!(count_host_left(&outbox, b), 0);
    }

    #[test]
    fn test_user_left_sent_to_remaining() {
        let mut relay = Relay::new();
        let a = join(&mut relay, 1, "Alice");
        let b = join(&mut relay, 2, "Bob");

        let outbox = relay.disconnect(b);

        assert!(outbox.events_for(a).contains(&&ServerEvent::UserLeft { id: b }));
    }

    #[test]
    fn test_unannounced_disconnect_is_quiet() {
        let mut relay = Relay::new();
        join(&mut relay, 1, "Alice");
        relay.connect(ConnectionId(2));

        assert!(relay.disconnect(ConnectionId(2)).is_empty());
    }

    #[test]
    fn test_double_disconnect_is_safe() {
        let mut relay = Relay::new();
        let h = join(&mut relay, 1, "Alice");
        let f = join(&mut relay, 2, "Bob");
        relay.follow(f, h);

        relay.disconnect(h);
        let outbox = relay.disconnect(h);

        assert!(outbox.is_empty());
        assert_eq!(relay.presence_list(), vec![Participant::new(f, "Bob")]);
    }

    #[test]
    fn test_everyone_leaves_clears_tables() {
        let mut relay = Relay::new();
        let h = join(&mut relay, 1, "Alice");
        let f = join(&mut relay, 2, "Bob");
        relay.follow(f, h);

        relay.disconnect(f);
        relay.disconnect(h);

        assert_eq!(relay.groups().host_group_count(), 0);
        assert!(relay.presence_list().is_empty());
        assert!(relay.registry().is_empty());
    }
}
