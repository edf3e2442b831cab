//! Follow / state-sync controller
//!
//! Announce, follow and unfollow transitions. A connection follows at most
//! one host; following a new host implicitly leaves the previous one.

use super::{Outbox, Relay};
use crate::group::GroupKey;
use crate::protocol::{Participant, ServerEvent};
use crate::registry::ConnectionId;

impl Relay {
    /// Announce a connection under a display name
    ///
    /// Joins the global group and the connection's own host group, then
    /// refreshes the roster. A missing or blank name falls back to the
    /// default name. Announcing again only renames.
    pub fn announce(&mut self, id: ConnectionId, name: Option<String>) -> Outbox {
        let mut outbox = Outbox::new();
        let name = name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| self.registry.default_name().to_string());

        let Some(conn) = self.registry.get_mut(id) else {
            tracing::debug!(connection = %id, "Announce from unknown connection ignored");
            return outbox;
        };
        let first = !conn.announced;
        conn.announced = true;
        let following = conn.follow_target;
        self.registry.set_name(id, name.clone());

        self.groups.join_global(id);
        self.groups.join_host_group(id, id);

        tracing::info!(connection = %id, name = %name, first, "Participant announced");

        self.broadcast_presence(&mut outbox);
        if first {
            outbox.multicast(
                self.groups.members_except(&GroupKey::Global, id),
                ServerEvent::UserJoined(Participant::new(id, name)),
            );
        }

        // A rename shows up in the listener list of the followed host
        if let Some(host) = following {
            self.send_listener_list(host, &mut outbox);
        }

        outbox
    }

    /// Start following `host`
    ///
    /// Leaves any previously followed host first. The follower receives the
    /// host's cached state, if there is one, and the host receives its
    /// updated listener list. Following a host that is gone still records
    /// membership but delivers nothing.
    pub fn follow(&mut self, id: ConnectionId, host: ConnectionId) -> Outbox {
        let mut outbox = Outbox::new();

        if id == host {
            tracing::debug!(connection = %id, "Self-follow ignored");
            return outbox;
        }
        let Some(previous) = self.registry.get(id).map(|c| c.follow_target) else {
            return outbox;
        };

        if let Some(previous) = previous.filter(|p| *p != host) {
            outbox.extend(self.unfollow(id, previous));
        }

        self.registry.set_follow_target(id, Some(host));
        let newly_joined = self.groups.join_host_group(host, id);

        let extrapolate = self.config.extrapolate_sync_position;
        match self.registry.get(host) {
            Some(target) => {
                if let Some(ref cached) = target.state {
                    outbox.send(id, ServerEvent::SyncState(cached.snapshot(extrapolate)));
                }
                if newly_joined {
                    outbox.send(host, ServerEvent::NewFollower(self.participant(id)));
                }
                self.send_listener_list(host, &mut outbox);
            }
            None => {
                tracing::debug!(connection = %id, host = %host, "Followed host is not connected");
            }
        }

        tracing::debug!(connection = %id, host = %host, "Following host");
        outbox
    }

    /// Stop following `host`
    pub fn unfollow(&mut self, id: ConnectionId, host: ConnectionId) -> Outbox {
        let mut outbox = Outbox::new();

        // A host never leaves its own group
        if id == host {
            return outbox;
        }

        let cleared = self.registry.clear_follow_target_if(id, host);
        let left = self.groups.leave_host_group(host, id);
        if !cleared && !left {
            tracing::debug!(connection = %id, host = %host, "Unfollow of a host not followed");
            return outbox;
        }

        tracing::debug!(connection = %id, host = %host, "Stopped following host");
        self.send_listener_list(host, &mut outbox);
        outbox
    }

    /// Listeners of a host resolved to roster entries
    ///
    /// Members without a registry entry are skipped.
    pub fn listener_list(&self, host: ConnectionId) -> Vec<Participant> {
        self.groups
            .listeners_of(host)
            .into_iter()
            .filter_map(|id| {
                self.registry
                    .get(id)
                    .map(|c| Participant::new(id, c.name.clone()))
            })
            .collect()
    }

    /// Queue the listener list of `host` for the host itself
    pub(super) fn send_listener_list(&self, host: ConnectionId, outbox: &mut Outbox) {
        if !self.registry.contains(host) {
            return;
        }
        outbox.send(host, ServerEvent::ListenerListUpdate(self.listener_list(host)));
    }
}
