//! Group membership tables
//!
//! Membership is stored as insertion-ordered lists so rosters and listener
//! lists come out in join order. Groups are small (one host plus its
//! followers) and membership checks are linear.

use std::collections::HashMap;

use super::key::GroupKey;
use crate::registry::ConnectionId;

/// Owner of every multicast group and its membership
#[derive(Debug, Default)]
pub struct GroupManager {
    groups: HashMap<GroupKey, Vec<ConnectionId>>,
}

impl GroupManager {
    /// Create an empty manager
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection to the global presence group
    ///
    /// Returns false if it was already a member.
    pub fn join_global(&mut self, id: ConnectionId) -> bool {
        self.join(GroupKey::Global, id)
    }

    /// Remove a connection from the global presence group
    pub fn leave_global(&mut self, id: ConnectionId) -> bool {
        self.leave(GroupKey::Global, id)
    }

    /// Add a connection to the group keyed by `host`
    ///
    /// Used both for a host joining its own group and for followers.
    /// Returns false if it was already a member.
    pub fn join_host_group(&mut self, host: ConnectionId, id: ConnectionId) -> bool {
        self.join(GroupKey::Host(host), id)
    }

    /// Remove a connection from the group keyed by `host`
    ///
    /// The group is forgotten once it has no members left.
    pub fn leave_host_group(&mut self, host: ConnectionId, id: ConnectionId) -> bool {
        self.leave(GroupKey::Host(host), id)
    }

    /// Remove a host group entirely, returning its former members
    pub fn disband_host_group(&mut self, host: ConnectionId) -> Vec<ConnectionId> {
        let members = self.groups.remove(&GroupKey::Host(host)).unwrap_or_default();
        if !members.is_empty() {
            tracing::debug!(host = %host, members = members.len(), "Host group disbanded");
        }
        members
    }

    /// Current members of a group, in join order
    pub fn members_of(&self, key: &GroupKey) -> &[ConnectionId] {
        self.groups.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Members of a host group other than the host itself
    pub fn listeners_of(&self, host: ConnectionId) -> Vec<ConnectionId> {
        self.members_of(&GroupKey::Host(host))
            .iter()
            .copied()
            .filter(|id| *id != host)
            .collect()
    }

    /// Members of a group except `excluded`
    pub fn members_except(&self, key: &GroupKey, excluded: ConnectionId) -> Vec<ConnectionId> {
        self.members_of(key)
            .iter()
            .copied()
            .filter(|id| *id != excluded)
            .collect()
    }

    /// Check group membership
    pub fn is_member(&self, key: &GroupKey, id: ConnectionId) -> bool {
        self.members_of(key).contains(&id)
    }

    /// Remove a connection from every group it belongs to
    ///
    /// Returns the hosts of the groups it was removed from, excluding its own.
    pub fn remove_everywhere(&mut self, id: ConnectionId) -> Vec<ConnectionId> {
        let keys: Vec<GroupKey> = self
            .groups
            .iter()
            .filter(|(_, members)| members.contains(&id))
            .map(|(key, _)| *key)
            .collect();

        let mut hosts = Vec::new();
        for key in keys {
            self.leave(key, id);
            if let Some(host) = key.host() {
                if host != id {
                    hosts.push(host);
                }
            }
        }
        hosts
    }

    /// Number of live host groups
    pub fn host_group_count(&self) -> usize {
        self.groups
            .keys()
            .filter(|key| matches!(key, GroupKey::Host(_)))
            .count()
    }

    fn join(&mut self, key: GroupKey, id: ConnectionId) -> bool {
        let members = self.groups.entry(key).or_default();
        if members.contains(&id) {
            return false;
        }
        members.push(id);
        tracing::trace!(group = %key, connection = %id, "Joined group");
        true
    }

    fn leave(&mut self, key: GroupKey, id: ConnectionId) -> bool {
        let Some(members) = self.groups.get_mut(&key) else {
            return false;
        };

        let before = members.len();
        members.retain(|m| *m != id);
        let removed = members.len() != before;

        if members.is_empty() {
            self.groups.remove(&key);
        }
        if removed {
            tracing::trace!(group = %key, connection = %id, "Left group");
        }
        removed
    }
}
