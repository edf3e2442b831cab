//! Multicast group keys

use crate::registry::ConnectionId;

/// Name of the global presence group
pub const GLOBAL_GROUP: &str = "jam";

/// Identifier of a multicast group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupKey {
    /// Every announced connection
    Global,
    /// A host and the connections following it
    Host(ConnectionId),
}

impl GroupKey {
    /// Host that keys this group, if it is a host group
    pub fn host(&self) -> Option<ConnectionId> {
        match self {
            GroupKey::Global => None,
            GroupKey::Host(id) => Some(*id),
        }
    }
}

impl std::fmt::Display for GroupKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GroupKey::Global => f.write_str(GLOBAL_GROUP),
            GroupKey::Host(id) => write!(f, "host:{}", id),
        }
    }
}
