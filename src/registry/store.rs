//! Connection registry implementation
//!
//! Owns every live [`Connection`]. Lookups return `Option` because a peer
//! named in an event may already be gone by the time the event is handled.

use std::collections::HashMap;

use super::entry::{Connection, ConnectionId};

/// Name given to connections that never announced one
pub const DEFAULT_NAME: &str = "guest";

/// Registry of all live connections
#[derive(Debug)]
pub struct ConnectionRegistry {
    /// Map of connection ID to entry
    connections: HashMap<ConnectionId, Connection>,

    /// Name assigned on register and on blank announces
    default_name: String,
}

impl ConnectionRegistry {
    /// Create an empty registry using [`DEFAULT_NAME`]
    pub fn new() -> Self {
        Self::with_default_name(DEFAULT_NAME)
    }

    /// Create an empty registry with a custom default display name
    pub fn with_default_name(default_name: impl Into<String>) -> Self {
        Self {
            connections: HashMap::new(),
            default_name: default_name.into(),
        }
    }

    /// Default display name
    pub fn default_name(&self) -> &str {
        &self.default_name
    }

    /// Register a freshly connected transport connection
    ///
    /// A duplicate registration replaces the previous entry.
    pub fn register(&mut self, id: ConnectionId) {
        let entry = Connection::new(id, self.default_name.clone());
        if self.connections.insert(id, entry).is_some() {
            tracing::warn!(connection = %id, "Connection registered twice, entry reset");
        } else {
            tracing::debug!(connection = %id, "Connection registered");
        }
    }

    /// Update a display name; unknown IDs are ignored
    pub fn set_name(&mut self, id: ConnectionId, name: impl Into<String>) {
        if let Some(conn) = self.connections.get_mut(&id) {
            conn.name = name.into();
        }
    }

    /// Get a connection
    pub fn get(&self, id: ConnectionId) -> Option<&Connection> {
        self.connections.get(&id)
    }

    /// Get a mutable connection
    pub fn get_mut(&mut self, id: ConnectionId) -> Option<&mut Connection> {
        self.connections.get_mut(&id)
    }

    /// Remove a connection, returning its last entry
    pub fn remove(&mut self, id: ConnectionId) -> Option<Connection> {
        self.connections.remove(&id)
    }

    /// Display name of a connection, if it exists
    pub fn name_of(&self, id: ConnectionId) -> Option<&str> {
        self.connections.get(&id).map(|c| c.name.as_str())
    }

    /// Set which host a connection follows
    pub fn set_follow_target(&mut self, id: ConnectionId, host: Option<ConnectionId>) {
        if let Some(conn) = self.connections.get_mut(&id) {
            conn.follow_target = host;
        }
    }

    /// Clear the follow target of `id` if it currently points at `host`
    ///
    /// Returns true if it was cleared.
    pub fn clear_follow_target_if(&mut self, id: ConnectionId, host: ConnectionId) -> bool {
        match self.connections.get_mut(&id) {
            Some(conn) if conn.is_following(host) => {
                conn.follow_target = None;
                true
            }
            _ => false,
        }
    }

    /// Check if a connection is registered
    pub fn contains(&self, id: ConnectionId) -> bool {
        self.connections.contains_key(&id)
    }

    /// Number of live connections
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Whether no connection is registered
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
