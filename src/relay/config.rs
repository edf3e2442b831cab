//! Relay configuration

use crate::registry::DEFAULT_NAME;

/// Relay engine configuration
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Display name for connections that never announced a usable one
    pub default_name: String,

    /// Advance the position of a playing snapshot by the time elapsed since
    /// the host last reported it, when delivering it to a new follower
    pub extrapolate_sync_position: bool,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            default_name: DEFAULT_NAME.to_string(),
            extrapolate_sync_position: false,
        }
    }
}

impl RelayConfig {
    /// Set the default display name
    pub fn default_name(mut self, name: impl Into<String>) -> Self {
        self.default_name = name.into();
        self
    }

    /// Enable snapshot position extrapolation
    pub fn extrapolate_sync_position(mut self, enabled: bool) -> Self {
        self.extrapolate_sync_position = enabled;
        self
    }
}
