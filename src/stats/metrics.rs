//! Statistics for the relay

/// Relay-wide statistics snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelayStats {
    /// Total connections ever registered
    pub connections_total: u64,
    /// Currently registered connections
    pub connections_active: u64,
    /// Members of the global presence group
    pub participants: u64,
    /// Live host groups
    pub host_groups: u64,
    /// Inbound intents handled
    pub intents_handled: u64,
    /// Outbound events addressed (one per recipient)
    pub events_dispatched: u64,
    /// Connections dropped because their outbound queue was full
    pub slow_consumers_dropped: u64,
}

impl RelayStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Average recipients per handled intent
    pub fn fanout_ratio(&self) -> f64 {
        if self.intents_handled > 0 {
            self.events_dispatched as f64 / self.intents_handled as f64
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relay_stats_new() {
        let stats = RelayStats::new();
        assert_eq!(stats.connections_total, 0);
        assert_eq!(stats.connections_active, 0);
        assert_eq!(stats.participants, 0);
        assert_eq!(stats.host_groups, 0);
        assert_eq!(stats.slow_consumers_dropped, 0);
    }

    #[test]
    fn test_fanout_ratio() {
        let stats = RelayStats {
            intents_handled: 4,
            events_dispatched: 10,
            ..Default::default()
        };

        assert_eq!(stats.fanout_ratio(), 2.5);
    }

    #[test]
    fn test_fanout_ratio_no_intents() {
        assert_eq!(RelayStats::new().fanout_ratio(), 0.0);
    }
}
