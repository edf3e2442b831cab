//! Outbound dispatches
//!
//! Relay operations do not send anything themselves. They return an
//! [`Outbox`]: an ordered list of events, each addressed to an explicit set
//! of connections. The transport delivers dispatches in order, which keeps
//! per-recipient ordering equal to the order the relay produced them.

use crate::protocol::ServerEvent;
use crate::registry::ConnectionId;

/// One event addressed to a set of connections
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatch {
    /// Recipients, in group order
    pub recipients: Vec<ConnectionId>,
    /// Event to deliver
    pub event: ServerEvent,
}

/// Ordered collection of dispatches produced by one relay operation
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Outbox {
    dispatches: Vec<Dispatch>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Address an event to a single connection
    pub fn send(&mut self, to: ConnectionId, event: ServerEvent) {
        self.multicast(vec![to], event);
    }

    /// Address an event to several connections; empty recipient lists are dropped
    pub fn multicast(&mut self, recipients: Vec<ConnectionId>, event: ServerEvent) {
        if recipients.is_empty() {
            return;
        }
        tracing::trace!(event = event.name(), recipients = recipients.len(), "Dispatch queued");
        self.dispatches.push(Dispatch { recipients, event });
    }

    /// Append every dispatch of another outbox
    pub fn extend(&mut self, other: Outbox) {
        self.dispatches.extend(other.dispatches);
    }

    /// Queued dispatches
    pub fn dispatches(&self) -> &[Dispatch] {
        &self.dispatches
    }

    /// Number of dispatches
    pub fn len(&self) -> usize {
        self.dispatches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dispatches.is_empty()
    }

    /// Total number of (recipient, event) deliveries
    pub fn recipient_count(&self) -> usize {
        self.dispatches.iter().map(|d| d.recipients.len()).sum()
    }

    /// Events addressed to one connection, in delivery order
    pub fn events_for(&self, id: ConnectionId) -> Vec<&ServerEvent> {
        self.dispatches
            .iter()
            .filter(|d| d.recipients.contains(&id))
            .map(|d| &d.event)
            .collect()
    }
}

impl IntoIterator for Outbox {
    type Item = Dispatch;
    type IntoIter = std::vec::IntoIter<Dispatch>;

    fn into_iter(self) -> Self::IntoIter {
        self.dispatches.into_iter()
    }
}
