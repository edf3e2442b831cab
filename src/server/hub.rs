//! Relay hub
//!
//! A single task owns the [`Relay`]. Connection tasks send it commands over
//! a bounded channel and it applies them one at a time, so relay handlers
//! never run concurrently and need no locking.
//!
//! Each outbound event is serialized once into a [`Bytes`] frame; every
//! recipient gets a reference-counted clone of the same allocation.
//!
//! A recipient whose outbound queue is full is cut off: the hub drops its
//! sender, the connection's writer drains and closes, and the usual
//! disconnect cascade follows. Listeners therefore never see a gap in a
//! host's stream of updates; they either get all of it or get disconnected.

use std::collections::HashMap;

use bytes::Bytes;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::error::{Error, Result};
use crate::protocol::{encode_event, ClientIntent};
use crate::registry::ConnectionId;
use crate::relay::{Outbox, Relay};
use crate::stats::RelayStats;

/// Commands accepted by the hub
#[derive(Debug)]
pub enum HubCommand {
    /// A transport connection opened; frames for it go to `outbound`
    Connect {
        id: ConnectionId,
        outbound: mpsc::Sender<Bytes>,
    },
    /// A decoded intent from a connection
    Intent {
        id: ConnectionId,
        intent: ClientIntent,
    },
    /// A transport connection closed
    Disconnect { id: ConnectionId },
    /// Request a statistics snapshot
    Stats { reply: oneshot::Sender<RelayStats> },
}

/// Cloneable handle used by connection tasks to reach the hub
#[derive(Debug, Clone)]
pub struct RelayHandle {
    tx: mpsc::Sender<HubCommand>,
}

impl RelayHandle {
    /// Register a connection and its outbound queue
    pub async fn connect(&self, id: ConnectionId, outbound: mpsc::Sender<Bytes>) -> Result<()> {
        self.send(HubCommand::Connect { id, outbound }).await
    }

    /// Forward an intent
    pub async fn intent(&self, id: ConnectionId, intent: ClientIntent) -> Result<()> {
        self.send(HubCommand::Intent { id, intent }).await
    }

    /// Report a closed connection
    pub async fn disconnect(&self, id: ConnectionId) -> Result<()> {
        self.send(HubCommand::Disconnect { id }).await
    }

    /// Fetch current statistics
    pub async fn stats(&self) -> Result<RelayStats> {
        let (reply, rx) = oneshot::channel();
        self.send(HubCommand::Stats { reply }).await?;
        rx.await.map_err(|_| Error::HubClosed)
    }

    async fn send(&self, command: HubCommand) -> Result<()> {
        self.tx.send(command).await.map_err(|_| Error::HubClosed)
    }
}

/// Task state owning the relay and every connection's outbound queue
pub struct RelayHub {
    relay: Relay,
    outbound: HashMap<ConnectionId, mpsc::Sender<Bytes>>,
    commands: mpsc::Receiver<HubCommand>,
    slow_consumers_dropped: u64,
}

impl RelayHub {
    /// Spawn the hub task
    ///
    /// The task stops once every [`RelayHandle`] has been dropped.
    pub fn spawn(relay: Relay, command_capacity: usize) -> (RelayHandle, JoinHandle<()>) {
        let (tx, commands) = mpsc::channel(command_capacity.max(1));
        let hub = Self {
            relay,
            outbound: HashMap::new(),
            commands,
            slow_consumers_dropped: 0,
        };

        (RelayHandle { tx }, tokio::spawn(hub.run()))
    }

    async fn run(mut self) {
        while let Some(command) = self.commands.recv().await {
            self.apply(command);
        }
        tracing::debug!("Relay hub stopped");
    }

    fn apply(&mut self, command: HubCommand) {
        match command {
            HubCommand::Connect { id, outbound } => {
                self.outbound.insert(id, outbound);
                self.relay.connect(id);
            }
            HubCommand::Intent { id, intent } => {
                let outbox = self.relay.handle(id, intent);
                self.deliver(outbox);
            }
            HubCommand::Disconnect { id } => {
                self.outbound.remove(&id);
                let outbox = self.relay.disconnect(id);
                self.deliver(outbox);
            }
            HubCommand::Stats { reply } => {
                let mut stats = self.relay.stats();
                stats.slow_consumers_dropped = self.slow_consumers_dropped;
                let _ = reply.send(stats);
            }
        }
    }

    fn deliver(&mut self, outbox: Outbox) {
        for dispatch in outbox {
            let frame = match encode_event(&dispatch.event) {
                Ok(frame) => frame,
                Err(e) => {
                    tracing::error!(event = dispatch.event.name(), error = %e, "Failed to encode event");
                    continue;
                }
            };

            tracing::trace!(
                event = dispatch.event.name(),
                recipients = dispatch.recipients.len(),
                "Dispatching"
            );

            for recipient in dispatch.recipients {
                let Some(tx) = self.outbound.get(&recipient) else {
                    continue;
                };

                match tx.try_send(frame.clone()) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => {
                        tracing::warn!(
                            connection = %recipient,
                            event = dispatch.event.name(),
                            "Outbound queue full, dropping slow consumer"
                        );
                        self.outbound.remove(&recipient);
                        self.slow_consumers_dropped += 1;
                    }
                    Err(TrySendError::Closed(_)) => {
                        self.outbound.remove(&recipient);
                    }
                }
            }
        }
    }
}
