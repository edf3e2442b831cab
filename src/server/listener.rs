//! Relay server listener
//!
//! Handles the TCP accept loop and spawns one task per connection. All
//! connections share a single hub task that owns the relay.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

use crate::error::Result;
use crate::registry::ConnectionId;
use crate::relay::Relay;
use crate::server::config::ServerConfig;
use crate::server::connection::ClientConnection;
use crate::server::hub::{RelayHandle, RelayHub};

/// Listen-together relay server
pub struct RelayServer {
    config: ServerConfig,
    next_connection_id: AtomicU64,
    connection_semaphore: Option<Arc<Semaphore>>,
}

impl RelayServer {
    /// Create a new server with the given configuration
    pub fn new(config: ServerConfig) -> Self {
        let connection_semaphore = if config.max_connections > 0 {
            Some(Arc::new(Semaphore::new(config.max_connections)))
        } else {
            None
        };

        Self {
            config,
            next_connection_id: AtomicU64::new(1),
            connection_semaphore,
        }
    }

    /// Get the server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Run the server
    ///
    /// This method blocks until the accept loop fails.
    pub async fn run(&self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Run the server with graceful shutdown
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        self.serve(listener, shutdown).await
    }

    /// Serve connections from an already bound listener until `shutdown` resolves
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let addr = listener.local_addr()?;
        tracing::info!(addr = %addr, "Relay server listening");

        let relay = Relay::with_config(self.config.relay.clone());
        let (hub, hub_task) = RelayHub::spawn(relay, self.config.command_capacity);
        let stats_task = self.spawn_stats_task(hub.clone());

        let result = tokio::select! {
            _ = shutdown => {
                tracing::info!("Shutdown signal received");
                Ok(())
            }
            result = self.accept_loop(&listener, &hub) => result,
        };

        // Connection tasks see the hub as closed and wind down
        if let Some(task) = stats_task {
            task.abort();
        }
        hub_task.abort();

        result
    }

    async fn accept_loop(&self, listener: &TcpListener, hub: &RelayHandle) -> Result<()> {
        loop {
            match listener.accept().await {
                Ok((socket, peer_addr)) => {
                    self.handle_connection(socket, peer_addr, hub);
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to accept connection");
                }
            }
        }
    }

    fn handle_connection(&self, socket: TcpStream, peer_addr: SocketAddr, hub: &RelayHandle) {
        // Check connection limit
        let permit = if let Some(ref sem) = self.connection_semaphore {
            match sem.clone().try_acquire_owned() {
                Ok(permit) => Some(permit),
                Err(_) => {
                    tracing::warn!(peer = %peer_addr, "Connection rejected: limit reached");
                    return;
                }
            }
        } else {
            None
        };

        let id = ConnectionId(self.next_connection_id.fetch_add(1, Ordering::Relaxed));

        tracing::debug!(connection = %id, peer = %peer_addr, "New connection");

        if let Err(e) = self.configure_socket(&socket) {
            tracing::error!(error = %e, "Failed to configure socket");
            return;
        }

        let config = self.config.clone();
        let hub = hub.clone();

        tokio::spawn(async move {
            // Held for the lifetime of the connection
            let _permit = permit;

            let connection = ClientConnection::new(id, socket, config, hub);
            if let Err(e) = connection.run().await {
                tracing::debug!(connection = %id, error = %e, "Connection error");
            }

            tracing::debug!(connection = %id, peer = %peer_addr, "Connection closed");
        });
    }

    fn configure_socket(&self, socket: &TcpStream) -> std::io::Result<()> {
        if self.config.tcp_nodelay {
            socket.set_nodelay(true)?;
        }
        Ok(())
    }

    fn spawn_stats_task(&self, hub: RelayHandle) -> Option<JoinHandle<()>> {
        let period = self.config.stats_interval;
        if period.is_zero() {
            return None;
        }

        Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.tick().await;

            loop {
                interval.tick().await;
                let Ok(stats) = hub.stats().await else {
                    break;
                };
                tracing::info!(
                    connections = stats.connections_active,
                    participants = stats.participants,
                    host_groups = stats.host_groups,
                    intents = stats.intents_handled,
                    fanout = stats.fanout_ratio(),
                    slow_consumers = stats.slow_consumers_dropped,
                    "Relay stats"
                );
            }
        }))
    }

    /// Get the bind address
    pub fn bind_addr(&self) -> SocketAddr {
        self.config.bind_addr
    }
}
