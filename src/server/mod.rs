//! Relay server transport
//!
//! Newline-delimited JSON over TCP. Every frame is one object of the form
//! `{"event": "<name>", "data": <payload>}` in both directions.

pub mod config;
pub mod connection;
pub mod hub;
pub mod listener;

pub use config::ServerConfig;
pub use connection::ClientConnection;
pub use hub::{HubCommand, RelayHandle, RelayHub};
pub use listener::RelayServer;
