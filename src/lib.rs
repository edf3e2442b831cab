//! Listen-together relay
//!
//! One participant (the host) plays media; followers mirror the host's
//! playback state through this relay, which also keeps a global roster and
//! relays chat inside each host's group.
//!
//! The crate is split in two layers:
//!
//! - [`relay`]: the in-memory engine. It owns the connection registry and the
//!   multicast groups, and turns every inbound intent into an [`relay::Outbox`]
//!   of events addressed to concrete connections. It performs no I/O.
//! - [`server`]: a tokio transport that speaks newline-delimited JSON over TCP
//!   and feeds a single hub task owning the engine.
//!
//! ```text
//!   [conn task] ──┐                        ┌──► [conn writer] ──► TCP
//!   [conn task] ──┼──► mpsc ──► RelayHub ──┼──► [conn writer] ──► TCP
//!   [conn task] ──┘        (owns Relay)    └──► [conn writer] ──► TCP
//! ```

pub mod error;
pub mod group;
pub mod protocol;
pub mod registry;
pub mod relay;
pub mod server;
pub mod stats;

pub use error::{Error, Result};
pub use protocol::{ClientIntent, PlaybackState, PlaybackStatePatch, ServerEvent};
pub use registry::ConnectionId;
pub use relay::{Outbox, Relay, RelayConfig};
pub use server::{RelayServer, ServerConfig};
pub use stats::RelayStats;
