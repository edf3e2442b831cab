//! Connection registry
//!
//! Tracks every live connection together with its display name, the host it
//! follows and, for hosts, the last known playback state. Other components
//! hold only [`ConnectionId`]s and resolve them here.

pub mod entry;
pub mod store;

pub use entry::{CachedState, Connection, ConnectionId};
pub use store::{ConnectionRegistry, DEFAULT_NAME};
