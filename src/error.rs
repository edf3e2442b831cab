//! Error types
//!
//! Only the transport layer produces errors. Relay operations never fail:
//! missing connections and malformed payloads are absorbed where they occur.

use crate::protocol::codec::DecodeError;

/// Errors raised while serving a connection
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Socket I/O failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Inbound frame could not be decoded
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Inbound frame exceeded the configured size limit
    #[error("frame exceeds {limit} bytes")]
    MessageTooLarge { limit: usize },

    /// No frame received within the idle timeout
    #[error("connection idle for too long")]
    IdleTimeout,

    /// The hub task owning the relay is gone
    #[error("relay hub stopped")]
    HubClosed,
}

/// Result alias used by the transport layer
pub type Result<T> = std::result::Result<T, Error>;
