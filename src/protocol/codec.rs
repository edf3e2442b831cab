//! Line codec
//!
//! Decoding is lenient: a recognised event with a missing payload still
//! produces an intent filled with defaults, and a payload field of the wrong
//! type falls back to its default without affecting the other fields. Only
//! frames that are not JSON objects or that name no known event are errors.

use bytes::{BufMut, Bytes, BytesMut};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use super::message::{ClientIntent, ServerEvent};

/// Error decoding an inbound frame
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// Frame is not a JSON object
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Frame has no `event` field
    #[error("frame has no event name")]
    MissingEvent,

    /// Frame names an event the relay does not handle
    #[error("unknown event: {0}")]
    UnknownEvent(String),
}

#[derive(Deserialize)]
struct RawFrame {
    #[serde(default)]
    event: Option<String>,
    #[serde(default)]
    data: Value,
}

/// Decode one inbound line into an intent
pub fn decode_intent(line: &str) -> Result<ClientIntent, DecodeError> {
    let raw: RawFrame = serde_json::from_str(line)?;
    let event = raw.event.ok_or(DecodeError::MissingEvent)?;
    let data = raw.data;

    let intent = match event.as_str() {
        "announce" | "join-jam" => ClientIntent::Announce(payload(&event, data)),
        "follow" | "follow-user" => ClientIntent::Follow(payload(&event, data)),
        "unfollow" | "leave-host" => ClientIntent::Unfollow(payload(&event, data)),
        "state-update" => ClientIntent::StateUpdate(payload(&event, data)),
        "media-event" => ClientIntent::MediaEvent(payload(&event, data)),
        "chat-message" => ClientIntent::ChatMessage(payload(&event, data)),
        "sync-state" => ClientIntent::SyncState(payload(&event, data)),
        _ => return Err(DecodeError::UnknownEvent(event)),
    };

    Ok(intent)
}

fn payload<T>(event: &str, data: Value) -> T
where
    T: DeserializeOwned + Default,
{
    if data.is_null() {
        return T::default();
    }

    serde_json::from_value(data).unwrap_or_else(|e| {
        tracing::warn!(event, error = %e, "Malformed payload, using defaults");
        T::default()
    })
}

/// Encode an outbound event as one newline-terminated frame
///
/// The result is shared by every recipient of a multicast.
pub fn encode_event(event: &ServerEvent) -> Result<Bytes, serde_json::Error> {
    let mut buf = BytesMut::with_capacity(128).writer();
    serde_json::to_writer(&mut buf, event)?;

    let mut buf = buf.into_inner();
    buf.put_u8(b'\n');
    Ok(buf.freeze())
}
