//! Wire protocol
//!
//! Newline-delimited JSON frames. Each frame is an object with an `event`
//! name and a `data` payload.

pub mod codec;
pub(crate) mod lenient;
pub mod message;
pub mod state;

pub use codec::{decode_intent, encode_event, DecodeError};
pub use message::{
    AnnouncePayload, ChatMessage, ChatPayload, ClientIntent, FollowPayload, MediaEvent,
    MediaEventPayload, Participant, ServerEvent, StateUpdatePayload, SyncStatePayload,
    UnfollowPayload,
};
pub use state::{PlaybackState, PlaybackStatePatch};
