//! Multicast groups
//!
//! Two kinds of group exist: the single global presence group (the roster)
//! and one group per host, holding the host and its followers. Membership is
//! only ever changed through [`GroupManager`]; the relay derives it from
//! connection state transitions.

pub mod key;
pub mod manager;

pub use key::{GroupKey, GLOBAL_GROUP};
pub use manager::GroupManager;
