//! Broadcast synchronizer
//!
//! Mediates client connect/update/reset events against the mixer store.
//! Partial deltas go to every client except the sender; full-state changes
//! go to everyone so all views converge on the canonical state.

mod actor;
mod commands;
mod handle;
pub mod protocol;

pub use actor::{SyncActor, DEFAULT_CHANNEL_COUNT, MAX_CHANNELS};
pub use commands::{ClientTx, SyncCommand};
pub use handle::SyncHandle;
pub use protocol::{ChannelDelta, ClientEvent, ServerEvent};

use std::fmt;

/// Identity of a connected client, used to exclude the sender from
/// delta broadcasts
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClientId(pub u64);

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
