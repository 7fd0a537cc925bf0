//! Commands for the sync actor

use tokio::sync::{mpsc, oneshot};

use super::protocol::{ClientEvent, ServerEvent};
use super::ClientId;
use crate::mixer::MixerState;
use crate::topology::AddressedChannel;

/// Outbound queue of one connected client
pub type ClientTx = mpsc::UnboundedSender<ServerEvent>;

/// Commands processed one at a time by the sync actor
#[derive(Debug)]
pub enum SyncCommand {
    /// Register a client and send it the current state
    Connect { client: ClientId, tx: ClientTx },

    Disconnect { client: ClientId },

    /// Event received from a client
    Event { client: ClientId, event: ClientEvent },

    Snapshot {
        response: oneshot::Sender<MixerState>,
    },

    PresetNames {
        response: oneshot::Sender<Vec<String>>,
    },

    Layout {
        response: oneshot::Sender<Vec<AddressedChannel>>,
    },

    ClientCount {
        response: oneshot::Sender<usize>,
    },

    Shutdown,
}
