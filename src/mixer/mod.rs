//! Shared mixer state
//!
//! Four buses of channel strips, mutated only through [`MixerStore`].

mod store;
mod types;

pub use store::MixerStore;
pub use types::{
    clamp_percent, Bus, ChannelState, ChannelUpdate, MixerState, BUS_COUNT, PAN_CENTER,
};

/// Mixer state validation failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MixerError {
    #[error("bus {bus} / channel {channel} out of range ({channels} channels per bus)")]
    OutOfRange {
        bus: usize,
        channel: usize,
        channels: usize,
    },

    #[error("expected 4 buses, found {0}")]
    BusCount(usize),

    #[error("buses must have equal channel counts (expected {expected}, found {found})")]
    UnevenBuses { expected: usize, found: usize },
}
