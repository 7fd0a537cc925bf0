//! MixerStore - exclusive owner of the live mixer state

use tracing::{debug, info};

use super::types::{ChannelUpdate, MixerState};
use super::MixerError;

/// Holds the single shared [`MixerState`]
///
/// All mutation goes through `&mut self`, so whoever owns the store (the
/// sync actor) decides the exclusion discipline.
#[derive(Debug, Clone)]
pub struct MixerStore {
    state: MixerState,
    default_fader: u8,
}

impl MixerStore {
    /// Create a store initialized from the given channel names
    pub fn new<S: AsRef<str>>(names: &[S], default_fader: u8) -> Self {
        let default_fader = default_fader.min(100);
        Self {
            state: MixerState::new(names, default_fader),
            default_fader,
        }
    }

    /// Rebuild all four buses with fresh channel states
    pub fn initialize<S: AsRef<str>>(&mut self, names: &[S]) {
        self.state = MixerState::new(names, self.default_fader);
        info!("Mixer initialized with {} channels per bus", names.len());
    }

    /// Swap the entire state
    pub fn replace(&mut self, state: MixerState) {
        debug!(
            "Mixer state replaced ({} channels per bus)",
            state.channel_count()
        );
        self.state = state;
    }

    /// Merge a partial update into one channel
    ///
    /// Fails without touching anything if the slot does not exist.
    pub fn apply_update(
        &mut self,
        bus: usize,
        channel: usize,
        update: &ChannelUpdate,
    ) -> Result<(), MixerError> {
        let channels = self.state.channel_count();
        let target = self
            .state
            .channel_mut(bus, channel)
            .ok_or(MixerError::OutOfRange {
                bus,
                channel,
                channels,
            })?;

        target.apply(update);
        Ok(())
    }

    /// Deep copy of the current state
    pub fn snapshot(&self) -> MixerState {
        self.state.clone()
    }

    /// Borrow the current state
    pub fn state(&self) -> &MixerState {
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mixer::PAN_CENTER;

    fn fader(value: u8) -> ChannelUpdate {
        ChannelUpdate {
            fader: Some(value),
            ..ChannelUpdate::default()
        }
    }

    #[test]
    fn test_initialize_resets_values() {
        let mut store = MixerStore::new(&["A", "B"], 70);
        store.apply_update(0, 0, &fader(10)).unwrap();

        store.initialize(&["X", "Y", "Z"]);

        let state = store.state();
        assert_eq!(state.channel_count(), 3);
        assert_eq!(state.channel(0, 0).unwrap().fader, 70);
        assert_eq!(state.channel(0, 0).unwrap().pan, PAN_CENTER);
        assert_eq!(state.channel(1, 2).unwrap().name, "Z");
    }

    #[test]
    fn test_apply_update_targets_one_slot() {
        let mut store = MixerStore::new(&["A", "B"], 0);
        store.apply_update(2, 1, &fader(55)).unwrap();

        assert_eq!(store.state().channel(2, 1).unwrap().fader, 55);
        assert_eq!(store.state().channel(1, 1).unwrap().fader, 0);
        assert_eq!(store.state().channel(2, 0).unwrap().fader, 0);
    }

    #[test]
    fn test_apply_update_is_idempotent() {
        let mut store = MixerStore::new(&["A"], 0);
        let update = ChannelUpdate {
            fader: Some(80),
            muted: Some(true),
            ..ChannelUpdate::default()
        };

        store.apply_update(1, 0, &update).unwrap();
        let once = store.snapshot();
        store.apply_update(1, 0, &update).unwrap();
        assert_eq!(store.snapshot(), once);
    }

    #[test]
    fn test_out_of_range_leaves_state_unchanged() {
        let mut store = MixerStore::new(&["A", "B"], 40);
        let before = store.snapshot();

        let err = store.apply_update(0, 2, &fader(99)).unwrap_err();
        assert_eq!(
            err,
            MixerError::OutOfRange {
                bus: 0,
                channel: 2,
                channels: 2
            }
        );
        assert!(store.apply_update(4, 0, &fader(99)).is_err());
        assert_eq!(store.snapshot(), before);
    }

    #[test]
    fn test_replace_swaps_whole_state() {
        let mut store = MixerStore::new(&["A"], 0);
        let other = MixerState::new(&["P", "Q"], 90);
        store.replace(other.clone());
        assert_eq!(store.snapshot(), other);
    }

    #[test]
    fn test_snapshot_is_detached() {
        let mut store = MixerStore::new(&["A"], 0);
        let snap = store.snapshot();
        store.apply_update(0, 0, &fader(33)).unwrap();
        assert_eq!(snap.channel(0, 0).unwrap().fader, 0);
    }
}
