//! Mixer state type definitions
//!
//! Field names on the wire follow the web console: `faderValue`,
//! `panValue`, `isMuted`, `isHidden`.

use serde::{Deserialize, Deserializer, Serialize};

use super::MixerError;

/// Number of independent mix outputs
pub const BUS_COUNT: usize = 4;

/// Centre pan position
pub const PAN_CENTER: u8 = 50;

/// Clamp a percentage into 0..=100, rounding fractional input
pub fn clamp_percent(value: f64) -> u8 {
    if value.is_nan() {
        return 0;
    }
    value.round().clamp(0.0, 100.0) as u8
}

fn de_percent<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    f64::deserialize(deserializer).map(clamp_percent)
}

fn de_opt_percent<'de, D>(deserializer: D) -> Result<Option<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.map(clamp_percent))
}

/// State of one channel strip on one bus
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelState {
    pub name: String,
    #[serde(rename = "faderValue", deserialize_with = "de_percent")]
    pub fader: u8,
    #[serde(rename = "panValue", deserialize_with = "de_percent")]
    pub pan: u8,
    #[serde(rename = "isMuted", default)]
    pub muted: bool,
    #[serde(rename = "isHidden", default)]
    pub hidden: bool,
}

impl ChannelState {
    pub fn new(name: impl Into<String>, fader: u8) -> Self {
        Self {
            name: name.into(),
            fader: fader.min(100),
            pan: PAN_CENTER,
            muted: false,
            hidden: false,
        }
    }

    /// Merge the fields present in `update`; absent fields stay untouched
    pub fn apply(&mut self, update: &ChannelUpdate) {
        if let Some(name) = &update.name {
            self.name.clone_from(name);
        }
        if let Some(fader) = update.fader {
            self.fader = fader.min(100);
        }
        if let Some(pan) = update.pan {
            self.pan = pan.min(100);
        }
        if let Some(muted) = update.muted {
            self.muted = muted;
        }
        if let Some(hidden) = update.hidden {
            self.hidden = hidden;
        }
    }
}

/// Partial channel update with explicit optional fields
///
/// Percent values are clamped to 0..=100 as they are decoded, so the
/// delta forwarded to peers is the one actually applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(
        rename = "faderValue",
        default,
        deserialize_with = "de_opt_percent",
        skip_serializing_if = "Option::is_none"
    )]
    pub fader: Option<u8>,
    #[serde(
        rename = "panValue",
        default,
        deserialize_with = "de_opt_percent",
        skip_serializing_if = "Option::is_none"
    )]
    pub pan: Option<u8>,
    #[serde(rename = "isMuted", default, skip_serializing_if = "Option::is_none")]
    pub muted: Option<bool>,
    #[serde(rename = "isHidden", default, skip_serializing_if = "Option::is_none")]
    pub hidden: Option<bool>,
}

impl ChannelUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.fader.is_none()
            && self.pan.is_none()
            && self.muted.is_none()
            && self.hidden.is_none()
    }
}

/// One mix output: one channel state per topology channel
pub type Bus = Vec<ChannelState>;

/// The full shared state: exactly four buses of equal channel count
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Bus>", into = "Vec<Bus>")]
pub struct MixerState {
    buses: [Bus; BUS_COUNT],
}

impl MixerState {
    /// Build four identical buses from the channel names
    pub fn new<S: AsRef<str>>(names: &[S], default_fader: u8) -> Self {
        let bus: Bus = names
            .iter()
            .map(|n| ChannelState::new(n.as_ref(), default_fader))
            .collect();
        Self {
            buses: std::array::from_fn(|_| bus.clone()),
        }
    }

    pub fn buses(&self) -> &[Bus; BUS_COUNT] {
        &self.buses
    }

    /// Channels per bus (identical across buses)
    pub fn channel_count(&self) -> usize {
        self.buses[0].len()
    }

    pub fn channel(&self, bus: usize, channel: usize) -> Option<&ChannelState> {
        self.buses.get(bus)?.get(channel)
    }

    pub(super) fn channel_mut(&mut self, bus: usize, channel: usize) -> Option<&mut ChannelState> {
        self.buses.get_mut(bus)?.get_mut(channel)
    }
}

impl TryFrom<Vec<Bus>> for MixerState {
    type Error = MixerError;

    fn try_from(buses: Vec<Bus>) -> Result<Self, Self::Error> {
        let buses: [Bus; BUS_COUNT] = buses
            .try_into()
            .map_err(|b: Vec<Bus>| MixerError::BusCount(b.len()))?;

        let expected = buses[0].len();
        if let Some(bad) = buses.iter().find(|b| b.len() != expected) {
            return Err(MixerError::UnevenBuses {
                expected,
                found: bad.len(),
            });
        }

        Ok(Self { buses })
    }
}

impl From<MixerState> for Vec<Bus> {
    fn from(state: MixerState) -> Self {
        state.buses.into()
    }
}
