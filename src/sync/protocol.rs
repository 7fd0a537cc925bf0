//! Real-time event envelope exchanged with web clients
//!
//! Every frame is `{"event": <name>, "data": <payload>}`.

use serde::{Deserialize, Serialize};

use crate::midi::convert;
use crate::mixer::{ChannelUpdate, MixerState};
use crate::output::DirectControl;

/// Events sent by clients
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    GetPresets,
    SavePreset(SavePresetRequest),
    LoadPreset(String),
    DeletePreset(String),
    UpdateChannel(ChannelDelta),
    InitSetup(InitSetupRequest),
    MidiCc(DirectValue),
    MidiPan(DirectValue),
    MidiMute(DirectMute),
}

impl ClientEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::GetPresets => "get_presets",
            ClientEvent::SavePreset(_) => "save_preset",
            ClientEvent::LoadPreset(_) => "load_preset",
            ClientEvent::DeletePreset(_) => "delete_preset",
            ClientEvent::UpdateChannel(_) => "update_channel",
            ClientEvent::InitSetup(_) => "init_setup",
            ClientEvent::MidiCc(_) => "midi_cc",
            ClientEvent::MidiPan(_) => "midi_pan",
            ClientEvent::MidiMute(_) => "midi_mute",
        }
    }
}

/// Events sent to clients
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Full canonical state
    SyncState(MixerState),
    /// Partial delta applied by another client
    StateUpdated(ChannelDelta),
    PresetsList(Vec<String>),
}

/// `save_preset` payload: a bare name, or a name with an explicit state
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum SavePresetRequest {
    Name(String),
    Full {
        name: String,
        #[serde(default)]
        state: Option<MixerState>,
    },
}

impl SavePresetRequest {
    pub fn into_parts(self) -> (String, Option<MixerState>) {
        match self {
            SavePresetRequest::Name(name) => (name, None),
            SavePresetRequest::Full { name, state } => (name, state),
        }
    }
}

/// Partial update addressed to one channel on one bus
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelDelta {
    #[serde(rename = "busIndex", alias = "mixIndex")]
    pub bus_index: usize,
    #[serde(rename = "channelIndex")]
    pub channel_index: usize,
    pub update: ChannelUpdate,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct InitSetupRequest {
    #[serde(default)]
    pub count: Option<usize>,
}

/// Bus reference in legacy events: a number or a string such as `"2"`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum BusRef {
    Index(i64),
    Label(String),
}

impl Default for BusRef {
    fn default() -> Self {
        BusRef::Index(0)
    }
}

impl BusRef {
    /// Bus index; anything unrecognised (including `"MAIN"`) is bus 0
    pub fn index(&self) -> usize {
        match self {
            BusRef::Index(i) => usize::try_from(*i).unwrap_or(0),
            BusRef::Label(s) => s.trim().parse().unwrap_or(0),
        }
    }
}

fn default_strip() -> i64 {
    1
}

/// 1-based strip number to a 0-based address offset
fn strip_offset(ch: i64) -> u16 {
    (ch - 1).clamp(0, u16::MAX as i64) as u16
}

/// Legacy `midi_cc` / `midi_pan` payload
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DirectValue {
    #[serde(alias = "channel", default = "default_strip")]
    pub ch: i64,
    #[serde(alias = "bus", default)]
    pub mix: BusRef,
    #[serde(default)]
    pub value: Option<i64>,
}

impl DirectValue {
    pub fn to_fader(&self) -> DirectControl {
        DirectControl::Fader {
            bus: self.mix.index(),
            channel: strip_offset(self.ch),
            value: convert::clamp_7bit(self.value.unwrap_or(0)),
        }
    }

    pub fn to_pan(&self) -> DirectControl {
        DirectControl::Pan {
            bus: self.mix.index(),
            channel: strip_offset(self.ch),
            value: convert::clamp_7bit(self.value.unwrap_or(64)),
        }
    }
}

/// Legacy `midi_mute` payload
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DirectMute {
    #[serde(alias = "channel", default = "default_strip")]
    pub ch: i64,
    #[serde(alias = "bus", default)]
    pub mix: BusRef,
    #[serde(default)]
    pub state: bool,
}

impl DirectMute {
    pub fn to_control(&self) -> DirectControl {
        DirectControl::Mute {
            bus: self.mix.index(),
            channel: strip_offset(self.ch),
            on: self.state,
        }
    }
}
