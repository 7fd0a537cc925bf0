//! Control Translator - applied deltas to outbound MIDI
//!
//! Address scheme (per hardware channel):
//! - fader: CC `FADER_BASE + chid`
//! - pan:   CC `PAN_BASE + chid`
//! - mute:  note `MUTE_BASE + chid`, Note On 127 when muted, Note Off 0 when not

use tracing::{debug, trace};

use super::port::OutputPort;
use crate::midi::{convert, MidiMessage};
use crate::mixer::ChannelUpdate;

pub const FADER_BASE: u8 = 20;
pub const PAN_BASE: u8 = 80;
pub const MUTE_BASE: u8 = 60;

/// Bus index to MIDI channel
const BUS_MIDI_CHANNELS: [u8; 4] = [0, 1, 2, 3];

/// MIDI channel for a bus; unknown buses fall back to channel 0
pub fn hardware_channel(bus: usize) -> u8 {
    BUS_MIDI_CHANNELS.get(bus).copied().unwrap_or(0)
}

/// Highest chid whose fader, pan and mute addresses all fit in 7 bits
pub const MAX_FULL_CHID: u16 = 127 - PAN_BASE as u16;

/// 7-bit control address `base + chid`, or `None` past 127
fn address(base: u8, chid: u16) -> Option<u8> {
    match u16::from(base).checked_add(chid) {
        Some(addr) if addr <= 127 => Some(addr as u8),
        _ => {
            trace!("Control address {} + {} exceeds 127, skipping", base, chid);
            None
        }
    }
}

fn mute_message(channel: u8, note: u8, on: bool) -> MidiMessage {
    if on {
        MidiMessage::NoteOn { channel, note, velocity: 127 }
    } else {
        MidiMessage::NoteOff { channel, note, velocity: 0 }
    }
}

/// Messages for one applied channel delta
///
/// Name and visibility changes produce nothing.
pub fn translate(bus: usize, chid: u16, update: &ChannelUpdate) -> Vec<MidiMessage> {
    let channel = hardware_channel(bus);
    let mut out = Vec::with_capacity(3);

    if let Some(fader) = update.fader {
        if let Some(cc) = address(FADER_BASE, chid) {
            out.push(MidiMessage::ControlChange {
                channel,
                cc,
                value: convert::percent_to_7bit(fader as i32),
            });
        }
    }

    if let Some(pan) = update.pan {
        if let Some(cc) = address(PAN_BASE, chid) {
            out.push(MidiMessage::ControlChange {
                channel,
                cc,
                value: convert::percent_to_7bit(pan as i32),
            });
        }
    }

    if let Some(muted) = update.muted {
        if let Some(note) = address(MUTE_BASE, chid) {
            out.push(mute_message(channel, note, muted));
        }
    }

    out
}

/// Raw control request that bypasses the mixer state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectControl {
    /// Raw 7-bit fader value on address offset `channel`
    Fader { bus: usize, channel: u16, value: u8 },
    /// Raw 7-bit pan value on address offset `channel`
    Pan { bus: usize, channel: u16, value: u8 },
    Mute { bus: usize, channel: u16, on: bool },
}

/// Message for a direct control request
pub fn translate_direct(control: &DirectControl) -> Option<MidiMessage> {
    match *control {
        DirectControl::Fader { bus, channel, value } => {
            address(FADER_BASE, channel).map(|cc| MidiMessage::ControlChange {
                channel: hardware_channel(bus),
                cc,
                value: value.min(127),
            })
        }
        DirectControl::Pan { bus, channel, value } => {
            address(PAN_BASE, channel).map(|cc| MidiMessage::ControlChange {
                channel: hardware_channel(bus),
                cc,
                value: value.min(127),
            })
        }
        DirectControl::Mute { bus, channel, on } => address(MUTE_BASE, channel)
            .map(|note| mute_message(hardware_channel(bus), note, on)),
    }
}

/// Emits translated messages to the output port
///
/// With an unavailable port every call is a no-op.
pub struct ControlTranslator {
    port: OutputPort,
}

impl ControlTranslator {
    pub fn new(port: OutputPort) -> Self {
        if !port.is_available() {
            debug!("Control translator inert: no output port");
        }
        Self { port }
    }

    /// Translator with no output port
    pub fn inert() -> Self {
        Self::new(OutputPort::Unavailable)
    }

    pub fn is_active(&self) -> bool {
        self.port.is_available()
    }

    pub fn emit_update(&mut self, bus: usize, chid: u16, update: &ChannelUpdate) {
        if !self.is_active() {
            return;
        }
        for message in translate(bus, chid, update) {
            self.port.send(&message);
        }
    }

    pub fn emit_direct(&mut self, control: &DirectControl) {
        if !self.is_active() {
            return;
        }
        if let Some(message) = translate_direct(control) {
            self.port.send(&message);
        }
    }

    pub fn close(&mut self) {
        self.port.close();
    }
}
