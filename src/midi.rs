//! MIDI utilities and message types
//!
//! Provides the subset of MIDI channel messages the bridge emits, their
//! wire encoding, and the percent to 7-bit value conversion.

use std::fmt;

/// MIDI message types emitted by the bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiMessage {
    /// Note Off: channel (0-15), note (0-127), velocity (0-127)
    NoteOff { channel: u8, note: u8, velocity: u8 },

    /// Note On: channel (0-15), note (0-127), velocity (0-127)
    NoteOn { channel: u8, note: u8, velocity: u8 },

    /// Control Change: channel (0-15), cc (0-127), value (0-127)
    ControlChange { channel: u8, cc: u8, value: u8 },
}

impl MidiMessage {
    /// Encode the message to MIDI bytes
    pub fn encode(&self) -> [u8; 3] {
        match *self {
            MidiMessage::NoteOff { channel, note, velocity } => {
                [0x80 | (channel & 0x0F), note & 0x7F, velocity & 0x7F]
            }
            MidiMessage::NoteOn { channel, note, velocity } => {
                [0x90 | (channel & 0x0F), note & 0x7F, velocity & 0x7F]
            }
            MidiMessage::ControlChange { channel, cc, value } => {
                [0xB0 | (channel & 0x0F), cc & 0x7F, value & 0x7F]
            }
        }
    }
}

impl fmt::Display for MidiMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            MidiMessage::NoteOff { channel, note, velocity } => {
                write!(f, "NoteOff ch:{} n:{} v:{}", channel + 1, note, velocity)
            }
            MidiMessage::NoteOn { channel, note, velocity } => {
                write!(f, "NoteOn ch:{} n:{} v:{}", channel + 1, note, velocity)
            }
            MidiMessage::ControlChange { channel, cc, value } => {
                write!(f, "CC ch:{} cc:{} v:{}", channel + 1, cc, value)
            }
        }
    }
}

/// MIDI value conversion utilities
pub mod convert {
    /// Convert a percentage (0-100) to a 7-bit value (0-127)
    ///
    /// Rounds half up: `round(v * 127 / 100)`. Inputs outside 0-100 are
    /// clamped first.
    pub fn percent_to_7bit(percent: i32) -> u8 {
        let v = percent.clamp(0, 100);
        ((v * 127 + 50) / 100).min(127) as u8
    }

    /// Clamp an arbitrary integer into the 7-bit range
    pub fn clamp_7bit(value: i64) -> u8 {
        value.clamp(0, 127) as u8
    }
}

/// Format MIDI bytes as hex string for debugging
pub fn format_hex(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_encode_control_change() {
        let msg = MidiMessage::ControlChange {
            channel: 2,
            cc: 21,
            value: 100,
        };
        assert_eq!(msg.encode(), [0xB2, 21, 100]);
    }

    #[test]
    fn test_encode_note_off_keeps_kind() {
        let msg = MidiMessage::NoteOff {
            channel: 0,
            note: 60,
            velocity: 0,
        };
        assert_eq!(msg.encode(), [0x80, 60, 0]);
    }

    #[test]
    fn test_percent_to_7bit_anchors() {
        assert_eq!(convert::percent_to_7bit(0), 0);
        assert_eq!(convert::percent_to_7bit(100), 127);
        assert_eq!(convert::percent_to_7bit(50), 64);
    }

    #[test]
    fn test_percent_to_7bit_rounding() {
        // 1.27 -> 1, 12.7 -> 13, 125.73 -> 126
        assert_eq!(convert::percent_to_7bit(1), 1);
        assert_eq!(convert::percent_to_7bit(10), 13);
        assert_eq!(convert::percent_to_7bit(99), 126);
        // 63.5 is the only exact midpoint; it rounds up
        assert_eq!(convert::percent_to_7bit(50), 64);
    }

    #[test]
    fn test_percent_to_7bit_clamps() {
        assert_eq!(convert::percent_to_7bit(-20), 0);
        assert_eq!(convert::percent_to_7bit(250), 127);
    }

    #[test]
    fn test_format_hex() {
        assert_eq!(format_hex(&[0xB0, 0x14, 0x7F]), "B0 14 7F");
    }

    proptest! {
        #[test]
        fn prop_percent_to_7bit_matches_rounding(v in 0i32..=100) {
            let expected = (v as f64 * 127.0 / 100.0).round() as u8;
            prop_assert_eq!(convert::percent_to_7bit(v), expected);
        }

        #[test]
        fn prop_percent_to_7bit_is_monotonic(a in 0i32..=100, b in 0i32..=100) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(convert::percent_to_7bit(lo) <= convert::percent_to_7bit(hi));
        }
    }
}
