//! Hardware output port handle
//!
//! Wraps a midir output connection behind the [`MidiSink`] seam. A port
//! that could not be opened is the typed `Unavailable` state rather than
//! an error.

use anyhow::{anyhow, Context, Result};
use midir::{MidiOutput, MidiOutputConnection, MidiOutputPort};
use tracing::{debug, info, warn};

use crate::midi::{format_hex, MidiMessage};

/// Destination for encoded MIDI bytes
pub trait MidiSink: Send {
    fn send(&mut self, data: &[u8]) -> Result<()>;

    fn name(&self) -> &str;
}

/// midir-backed sink
struct MidirSink {
    conn: MidiOutputConnection,
    name: String,
}

impl MidiSink for MidirSink {
    fn send(&mut self, data: &[u8]) -> Result<()> {
        self.conn
            .send(data)
            .map_err(|e| anyhow!("Failed to send MIDI to '{}': {}", self.name, e))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Output port with an explicit open/close lifecycle
pub enum OutputPort {
    Open(Box<dyn MidiSink>),
    Unavailable,
}

impl OutputPort {
    /// Open the first output port whose name contains `pattern`
    /// (case-insensitive), or the first port at all when
    /// `fallback_to_first` is set. Yields `Unavailable` when nothing fits.
    pub fn open(pattern: &str, fallback_to_first: bool) -> Self {
        match connect(pattern, fallback_to_first) {
            Ok(Some(sink)) => {
                info!("MIDI output port open: {}", sink.name);
                OutputPort::Open(Box::new(sink))
            }
            Ok(None) => {
                warn!("No MIDI output port available, control output disabled");
                OutputPort::Unavailable
            }
            Err(e) => {
                warn!("Failed to open MIDI output ({}), control output disabled", e);
                OutputPort::Unavailable
            }
        }
    }

    /// Wrap an already-open sink
    pub fn from_sink(sink: Box<dyn MidiSink>) -> Self {
        OutputPort::Open(sink)
    }

    pub fn is_available(&self) -> bool {
        matches!(self, OutputPort::Open(_))
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            OutputPort::Open(sink) => Some(sink.name()),
            OutputPort::Unavailable => None,
        }
    }

    /// Best-effort send; failures are logged and dropped
    pub fn send(&mut self, message: &MidiMessage) {
        let OutputPort::Open(sink) = self else {
            return;
        };

        let data = message.encode();
        match sink.send(&data) {
            Ok(()) => debug!("Sent: {} | {}", format_hex(&data), message),
            Err(e) => warn!("{}", e),
        }
    }

    /// Release the connection
    pub fn close(&mut self) {
        if let OutputPort::Open(sink) = self {
            info!("Closing MIDI output port: {}", sink.name());
        }
        *self = OutputPort::Unavailable;
    }
}

fn connect(pattern: &str, fallback_to_first: bool) -> Result<Option<MidirSink>> {
    let midi_out = MidiOutput::new("CueMix-GW-Output").context("Failed to create MIDI output")?;

    let Some((port, name)) = select_port(&midi_out, pattern, fallback_to_first) else {
        return Ok(None);
    };

    let conn = midi_out
        .connect(&port, "cuemix-gw")
        .map_err(|e| anyhow!("Failed to connect to output port '{}': {}", name, e))?;

    Ok(Some(MidirSink { conn, name }))
}

fn select_port(
    midi_out: &MidiOutput,
    pattern: &str,
    fallback_to_first: bool,
) -> Option<(MidiOutputPort, String)> {
    let ports: Vec<(MidiOutputPort, String)> = midi_out
        .ports()
        .into_iter()
        .filter_map(|p| midi_out.port_name(&p).ok().map(|n| (p, n)))
        .collect();

    let index = match find_port_index(ports.iter().map(|(_, n)| n.as_str()), pattern) {
        Some(i) => i,
        None if fallback_to_first && !ports.is_empty() => {
            warn!(
                "Output port '{}' not found, using first available: {}",
                pattern, ports[0].1
            );
            0
        }
        None => return None,
    };

    ports.into_iter().nth(index)
}

/// Index of the first name containing `pattern` (case-insensitive)
pub fn find_port_index<'a>(names: impl Iterator<Item = &'a str>, pattern: &str) -> Option<usize> {
    let pattern = pattern.to_lowercase();
    names
        .enumerate()
        .find(|(_, name)| name.to_lowercase().contains(&pattern))
        .map(|(i, _)| i)
}

/// List available MIDI output ports
pub fn list_output_ports() -> Result<Vec<String>> {
    let midi_out = MidiOutput::new("CueMix-GW-Scanner")?;

    let mut port_names = Vec::new();
    for port in midi_out.ports() {
        if let Ok(name) = midi_out.port_name(&port) {
            port_names.push(name);
        }
    }

    Ok(port_names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    struct FailingSink;

    impl MidiSink for FailingSink {
        fn send(&mut self, _data: &[u8]) -> Result<()> {
            Err(anyhow!("device unplugged"))
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    struct VecSink(Arc<Mutex<Vec<Vec<u8>>>>);

    impl MidiSink for VecSink {
        fn send(&mut self, data: &[u8]) -> Result<()> {
            self.0.lock().unwrap().push(data.to_vec());
            Ok(())
        }

        fn name(&self) -> &str {
            "vec"
        }
    }

    #[test]
    fn test_find_port_index_case_insensitive() {
        let names = ["Midi Through", "IAC Driver Bus 1", "IAC Driver Bus 2"];
        assert_eq!(find_port_index(names.iter().copied(), "iac"), Some(1));
        assert_eq!(find_port_index(names.iter().copied(), "loopMIDI"), None);
    }

    #[test]
    fn test_send_failure_is_absorbed() {
        let mut port = OutputPort::from_sink(Box::new(FailingSink));
        port.send(&MidiMessage::ControlChange { channel: 0, cc: 20, value: 1 });
        assert!(port.is_available());
    }

    #[test]
    fn test_close_makes_port_inert() {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let mut port = OutputPort::from_sink(Box::new(VecSink(sent.clone())));
        assert_eq!(port.name(), Some("vec"));

        port.send(&MidiMessage::NoteOn { channel: 1, note: 60, velocity: 127 });
        port.close();
        port.send(&MidiMessage::NoteOn { channel: 1, note: 60, velocity: 127 });

        assert!(!port.is_available());
        assert_eq!(sent.lock().unwrap().as_slice(), &[vec![0x91, 60, 127]]);
    }
}
