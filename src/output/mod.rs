//! Control-surface output: port handle and delta translation

mod port;
mod translator;

pub use port::{find_port_index, list_output_ports, MidiSink, OutputPort};
pub use translator::{
    hardware_channel, translate, translate_direct, ControlTranslator, DirectControl, FADER_BASE,
    MAX_FULL_CHID, MUTE_BASE, PAN_BASE,
};
