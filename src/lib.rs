//! CueMix GW - multi-client monitor mixer gateway
//!
//! Keeps one canonical monitor-mix state, synchronizes it across web
//! clients over WebSocket, persists named presets, and mirrors every edit
//! to a MIDI output port as fader/pan/mute controls.

pub mod api;
pub mod config;
pub mod midi;
pub mod mixer;
pub mod output;
pub mod paths;
pub mod presets;
pub mod sync;
pub mod topology;
