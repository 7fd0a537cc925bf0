//! Channel topology extraction from session-export documents
//!
//! Turns a session-export tree into the ordered channel layout shared by
//! all four buses: raw input channels are filtered, sorted, grouped into
//! stereo pairs and assigned control-protocol base addresses (chids).

mod document;
mod extract;

pub use document::SessionNode;
pub use extract::{
    assign_addresses, extract, extract_from_path, group_stereo, ExtractRules,
};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw input channel read from the session export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    /// Relative position index within the mixer node
    pub index: i64,
    pub name: String,
    pub stereo: bool,
    /// Explicit display name for the stereo pair, if any
    pub stereo_name: Option<String>,
}

/// Channel after stereo grouping, before address assignment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalChannel {
    pub name: String,
    pub stereo: bool,
}

impl LogicalChannel {
    pub fn mono(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stereo: false,
        }
    }

    pub fn stereo(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stereo: true,
        }
    }
}

/// Channel with its control-protocol base address
///
/// Stereo entries reserve `chid` and `chid + 1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressedChannel {
    pub chid: u16,
    pub name: String,
    pub stereo: bool,
}

/// Build a layout of `count` generic mono channels named `CH 1`..`CH n`
pub fn generic_layout(count: usize) -> Vec<AddressedChannel> {
    let logical: Vec<LogicalChannel> = (1..=count)
        .map(|i| LogicalChannel::mono(format!("CH {}", i)))
        .collect();
    assign_addresses(&logical)
}

/// Topology extraction failures
///
/// None of these are fatal to the running service; a one-shot extraction
/// reports them to the operator.
#[derive(Debug, thiserror::Error)]
pub enum TopologyError {
    #[error("failed to read session export {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed session export: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("no '{0}' node found in session export")]
    MissingMixer(String),

    #[error("no routable input channels left after filtering")]
    Empty,
}
