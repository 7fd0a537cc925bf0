//! Named snapshots of the full mixer state
//!
//! Backed by an embedded sled database; each record is the JSON text of
//! the 4-bus array, keyed by preset name.

mod store;

pub use store::PresetStore;

use std::path::PathBuf;

/// Preset storage failures
#[derive(Debug, thiserror::Error)]
pub enum PresetError {
    #[error("preset name cannot be empty")]
    EmptyName,

    #[error("preset '{0}' not found")]
    NotFound(String),

    #[error("preset '{name}' is corrupt: {source}")]
    Parse {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("preset storage error: {0}")]
    Storage(#[from] sled::Error),

    #[error("failed to access preset file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode presets: {0}")]
    Encode(#[from] serde_json::Error),
}
