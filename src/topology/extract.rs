//! Extraction pipeline: filter, sort, stereo grouping, address assignment

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, warn};

use super::document::SessionNode;
use super::{AddressedChannel, Channel, LogicalChannel, TopologyError};

/// Node types, property keys and filters used to read a session export
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ExtractRules {
    pub mixer_type: String,
    pub input_type: String,
    pub name_key: String,
    pub stereo_name_key: String,
    pub io_type_key: String,
    pub stereo_key: String,
    /// I/O classifiers of non-routable virtual/system I/O (case-insensitive)
    pub ignore_io_types: Vec<String>,
    /// Name prefix reserved for virtual channels (case-insensitive)
    pub virtual_prefix: String,
    /// Digital-interconnect marker; matching channels are dropped after
    /// addressing (case-insensitive substring)
    pub interconnect_marker: String,
}

impl Default for ExtractRules {
    fn default() -> Self {
        Self {
            mixer_type: "Mixer".to_string(),
            input_type: "Input".to_string(),
            name_key: "name".to_string(),
            stereo_name_key: "stereoName".to_string(),
            io_type_key: "ioType".to_string(),
            stereo_key: "stereo".to_string(),
            ignore_io_types: vec![
                "Virtual".to_string(),
                "System".to_string(),
                "Loopback".to_string(),
            ],
            virtual_prefix: "VIRT".to_string(),
            interconnect_marker: "ADAT".to_string(),
        }
    }
}

impl ExtractRules {
    fn is_ignored_io(&self, io_type: Option<&str>) -> bool {
        io_type.is_some_and(|io| {
            self.ignore_io_types
                .iter()
                .any(|ignored| ignored.eq_ignore_ascii_case(io))
        })
    }

    fn is_virtual_name(&self, name: &str) -> bool {
        !self.virtual_prefix.is_empty()
            && name
                .to_lowercase()
                .starts_with(&self.virtual_prefix.to_lowercase())
    }

    fn is_interconnect(&self, name: &str) -> bool {
        !self.interconnect_marker.is_empty()
            && name
                .to_lowercase()
                .contains(&self.interconnect_marker.to_lowercase())
    }

    /// Read one input node, or `None` if it is not a routable channel
    fn read_channel(&self, node: &SessionNode) -> Option<Channel> {
        let Some(name) = node.text(&self.name_key) else {
            debug!("Skipping unnamed input node");
            return None;
        };
        let io_type = node.text(&self.io_type_key);

        if self.is_ignored_io(io_type.as_deref()) {
            debug!("Skipping '{}': ignored I/O type {:?}", name, io_type);
            return None;
        }
        if self.is_virtual_name(&name) {
            debug!("Skipping '{}': reserved virtual channel", name);
            return None;
        }
        let Some(index) = node.position_index() else {
            debug!("Skipping '{}': position {:?} is not an integer", name, node.position);
            return None;
        };

        Some(Channel {
            index,
            stereo: node.flag(&self.stereo_key),
            stereo_name: node.text(&self.stereo_name_key),
            name,
        })
    }
}

/// Merge adjacent stereo-flagged channels into pairs
///
/// Only two neighbours ever merge; a stereo-flagged channel without a
/// stereo-flagged successor stays mono.
pub fn group_stereo(channels: &[Channel]) -> Vec<LogicalChannel> {
    let mut out = Vec::with_capacity(channels.len());
    let mut i = 0;

    while i < channels.len() {
        let current = &channels[i];
        match channels.get(i + 1) {
            Some(next) if current.stereo && next.stereo => {
                let name = current
                    .stereo_name
                    .clone()
                    .unwrap_or_else(|| format!("{} LR", current.name));
                out.push(LogicalChannel::stereo(name));
                i += 2;
            }
            _ => {
                out.push(LogicalChannel::mono(current.name.clone()));
                i += 1;
            }
        }
    }

    out
}

/// Assign base addresses: +2 after a stereo entry, +1 after mono
pub fn assign_addresses(channels: &[LogicalChannel]) -> Vec<AddressedChannel> {
    let mut chid: u16 = 0;
    channels
        .iter()
        .map(|c| {
            let addressed = AddressedChannel {
                chid,
                name: c.name.clone(),
                stereo: c.stereo,
            };
            chid = chid.saturating_add(if c.stereo { 2 } else { 1 });
            addressed
        })
        .collect()
}

/// Extract the addressed channel layout from a parsed session export
pub fn extract(
    root: &SessionNode,
    rules: &ExtractRules,
) -> Result<Vec<AddressedChannel>, TopologyError> {
    let mut mixers = Vec::new();
    root.find_all(&rules.mixer_type, &mut mixers);

    let mixer = match mixers.as_slice() {
        [] => return Err(TopologyError::MissingMixer(rules.mixer_type.clone())),
        [only] => *only,
        [first, ..] => {
            warn!(
                "Session export has {} '{}' nodes, using the first",
                mixers.len(),
                rules.mixer_type
            );
            *first
        }
    };

    let mut channels: Vec<Channel> = mixer
        .children_of_type(&rules.input_type)
        .filter_map(|node| rules.read_channel(node))
        .collect();
    channels.sort_by_key(|c| c.index);

    let addressed: Vec<AddressedChannel> = assign_addresses(&group_stereo(&channels))
        .into_iter()
        .filter(|c| {
            let keep = !rules.is_interconnect(&c.name);
            if !keep {
                debug!("Dropping '{}' (chid {}): digital interconnect", c.name, c.chid);
            }
            keep
        })
        .collect();

    if addressed.is_empty() {
        return Err(TopologyError::Empty);
    }

    info!(
        "Extracted {} channels ({} stereo) from session export",
        addressed.len(),
        addressed.iter().filter(|c| c.stereo).count()
    );
    Ok(addressed)
}

/// Read and extract a session export file
pub fn extract_from_path(
    path: impl AsRef<Path>,
    rules: &ExtractRules,
) -> Result<Vec<AddressedChannel>, TopologyError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| TopologyError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let root = SessionNode::from_json(&text)?;
    extract(&root, rules)
}
