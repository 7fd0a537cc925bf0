//! Configuration management for CueMix GW
//!
//! Handles loading, parsing and validation of the YAML configuration file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::sync::MAX_CHANNELS;
use crate::topology::ExtractRules;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub midi: MidiConfig,
    pub mixer: MixerConfig,
    pub presets: PresetsConfig,
    pub topology: TopologyConfig,
    pub logging: LoggingConfig,
}

/// HTTP / WebSocket listener
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Directory with the built web console, served at `/`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub static_dir: Option<PathBuf>,
}

/// MIDI output port selection
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct MidiConfig {
    /// Substring matched case-insensitively against output port names
    #[serde(default = "default_output_port")]
    pub output_port: String,
    /// Use the first available port when none matches
    #[serde(default = "default_true")]
    pub fallback_to_first: bool,
}

/// Mixer defaults
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct MixerConfig {
    #[serde(default = "default_fader")]
    pub default_fader: u8,
    #[serde(default = "default_channel_count")]
    pub default_channel_count: usize,
}

/// Preset database location
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct PresetsConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_path: Option<PathBuf>,
}

/// Session-export source and extraction rules
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct TopologyConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_file: Option<PathBuf>,
    #[serde(flatten)]
    pub rules: ExtractRules,
}

/// Optional file logging
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct LoggingConfig {
    /// Directory for daily-rolling log files
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_dir: None,
        }
    }
}

impl Default for MidiConfig {
    fn default() -> Self {
        Self {
            output_port: default_output_port(),
            fallback_to_first: true,
        }
    }
}

impl Default for MixerConfig {
    fn default() -> Self {
        Self {
            default_fader: default_fader(),
            default_channel_count: default_channel_count(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file with validation
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_yaml(&contents)
            .with_context(|| format!("Invalid config file: {}", path.display()))
    }

    /// Load configuration if the file exists; `None` means use defaults
    pub async fn load_optional(path: impl AsRef<Path>) -> Result<Option<Self>> {
        let path = path.as_ref();
        if !fs::try_exists(path).await.unwrap_or(false) {
            return Ok(None);
        }
        Self::load(path).await.map(Some)
    }

    /// Parse and validate YAML text
    pub fn from_yaml(contents: &str) -> Result<Self> {
        let config: AppConfig =
            serde_yaml::from_str(contents).context("Failed to parse YAML config")?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration for correctness and consistency
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("server.port cannot be 0");
        }
        if self.mixer.default_fader > 100 {
            anyhow::bail!(
                "mixer.default_fader {} is invalid (must be 0-100)",
                self.mixer.default_fader
            );
        }
        if self.mixer.default_channel_count == 0 || self.mixer.default_channel_count > MAX_CHANNELS {
            anyhow::bail!(
                "mixer.default_channel_count {} is invalid (must be 1-{})",
                self.mixer.default_channel_count,
                MAX_CHANNELS
            );
        }
        if self.topology.rules.mixer_type.is_empty() || self.topology.rules.input_type.is_empty() {
            anyhow::bail!("topology node types cannot be empty");
        }
        Ok(())
    }

    /// Socket address string for the listener
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 5050 }
fn default_output_port() -> String { "IAC".to_string() }
fn default_true() -> bool { true }
fn default_fader() -> u8 { 70 }
fn default_channel_count() -> usize { 8 }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_yaml_gives_defaults() {
        let config = AppConfig::from_yaml("{}").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.server.port, 5050);
        assert_eq!(config.midi.output_port, "IAC");
        assert!(config.midi.fallback_to_first);
        assert_eq!(config.mixer.default_fader, 70);
        assert_eq!(config.topology.rules, ExtractRules::default());
    }

    #[test]
    fn test_partial_sections() {
        let yaml = r#"
server:
  port: 8080
midi:
  output_port: "loopMIDI"
  fallback_to_first: false
topology:
  session_file: "show.json"
  interconnect_marker: "MADI"
  ignore_io_types: ["Virtual"]
"#;
        let config = AppConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.midi.output_port, "loopMIDI");
        assert!(!config.midi.fallback_to_first);
        assert_eq!(config.topology.session_file, Some(PathBuf::from("show.json")));
        assert_eq!(config.topology.rules.interconnect_marker, "MADI");
        assert_eq!(config.topology.rules.ignore_io_types, vec!["Virtual".to_string()]);
        assert_eq!(config.topology.rules.mixer_type, "Mixer");
        assert_eq!(config.bind_addr(), "0.0.0.0:8080");
    }

    #[test]
    fn test_validation_errors() {
        assert!(AppConfig::from_yaml("mixer:\n  default_fader: 101\n").is_err());
        assert!(AppConfig::from_yaml("mixer:\n  default_channel_count: 0\n").is_err());
        assert!(AppConfig::from_yaml("server:\n  port: 0\n").is_err());
        assert!(AppConfig::from_yaml("topology:\n  mixer_type: \"\"\n").is_err());
    }

    #[test]
    fn test_malformed_yaml() {
        assert!(AppConfig::from_yaml("server: [unclosed").is_err());
    }

    #[tokio::test]
    async fn test_load_optional_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load_optional(dir.path().join("absent.yaml"))
            .await
            .unwrap();
        assert!(config.is_none());
    }

    #[tokio::test]
    async fn test_load_optional_malformed_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "mixer: [").unwrap();
        assert!(AppConfig::load_optional(&path).await.is_err());
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "mixer:\n  default_fader: 0\n").unwrap();

        let config = AppConfig::load_optional(&path).await.unwrap().unwrap();
        assert_eq!(config.mixer.default_fader, 0);
    }
}
