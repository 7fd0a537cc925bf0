//! Application path management for portable and installed modes.
//!
//! - **Portable mode**: a `.portable` marker file next to the executable
//!   keeps config and presets in that directory.
//! - **Installed mode** (default): data lives in the platform data
//!   directory under `CueMix GW`.

use anyhow::Context;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Application name used for directories in installed mode
const APP_NAME: &str = "CueMix GW";

/// Application paths for config and presets.
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Path to the configuration file
    pub config: PathBuf,
    /// Path to the preset database directory
    pub presets_db: PathBuf,
    pub is_portable: bool,
}

impl AppPaths {
    /// Detect the appropriate paths based on environment.
    ///
    /// Called before logging is initialized, so nothing here logs.
    pub fn detect() -> Self {
        let exe_dir = std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
            .unwrap_or_else(|| PathBuf::from("."));

        if exe_dir.join(".portable").exists() {
            Self::rooted_at(&exe_dir, true)
        } else {
            let data_dir = dirs::data_dir().unwrap_or(exe_dir).join(APP_NAME);
            Self::rooted_at(&data_dir, false)
        }
    }

    /// Layout of every path under one base directory
    pub fn rooted_at(base: &Path, is_portable: bool) -> Self {
        Self {
            config: base.join("config.yaml"),
            presets_db: base.join("presets"),
            is_portable,
        }
    }

    /// Get the base directory (for displaying in logs)
    pub fn base_dir(&self) -> PathBuf {
        self.config
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Ensure the base directory exists.
    pub fn ensure_directories(&self) -> anyhow::Result<()> {
        let dir = self.base_dir();
        if !dir.exists() {
            debug!("Creating data directory: {}", dir.display());
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }
        Ok(())
    }
}
