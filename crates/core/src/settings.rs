//! User settings persistence.
//!
//! Preferences survive between runs as JSON in the user's config directory
//! (e.g., `~/.config/restyle/settings.json` on Linux) and are layered on top
//! of the environment configuration.

use crate::config::Config;
use crate::error::Result;
use crate::style::StyleId;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// User-configurable settings persisted between sessions.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Style applied when none is given explicitly.
    #[serde(default)]
    pub default_style: Option<StyleId>,
    /// Endpoint override (takes precedence over environment).
    #[serde(default)]
    pub endpoint_url: Option<String>,
    /// Upload re-encode quality override.
    #[serde(default)]
    pub upload_quality: Option<u8>,
}

impl Settings {
    /// Returns the path to the settings file.
    pub fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "restyle", "restyle")
            .map(|dirs| dirs.config_dir().join("settings.json"))
    }

    /// Loads settings from disk, falling back to defaults if not found.
    pub fn load() -> Self {
        Self::config_path()
            .map(|path| Self::load_from(&path))
            .unwrap_or_default()
    }

    /// Loads settings from a specific file, falling back to defaults.
    pub fn load_from(path: &Path) -> Self {
        fs::read_to_string(path)
            .ok()
            .and_then(|content| serde_json::from_str(&content).ok())
            .unwrap_or_default()
    }

    /// Persists settings to disk.
    ///
    /// # Errors
    /// Returns an error if serialization or file writing fails.
    pub fn save(&self) -> Result<()> {
        if let Some(path) = Self::config_path() {
            self.save_to(&path)?;
        }
        Ok(())
    }

    /// Persists settings to a specific file, creating its directory.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Layers these settings over `config`, re-validating overridden values.
    ///
    /// # Errors
    /// Returns [`AppError::Config`](crate::AppError::Config) if an override is
    /// invalid.
    pub fn apply_to(&self, config: &Config) -> Result<Config> {
        let mut builder = Config::builder()
            .with_endpoint(self.endpoint_url.as_deref().unwrap_or(config.endpoint_url.as_str()))
            .with_image_field(&config.image_field_name)
            .with_style_field(&config.style_field_name)
            .with_abort_superseded(config.abort_superseded);
        if let Some(timeout) = config.timeout {
            builder = builder.with_timeout(timeout);
        }
        if let Some(quality) = self.upload_quality.or(config.upload_quality) {
            builder = builder.with_upload_quality(quality);
        }
        builder.build()
    }
}
