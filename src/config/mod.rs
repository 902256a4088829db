//! Configuration management for the insets engine
//!
//! This module handles loading, parsing, and validating configuration
//! from TOML files. It selects how much of the insets machinery is live
//! (the insets mode) and how the engine logs.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Main configuration struct containing all engine settings
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct EngineConfig {
    /// Insets control settings
    #[serde(default)]
    pub insets: InsetsConfig,

    /// General settings
    #[serde(default)]
    pub general: GeneralConfig,
}

/// How far clients are allowed to control inset sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum InsetsMode {
    /// No source is controllable; clients always see sources as requested-visible.
    None,
    /// Only the IME source is controllable.
    Ime,
    /// System bars and the IME are controllable.
    #[default]
    Full,
}

impl InsetsMode {
    /// Whether the provider of `inset_type` may hand out control in this mode.
    pub fn allows_control(self, inset_type: crate::types::InsetType) -> bool {
        if inset_type.is_system_bar() {
            self == InsetsMode::Full
        } else if inset_type == crate::types::InsetType::Ime {
            self >= InsetsMode::Ime
        } else {
            false
        }
    }
}

/// Insets control configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct InsetsConfig {
    /// Controllability mode ("none", "ime", "full")
    pub mode: InsetsMode,

    /// Keep the IME leash owned by a built-in target when no window is the
    /// IME target, so the keyboard never shows unowned. Has no effect in
    /// `none` mode, where nothing owns the IME leash.
    pub ime_fallback_target: bool,
}

/// General settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GeneralConfig {
    /// Enable debug logging
    pub debug: bool,

    /// env_logger filter directive; overrides `debug` when non-empty
    pub log_filter: String,
}

impl Default for InsetsConfig {
    fn default() -> Self {
        Self {
            mode: InsetsMode::Full,
            ime_fallback_target: true,
        }
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            debug: false,
            log_filter: String::new(),
        }
    }
}

/// Reasons a parsed configuration is rejected
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("log_filter contains whitespace: {0:?}")]
    InvalidLogFilter(String),
}

impl EngineConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        // Expand ~ to home directory
        let expanded_path = if path.to_string_lossy().starts_with('~') {
            let home = std::env::var("HOME").context("Failed to get HOME environment variable")?;
            Path::new(&home).join(path.strip_prefix("~").unwrap_or(path))
        } else {
            path.to_path_buf()
        };

        let contents = fs::read_to_string(&expanded_path)
            .with_context(|| format!("Failed to read config file: {}", expanded_path.display()))?;

        let config: EngineConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", expanded_path.display()))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.general.log_filter.chars().any(char::is_whitespace) {
            return Err(ConfigError::InvalidLogFilter(self.general.log_filter.clone()));
        }

        Ok(())
    }

    /// Save configuration to a TOML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        fs::write(path, contents).context("Failed to write configuration file")?;

        Ok(())
    }

    /// Merge a partial configuration into this one
    /// Non-default sections from the partial config override this config
    pub fn merge_partial(mut self, partial: EngineConfig) -> Self {
        let default_config = EngineConfig::default();

        if partial.insets != default_config.insets {
            self.insets = partial.insets;
        }
        if partial.general != default_config.general {
            self.general = partial.general;
        }

        self
    }
}
