//! Configuration file handling for CommConsole
//!
//! Configuration is organized into sections:
//! - Serial settings (last used port, line parameters)
//! - Console behaviour (poll cadence, send spacing, buffer cap)
//! - Logging
//!
//! Files are JSON or TOML, chosen by extension.

use crate::error::{SettingsError, SettingsResult};
use commconsole_communication::{ManagerConfig, DEFAULT_HARDWARE_ID};
use commconsole_core::LineConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Directory under the platform config dir holding our files
pub const CONFIG_DIR_NAME: &str = "commconsole";

/// Default configuration file name
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Serial settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerialSettings {
    /// Last port a connection was opened on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_port: Option<String>,
    /// Line parameters used when opening
    #[serde(default)]
    pub line: LineConfig,
}

/// Console behaviour
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleSettings {
    /// Receive poll cadence in milliseconds
    pub poll_interval_ms: u64,
    /// Spacing between batch items in milliseconds
    pub send_spacing_ms: u64,
    /// Lower bound applied to batch spacing in milliseconds
    pub min_send_spacing_ms: u64,
    /// Appended to every sent line
    pub line_terminator: String,
    /// Per-session character cap
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_buffer_chars: Option<usize>,
    /// Hardware id used to pick a port automatically
    pub hardware_id: String,
}

impl Default for ConsoleSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 100,
            send_spacing_ms: 300,
            min_send_spacing_ms: 50,
            line_terminator: "\n".to_string(),
            max_buffer_chars: None,
            hardware_id: DEFAULT_HARDWARE_ID.to_string(),
        }
    }
}

impl ConsoleSettings {
    /// Receive poll cadence
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Spacing between batch items
    pub fn send_spacing(&self) -> Duration {
        Duration::from_millis(self.send_spacing_ms)
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Filter directive (`RUST_LOG` takes precedence)
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Complete application configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleConfig {
    /// Serial settings
    #[serde(default)]
    pub serial: SerialSettings,
    /// Console behaviour
    #[serde(default)]
    pub console: ConsoleSettings,
    /// Logging settings
    #[serde(default)]
    pub logging: LoggingSettings,
}

enum Format {
    Json,
    Toml,
}

fn format_of(path: &Path) -> Option<Format> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => Some(Format::Json),
        Some("toml") => Some(Format::Toml),
        _ => None,
    }
}

impl ConsoleConfig {
    /// Create new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Default config file location (`<config dir>/commconsole/config.toml`)
    pub fn default_path() -> SettingsResult<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
            .ok_or_else(|| {
                SettingsError::ConfigDirectory("platform config directory not found".to_string())
            })
    }

    /// Load config from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        let format = format_of(path).ok_or_else(|| {
            SettingsError::Load(format!(
                "{}: config file must be .json or .toml",
                path.display()
            ))
        })?;
        let content = std::fs::read_to_string(path)?;

        let config: Self = match format {
            Format::Json => serde_json::from_str(&content)?,
            Format::Toml => toml::from_str(&content)?,
        };

        config.validate()?;
        tracing::debug!("Loaded settings from {}", path.display());
        Ok(config)
    }

    /// Load config from `path`, falling back to defaults when it does not exist
    ///
    /// A file that exists but cannot be parsed or validated is an error.
    pub fn load_or_default(path: &Path) -> SettingsResult<Self> {
        if !path.exists() {
            tracing::debug!("No settings at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load_from_file(path)
    }

    /// Save config to file (JSON or TOML), creating the parent directory
    pub fn save_to_file(&self, path: &Path) -> SettingsResult<()> {
        self.validate()?;

        let content = match format_of(path) {
            Some(Format::Json) => serde_json::to_string_pretty(self)?,
            Some(Format::Toml) => toml::to_string_pretty(self)?,
            None => {
                return Err(SettingsError::Save(format!(
                    "{}: config file must be .json or .toml",
                    path.display()
                )))
            }
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        tracing::debug!("Saved settings to {}", path.display());
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> SettingsResult<()> {
        if self.serial.line.baud_rate == 0 {
            return Err(SettingsError::invalid(
                "serial.line.baud_rate",
                "must be greater than 0",
            ));
        }

        let console = &self.console;
        if console.poll_interval_ms == 0 {
            return Err(SettingsError::invalid(
                "console.poll_interval_ms",
                "must be greater than 0",
            ));
        }
        if console.min_send_spacing_ms == 0 {
            return Err(SettingsError::invalid(
                "console.min_send_spacing_ms",
                "must be greater than 0",
            ));
        }
        if console.send_spacing_ms < console.min_send_spacing_ms {
            return Err(SettingsError::invalid(
                "console.send_spacing_ms",
                format!("must be at least {} ms", console.min_send_spacing_ms),
            ));
        }
        if console.line_terminator.is_empty() {
            return Err(SettingsError::invalid(
                "console.line_terminator",
                "must not be empty",
            ));
        }
        if console.max_buffer_chars == Some(0) {
            return Err(SettingsError::invalid(
                "console.max_buffer_chars",
                "must be greater than 0 when set",
            ));
        }

        Ok(())
    }

    /// Merge another config into this one
    ///
    /// Sections of `other` left at their defaults keep the values already here.
    pub fn merge(&mut self, other: &ConsoleConfig) {
        if other.serial.last_port.is_some() {
            self.serial.last_port = other.serial.last_port.clone();
        }
        if other.serial.line != LineConfig::default() {
            self.serial.line = other.serial.line;
        }
        if other.console != ConsoleSettings::default() {
            self.console = other.console.clone();
        }
        if other.logging != LoggingSettings::default() {
            self.logging = other.logging.clone();
        }
    }

    /// Session manager configuration derived from the console section
    pub fn manager_config(&self) -> ManagerConfig {
        ManagerConfig {
            line_terminator: self.console.line_terminator.clone(),
            min_send_spacing: Duration::from_millis(self.console.min_send_spacing_ms),
            max_buffer_chars: self.console.max_buffer_chars,
            ..ManagerConfig::default()
        }
    }
}
