//! CommConsole Settings Crate
//!
//! Loads, validates, and persists console configuration.

pub mod config;
pub mod error;

pub use config::{
    ConsoleConfig, ConsoleSettings, LoggingSettings, SerialSettings, CONFIG_DIR_NAME,
    CONFIG_FILE_NAME,
};
pub use error::{SettingsError, SettingsResult};
