//! Configuration management.
//!
//! This module provides:
//! - TOML-based configuration with logical sections
//! - Atomic file writes (write to temp, then rename)
//! - Section-level updates (only changed section is modified)
//! - Repair of incomplete files on load
//!
//! # Example
//!
//! ```no_run
//! use amp_core::config::{ConfigManager, ConfigSection};
//!
//! let mut config = ConfigManager::new(".config/amp.toml");
//! config.load_or_create().unwrap();
//!
//! println!("Chunk length: {}s", config.settings().processing.chunk_duration_secs);
//!
//! config.settings_mut().logging.compact = false;
//! config.update_section(ConfigSection::Logging).unwrap();
//! ```

mod manager;
mod settings;

pub use manager::{ConfigError, ConfigManager, ConfigResult};
pub use settings::{
    ConfigSection, JobDefaults, LoggingSettings, PathSettings, ProcessingSettings, QueueSettings,
    Settings, ToolSettings,
};
