//! Configuration file support.
//!
//! The engine and the `roiset` tool read their settings from a JSON file;
//! every field is optional and falls back to its default.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::codec::{ConnectionPolicy, XmlOptions};
use crate::error::RoiError;
use crate::model::MeasurementUnits;

/// Log level setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Show only errors
    Error,
    /// Show errors and warnings
    Warn,
    /// Show errors, warnings, and info messages
    #[default]
    Info,
    /// Show debug-level logging
    Debug,
    /// Show all log messages including trace
    Trace,
}

impl LogLevel {
    /// Convert to log crate's LevelFilter.
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Current configuration file format version.
/// Increment this when making breaking changes to the config format.
pub const CONFIG_VERSION: u32 = 1;

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Version of the configuration file format
    pub version: u32,

    /// Log verbosity of the command line tool
    #[serde(default)]
    pub log_level: LogLevel,

    /// File format settings
    #[serde(default)]
    pub xml: XmlConfig,

    /// Pixel sizes attached to every figure read
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<MeasurementUnits>,
}

/// File format section of the config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct XmlConfig {
    /// Spaces per indentation level when writing
    #[serde(default = "default_indent")]
    pub indent: usize,

    /// Resolution of line connection references
    #[serde(default)]
    pub connection_policy: ConnectionPolicy,
}

fn default_indent() -> usize {
    2
}

impl Default for XmlConfig {
    fn default() -> Self {
        Self {
            indent: default_indent(),
            connection_policy: ConnectionPolicy::default(),
        }
    }
}

impl EngineConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self {
            version: CONFIG_VERSION,
            log_level: LogLevel::default(),
            xml: XmlConfig::default(),
            units: None,
        }
    }

    /// Options for the XML codec.
    pub fn xml_options(&self) -> XmlOptions {
        XmlOptions {
            indent: self.xml.indent,
            connection_policy: self.xml.connection_policy,
            units: self.units.clone(),
        }
    }

    /// Serialize the configuration to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;

        if config.version > CONFIG_VERSION {
            return Err(ConfigError::VersionTooNew {
                file_version: config.version,
                supported_version: CONFIG_VERSION,
            });
        }

        Ok(config)
    }

    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json(&json)?;
        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to a file, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json()?)?;
        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Get the default filename for the config.
    pub fn default_filename() -> &'static str {
        "roiset.json"
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// JSON parsing error
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Configuration version is newer than supported
    #[error(
        "Configuration file version {file_version} is newer than supported version {supported_version}"
    )]
    VersionTooNew {
        file_version: u32,
        supported_version: u32,
    },

    /// I/O error when reading/writing config
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<ConfigError> for RoiError {
    fn from(err: ConfigError) -> Self {
        RoiError::config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn test_missing_fields_default() {
        let config = EngineConfig::from_json(r#"{"version": 1}"#).unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.xml.indent, 2);
        assert_eq!(config.log_level.to_level_filter(), log::LevelFilter::Info);
    }

    #[test]
    fn test_json_roundtrip() {
        let mut config = EngineConfig::new();
        config.log_level = LogLevel::Debug;
        config.xml.connection_policy = ConnectionPolicy::Deferred;
        config.units = Some(MeasurementUnits {
            pixel_size_x: 0.5,
            pixel_size_y: 0.5,
            pixel_size_z: 1.0,
            in_microns: true,
        });

        let json = config.to_json().unwrap();
        assert!(json.contains("\"deferred\""));
        assert!(json.contains("\"debug\""));
        let restored = EngineConfig::from_json(&json).unwrap();
        assert_eq!(restored, config);
        assert_eq!(
            restored.xml_options().connection_policy,
            ConnectionPolicy::Deferred
        );
    }

    #[test]
    fn test_newer_version_rejected() {
        let result = EngineConfig::from_json(r#"{"version": 99}"#);
        assert_matches!(
            result,
            Err(ConfigError::VersionTooNew {
                file_version: 99,
                ..
            })
        );
        assert_matches!(
            EngineConfig::from_json("{"),
            Err(ConfigError::ParseError(_))
        );

        let err: RoiError = EngineConfig::from_json(r#"{"version": 2}"#)
            .unwrap_err()
            .into();
        assert_matches!(err, RoiError::Config { .. });
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir()
            .join(format!("roiset-config-{}", uuid::Uuid::new_v4()))
            .join(EngineConfig::default_filename());
        let mut config = EngineConfig::new();
        config.xml.indent = 4;
        config.save(&path).unwrap();

        let loaded = EngineConfig::load(&path).unwrap();
        assert_eq!(loaded.xml.indent, 4);
        if let Some(parent) = path.parent() {
            let _ = std::fs::remove_dir_all(parent);
        }
    }
}
