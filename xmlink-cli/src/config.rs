//! Configuration file support for xmlink.
//!
//! Configuration is loaded with the following priority (highest first):
//! 1. Command-line arguments
//! 2. Environment variables (XMLINK_*)
//! 3. Local config file (./xmlink.toml)
//! 4. Global config file (~/.config/xmlink/config.toml)

use directories::ProjectDirs;
use log::{debug, warn};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

/// Connection settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ConnectionConfig {
    /// Preferred serial port (e.g., "/dev/ttyUSB0" or "COM3").
    pub serial: Option<String>,
    /// Default baud rate.
    pub baud: Option<u32>,
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct Config {
    /// Connection settings.
    #[serde(default)]
    pub connection: ConnectionConfig,
}

impl Config {
    /// Load configuration from the first config file found.
    pub(crate) fn load() -> Self {
        for path in Self::candidate_paths() {
            if !path.exists() {
                continue;
            }
            match fs::read_to_string(&path) {
                Ok(text) => match toml::from_str(&text) {
                    Ok(config) => {
                        debug!("loaded config from {}", path.display());
                        return config;
                    }
                    Err(e) => warn!("ignoring malformed config {}: {e}", path.display()),
                },
                Err(e) => warn!("could not read config {}: {e}", path.display()),
            }
        }
        Self::default()
    }

    fn candidate_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("xmlink.toml")];
        if let Some(dirs) = ProjectDirs::from("", "", "xmlink") {
            paths.push(dirs.config_dir().join("config.toml"));
        }
        paths
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert!(config.connection.serial.is_none());
        assert!(config.connection.baud.is_none());
    }

    #[test]
    fn full_config_parses() {
        let config: Config = toml::from_str(
            r#"
            [connection]
            serial = "/dev/ttyUSB1"
            baud = 57600
            "#,
        )
        .unwrap();
        assert_eq!(config.connection.serial.as_deref(), Some("/dev/ttyUSB1"));
        assert_eq!(config.connection.baud, Some(57600));
    }

    #[test]
    fn unknown_keys_are_tolerated() {
        let config: Config = toml::from_str(
            r#"
            [connection]
            baud = 9600

            [future]
            flag = true
            "#,
        )
        .unwrap();
        assert_eq!(config.connection.baud, Some(9600));
    }
}
