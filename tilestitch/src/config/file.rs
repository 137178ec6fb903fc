//! Loading `config.ini` from disk.

use std::path::{Path, PathBuf};

use ini::Ini;
use thiserror::Error;

use super::settings::ConfigFile;

/// Configuration file errors.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] ini::Error),

    /// Explicitly requested file does not exist
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// Invalid configuration value
    #[error("Invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },
}

impl ConfigFile {
    /// Load configuration from the default path (~/.tilestitch/config.ini).
    ///
    /// If the file doesn't exist, returns defaults.
    pub fn load() -> Result<Self, ConfigFileError> {
        let path = config_file_path();
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Load configuration from a specific path, which must exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigFileError> {
        if !path.exists() {
            return Err(ConfigFileError::NotFound(path.to_path_buf()));
        }

        let ini = Ini::load_from_file(path)?;
        super::parser::parse_ini(&ini)
    }

    /// Parse configuration from INI text.
    pub fn parse(content: &str) -> Result<Self, ConfigFileError> {
        let ini = Ini::load_from_str(content)
            .map_err(|e| ConfigFileError::ReadError(ini::Error::Parse(e)))?;
        super::parser::parse_ini(&ini)
    }
}

/// Get the path to the config directory (~/.tilestitch).
pub fn config_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".tilestitch")
}

/// Get the path to the config file (~/.tilestitch/config.ini).
pub fn config_file_path() -> PathBuf {
    config_directory().join("config.ini")
}

/// Get the default tile cache directory (~/.tilestitch/cache).
pub fn default_cache_directory() -> PathBuf {
    config_directory().join("cache")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mosaic::DEFAULT_TILE_SIZE;

    #[test]
    fn test_load_from_reads_file() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.ini");
        std::fs::write(&config_path, "[mosaic]\nzoom = 12\n").unwrap();

        let config = ConfigFile::load_from(&config_path).unwrap();
        assert_eq!(config.mosaic.zoom, 12);
        assert_eq!(config.mosaic.tile_size, DEFAULT_TILE_SIZE);
    }

    #[test]
    fn test_load_from_missing_file_fails() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nonexistent.ini");

        assert!(matches!(
            ConfigFile::load_from(&config_path),
            Err(ConfigFileError::NotFound(_))
        ));
    }

    #[test]
    fn test_default_paths_live_under_config_directory() {
        assert!(config_file_path().starts_with(config_directory()));
        assert!(default_cache_directory().starts_with(config_directory()));
    }
}
