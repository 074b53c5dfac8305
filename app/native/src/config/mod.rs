//! Configuration module for Autoduplex.
//!
//! This module provides configuration types and loading functionality.
//!
//! The configuration file supports JSONC format (JSON with comments).
//! Both single-line (`//`) and multi-line (`/* */`) comments are allowed.

pub mod template;
pub mod types;

use std::path::{Path, PathBuf};

pub use types::{
    AutoduplexConfig, ClientPattern, ClientsConfig, ConfigError, MatchStrategy, PulseConfig,
    config_paths, load_config, load_config_from_path,
};

/// A configuration together with the file it was read from.
#[derive(Debug, Clone, Default)]
pub struct LoadedConfig {
    /// The effective configuration.
    pub config: AutoduplexConfig,
    /// The file the configuration was read from, if any.
    pub path: Option<PathBuf>,
}

/// Loads the configuration from disk.
///
/// Reads `custom_path` when given, otherwise the first existing file from
/// [`config_paths`]. Falls back to the default configuration when no file
/// exists or the file cannot be parsed.
#[must_use]
pub fn load(custom_path: Option<&Path>) -> LoadedConfig {
    let result = custom_path.map_or_else(load_config, load_config_from_path);

    match result {
        Ok((config, path)) => {
            tracing::debug!(path = %path.display(), "loaded configuration");
            LoadedConfig { config, path: Some(path) }
        }
        Err(ConfigError::NotFound) => {
            tracing::debug!("no configuration file found, using defaults");
            LoadedConfig::default()
        }
        Err(err) => {
            tracing::warn!(error = %err, "failed to load configuration, using defaults");
            LoadedConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn test_load_missing_custom_path_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = load(Some(&dir.path().join("nope.jsonc")));
        assert!(loaded.path.is_none());
        assert_eq!(loaded.config, AutoduplexConfig::default());
    }

    #[test]
    fn test_load_invalid_custom_path_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.jsonc");
        fs::write(&path, "{ not json").unwrap();

        let loaded = load(Some(&path));
        assert!(loaded.path.is_none());
        assert!(loaded.config.mute_on_duplex);
    }

    #[test]
    fn test_load_custom_path_reports_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.jsonc");
        fs::write(&path, r#"{ "muteOnDuplex": false }"#).unwrap();

        let loaded = load(Some(&path));
        assert_eq!(loaded.path.as_deref(), Some(path.as_path()));
        assert!(!loaded.config.mute_on_duplex);
    }
}
