//! Configuration types for Autoduplex.
//!
//! This module provides the configuration types and loading functionality.
//! The configuration file supports JSONC format (JSON with comments).
//! Both single-line (`//`) and multi-line (`/* */`) comments are allowed.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Strategy for matching application names against a client pattern.
///
/// All strategies are case-sensitive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum MatchStrategy {
    /// The whole name equals the pattern. This is the default strategy.
    #[default]
    Exact,
    /// The name contains the pattern.
    Contains,
    /// The name starts with the pattern.
    StartsWith,
    /// The whole name matches the regex pattern.
    Regex,
}

/// A pattern identifying one or more client applications.
///
/// Can be written as a plain string (exact match) or as an object with an
/// explicit matching strategy:
///
/// ```jsonc
/// "allow": ["Skype", { "name": "^WEBRTC", "strategy": "regex" }]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum ClientPattern {
    /// Exact application name.
    Name(String),
    /// Pattern with an explicit strategy.
    Detailed {
        /// The name (or pattern) to match.
        name: String,
        /// The strategy used to match `name`.
        #[serde(default)]
        strategy: MatchStrategy,
    },
}

impl ClientPattern {
    /// Creates a pattern matching `name` with the given strategy.
    pub fn new(name: impl Into<String>, strategy: MatchStrategy) -> Self {
        Self::Detailed { name: name.into(), strategy }
    }

    /// Returns the raw pattern text.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Name(name) | Self::Detailed { name, .. } => name,
        }
    }

    /// Returns the matching strategy.
    #[must_use]
    pub const fn strategy(&self) -> MatchStrategy {
        match self {
            Self::Name(_) => MatchStrategy::Exact,
            Self::Detailed { strategy, .. } => *strategy,
        }
    }
}

impl From<&str> for ClientPattern {
    fn from(name: &str) -> Self { Self::Name(name.to_string()) }
}

/// Which applications count as two-way communication clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct ClientsConfig {
    /// Applications whose streams are tracked. Streams of any other
    /// application are ignored entirely.
    pub allow: Vec<ClientPattern>,

    /// Clients that may keep the output stream open after a call without
    /// keeping the headset in duplex mode. Matched against canonical names.
    pub persistent_speakers: Vec<ClientPattern>,

    /// Maps raw application names to a canonical client name, so that the
    /// input and output side of one application are recognized as the same
    /// client.
    pub aliases: BTreeMap<String, String>,
}

impl Default for ClientsConfig {
    fn default() -> Self {
        Self {
            allow: vec!["Skype".into(), "WEBRTC VoiceEngine".into()],
            persistent_speakers: Vec::new(),
            aliases: BTreeMap::new(),
        }
    }
}

/// PulseAudio naming and tooling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct PulseConfig {
    /// The `pactl` binary (name or absolute path).
    pub pactl: String,

    /// The `pacmd` binary (name or absolute path).
    pub pacmd: String,

    /// Prefix of Bluetooth card names.
    pub card_prefix: String,

    /// Prefix of Bluetooth sink names.
    pub sink_prefix: String,

    /// Prefix of Bluetooth source names.
    pub source_prefix: String,

    /// Card profile used for high-fidelity stereo playback.
    pub stereo_profile: String,

    /// Card profile used for duplex (headset) operation.
    pub duplex_profile: String,
}

impl Default for PulseConfig {
    fn default() -> Self {
        Self {
            pactl: "pactl".to_string(),
            pacmd: "pacmd".to_string(),
            card_prefix: "bluez_card.".to_string(),
            sink_prefix: "bluez_sink.".to_string(),
            source_prefix: "bluez_source.".to_string(),
            stereo_profile: "a2dp_sink".to_string(),
            duplex_profile: "headset_head_unit".to_string(),
        }
    }
}

/// Root configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct AutoduplexConfig {
    /// Client classification rules.
    pub clients: ClientsConfig,

    /// Mute other resumable playback streams while in duplex mode.
    /// Default: true
    pub mute_on_duplex: bool,

    /// Quiet period after the last stream event before a switch is considered.
    /// Default: 1000
    pub debounce_ms: u64,

    /// How long to wait for the audio server at startup before giving up.
    /// Default: 30
    pub startup_wait_secs: u64,

    /// Interval between connection attempts while waiting at startup.
    /// Default: 1000
    pub startup_poll_ms: u64,

    /// PulseAudio settings.
    pub pulse: PulseConfig,
}

impl Default for AutoduplexConfig {
    fn default() -> Self {
        Self {
            clients: ClientsConfig::default(),
            mute_on_duplex: true,
            debounce_ms: 1000,
            startup_wait_secs: 30,
            startup_poll_ms: 1000,
            pulse: PulseConfig::default(),
        }
    }
}

impl AutoduplexConfig {
    /// Returns the debounce interval.
    #[must_use]
    pub const fn debounce(&self) -> Duration { Duration::from_millis(self.debounce_ms) }

    /// Returns the startup wait window.
    #[must_use]
    pub const fn startup_wait(&self) -> Duration { Duration::from_secs(self.startup_wait_secs) }

    /// Returns the startup poll interval.
    #[must_use]
    pub const fn startup_poll(&self) -> Duration { Duration::from_millis(self.startup_poll_ms) }
}

/// Errors that can occur when loading the configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// No configuration file was found in any of the expected locations.
    #[error(
        "No configuration file found. Expected at ~/.config/autoduplex/config.jsonc \
         or ~/.autoduplex.jsonc"
    )]
    NotFound,
    /// The configuration file exists but could not be read.
    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),
    /// The configuration file contains invalid JSON.
    #[error("Failed to parse configuration file: {0}")]
    ParseError(#[from] serde_json::Error),
}

/// Configuration file names to search for (in priority order).
const CONFIG_FILE_NAMES: &[&str] = &["config.jsonc", "config.json"];

/// Legacy configuration file names in home directory.
const LEGACY_CONFIG_FILE_NAMES: &[&str] = &[".autoduplex.jsonc", ".autoduplex.json"];

/// Returns the possible configuration file paths in priority order.
///
/// The function checks the following locations (both `.jsonc` and `.json` variants):
/// 1. `$XDG_CONFIG_HOME/autoduplex/config.jsonc` (if set)
/// 2. `~/.config/autoduplex/config.jsonc`
/// 3. The platform configuration directory reported by `dirs::config_dir`
/// 4. `~/.autoduplex.jsonc` (simple location)
#[must_use]
pub fn config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        let app_dir = PathBuf::from(xdg_config).join("autoduplex");
        for filename in CONFIG_FILE_NAMES {
            paths.push(app_dir.join(filename));
        }
    }

    if let Some(home) = dirs::home_dir() {
        let app_dir = home.join(".config").join("autoduplex");
        for filename in CONFIG_FILE_NAMES {
            let path = app_dir.join(filename);
            if !paths.contains(&path) {
                paths.push(path);
            }
        }
    }

    if let Some(config_dir) = dirs::config_dir() {
        let app_dir = config_dir.join("autoduplex");
        for filename in CONFIG_FILE_NAMES {
            let path = app_dir.join(filename);
            if !paths.contains(&path) {
                paths.push(path);
            }
        }
    }

    if let Some(home) = dirs::home_dir() {
        for filename in LEGACY_CONFIG_FILE_NAMES {
            paths.push(home.join(filename));
        }
    }

    paths
}

/// Loads the configuration from a specific file.
///
/// # Errors
///
/// Returns `ConfigError::NotFound` if the file does not exist,
/// `ConfigError::IoError` if it cannot be read and `ConfigError::ParseError`
/// if it is not valid JSONC.
pub fn load_config_from_path(path: &Path) -> Result<(AutoduplexConfig, PathBuf), ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound);
    }

    let file = fs::File::open(path)?;
    let reader = json_comments::StripComments::new(file);
    let config: AutoduplexConfig = serde_json::from_reader(reader)?;
    Ok((config, path.to_path_buf()))
}

/// Loads the configuration from the first available config file.
///
/// # Errors
///
/// Returns `ConfigError::NotFound` if no configuration file exists in any of
/// the expected locations, or the errors of [`load_config_from_path`].
pub fn load_config() -> Result<(AutoduplexConfig, PathBuf), ConfigError> {
    config_paths()
        .into_iter()
        .find(|path| path.exists())
        .map_or(Err(ConfigError::NotFound), |path| load_config_from_path(&path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_tracks_known_clients() {
        let config = AutoduplexConfig::default();
        assert_eq!(config.clients.allow.len(), 2);
        assert!(config.mute_on_duplex);
        assert_eq!(config.debounce(), Duration::from_secs(1));
        assert_eq!(config.startup_wait(), Duration::from_secs(30));
    }

    #[test]
    fn test_config_deserializes_mixed_patterns() {
        let json = r#"{
            "clients": {
                "allow": ["Skype", { "name": "^WEBRTC", "strategy": "regex" }],
                "persistentSpeakers": [{ "name": "Google Chrome" }],
                "aliases": { "Skype Input": "Skype" }
            }
        }"#;

        let config: AutoduplexConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.clients.allow[0], ClientPattern::Name("Skype".to_string()));
        assert_eq!(config.clients.allow[1].strategy(), MatchStrategy::Regex);
        assert_eq!(config.clients.persistent_speakers[0].strategy(), MatchStrategy::Exact);
        assert_eq!(config.clients.aliases.get("Skype Input").map(String::as_str), Some("Skype"));
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let json = r#"{ "muteOnDuplex": false, "pulse": { "duplexProfile": "handsfree_head_unit" } }"#;

        let config: AutoduplexConfig = serde_json::from_str(json).unwrap();
        assert!(!config.mute_on_duplex);
        assert_eq!(config.debounce_ms, 1000);
        assert_eq!(config.pulse.duplex_profile, "handsfree_head_unit");
        assert_eq!(config.pulse.stereo_profile, "a2dp_sink");
        assert_eq!(config.clients, ClientsConfig::default());
    }

    #[test]
    fn test_load_config_from_path_strips_comments() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.jsonc");
        fs::write(
            &path,
            "{\n  // seconds\n  \"startupWaitSecs\": 5, /* ms */ \"debounceMs\": 250\n}\n",
        )
        .unwrap();

        let (config, loaded_from) = load_config_from_path(&path).unwrap();
        assert_eq!(config.startup_wait(), Duration::from_secs(5));
        assert_eq!(config.debounce(), Duration::from_millis(250));
        assert_eq!(loaded_from, path);
    }

    #[test]
    fn test_load_config_from_missing_path_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_config_from_path(&dir.path().join("missing.jsonc"));
        assert!(matches!(result, Err(ConfigError::NotFound)));
    }

    #[test]
    fn test_load_config_from_invalid_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ \"debounceMs\": \"soon\" }").unwrap();

        let result = load_config_from_path(&path);
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_config_paths_are_not_empty() {
        let paths = config_paths();
        assert!(!paths.is_empty() || std::env::var("HOME").is_err());
    }

    #[test]
    fn test_config_error_message() {
        let msg = ConfigError::NotFound.to_string();
        assert!(msg.contains("No configuration file found"));
    }
}
