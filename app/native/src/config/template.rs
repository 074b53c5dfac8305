//! Configuration template generation.
//!
//! Generates a commented configuration template with all available options.

use std::fs;
use std::path::Path;

/// Generates a configuration template with all options commented out.
///
/// This creates a JSONC file with documentation for every available option.
/// Uncommented, it is equivalent to the built-in defaults.
#[must_use]
pub fn generate_config_template() -> String {
    r#"// Autoduplex Configuration File
// ==============================
// This file uses JSONC format (JSON with comments).
// All options below are commented out and show their default values.
// Uncomment and modify the options you want to configure.

{
  // ============================================================================
  // Client Classification
  // ============================================================================
  // Only streams of these applications can trigger a switch to duplex mode.
  // Patterns are case-sensitive. A plain string matches the whole name;
  // objects may use "exact", "contains", "startsWith" or "regex".
  // "clients": {
  //   "allow": [
  //     "Skype",
  //     "WEBRTC VoiceEngine"
  //     // { "name": "^Zoom", "strategy": "regex" }
  //   ],
  //
  //   // Clients allowed to keep playing after a call ends without keeping
  //   // the headset in duplex mode (matched against canonical names)
  //   "persistentSpeakers": [],
  //
  //   // Map raw application names to one canonical client name
  //   "aliases": {
  //     // "Skype Input": "Skype"
  //   }
  // },

  // ============================================================================
  // Switching Behaviour
  // ============================================================================
  // Mute other resumable playback streams while the headset is in duplex mode
  // "muteOnDuplex": true,
  //
  // Quiet period after the last stream event before deciding, in milliseconds
  // "debounceMs": 1000,
  //
  // How long to wait for the audio server at startup, in seconds
  // "startupWaitSecs": 30,
  //
  // Interval between connection attempts at startup, in milliseconds
  // "startupPollMs": 1000,

  // ============================================================================
  // PulseAudio
  // ============================================================================
  // "pulse": {
  //   "pactl": "pactl",
  //   "pacmd": "pacmd",
  //   "cardPrefix": "bluez_card.",
  //   "sinkPrefix": "bluez_sink.",
  //   "sourcePrefix": "bluez_source.",
  //
  //   // Card profiles for stereo playback and duplex operation
  //   "stereoProfile": "a2dp_sink",
  //   "duplexProfile": "headset_head_unit"
  // }
}
"#
    .to_string()
}

/// Creates a configuration file with the template at the specified path.
///
/// Creates parent directories if they don't exist.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn create_config_file(path: &Path) -> Result<(), std::io::Error> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    fs::write(path, generate_config_template())
}
