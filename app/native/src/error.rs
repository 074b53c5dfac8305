//! Error types for Autoduplex.
//!
//! This module provides the unified error type used throughout the application.
//! Events from unrecognized clients and references to streams that no longer
//! exist are not errors: they are dropped or treated as no-ops where they
//! occur.

use thiserror::Error;

/// Errors that can occur while watching and switching the audio device.
#[derive(Debug, Error)]
pub enum SwitcherError {
    /// The audio server or its event feed is not reachable (yet).
    #[error("Audio server unavailable: {0}")]
    Unavailable(String),
    /// The event feed ended while the engine was running.
    #[error("Event feed terminated unexpectedly")]
    FeedClosed,
    /// A single audio server command failed.
    #[error("Command `{command}` failed: {message}")]
    Command {
        /// The command that was executed.
        command: String,
        /// The failure reason reported by the server or the OS.
        message: String,
    },
    /// The device or one of its endpoints could not be resolved.
    #[error("Unable to resolve device: {0}")]
    Unresolved(String),
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
    /// IO error.
    #[error("IO error: {0}")]
    Io(String),
}

impl SwitcherError {
    /// Creates a [`SwitcherError::Command`] from anything printable.
    pub fn command(command: impl Into<String>, message: impl ToString) -> Self {
        Self::Command {
            command: command.into(),
            message: message.to_string(),
        }
    }

    /// Returns whether retrying later may succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool { matches!(self, Self::Unavailable(_)) }
}

impl From<std::io::Error> for SwitcherError {
    fn from(err: std::io::Error) -> Self { Self::Io(err.to_string()) }
}

impl From<serde_json::Error> for SwitcherError {
    fn from(err: serde_json::Error) -> Self { Self::Config(err.to_string()) }
}

impl From<regex::Error> for SwitcherError {
    fn from(err: regex::Error) -> Self { Self::Config(format!("invalid pattern: {err}")) }
}
