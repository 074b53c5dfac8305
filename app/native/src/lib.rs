//! Autoduplex - switches a Bluetooth headset between stereo playback and
//! duplex call mode.
//!
//! The [`switcher`] module holds the switching engine; [`pulse`] connects it
//! to a PulseAudio server through its command line tools.

pub mod cli;
pub mod config;
pub mod error;
pub mod pulse;
pub mod schema;
pub mod switcher;

use crate::config::AutoduplexConfig;
use crate::error::SwitcherError;
use crate::pulse::{PactlEventSource, PulseController};
use crate::switcher::Engine;

/// Runs the switcher against the local PulseAudio server until its event
/// feed ends.
///
/// # Errors
///
/// Returns an error if the configuration is invalid, the server does not
/// come up within the startup window, or the event feed terminates.
pub async fn serve(config: &AutoduplexConfig) -> Result<(), SwitcherError> {
    let controller = PulseController::new(&config.pulse)?;
    let mut source = PactlEventSource::new(&config.pulse)?;
    let mut engine = Engine::new(config, controller)?;

    tracing::info!(
        debounce_ms = config.debounce_ms,
        mute_on_duplex = config.mute_on_duplex,
        "watching PulseAudio streams"
    );
    engine.start(&mut source).await
}
