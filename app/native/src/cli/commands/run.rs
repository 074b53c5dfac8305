//! The `run` command.

use std::path::Path;

use super::display_path;
use crate::config;
use crate::error::SwitcherError;

/// Loads the configuration and runs the switcher on a single-threaded runtime.
///
/// # Errors
///
/// Returns an error if the runtime cannot be created or the switcher stops.
pub fn execute(config_path: Option<&Path>) -> Result<(), SwitcherError> {
    let loaded = config::load(config_path);
    tracing::info!(
        config = %display_path(loaded.path.as_deref()),
        version = env!("CARGO_PKG_VERSION"),
        "starting autoduplex"
    );

    let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
    runtime.block_on(crate::serve(&loaded.config))
}
