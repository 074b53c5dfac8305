//! CLI module for Autoduplex.
//!
//! Without a subcommand the binary runs the switching daemon; the other
//! commands inspect the audio server and manage the configuration file.

mod commands;
mod output;

use clap::Parser;
pub use commands::Cli;

use crate::error::SwitcherError;

/// Runs the CLI.
///
/// Parses command-line arguments and executes the appropriate command.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn run() -> Result<(), SwitcherError> {
    let cli = Cli::parse();
    cli.execute()
}
