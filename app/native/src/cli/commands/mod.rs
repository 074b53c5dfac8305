//! CLI command definitions using Clap.
//!
//! This module defines all CLI commands and their arguments, organized into
//! submodules:
//!
//! - `config_cmd` - Configuration file commands
//! - `run` - The switching daemon
//! - `status` - Device and stream inspection

use std::io;
use std::path::{Path, PathBuf};

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{Generator, Shell, generate};
use tracing_subscriber::EnvFilter;

use crate::error::SwitcherError;
use crate::schema;

pub mod config_cmd;
pub mod run;
pub mod status;

pub use config_cmd::ConfigCommands;

/// Application version from Cargo.toml.
const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Autoduplex - switches a Bluetooth headset to duplex mode while a call is
/// using it, and back to stereo playback afterwards.
#[derive(Parser, Debug)]
#[command(name = "autoduplex")]
#[command(author, version = APP_VERSION, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to a custom configuration file.
    ///
    /// Overrides the default configuration file search paths.
    /// Supports JSONC format (JSON with comments).
    #[arg(long, short, global = true, value_name = "PATH")]
    pub config: Option<String>,

    /// Defaults to `run` when omitted.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
#[command(next_display_order = None)]
pub enum Commands {
    /// Watch the audio server and switch the headset automatically.
    ///
    /// This is the default when no command is given. Runs until the audio
    /// server goes away, then exits with a non-zero status so a supervisor
    /// can restart it.
    Run {
        /// Log debug messages. `RUST_LOG` takes precedence.
        #[arg(long, short)]
        verbose: bool,
    },

    /// Show the active headset, its mode and the live streams.
    Status {
        /// Output as JSON.
        #[arg(long, short)]
        json: bool,
    },

    /// Configuration file management commands.
    ///
    /// Initialize, locate, and inspect the configuration file.
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Output Autoduplex configuration JSON Schema.
    ///
    /// Outputs a JSON Schema to stdout that describes the structure of the
    /// configuration file. Can be redirected to a file for use with editors
    /// that support JSON Schema validation.
    Schema,

    /// Generate shell completions.
    ///
    /// Outputs shell completion script to stdout for the specified shell.
    ///
    /// Usage:
    ///   eval "$(autoduplex completions --shell zsh)"
    ///   autoduplex completions --shell fish > ~/.config/fish/completions/autoduplex.fish
    Completions {
        /// The shell to generate completions for.
        #[arg(long, short, value_enum)]
        shell: Shell,
    },
}

impl Cli {
    /// Returns the custom config path if specified via --config flag.
    #[must_use]
    pub fn config_path(&self) -> Option<PathBuf> { self.config.as_ref().map(PathBuf::from) }

    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if the command execution fails.
    pub fn execute(&self) -> Result<(), SwitcherError> {
        let config_path = self.config_path();
        if let Some(path) = &config_path
            && !path.exists()
        {
            return Err(SwitcherError::Config(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }
        let config_path = config_path.as_deref();

        init_logging(self.log_level());

        match &self.command {
            None => run::execute(config_path),
            Some(Commands::Run { .. }) => run::execute(config_path),
            Some(Commands::Status { json }) => status::execute(config_path, *json),
            Some(Commands::Config(cmd)) => config_cmd::execute(cmd, config_path),

            Some(Commands::Schema) => {
                println!("{}", schema::generate_schema_json());
                Ok(())
            }

            Some(Commands::Completions { shell }) => {
                Self::print_completions(*shell);
                Ok(())
            }
        }
    }

    /// Default log level when `RUST_LOG` is not set.
    const fn log_level(&self) -> &'static str {
        match &self.command {
            None | Some(Commands::Run { verbose: false }) => "info",
            Some(Commands::Run { verbose: true }) => "debug",
            Some(_) => "warn",
        }
    }

    /// Print shell completions to stdout.
    fn print_completions<G: Generator>(generator: G) {
        let mut cmd = Self::command();
        generate(generator, &mut cmd, "autoduplex", &mut io::stdout());
    }
}

/// Installs the stderr log subscriber.
fn init_logging(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("autoduplex={default_level},autoduplex_lib={default_level}"))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

/// Formats a path for messages, `-` when absent.
fn display_path(path: Option<&Path>) -> String {
    path.map_or_else(|| "-".to_string(), |path| path.display().to_string())
}
