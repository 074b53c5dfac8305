//! The `config` command.

use std::fmt::Write;
use std::path::{Path, PathBuf};

use clap::Subcommand;

use super::display_path;
use crate::cli::output::print_highlighted_json;
use crate::config::template::{create_config_file, generate_config_template};
use crate::config::{self, config_paths};
use crate::error::SwitcherError;

/// Where `config init` writes when no `--path` is given and no search path exists.
const FALLBACK_CONFIG_FILE: &str = "autoduplex.jsonc";

/// Configuration file commands.
#[derive(Subcommand, Debug)]
#[command(next_display_order = None)]
pub enum ConfigCommands {
    /// Write a configuration file listing every option.
    ///
    /// Every option is present but commented out, so the file behaves like
    /// the defaults until you uncomment something. The usual first edit is
    /// adding your call applications to `clients.allow`.
    #[command(
        name = "init",
        after_long_help = r#"Examples:
  autoduplex config init                          # ~/.config/autoduplex/config.jsonc
  autoduplex config init --force                  # replace an existing file
  autoduplex config init --path ./autoduplex.jsonc
  autoduplex config init --stdout > config.jsonc"#
    )]
    Init {
        /// Replace the file if it already exists.
        #[arg(long, short)]
        force: bool,

        /// Write here instead of the preferred search path.
        #[arg(long, short, value_name = "PATH")]
        path: Option<PathBuf>,

        /// Print the file instead of writing it.
        #[arg(long)]
        stdout: bool,
    },

    /// List the configuration search paths and mark the one in use.
    Path,

    /// Print the effective configuration, defaults included.
    Show,
}

/// Runs a `config` subcommand.
///
/// # Errors
///
/// Returns an error if the file cannot be written or the configuration
/// cannot be serialized.
pub fn execute(cmd: &ConfigCommands, config_path: Option<&Path>) -> Result<(), SwitcherError> {
    match cmd {
        ConfigCommands::Init { stdout: true, .. } => {
            print!("{}", generate_config_template());
        }
        ConfigCommands::Init { force, path, .. } => {
            let written = write_template(path.as_deref(), *force)?;
            println!("Wrote {}", written.display());
            println!("Add your call applications to clients.allow, then restart autoduplex.");
        }
        ConfigCommands::Path => print!("{}", describe_search(&config_paths(), config_path)),
        ConfigCommands::Show => {
            let loaded = config::load(config_path);
            eprintln!("# source: {}", display_path(loaded.path.as_deref()));
            print_highlighted_json(&serde_json::to_value(&loaded.config)?);
        }
    }
    Ok(())
}

/// Writes the commented template and returns where it went.
fn write_template(path: Option<&Path>, force: bool) -> Result<PathBuf, SwitcherError> {
    let target = path.map_or_else(
        || config_paths().into_iter().next().unwrap_or_else(|| PathBuf::from(FALLBACK_CONFIG_FILE)),
        Path::to_path_buf,
    );

    if !force && target.exists() {
        return Err(SwitcherError::Config(format!(
            "{} already exists (pass --force to replace it)",
            target.display()
        )));
    }

    create_config_file(&target)
        .map_err(|err| SwitcherError::Config(format!("cannot write {}: {err}", target.display())))?;
    Ok(target)
}

/// Describes which configuration file is read.
///
/// A `--config` path replaces the search entirely. Otherwise the first
/// existing search path wins and later ones are shadowed.
fn describe_search(paths: &[PathBuf], custom: Option<&Path>) -> String {
    let mut out = String::new();

    if let Some(custom) = custom {
        let _ = writeln!(out, "{}  (--config)", custom.display());
        return out;
    }

    let mut in_use = None;
    for path in paths {
        let state = if !path.exists() {
            ""
        } else if in_use.is_none() {
            in_use = Some(path);
            "  (in use)"
        } else {
            "  (shadowed)"
        };
        let _ = writeln!(out, "{}{state}", path.display());
    }

    if in_use.is_none() {
        out.push_str("\nNo file found, running with defaults. Create one with `autoduplex config init`.\n");
    }
    out
}
