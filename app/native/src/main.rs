//! Autoduplex - Bluetooth headset profile switcher.
//!
//! Runs the switching daemon when called without arguments or with `run`;
//! every other subcommand is a one-shot CLI command.

fn main() {
    if let Err(err) = autoduplex_lib::cli::run() {
        tracing::error!(error = %err, "exiting");
        eprintln!("autoduplex: {err}");
        std::process::exit(1);
    }
}
