//! The `status` command.

use std::fmt::Write;
use std::path::Path;

use colored::Colorize;
use serde::Serialize;

use super::display_path;
use crate::cli::output::{print_highlighted_json, truncate};
use crate::config;
use crate::error::SwitcherError;
use crate::pulse::PulseController;
use crate::switcher::{AudioController, ClientClassifier, StreamKind};

/// Widest application name shown in the table.
const MAX_APPLICATION_WIDTH: usize = 32;

/// One live stream and how the switcher sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamStatus {
    /// `output` or `input`.
    pub kind: String,
    /// Server-assigned identifier.
    pub id: u32,
    /// Owning application, if known.
    pub application: Option<String>,
    /// Canonical client name when the stream would be tracked.
    pub client: Option<String>,
    /// Whether the client may hold the output alone without blocking stereo mode.
    pub persistent_speaker: bool,
}

/// Snapshot of the headset and the streams using the audio server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    /// Active Bluetooth card, if any.
    pub device: Option<String>,
    /// `stereo`, `duplex`, or `null` when unknown.
    pub mode: Option<String>,
    /// Live streams, outputs first.
    pub streams: Vec<StreamStatus>,
}

impl StatusReport {
    /// Queries the server and classifies every live stream.
    ///
    /// # Errors
    ///
    /// Returns an error if the server cannot be queried.
    pub fn collect<C: AudioController>(
        controller: &mut C,
        classifier: &ClientClassifier,
    ) -> Result<Self, SwitcherError> {
        let device = controller.active_device()?;
        let mode = match &device {
            Some(device) => controller.current_mode(device)?.map(|mode| mode.to_string()),
            None => None,
        };

        let mut streams = Vec::new();
        for kind in StreamKind::ALL {
            for stream in controller.live_streams(kind)? {
                let client = stream
                    .application
                    .as_deref()
                    .and_then(|application| classifier.classify(kind, application));
                let persistent_speaker =
                    client.as_deref().is_some_and(|client| classifier.is_persistent_speaker(client));

                streams.push(StreamStatus {
                    kind: kind.to_string(),
                    id: stream.id,
                    application: stream.application,
                    client,
                    persistent_speaker,
                });
            }
        }

        Ok(Self {
            device: device.map(|device| device.0),
            mode,
            streams,
        })
    }
}

/// Formats the report for human-readable output.
#[must_use]
pub fn format_status(report: &StatusReport) -> String {
    let mut output = String::new();

    let device = report.device.as_deref().unwrap_or("none");
    let mode = report.mode.as_deref().unwrap_or("unknown");
    let _ = writeln!(output, "{} {}", "Device:".bold(), device);
    let _ = writeln!(output, "{} {}", "Mode:  ".bold(), mode);
    let _ = writeln!(output);

    if report.streams.is_empty() {
        output.push_str("No live streams.\n");
        return output;
    }

    let applications: Vec<String> = report
        .streams
        .iter()
        .map(|stream| {
            truncate(stream.application.as_deref().unwrap_or("?"), MAX_APPLICATION_WIDTH)
        })
        .collect();
    let name_col_width =
        applications.iter().map(|name| name.chars().count()).max().unwrap_or(0).max(11);

    let _ = writeln!(
        output,
        "{:<6}  {:>5}  {:<name_col_width$}  {:<7}  {:<10}",
        "Kind", "Id", "Application", "Tracked", "Persistent"
    );
    let _ = writeln!(
        output,
        "{:<6}  {:>5}  {:<name_col_width$}  {:<7}  {:<10}",
        "-".repeat(6),
        "-".repeat(5),
        "-".repeat(name_col_width),
        "-".repeat(7),
        "-".repeat(10)
    );

    for (stream, application) in report.streams.iter().zip(&applications) {
        let tracked = if stream.client.is_some() { "Y" } else { "-" };
        let persistent = if stream.persistent_speaker { "Y" } else { "-" };
        let padding = name_col_width.saturating_sub(application.chars().count());

        let _ = writeln!(
            output,
            "{:<6}  {:>5}  {application}{}  {:<7}  {:<10}",
            stream.kind,
            stream.id,
            " ".repeat(padding),
            tracked,
            persistent
        );
    }

    output
}

/// Prints the status of the local audio server.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or the server cannot be
/// queried.
pub fn execute(config_path: Option<&Path>, json: bool) -> Result<(), SwitcherError> {
    let loaded = config::load(config_path);
    tracing::debug!(config = %display_path(loaded.path.as_deref()), "collecting status");

    let classifier = ClientClassifier::new(&loaded.config.clients)?;
    let mut controller = PulseController::new(&loaded.config.pulse)?;
    let report = StatusReport::collect(&mut controller, &classifier)?;

    if json {
        print_highlighted_json(&serde_json::to_value(&report)?);
    } else {
        print!("{}", format_status(&report));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ClientPattern, ClientsConfig};
    use crate::switcher::MemoryController;

    fn classifier() -> ClientClassifier {
        ClientClassifier::new(&ClientsConfig {
            allow: vec!["Skype".into(), "Google Chrome".into()],
            persistent_speakers: vec![ClientPattern::from("Google Chrome")],
            ..ClientsConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_collect_classifies_streams() {
        let mut controller = MemoryController::new();
        controller.open_stream(StreamKind::Output, "Google Chrome");
        controller.open_stream(StreamKind::Input, "Skype");
        controller.open_playback("Rhythmbox", true);

        let report = StatusReport::collect(&mut controller, &classifier()).unwrap();

        assert_eq!(report.device.as_deref(), Some("bluez_card.00_1B_66_AA_BB_CC"));
        assert_eq!(report.mode.as_deref(), Some("stereo"));
        assert_eq!(report.streams.len(), 3);
        assert_eq!(report.streams[0].client.as_deref(), Some("Google Chrome"));
        assert!(report.streams[0].persistent_speaker);
        assert_eq!(report.streams[1].application.as_deref(), Some("Rhythmbox"));
        assert_eq!(report.streams[1].client, None);
        assert_eq!(report.streams[2].kind, "input");
        assert!(!report.streams[2].persistent_speaker);
    }

    #[test]
    fn test_collect_without_headset() {
        let mut controller = MemoryController::new();
        controller.disconnect();

        let report = StatusReport::collect(&mut controller, &classifier()).unwrap();

        assert_eq!(report.device, None);
        assert_eq!(report.mode, None);
    }

    #[test]
    fn test_collect_propagates_query_failure() {
        let mut controller = MemoryController::new();
        controller.fail_on("live_streams");
        assert!(StatusReport::collect(&mut controller, &classifier()).is_err());
    }

    #[test]
    fn test_format_status_empty() {
        colored::control::set_override(false);
        let report = StatusReport { device: None, mode: None, streams: Vec::new() };
        let output = format_status(&report);
        assert!(output.contains("Device: none"));
        assert!(output.contains("unknown"));
        assert!(output.contains("No live streams."));
    }

    #[test]
    fn test_format_status_table() {
        colored::control::set_override(false);
        let report = StatusReport {
            device: Some("bluez_card.00_1B".to_string()),
            mode: Some("duplex".to_string()),
            streams: vec![StreamStatus {
                kind: "output".to_string(),
                id: 12,
                application: Some("Skype".to_string()),
                client: Some("Skype".to_string()),
                persistent_speaker: false,
            }],
        };

        let output = format_status(&report);
        let lines: Vec<&str> = output.lines().collect();
        assert!(lines[1].contains("duplex"));
        assert!(lines[3].starts_with("Kind"));
        assert!(lines[5].starts_with("output"));
        assert!(lines[5].contains("Skype"));
        assert!(lines[5].contains('Y'));
    }

    #[test]
    fn test_status_report_serializes_camel_case() {
        let report = StatusReport { device: None, mode: Some("stereo".to_string()), streams: Vec::new() };
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["mode"], "stereo");
        assert!(value["device"].is_null());
    }
}
