//! [`AudioController`] backed by `pactl` and `pacmd`.

use std::collections::BTreeSet;

use super::command::Tool;
use super::parse;
use crate::config::PulseConfig;
use crate::error::SwitcherError;
use crate::switcher::{
    AudioController, DeviceId, DeviceMode, Endpoints, LiveStream, PlaybackStream, StreamKind,
};

/// Talks to PulseAudio (or `pipewire-pulse`) through its command line tools.
#[derive(Debug, Clone)]
pub struct PulseController {
    pactl: Tool,
    /// Only needed to find resumable playback; missing on PipeWire systems.
    pacmd: Option<Tool>,
    config: PulseConfig,
}

impl PulseController {
    /// Locates the tools named in `config`.
    ///
    /// # Errors
    ///
    /// Returns [`SwitcherError::Command`] if `pactl` cannot be found.
    pub fn new(config: &PulseConfig) -> Result<Self, SwitcherError> {
        let pactl = Tool::locate(&config.pactl)?;
        let pacmd = match Tool::locate(&config.pacmd) {
            Ok(tool) => Some(tool),
            Err(err) => {
                tracing::warn!(error = %err, "pacmd not found, other playback will not be muted");
                None
            }
        };

        Ok(Self {
            pactl,
            pacmd,
            config: config.clone(),
        })
    }

    fn profile(&self, mode: DeviceMode) -> &str {
        match mode {
            DeviceMode::Stereo => &self.config.stereo_profile,
            DeviceMode::Duplex => &self.config.duplex_profile,
        }
    }

    fn address<'a>(&self, device: &'a DeviceId) -> Result<&'a str, SwitcherError> {
        device
            .0
            .strip_prefix(self.config.card_prefix.as_str())
            .filter(|address| !address.is_empty())
            .ok_or_else(|| SwitcherError::Unresolved(format!("{device} is not a Bluetooth card")))
    }

    fn run(&self, args: &[&str]) -> Result<(), SwitcherError> { self.pactl.run(args).map(drop) }
}

const fn listing(kind: StreamKind) -> &'static str {
    match kind {
        StreamKind::Output => "sink-inputs",
        StreamKind::Input => "source-outputs",
    }
}

impl AudioController for PulseController {
    fn active_device(&mut self) -> Result<Option<DeviceId>, SwitcherError> {
        // `get-default-sink` needs PulseAudio 15; `info` works everywhere.
        let info = self.pactl.run(&["info"])?;
        let Some(sink) = parse::default_sink(&info) else {
            return Ok(None);
        };
        Ok(parse::bluetooth_address(sink, &self.config.sink_prefix)
            .map(|address| DeviceId(format!("{}{address}", self.config.card_prefix))))
    }

    fn current_mode(&mut self, device: &DeviceId) -> Result<Option<DeviceMode>, SwitcherError> {
        let cards = self.pactl.run(&["list", "cards"])?;
        let Some(profile) = parse::active_profile(&cards, &device.0) else {
            return Err(SwitcherError::Unresolved(format!("card {device} is not listed")));
        };

        Ok(match profile.as_deref() {
            Some(p) if p == self.config.stereo_profile => Some(DeviceMode::Stereo),
            Some(p) if p == self.config.duplex_profile => Some(DeviceMode::Duplex),
            _ => None,
        })
    }

    fn endpoints(&mut self, device: &DeviceId, mode: DeviceMode) -> Result<Endpoints, SwitcherError> {
        let address = self.address(device)?;
        let profile = self.profile(mode);

        Ok(Endpoints {
            output: format!("{}{address}.{profile}", self.config.sink_prefix),
            input: (mode == DeviceMode::Duplex)
                .then(|| format!("{}{address}.{profile}", self.config.source_prefix)),
        })
    }

    fn output_volume(&mut self, endpoint: &str) -> Result<Option<u32>, SwitcherError> {
        let output = self.pactl.run(&["get-sink-volume", endpoint])?;
        Ok(parse::first_volume(&output))
    }

    fn set_output_volume(&mut self, endpoint: &str, level: u32) -> Result<(), SwitcherError> {
        self.run(&["set-sink-volume", endpoint, &level.to_string()])
    }

    fn set_profile(&mut self, device: &DeviceId, mode: DeviceMode) -> Result<(), SwitcherError> {
        let profile = self.profile(mode).to_string();
        self.run(&["set-card-profile", &device.0, &profile])
    }

    fn set_default_output(&mut self, endpoint: &str) -> Result<(), SwitcherError> {
        self.run(&["set-default-sink", endpoint])
    }

    fn set_default_input(&mut self, endpoint: &str) -> Result<(), SwitcherError> {
        self.run(&["set-default-source", endpoint])
    }

    fn move_stream(&mut self, kind: StreamKind, id: u32, endpoint: &str) -> Result<(), SwitcherError> {
        let subcommand = match kind {
            StreamKind::Output => "move-sink-input",
            StreamKind::Input => "move-source-output",
        };
        self.run(&[subcommand, &id.to_string(), endpoint])
    }

    fn unmuted_output_streams(
        &mut self,
        excluding: &BTreeSet<u32>,
    ) -> Result<Vec<PlaybackStream>, SwitcherError> {
        let Some(pacmd) = &self.pacmd else {
            return Err(SwitcherError::command(&self.config.pacmd, "not available"));
        };

        let listing = pacmd.run(&["list-sink-inputs"])?;
        Ok(parse::unmuted_playback(&listing)
            .into_iter()
            .filter(|stream| !excluding.contains(&stream.id))
            .collect())
    }

    fn set_mute(&mut self, id: u32, muted: bool) -> Result<(), SwitcherError> {
        let flag = if muted { "1" } else { "0" };
        self.run(&["set-sink-input-mute", &id.to_string(), flag])
    }

    fn live_streams(&mut self, kind: StreamKind) -> Result<Vec<LiveStream>, SwitcherError> {
        let listing = self.pactl.run(&["list", listing(kind)])?;
        Ok(parse::live_streams(&listing))
    }
}

/// Looks up the application owning a stream. `None` if it already vanished.
pub async fn application_of(pactl: &Tool, kind: StreamKind, id: u32) -> Option<String> {
    match pactl.run_async(&["list", listing(kind)]).await {
        Ok(listing) => parse::live_streams(&listing)
            .into_iter()
            .find(|stream| stream.id == id)
            .and_then(|stream| stream.application),
        Err(err) => {
            tracing::debug!(%kind, id, error = %err, "cannot look up stream owner");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> PulseController {
        PulseController {
            pactl: Tool::locate("sh").unwrap(),
            pacmd: None,
            config: PulseConfig::default(),
        }
    }

    fn device() -> DeviceId { DeviceId("bluez_card.00_1B_66_AA_BB_CC".to_string()) }

    #[test]
    fn test_endpoints_in_stereo_mode_have_no_input() {
        let endpoints = controller().endpoints(&device(), DeviceMode::Stereo).unwrap();
        assert_eq!(endpoints.output, "bluez_sink.00_1B_66_AA_BB_CC.a2dp_sink");
        assert_eq!(endpoints.input, None);
    }

    #[test]
    fn test_endpoints_in_duplex_mode() {
        let endpoints = controller().endpoints(&device(), DeviceMode::Duplex).unwrap();
        assert_eq!(endpoints.output, "bluez_sink.00_1B_66_AA_BB_CC.headset_head_unit");
        assert_eq!(
            endpoints.input.as_deref(),
            Some("bluez_source.00_1B_66_AA_BB_CC.headset_head_unit")
        );
    }

    #[test]
    fn test_endpoints_of_non_bluetooth_card_are_unresolved() {
        let card = DeviceId("alsa_card.pci-0000_00_1f.3".to_string());
        assert!(matches!(
            controller().endpoints(&card, DeviceMode::Duplex),
            Err(SwitcherError::Unresolved(_))
        ));
    }

    #[test]
    fn test_endpoints_follow_configured_profiles() {
        let mut controller = controller();
        controller.config.duplex_profile = "handsfree_head_unit".to_string();
        let endpoints = controller.endpoints(&device(), DeviceMode::Duplex).unwrap();
        assert!(endpoints.output.ends_with(".handsfree_head_unit"));
    }

    #[test]
    fn test_unmuted_streams_need_pacmd() {
        let result = controller().unmuted_output_streams(&BTreeSet::new());
        assert!(matches!(result, Err(SwitcherError::Command { .. })));
    }

    /// A stand-in `pactl` that appends its arguments to `calls` and prints
    /// the file named after its subcommand (`list <what>` prints `<what>`).
    struct FakePactl {
        dir: tempfile::TempDir,
    }

    impl FakePactl {
        fn new() -> Self {
            use std::os::unix::fs::PermissionsExt;

            let dir = tempfile::tempdir().unwrap();
            let root = dir.path().display().to_string();
            let script = format!(
                "#!/bin/sh\n\
                 echo \"$*\" >> '{root}/calls'\n\
                 case \"$1\" in\n\
                 list) exec cat '{root}/'\"$2\" ;;\n\
                 info|get-sink-volume) exec cat '{root}/'\"$1\" ;;\n\
                 esac\n"
            );
            let path = dir.path().join("pactl");
            std::fs::write(&path, script).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            Self { dir }
        }

        fn respond(&self, subcommand: &str, output: &str) {
            std::fs::write(self.dir.path().join(subcommand), output).unwrap();
        }

        fn controller(&self) -> PulseController {
            let config = PulseConfig {
                pactl: self.dir.path().join("pactl").display().to_string(),
                ..PulseConfig::default()
            };
            PulseController {
                pactl: Tool::locate(&config.pactl).unwrap(),
                pacmd: None,
                config,
            }
        }

        fn calls(&self) -> Vec<String> {
            std::fs::read_to_string(self.dir.path().join("calls"))
                .unwrap_or_default()
                .lines()
                .map(str::to_string)
                .collect()
        }
    }

    const CARDS: &str = "\
Card #0
\tName: alsa_card.pci-0000_00_1f.3
\tDriver: module-alsa-card.c
\tActive Profile: output:analog-stereo+input:analog-stereo
Card #3
\tName: bluez_card.00_1B_66_AA_BB_CC
\tDriver: module-bluez5-device.c
\tActive Profile: headset_head_unit
";

    #[test]
    fn test_active_device_reads_default_sink_from_info() {
        let pactl = FakePactl::new();
        pactl.respond(
            "info",
            "Server Name: pulseaudio\nDefault Sink: bluez_sink.00_1B_66_AA_BB_CC.a2dp_sink\n",
        );

        assert_eq!(pactl.controller().active_device().unwrap(), Some(device()));
        assert_eq!(pactl.calls(), vec!["info"]);
    }

    #[test]
    fn test_active_device_ignores_wired_default_sink() {
        let pactl = FakePactl::new();
        pactl.respond("info", "Default Sink: alsa_output.pci-0000_00_1f.3.analog-stereo\n");

        assert_eq!(pactl.controller().active_device().unwrap(), None);
    }

    #[test]
    fn test_current_mode_maps_active_profile() {
        let pactl = FakePactl::new();
        pactl.respond("cards", CARDS);
        let mut controller = pactl.controller();

        assert_eq!(controller.current_mode(&device()).unwrap(), Some(DeviceMode::Duplex));
        assert_eq!(pactl.calls(), vec!["list cards"]);

        pactl.respond("cards", &CARDS.replace("headset_head_unit", "a2dp_sink"));
        assert_eq!(controller.current_mode(&device()).unwrap(), Some(DeviceMode::Stereo));

        pactl.respond("cards", &CARDS.replace("headset_head_unit", "off"));
        assert_eq!(controller.current_mode(&device()).unwrap(), None);
    }

    #[test]
    fn test_current_mode_of_unlisted_card_is_unresolved() {
        let pactl = FakePactl::new();
        pactl.respond("cards", CARDS);
        let card = DeviceId("bluez_card.11_22_33_44_55_66".to_string());

        assert!(matches!(
            pactl.controller().current_mode(&card),
            Err(SwitcherError::Unresolved(_))
        ));
    }

    #[test]
    fn test_volume_is_read_and_written_raw() {
        let pactl = FakePactl::new();
        pactl.respond(
            "get-sink-volume",
            "Volume: front-left: 26214 /  40% / -23.88 dB,   front-right: 26214 /  40% / -23.88 dB\n",
        );
        let mut controller = pactl.controller();
        let sink = "bluez_sink.00_1B_66_AA_BB_CC.a2dp_sink";

        assert_eq!(controller.output_volume(sink).unwrap(), Some(26_214));
        controller.set_output_volume(sink, 30_000).unwrap();

        assert_eq!(pactl.calls(), vec![
            format!("get-sink-volume {sink}"),
            format!("set-sink-volume {sink} 30000"),
        ]);
    }

    #[test]
    fn test_switch_commands() {
        let pactl = FakePactl::new();
        let mut controller = pactl.controller();

        controller.set_profile(&device(), DeviceMode::Duplex).unwrap();
        controller.set_default_input("bluez_source.00_1B_66_AA_BB_CC.headset_head_unit").unwrap();
        controller.set_default_output("bluez_sink.00_1B_66_AA_BB_CC.headset_head_unit").unwrap();
        controller
            .move_stream(StreamKind::Output, 12, "bluez_sink.00_1B_66_AA_BB_CC.headset_head_unit")
            .unwrap();
        controller
            .move_stream(StreamKind::Input, 7, "bluez_source.00_1B_66_AA_BB_CC.headset_head_unit")
            .unwrap();
        controller.set_mute(15, true).unwrap();
        controller.set_mute(15, false).unwrap();

        assert_eq!(pactl.calls(), vec![
            "set-card-profile bluez_card.00_1B_66_AA_BB_CC headset_head_unit",
            "set-default-source bluez_source.00_1B_66_AA_BB_CC.headset_head_unit",
            "set-default-sink bluez_sink.00_1B_66_AA_BB_CC.headset_head_unit",
            "move-sink-input 12 bluez_sink.00_1B_66_AA_BB_CC.headset_head_unit",
            "move-source-output 7 bluez_source.00_1B_66_AA_BB_CC.headset_head_unit",
            "set-sink-input-mute 15 1",
            "set-sink-input-mute 15 0",
        ]);
    }

    #[test]
    fn test_set_profile_uses_configured_profile_names() {
        let pactl = FakePactl::new();
        let mut controller = pactl.controller();
        controller.config.stereo_profile = "a2dp-sink-sbc".to_string();

        controller.set_profile(&device(), DeviceMode::Stereo).unwrap();

        assert_eq!(pactl.calls(), vec!["set-card-profile bluez_card.00_1B_66_AA_BB_CC a2dp-sink-sbc"]);
    }

    #[test]
    fn test_live_streams_lists_by_kind() {
        let pactl = FakePactl::new();
        pactl.respond(
            "sink-inputs",
            "Sink Input #12\n\tProperties:\n\t\tapplication.name = \"Skype\"\n",
        );
        pactl.respond("source-outputs", "");
        let mut controller = pactl.controller();

        let outputs = controller.live_streams(StreamKind::Output).unwrap();
        let inputs = controller.live_streams(StreamKind::Input).unwrap();

        assert_eq!(outputs, vec![LiveStream { id: 12, application: Some("Skype".to_string()) }]);
        assert!(inputs.is_empty());
        assert_eq!(pactl.calls(), vec!["list sink-inputs", "list source-outputs"]);
    }

    #[test]
    fn test_failing_command_is_reported() {
        let pactl = FakePactl::new();

        // No canned `cards` output, so `cat` exits non-zero.
        let err = pactl.controller().current_mode(&device()).unwrap_err();
        assert!(matches!(err, SwitcherError::Command { .. }));
        assert!(err.to_string().contains("pactl list cards"));
    }
}
