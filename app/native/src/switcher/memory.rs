//! Simulated audio server.
//!
//! [`MemoryController`] models a single Bluetooth card with a stereo and a
//! duplex profile. Only the sink of the active profile exists, so querying
//! the volume of the other one fails just like on a real server, and a
//! profile change brings the new sink up at full volume.

use std::collections::{BTreeMap, BTreeSet};

use tokio::sync::mpsc;

use super::controller::{
    AudioController, DeviceId, DeviceMode, Endpoints, LiveStream, PlaybackStream,
};
use super::event::{ServerEvent, StreamKind};
use super::source::EventSource;
use crate::error::SwitcherError;

const ADDRESS: &str = "00_1B_66_AA_BB_CC";
const BUILTIN_SINK: &str = "alsa_output.pci-0000_00_1f.3.analog-stereo";
const BUILTIN_SOURCE: &str = "alsa_input.pci-0000_00_1f.3.analog-stereo";
const FULL_VOLUME: u32 = 65_536;

/// A mutating call that reached the simulated server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    SetVolume { endpoint: String, level: u32 },
    SetProfile(DeviceMode),
    SetDefaultOutput(String),
    SetDefaultInput(String),
    MoveStream { kind: StreamKind, id: u32, endpoint: String },
    SetMute { id: u32, muted: bool },
}

#[derive(Debug, Clone)]
struct Stream {
    application: String,
    endpoint: String,
    muted: bool,
    resumable: bool,
}

/// In-memory [`AudioController`].
#[derive(Debug, Clone)]
pub struct MemoryController {
    connected: bool,
    mode: Option<DeviceMode>,
    volumes: BTreeMap<DeviceMode, u32>,
    default_output: String,
    default_input: Option<String>,
    outputs: BTreeMap<u32, Stream>,
    inputs: BTreeMap<u32, Stream>,
    next_id: u32,
    failing: BTreeSet<&'static str>,
    journal: Vec<Operation>,
    device_queries: usize,
}

impl Default for MemoryController {
    fn default() -> Self { Self::new() }
}

impl MemoryController {
    /// Creates a server with the headset connected in stereo mode at full volume.
    #[must_use]
    pub fn new() -> Self {
        let mut volumes = BTreeMap::new();
        volumes.insert(DeviceMode::Stereo, FULL_VOLUME);
        volumes.insert(DeviceMode::Duplex, FULL_VOLUME);

        Self {
            connected: true,
            mode: Some(DeviceMode::Stereo),
            volumes,
            default_output: sink(DeviceMode::Stereo),
            default_input: None,
            outputs: BTreeMap::new(),
            inputs: BTreeMap::new(),
            next_id: 1,
            failing: BTreeSet::new(),
            journal: Vec::new(),
            device_queries: 0,
        }
    }

    /// The simulated card.
    #[must_use]
    pub fn device(&self) -> DeviceId { DeviceId(format!("bluez_card.{ADDRESS}")) }

    /// Output endpoint name of the headset in `mode`.
    #[must_use]
    pub fn sink_name(&self, mode: DeviceMode) -> String { sink(mode) }

    /// Input endpoint name of the headset in duplex mode.
    #[must_use]
    pub fn source_name(&self) -> String { source() }

    /// Disconnects the headset; the default output falls back to the built-in card.
    pub fn disconnect(&mut self) {
        self.connected = false;
        self.default_output = BUILTIN_SINK.to_string();
    }

    /// Returns the applied profile.
    #[must_use]
    pub const fn mode(&self) -> Option<DeviceMode> { self.mode }

    /// Forces the applied profile, e.g. to something neither mode maps to.
    pub const fn set_mode(&mut self, mode: Option<DeviceMode>) { self.mode = mode; }

    /// Returns the stored volume of the headset sink in `mode`.
    #[must_use]
    pub fn volume_of(&self, mode: DeviceMode) -> Option<u32> { self.volumes.get(&mode).copied() }

    /// Sets the volume of the headset sink in `mode` as if changed by the user.
    pub fn set_volume_of(&mut self, mode: DeviceMode, level: u32) {
        self.volumes.insert(mode, level);
    }

    /// Returns the current default output.
    #[must_use]
    pub fn default_output(&self) -> String { self.default_output.clone() }

    /// Returns the current default input, if one was set.
    #[must_use]
    pub fn default_input(&self) -> Option<String> { self.default_input.clone() }

    /// Opens a stream on the current default endpoint and returns its id.
    pub fn open_stream(&mut self, kind: StreamKind, application: &str) -> u32 {
        self.open(kind, application, true)
    }

    /// Opens a playback stream with an explicit resume hint.
    pub fn open_playback(&mut self, application: &str, resumable: bool) -> u32 {
        self.open(StreamKind::Output, application, resumable)
    }

    fn open(&mut self, kind: StreamKind, application: &str, resumable: bool) -> u32 {
        let id = self.next_id;
        self.next_id += 1;

        let endpoint = match kind {
            StreamKind::Output => self.default_output.clone(),
            StreamKind::Input => {
                self.default_input.clone().unwrap_or_else(|| BUILTIN_SOURCE.to_string())
            }
        };
        self.streams_mut(kind).insert(id, Stream {
            application: application.to_string(),
            endpoint,
            muted: false,
            resumable,
        });
        id
    }

    /// Closes a stream. Returns `false` if it did not exist.
    pub fn close_stream(&mut self, kind: StreamKind, id: u32) -> bool {
        self.streams_mut(kind).remove(&id).is_some()
    }

    /// Returns the endpoint a stream is attached to.
    #[must_use]
    pub fn stream_endpoint(&self, kind: StreamKind, id: u32) -> Option<String> {
        self.streams(kind).get(&id).map(|stream| stream.endpoint.clone())
    }

    /// Returns whether an output stream is muted.
    #[must_use]
    pub fn is_muted(&self, id: u32) -> bool { self.outputs.get(&id).is_some_and(|s| s.muted) }

    /// Makes every later call of `operation` fail, e.g. `"set_mute"`.
    pub fn fail_on(&mut self, operation: &'static str) { self.failing.insert(operation); }

    /// Mutating calls that succeeded, in order.
    #[must_use]
    pub fn journal(&self) -> &[Operation] { &self.journal }

    /// Number of times the active device was queried.
    #[must_use]
    pub const fn device_queries(&self) -> usize { self.device_queries }

    const fn streams(&self, kind: StreamKind) -> &BTreeMap<u32, Stream> {
        match kind {
            StreamKind::Output => &self.outputs,
            StreamKind::Input => &self.inputs,
        }
    }

    const fn streams_mut(&mut self, kind: StreamKind) -> &mut BTreeMap<u32, Stream> {
        match kind {
            StreamKind::Output => &mut self.outputs,
            StreamKind::Input => &mut self.inputs,
        }
    }

    fn check(&self, operation: &'static str) -> Result<(), SwitcherError> {
        if self.failing.contains(operation) {
            return Err(SwitcherError::command(operation, "injected failure"));
        }
        Ok(())
    }

    fn check_device(&self, device: &DeviceId) -> Result<(), SwitcherError> {
        if self.connected && *device == self.device() {
            Ok(())
        } else {
            Err(SwitcherError::Unresolved(format!("no such card: {device}")))
        }
    }

    /// The headset mode whose sink is named `endpoint`, if that sink exists now.
    fn live_sink(&self, endpoint: &str) -> Option<DeviceMode> {
        let mode = self.mode?;
        (self.connected && endpoint == sink(mode)).then_some(mode)
    }
}

fn sink(mode: DeviceMode) -> String {
    match mode {
        DeviceMode::Stereo => format!("bluez_sink.{ADDRESS}.a2dp_sink"),
        DeviceMode::Duplex => format!("bluez_sink.{ADDRESS}.headset_head_unit"),
    }
}

fn source() -> String { format!("bluez_source.{ADDRESS}.headset_head_unit") }

impl AudioController for MemoryController {
    fn active_device(&mut self) -> Result<Option<DeviceId>, SwitcherError> {
        self.device_queries += 1;
        self.check("active_device")?;
        Ok((self.connected && self.default_output.starts_with("bluez_sink."))
            .then(|| self.device()))
    }

    fn current_mode(&mut self, device: &DeviceId) -> Result<Option<DeviceMode>, SwitcherError> {
        self.check("current_mode")?;
        self.check_device(device)?;
        Ok(self.mode)
    }

    fn endpoints(&mut self, device: &DeviceId, mode: DeviceMode) -> Result<Endpoints, SwitcherError> {
        if self.failing.contains("endpoints") {
            return Err(SwitcherError::Unresolved("injected failure".to_string()));
        }
        self.check_device(device)?;
        Ok(Endpoints {
            output: sink(mode),
            input: (mode == DeviceMode::Duplex).then(source),
        })
    }

    fn output_volume(&mut self, endpoint: &str) -> Result<Option<u32>, SwitcherError> {
        self.check("output_volume")?;
        match self.live_sink(endpoint) {
            Some(mode) => Ok(self.volumes.get(&mode).copied()),
            None => Err(SwitcherError::command("get-sink-volume", format!("no such sink: {endpoint}"))),
        }
    }

    fn set_output_volume(&mut self, endpoint: &str, level: u32) -> Result<(), SwitcherError> {
        self.check("set_output_volume")?;
        let Some(mode) = self.live_sink(endpoint) else {
            return Err(SwitcherError::command("set-sink-volume", format!("no such sink: {endpoint}")));
        };
        self.volumes.insert(mode, level);
        self.journal.push(Operation::SetVolume { endpoint: endpoint.to_string(), level });
        Ok(())
    }

    fn set_profile(&mut self, device: &DeviceId, mode: DeviceMode) -> Result<(), SwitcherError> {
        self.check("set_profile")?;
        self.check_device(device)?;
        if self.mode != Some(mode) {
            // The sink of the new profile comes up at its default volume.
            self.volumes.insert(mode, FULL_VOLUME);
        }
        self.mode = Some(mode);
        self.journal.push(Operation::SetProfile(mode));
        Ok(())
    }

    fn set_default_output(&mut self, endpoint: &str) -> Result<(), SwitcherError> {
        self.check("set_default_output")?;
        self.default_output = endpoint.to_string();
        self.journal.push(Operation::SetDefaultOutput(endpoint.to_string()));
        Ok(())
    }

    fn set_default_input(&mut self, endpoint: &str) -> Result<(), SwitcherError> {
        self.check("set_default_input")?;
        self.default_input = Some(endpoint.to_string());
        self.journal.push(Operation::SetDefaultInput(endpoint.to_string()));
        Ok(())
    }

    fn move_stream(&mut self, kind: StreamKind, id: u32, endpoint: &str) -> Result<(), SwitcherError> {
        self.check("move_stream")?;
        let Some(stream) = self.streams_mut(kind).get_mut(&id) else {
            return Err(SwitcherError::command("move-stream", format!("no such {kind} stream: {id}")));
        };
        stream.endpoint = endpoint.to_string();
        self.journal.push(Operation::MoveStream { kind, id, endpoint: endpoint.to_string() });
        Ok(())
    }

    fn unmuted_output_streams(
        &mut self,
        excluding: &BTreeSet<u32>,
    ) -> Result<Vec<PlaybackStream>, SwitcherError> {
        self.check("unmuted_output_streams")?;
        Ok(self
            .outputs
            .iter()
            .filter(|(id, stream)| !stream.muted && !excluding.contains(id))
            .map(|(id, stream)| PlaybackStream {
                id: *id,
                application: stream.application.clone(),
                resumable: stream.resumable,
            })
            .collect())
    }

    fn set_mute(&mut self, id: u32, muted: bool) -> Result<(), SwitcherError> {
        self.check("set_mute")?;
        let Some(stream) = self.outputs.get_mut(&id) else {
            return Err(SwitcherError::command("set-sink-input-mute", format!("no such output stream: {id}")));
        };
        stream.muted = muted;
        self.journal.push(Operation::SetMute { id, muted });
        Ok(())
    }

    fn live_streams(&mut self, kind: StreamKind) -> Result<Vec<LiveStream>, SwitcherError> {
        self.check("live_streams")?;
        Ok(self
            .streams(kind)
            .iter()
            .map(|(id, stream)| LiveStream { id: *id, application: Some(stream.application.clone()) })
            .collect())
    }
}

/// Event feed backed by a channel.
///
/// Reports the server as unavailable for the first `unavailable_for`
/// subscriptions. The channel can only be handed out once.
#[derive(Debug)]
pub struct MemorySource {
    events: Option<mpsc::Receiver<ServerEvent>>,
    unavailable_for: u32,
    attempts: u32,
}

impl MemorySource {
    /// Creates a source and the sender that feeds it.
    #[must_use]
    pub fn new(capacity: usize) -> (mpsc::Sender<ServerEvent>, Self) {
        let (tx, rx) = mpsc::channel(capacity);
        let source = Self {
            events: Some(rx),
            unavailable_for: 0,
            attempts: 0,
        };
        (tx, source)
    }

    /// Fails the first `attempts` subscriptions as unavailable.
    #[must_use]
    pub const fn unavailable_for(mut self, attempts: u32) -> Self {
        self.unavailable_for = attempts;
        self
    }

    /// Number of subscription attempts so far.
    #[must_use]
    pub const fn attempts(&self) -> u32 { self.attempts }
}

impl EventSource for MemorySource {
    async fn subscribe(&mut self) -> Result<mpsc::Receiver<ServerEvent>, SwitcherError> {
        self.attempts += 1;
        if self.attempts <= self.unavailable_for {
            return Err(SwitcherError::Unavailable("server not started".to_string()));
        }
        self.events.take().ok_or(SwitcherError::FeedClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_connected_in_stereo() {
        let mut controller = MemoryController::new();
        let device = controller.active_device().unwrap();

        assert_eq!(device, Some(controller.device()));
        assert_eq!(controller.current_mode(&controller.device()).unwrap(), Some(DeviceMode::Stereo));
        assert_eq!(controller.device_queries(), 1);
    }

    #[test]
    fn disconnected_headset_is_not_active() {
        let mut controller = MemoryController::new();
        controller.disconnect();
        assert_eq!(controller.active_device().unwrap(), None);
    }

    #[test]
    fn inactive_profile_sink_has_no_volume() {
        let mut controller = MemoryController::new();
        let duplex = controller.sink_name(DeviceMode::Duplex);

        assert!(controller.output_volume(&duplex).is_err());
        assert!(controller.set_output_volume(&duplex, 10).is_err());

        let stereo = controller.sink_name(DeviceMode::Stereo);
        assert_eq!(controller.output_volume(&stereo).unwrap(), Some(FULL_VOLUME));
    }

    #[test]
    fn injected_failures_only_hit_the_named_operation() {
        let mut controller = MemoryController::new();
        controller.fail_on("live_streams");

        assert!(controller.live_streams(StreamKind::Output).is_err());
        assert!(controller.active_device().unwrap().is_some());
    }

    #[test]
    fn profile_change_resets_the_new_sink_volume() {
        let mut controller = MemoryController::new();
        let device = controller.device();
        controller.set_volume_of(DeviceMode::Stereo, 26_214);
        controller.set_volume_of(DeviceMode::Duplex, 30_000);

        controller.set_profile(&device, DeviceMode::Duplex).unwrap();
        assert_eq!(controller.volume_of(DeviceMode::Duplex), Some(FULL_VOLUME));

        controller.set_profile(&device, DeviceMode::Stereo).unwrap();
        assert_eq!(controller.volume_of(DeviceMode::Stereo), Some(FULL_VOLUME));

        // Re-applying the active profile leaves its sink alone.
        controller.set_volume_of(DeviceMode::Stereo, 26_214);
        controller.set_profile(&device, DeviceMode::Stereo).unwrap();
        assert_eq!(controller.volume_of(DeviceMode::Stereo), Some(26_214));
    }

    #[test]
    fn streams_open_on_default_endpoints() {
        let mut controller = MemoryController::new();
        let output = controller.open_stream(StreamKind::Output, "Skype");
        let input = controller.open_stream(StreamKind::Input, "Skype");

        assert_eq!(
            controller.stream_endpoint(StreamKind::Output, output),
            Some(controller.sink_name(DeviceMode::Stereo))
        );
        assert_eq!(controller.stream_endpoint(StreamKind::Input, input).as_deref(), Some(BUILTIN_SOURCE));
        assert_ne!(output, input);
    }

    #[tokio::test]
    async fn source_hands_out_its_channel_once() {
        let (_tx, mut source) = MemorySource::new(4);
        assert!(source.subscribe().await.is_ok());
        assert!(matches!(source.subscribe().await, Err(SwitcherError::FeedClosed)));
    }

    #[test]
    fn mute_of_closed_stream_fails() {
        let mut controller = MemoryController::new();
        let id = controller.open_playback("Rhythmbox", true);
        assert!(controller.close_stream(StreamKind::Output, id));

        assert!(controller.set_mute(id, true).is_err());
        assert!(controller.journal().is_empty());
    }
}
