//! Interface to the audio server.
//!
//! The engine only talks to the audio server through [`AudioController`].
//! How queries and commands reach the server (and how their output is
//! parsed) is up to the implementation.

use std::collections::BTreeSet;
use std::fmt;

use super::event::StreamKind;
use crate::error::SwitcherError;

/// The two mutually exclusive operating modes of the headset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DeviceMode {
    /// High-fidelity, output-only playback (A2DP).
    Stereo,
    /// Mono microphone and speaker (HSP/HFP).
    Duplex,
}

impl fmt::Display for DeviceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stereo => f.write_str("stereo"),
            Self::Duplex => f.write_str("duplex"),
        }
    }
}

/// Identifies the active headset (a PulseAudio card name).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceId(pub String);

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

/// The endpoints a device exposes in one mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// Output endpoint (sink) name.
    pub output: String,
    /// Input endpoint (source) name. Stereo mode has none.
    pub input: Option<String>,
}

/// A live stream as reported by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveStream {
    /// Stream identifier.
    pub id: u32,
    /// Owning application, if known.
    pub application: Option<String>,
}

/// An unmuted playback stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackStream {
    /// Stream identifier.
    pub id: u32,
    /// Owning application.
    pub application: String,
    /// Whether the server flagged the stream as resumable after muting.
    pub resumable: bool,
}

/// Queries and commands the switching engine needs from the audio server.
///
/// Every call may fail. Calls are blocking and issued one at a time.
pub trait AudioController {
    /// Returns the Bluetooth device currently in use, if any.
    fn active_device(&mut self) -> Result<Option<DeviceId>, SwitcherError>;

    /// Returns the mode the device is in, or `None` if it is in neither mode.
    fn current_mode(&mut self, device: &DeviceId) -> Result<Option<DeviceMode>, SwitcherError>;

    /// Resolves the endpoint names the device exposes in `mode`.
    fn endpoints(&mut self, device: &DeviceId, mode: DeviceMode) -> Result<Endpoints, SwitcherError>;

    /// Returns the volume of an output endpoint, if it can be determined.
    fn output_volume(&mut self, endpoint: &str) -> Result<Option<u32>, SwitcherError>;

    /// Sets the volume of an output endpoint.
    fn set_output_volume(&mut self, endpoint: &str, level: u32) -> Result<(), SwitcherError>;

    /// Switches the device to `mode`.
    fn set_profile(&mut self, device: &DeviceId, mode: DeviceMode) -> Result<(), SwitcherError>;

    /// Makes `endpoint` the default output.
    fn set_default_output(&mut self, endpoint: &str) -> Result<(), SwitcherError>;

    /// Makes `endpoint` the default input.
    fn set_default_input(&mut self, endpoint: &str) -> Result<(), SwitcherError>;

    /// Moves a stream onto `endpoint`.
    fn move_stream(&mut self, kind: StreamKind, id: u32, endpoint: &str) -> Result<(), SwitcherError>;

    /// Lists unmuted playback streams whose id is not in `excluding`.
    fn unmuted_output_streams(
        &mut self,
        excluding: &BTreeSet<u32>,
    ) -> Result<Vec<PlaybackStream>, SwitcherError>;

    /// Mutes or unmutes a playback stream.
    fn set_mute(&mut self, id: u32, muted: bool) -> Result<(), SwitcherError>;

    /// Lists every live stream of one kind.
    fn live_streams(&mut self, kind: StreamKind) -> Result<Vec<LiveStream>, SwitcherError>;
}
