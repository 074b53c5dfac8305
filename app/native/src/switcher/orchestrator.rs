//! Mode transitions.
//!
//! A transition is a sequence of audio server commands. Only a failure to
//! resolve the device endpoints aborts it; every other failed command is
//! logged and the remaining steps still run. Nothing is rolled back.

use std::collections::{BTreeMap, BTreeSet};

use super::controller::{AudioController, DeviceId, DeviceMode};
use super::event::StreamKind;
use super::registry::ConnectionRegistry;
use crate::error::SwitcherError;

/// The output volume of the most recently vacated endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VolumeMemory {
    level: Option<u32>,
}

impl VolumeMemory {
    /// Returns the remembered level, if any.
    #[must_use]
    pub const fn get(&self) -> Option<u32> { self.level }

    /// Replaces the remembered level and returns the previous one.
    pub const fn replace(&mut self, level: Option<u32>) -> Option<u32> {
        std::mem::replace(&mut self.level, level)
    }
}

/// Playback streams muted when entering duplex mode, by stream id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MuteLedger {
    entries: BTreeMap<u32, String>,
}

impl MuteLedger {
    /// Records a muted stream.
    pub fn record(&mut self, id: u32, application: impl Into<String>) {
        self.entries.insert(id, application.into());
    }

    /// Returns whether no stream is muted.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    /// Muted stream ids, ascending.
    pub fn ids(&self) -> impl Iterator<Item = u32> + '_ { self.entries.keys().copied() }

    /// Empties the ledger, returning its entries.
    pub fn take(&mut self) -> BTreeMap<u32, String> { std::mem::take(&mut self.entries) }
}

/// Logs a failed best-effort step. Returns whether the step succeeded.
fn attempt(step: &str, result: Result<(), SwitcherError>) -> bool {
    match result {
        Ok(()) => true,
        Err(err) => {
            tracing::warn!(step, error = %err, "transition step failed, continuing");
            false
        }
    }
}

/// Runs the multi-step transitions between stereo and duplex mode.
#[derive(Debug, Clone, Default)]
pub struct SwitchOrchestrator {
    mute_on_duplex: bool,
    volume: VolumeMemory,
    muted: MuteLedger,
}

impl SwitchOrchestrator {
    /// Creates an orchestrator with empty volume memory and mute ledger.
    #[must_use]
    pub fn new(mute_on_duplex: bool) -> Self {
        Self {
            mute_on_duplex,
            ..Self::default()
        }
    }

    /// Returns the volume memory.
    #[must_use]
    pub const fn volume_memory(&self) -> &VolumeMemory { &self.volume }

    /// Returns the mute ledger.
    #[must_use]
    pub const fn mute_ledger(&self) -> &MuteLedger { &self.muted }

    /// Switches `device` from stereo to duplex mode.
    ///
    /// Mutes unrelated resumable playback (if enabled), changes the profile,
    /// moves the default endpoints and every tracked stream onto the duplex
    /// endpoints and restores the last duplex-mode volume.
    ///
    /// # Errors
    ///
    /// Returns an error only if the endpoints cannot be resolved, in which
    /// case no command has been issued.
    pub fn enter_duplex<C: AudioController + ?Sized>(
        &mut self,
        controller: &mut C,
        device: &DeviceId,
        registry: &ConnectionRegistry,
    ) -> Result<(), SwitcherError> {
        let from = controller.endpoints(device, DeviceMode::Stereo)?;
        let to = controller.endpoints(device, DeviceMode::Duplex)?;
        let Some(input) = to.input.as_deref() else {
            return Err(SwitcherError::Unresolved(format!(
                "{device} exposes no input endpoint in duplex mode"
            )));
        };

        let pending = vacated_volume(controller, &from.output, &to.output);

        if self.mute_on_duplex {
            self.mute_unrelated(controller, registry);
        }

        tracing::info!(%device, output = %to.output, input, "switching to duplex mode");
        attempt("set profile", controller.set_profile(device, DeviceMode::Duplex));
        attempt("set default input", controller.set_default_input(input));
        attempt("set default output", controller.set_default_output(&to.output));

        for connection in registry.snapshot() {
            let endpoint = match connection.kind {
                StreamKind::Output => to.output.as_str(),
                StreamKind::Input => input,
            };
            attempt(
                "move stream",
                controller.move_stream(connection.kind, connection.id, endpoint),
            );
        }

        if let Some(level) = self.volume.get() {
            tracing::info!(level, "restoring duplex volume");
            attempt("restore volume", controller.set_output_volume(&to.output, level));
        }
        self.volume.replace(pending);

        Ok(())
    }

    /// Switches `device` from duplex back to stereo mode.
    ///
    /// Changes the profile, moves the default output, restores the last
    /// stereo-mode volume and unmutes every stream muted on entry.
    ///
    /// # Errors
    ///
    /// Returns an error only if the endpoints cannot be resolved, in which
    /// case no command has been issued.
    pub fn leave_duplex<C: AudioController + ?Sized>(
        &mut self,
        controller: &mut C,
        device: &DeviceId,
    ) -> Result<(), SwitcherError> {
        let from = controller.endpoints(device, DeviceMode::Duplex)?;
        let to = controller.endpoints(device, DeviceMode::Stereo)?;

        let pending = vacated_volume(controller, &from.output, &to.output);

        tracing::info!(%device, output = %to.output, "switching back to stereo mode");
        attempt("set profile", controller.set_profile(device, DeviceMode::Stereo));
        attempt("set default output", controller.set_default_output(&to.output));

        if let Some(level) = self.volume.get() {
            tracing::info!(level, "restoring stereo volume");
            attempt("restore volume", controller.set_output_volume(&to.output, level));
        }
        self.volume.replace(pending);

        self.unmute_all(controller);
        Ok(())
    }

    fn mute_unrelated<C: AudioController + ?Sized>(
        &mut self,
        controller: &mut C,
        registry: &ConnectionRegistry,
    ) {
        let tracked: BTreeSet<u32> = registry.ids(StreamKind::Output).collect();
        let streams = match controller.unmuted_output_streams(&tracked) {
            Ok(streams) => streams,
            Err(err) => {
                tracing::warn!(error = %err, "cannot list playback streams, not muting");
                return;
            }
        };

        let mut applications = BTreeSet::new();
        for stream in streams {
            if tracked.contains(&stream.id) {
                continue;
            }
            if !stream.resumable {
                tracing::debug!(id = stream.id, application = %stream.application, "not muting stream that cannot resume");
                continue;
            }
            if attempt("mute stream", controller.set_mute(stream.id, true)) {
                applications.insert(stream.application.clone());
                self.muted.record(stream.id, stream.application);
            }
        }

        if !applications.is_empty() {
            let names: Vec<&str> = applications.iter().map(String::as_str).collect();
            tracing::info!(applications = %names.join(" "), "muted playback");
        }
    }

    fn unmute_all<C: AudioController + ?Sized>(&mut self, controller: &mut C) {
        let muted = self.muted.take();
        if muted.is_empty() {
            return;
        }

        tracing::info!(count = muted.len(), "unmuting playback");
        for (id, application) in muted {
            if let Err(err) = controller.set_mute(id, false) {
                tracing::debug!(id, %application, error = %err, "stream vanished before unmute");
            }
        }
    }
}

/// Volume of the endpoint being left, if the transition changes the output at all.
fn vacated_volume<C: AudioController + ?Sized>(
    controller: &mut C,
    from: &str,
    to: &str,
) -> Option<u32> {
    if from == to {
        return None;
    }
    read_volume(controller, from)
}

fn read_volume<C: AudioController + ?Sized>(controller: &mut C, endpoint: &str) -> Option<u32> {
    match controller.output_volume(endpoint) {
        Ok(level) => {
            tracing::debug!(endpoint, ?level, "read output volume");
            level
        }
        Err(err) => {
            tracing::warn!(endpoint, error = %err, "cannot read output volume");
            None
        }
    }
}
