//! The switching engine.
//!
//! All registry mutations and mode decisions happen on one task, strictly in
//! event order. Events re-arm the debouncer; once it settles the engine
//! queries the server for the device and its mode and runs at most one
//! transition to completion before looking at the next event.

use std::time::Duration;

use tokio::sync::mpsc;

use super::classifier::ClientClassifier;
use super::controller::{AudioController, DeviceMode};
use super::debounce::Debouncer;
use super::decision::{should_enter_duplex, should_leave_duplex};
use super::event::{ServerEvent, StreamKind};
use super::orchestrator::SwitchOrchestrator;
use super::registry::ConnectionRegistry;
use super::source::{EventSource, connect};
use crate::config::AutoduplexConfig;
use crate::error::SwitcherError;

/// Owns the switching state and drives it from the event feed.
#[derive(Debug)]
pub struct Engine<C> {
    classifier: ClientClassifier,
    registry: ConnectionRegistry,
    orchestrator: SwitchOrchestrator,
    controller: C,
    debouncer: Debouncer,
    startup_wait: Duration,
    startup_poll: Duration,
}

impl<C: AudioController> Engine<C> {
    /// Creates an engine with an empty registry.
    ///
    /// # Errors
    ///
    /// Returns [`SwitcherError::Config`] if a client pattern is invalid.
    pub fn new(config: &AutoduplexConfig, controller: C) -> Result<Self, SwitcherError> {
        Ok(Self {
            classifier: ClientClassifier::new(&config.clients)?,
            registry: ConnectionRegistry::new(),
            orchestrator: SwitchOrchestrator::new(config.mute_on_duplex),
            controller,
            debouncer: Debouncer::new(config.debounce()),
            startup_wait: config.startup_wait(),
            startup_poll: config.startup_poll(),
        })
    }

    /// Returns the tracked connections.
    #[must_use]
    pub const fn registry(&self) -> &ConnectionRegistry { &self.registry }

    /// Returns the transition state.
    #[must_use]
    pub const fn orchestrator(&self) -> &SwitchOrchestrator { &self.orchestrator }

    /// Returns the audio controller.
    #[must_use]
    pub const fn controller(&self) -> &C { &self.controller }

    /// Returns the audio controller mutably.
    pub const fn controller_mut(&mut self) -> &mut C { &mut self.controller }

    /// Returns whether an evaluation is pending.
    #[must_use]
    pub const fn is_settling(&self) -> bool { self.debouncer.is_armed() }

    /// Subscribes to `source`, reconciles with the live streams and runs
    /// until the feed ends.
    ///
    /// # Errors
    ///
    /// Returns [`SwitcherError::Unavailable`] if the server did not become
    /// reachable within the startup window, and [`SwitcherError::FeedClosed`]
    /// once a running feed terminates.
    pub async fn start<S: EventSource>(&mut self, source: &mut S) -> Result<(), SwitcherError> {
        let mut events = connect(source, self.startup_wait, self.startup_poll).await?;
        self.reconcile();
        self.run(&mut events).await
    }

    /// Tracks the streams that were already live before the feed was opened.
    ///
    /// Returns the number of connections tracked.
    pub fn reconcile(&mut self) -> usize {
        let mut tracked = 0;
        for kind in StreamKind::ALL {
            let streams = match self.controller.live_streams(kind) {
                Ok(streams) => streams,
                Err(err) => {
                    tracing::warn!(%kind, error = %err, "cannot list live streams");
                    continue;
                }
            };

            for stream in streams {
                let event = ServerEvent::New {
                    kind,
                    id: stream.id,
                    application: stream.application,
                };
                if self.track(event) {
                    tracked += 1;
                }
            }
        }

        tracing::info!(tracked, "reconciled with live streams");
        tracked
    }

    /// Applies one event to the registry.
    ///
    /// Returns whether the event was accepted, in which case an evaluation
    /// is scheduled after the quiet period.
    pub fn handle_event(&mut self, event: ServerEvent) -> bool {
        let accepted = self.track(event);
        if accepted {
            self.debouncer.arm();
        }
        accepted
    }

    fn track(&mut self, event: ServerEvent) -> bool {
        match event {
            ServerEvent::New { kind, id, application } => {
                let Some(application) = application else {
                    tracing::debug!(%kind, id, "stream without application name");
                    return false;
                };
                let Some(client) = self.classifier.classify(kind, &application) else {
                    return false;
                };
                tracing::info!(%kind, id, %client, "tracking connection");
                self.registry.insert(kind, id, client);
                true
            }
            ServerEvent::Remove { kind, id } => {
                if self.registry.remove(kind, id) {
                    tracing::info!(%kind, id, "connection closed");
                    true
                } else {
                    tracing::debug!(%kind, id, "ignoring remove of untracked stream");
                    false
                }
            }
        }
    }

    /// Decides whether the device has to switch and performs the transition.
    ///
    /// Returns the mode switched into, if any.
    pub fn evaluate(&mut self) -> Option<DeviceMode> {
        tracing::debug!(
            outputs = self.registry.len(StreamKind::Output),
            inputs = self.registry.len(StreamKind::Input),
            "settled, evaluating"
        );

        let device = match self.controller.active_device() {
            Ok(Some(device)) => device,
            Ok(None) => {
                tracing::debug!("no Bluetooth headset in use");
                return None;
            }
            Err(err) => {
                tracing::warn!(error = %err, "cannot determine active device");
                return None;
            }
        };

        let mode = match self.controller.current_mode(&device) {
            Ok(mode) => mode,
            Err(err) => {
                tracing::warn!(%device, error = %err, "cannot determine device mode");
                return None;
            }
        };

        let target = if mode != Some(DeviceMode::Duplex) && should_enter_duplex(&self.registry) {
            DeviceMode::Duplex
        } else if let Some(current) = mode
            && should_leave_duplex(&self.registry, current, &self.classifier)
        {
            DeviceMode::Stereo
        } else {
            tracing::debug!(%device, mode = ?mode, "no switch needed");
            return None;
        };

        let result = match target {
            DeviceMode::Duplex => {
                self.orchestrator.enter_duplex(&mut self.controller, &device, &self.registry)
            }
            DeviceMode::Stereo => self.orchestrator.leave_duplex(&mut self.controller, &device),
        };

        match result {
            Ok(()) => {
                tracing::info!(%device, mode = %target, "switched");
                Some(target)
            }
            Err(err) => {
                tracing::warn!(%device, mode = %target, error = %err, "switch aborted");
                None
            }
        }
    }

    /// Processes events until the feed ends.
    ///
    /// If the registry already holds connections, an evaluation is scheduled
    /// right away.
    ///
    /// # Errors
    ///
    /// Always ends with [`SwitcherError::FeedClosed`].
    pub async fn run(
        &mut self,
        events: &mut mpsc::Receiver<ServerEvent>,
    ) -> Result<(), SwitcherError> {
        if !self.registry.is_empty() {
            self.debouncer.arm();
        }

        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => {
                        self.handle_event(event);
                    }
                    None => {
                        self.debouncer.disarm();
                        return Err(SwitcherError::FeedClosed);
                    }
                },
                () = self.debouncer.settled() => {
                    self.evaluate();
                }
            }
        }
    }
}
