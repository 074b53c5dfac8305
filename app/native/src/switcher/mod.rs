//! Headset mode switching.
//!
//! Stream events from the audio server are classified and tracked in a
//! [`ConnectionRegistry`]. Once the event feed has been quiet for the
//! debounce interval, the [`Engine`] decides whether the headset has to
//! switch between stereo and duplex mode and runs the transition through an
//! [`AudioController`].

mod classifier;
mod controller;
mod debounce;
mod decision;
mod engine;
mod event;
pub mod memory;
mod orchestrator;
mod registry;
mod source;

pub use classifier::ClientClassifier;
pub use controller::{AudioController, DeviceId, DeviceMode, Endpoints, LiveStream, PlaybackStream};
pub use debounce::Debouncer;
pub use decision::{should_enter_duplex, should_leave_duplex};
pub use engine::Engine;
pub use event::{ServerEvent, StreamKind};
pub use memory::{MemoryController, MemorySource};
pub use orchestrator::{MuteLedger, SwitchOrchestrator, VolumeMemory};
pub use registry::{Connection, ConnectionRegistry, Holdings};
pub use source::{EventSource, connect};
