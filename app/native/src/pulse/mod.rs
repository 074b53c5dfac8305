//! PulseAudio adapters.
//!
//! Both adapters drive the `pactl` command line tool (and `pacmd` where
//! `pactl` lacks the information), so they work against PulseAudio as well
//! as `pipewire-pulse`.

pub mod command;
mod controller;
pub mod parse;
mod subscribe;

pub use controller::PulseController;
pub use subscribe::PactlEventSource;
