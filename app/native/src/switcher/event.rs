//! Stream lifecycle events delivered by the audio server.

use std::fmt;

/// The two kinds of stream a duplex client opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StreamKind {
    /// A playback stream (PulseAudio "sink input").
    Output,
    /// A capture stream (PulseAudio "source output").
    Input,
}

impl StreamKind {
    /// Both stream kinds, outputs first.
    pub const ALL: [Self; 2] = [Self::Output, Self::Input];
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Output => f.write_str("output"),
            Self::Input => f.write_str("input"),
        }
    }
}

/// A single record from the event feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    /// A stream was created.
    New {
        /// Kind of the new stream.
        kind: StreamKind,
        /// Server-assigned identifier, unique among live streams of `kind`.
        id: u32,
        /// Application that owns the stream, if it could be determined.
        application: Option<String>,
    },
    /// A stream was destroyed.
    Remove {
        /// Kind of the removed stream.
        kind: StreamKind,
        /// Identifier of the removed stream.
        id: u32,
    },
}

impl ServerEvent {
    /// Creates a `New` event for an application.
    pub fn new_stream(kind: StreamKind, id: u32, application: impl Into<String>) -> Self {
        Self::New {
            kind,
            id,
            application: Some(application.into()),
        }
    }

    /// Creates a `Remove` event.
    #[must_use]
    pub const fn removed(kind: StreamKind, id: u32) -> Self { Self::Remove { kind, id } }
}
