//! Table of live tracked connections.

use std::collections::BTreeMap;

use super::event::StreamKind;

/// One tracked stream attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    /// Stream kind.
    pub kind: StreamKind,
    /// Server-assigned stream identifier.
    pub id: u32,
    /// Canonical client name.
    pub client: String,
}

/// Which stream kinds a single client currently holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Holdings {
    /// At least one output stream is live.
    pub output: bool,
    /// At least one input stream is live.
    pub input: bool,
}

impl Holdings {
    /// Number of stream kinds held (0, 1 or 2).
    #[must_use]
    pub const fn kinds(self) -> u8 { self.output as u8 + self.input as u8 }
}

/// Live tracked connections, keyed by stream kind and identifier.
///
/// Only classified clients are ever inserted.
#[derive(Debug, Clone, Default)]
pub struct ConnectionRegistry {
    outputs: BTreeMap<u32, String>,
    inputs: BTreeMap<u32, String>,
}

impl ConnectionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    const fn table(&self, kind: StreamKind) -> &BTreeMap<u32, String> {
        match kind {
            StreamKind::Output => &self.outputs,
            StreamKind::Input => &self.inputs,
        }
    }

    const fn table_mut(&mut self, kind: StreamKind) -> &mut BTreeMap<u32, String> {
        match kind {
            StreamKind::Output => &mut self.outputs,
            StreamKind::Input => &mut self.inputs,
        }
    }

    /// Tracks a connection. A later insert for the same `(kind, id)` wins.
    pub fn insert(&mut self, kind: StreamKind, id: u32, client: impl Into<String>) {
        self.table_mut(kind).insert(id, client.into());
    }

    /// Stops tracking a connection.
    ///
    /// Returns `false` if the connection was not tracked.
    pub fn remove(&mut self, kind: StreamKind, id: u32) -> bool {
        self.table_mut(kind).remove(&id).is_some()
    }

    /// Returns the client tracked under `(kind, id)`.
    #[must_use]
    pub fn get(&self, kind: StreamKind, id: u32) -> Option<&str> {
        self.table(kind).get(&id).map(String::as_str)
    }

    /// Returns whether `(kind, id)` is tracked.
    #[must_use]
    pub fn contains(&self, kind: StreamKind, id: u32) -> bool { self.table(kind).contains_key(&id) }

    /// Number of tracked connections of one kind.
    #[must_use]
    pub fn len(&self, kind: StreamKind) -> usize { self.table(kind).len() }

    /// Returns whether nothing is tracked at all.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.outputs.is_empty() && self.inputs.is_empty() }

    /// Identifiers of tracked connections of one kind, in ascending order.
    pub fn ids(&self, kind: StreamKind) -> impl Iterator<Item = u32> + '_ {
        self.table(kind).keys().copied()
    }

    /// Returns a copy of every tracked connection, outputs first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Connection> {
        StreamKind::ALL
            .into_iter()
            .flat_map(|kind| {
                self.table(kind).iter().map(move |(id, client)| Connection {
                    kind,
                    id: *id,
                    client: client.clone(),
                })
            })
            .collect()
    }

    /// Groups tracked connections by canonical client name.
    #[must_use]
    pub fn holdings(&self) -> BTreeMap<&str, Holdings> {
        let mut clients: BTreeMap<&str, Holdings> = BTreeMap::new();
        for client in self.outputs.values() {
            clients.entry(client.as_str()).or_default().output = true;
        }
        for client in self.inputs.values() {
            clients.entry(client.as_str()).or_default().input = true;
        }
        clients
    }
}
