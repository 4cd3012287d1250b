use std::collections::HashMap;

use relaybridge_transport::{ConnectionHandle, PeerIdentity};
use tracing::info;

/// Identifier the caller uses to address a peer.
pub type ClientId = u64;

/// The single peer seen by a client-role adapter.
///
/// Relay connection handles are never zero, so host-assigned ids cannot
/// collide with it.
pub const SERVER_CLIENT_ID: ClientId = 0;

/// A live relay connection owned by the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Connection {
    pub handle: ConnectionHandle,
    pub identity: PeerIdentity,
}

/// Client id to connection map for the host role.
#[derive(Debug, Default)]
pub struct ConnectionTable {
    connections: HashMap<ClientId, Connection>,
}

impl ConnectionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new connection.
    ///
    /// Returns `false` and leaves the existing entry untouched if `id` is
    /// already present.
    pub fn insert(&mut self, id: ClientId, handle: ConnectionHandle, identity: PeerIdentity) -> bool {
        if let Some(existing) = self.connections.get(&id) {
            info!(
                client_id = id,
                existing = %existing.handle,
                %identity,
                "duplicate connect for known client ignored"
            );
            return false;
        }
        self.connections.insert(id, Connection { handle, identity });
        true
    }

    pub fn lookup(&self, id: ClientId) -> Option<Connection> {
        self.connections.get(&id).copied()
    }

    pub fn remove(&mut self, id: ClientId) -> Option<Connection> {
        self.connections.remove(&id)
    }

    /// Remove and return every connection.
    pub fn drain(&mut self) -> Vec<(ClientId, Connection)> {
        self.connections.drain().collect()
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
