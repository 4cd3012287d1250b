use bytes::Bytes;
use relaybridge_frame::decode_frame;
use relaybridge_transport::{
    pump_listen, ConnectionHandle, ConnectionInfo, DeliveryMode, ListenCallbacks, ListenHandle,
    RelaySocket,
};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::events::{EventQueue, NetworkEvent};
use crate::table::{ClientId, Connection, ConnectionTable, SERVER_CLIENT_ID};

/// The host role: a listening acceptor serving many inbound connections.
///
/// Each peer is addressed by its relay connection handle.
#[derive(Debug)]
pub struct HostRole {
    listen: ListenHandle,
    table: ConnectionTable,
}

impl HostRole {
    /// Open the listening acceptor. Ready immediately.
    pub fn start<R: RelaySocket + ?Sized>(relay: &mut R) -> Result<Self> {
        let listen = relay.listen()?;
        info!(listen = listen.id(), "hosting");
        Ok(Self {
            listen,
            table: ConnectionTable::new(),
        })
    }

    /// Dispatch pending relay events for the acceptor.
    pub fn pump<R: RelaySocket + ?Sized>(
        &mut self,
        relay: &mut R,
        events: &mut EventQueue,
        max_events: usize,
    ) -> usize {
        let listen = self.listen;
        let mut session = HostSession {
            table: &mut self.table,
            events,
        };
        pump_listen(relay, listen, &mut session, max_events)
    }

    /// Transmit an already framed message to one client.
    ///
    /// Unknown clients are logged and skipped.
    pub fn send<R: RelaySocket + ?Sized>(
        &self,
        relay: &mut R,
        client_id: ClientId,
        wire: &[u8],
        mode: DeliveryMode,
    ) -> Result<()> {
        let Some(connection) = self.table.lookup(client_id) else {
            info!(client_id, "send to unknown client skipped");
            return Ok(());
        };
        relay.send(connection.handle, wire, mode)?;
        Ok(())
    }

    /// Close one client's connection and forget it.
    pub fn disconnect_client<R: RelaySocket + ?Sized>(&mut self, relay: &mut R, client_id: ClientId) {
        let Some(connection) = self.table.remove(client_id) else {
            warn!(client_id, "disconnect requested for unknown client");
            return;
        };
        match relay.close(connection.handle) {
            Ok(()) => info!(client_id, "client disconnected"),
            Err(err) => warn!(client_id, error = %err, "close failed"),
        }
    }

    /// Close every client connection and the acceptor. Errors are logged.
    pub fn close<R: RelaySocket + ?Sized>(&mut self, relay: &mut R) {
        for (client_id, connection) in self.table.drain() {
            if let Err(err) = relay.close(connection.handle) {
                warn!(client_id, error = %err, "close failed during shutdown");
            }
        }
        match relay.close_listen(self.listen) {
            Ok(()) => info!(listen = self.listen.id(), "stopped hosting"),
            Err(err) => warn!(listen = self.listen.id(), error = %err, "close_listen failed"),
        }
    }

    pub fn connection(&self, client_id: ClientId) -> Option<Connection> {
        self.table.lookup(client_id)
    }

    pub fn client_count(&self) -> usize {
        self.table.len()
    }

    pub fn listen_handle(&self) -> ListenHandle {
        self.listen
    }
}

/// Client id for an accepted connection.
///
/// Handle 0 would collide with [`SERVER_CLIENT_ID`], so it has no client id.
fn client_id_for(handle: ConnectionHandle) -> Option<ClientId> {
    let client_id = ClientId::from(handle.id());
    (client_id != SERVER_CLIENT_ID).then_some(client_id)
}

/// Routes acceptor callbacks into the connection table and event queue.
struct HostSession<'a> {
    table: &'a mut ConnectionTable,
    events: &'a mut EventQueue,
}

impl<R: RelaySocket + ?Sized> ListenCallbacks<R> for HostSession<'_> {
    fn on_connecting(&mut self, relay: &mut R, info: &ConnectionInfo) {
        if client_id_for(info.handle).is_none() {
            warn!(peer = %info.identity, "relay offered reserved handle 0, refusing");
            if let Err(err) = relay.close(info.handle) {
                debug!(error = %err, "release of reserved handle failed");
            }
            return;
        }
        match relay.accept(info.handle) {
            Ok(()) => debug!(connection = %info.handle, peer = %info.identity, "accepted"),
            Err(err) => warn!(
                connection = %info.handle,
                peer = %info.identity,
                error = %err,
                "accept failed"
            ),
        }
    }

    fn on_connected(&mut self, _relay: &mut R, info: &ConnectionInfo) {
        let Some(client_id) = client_id_for(info.handle) else {
            warn!(peer = %info.identity, "connect on reserved handle 0 ignored");
            return;
        };
        if self.table.insert(client_id, info.handle, info.identity) {
            info!(client_id, peer = %info.identity, "client connected");
            self.events.enqueue(NetworkEvent::connect(client_id));
        }
    }

    fn on_disconnected(&mut self, relay: &mut R, info: &ConnectionInfo) {
        // Handshakes that never completed still hold a relay handle.
        if let Err(err) = relay.close(info.handle) {
            debug!(connection = %info.handle, error = %err, "release after disconnect failed");
        }
        let Some(client_id) = client_id_for(info.handle) else {
            return;
        };
        match self.table.remove(client_id) {
            Some(_) => info!(client_id, state = ?info.state, "client disconnected"),
            None => debug!(client_id, "disconnect for untracked client"),
        }
        self.events.enqueue(NetworkEvent::disconnect(client_id));
    }

    fn on_message(&mut self, _relay: &mut R, connection: ConnectionHandle, data: Bytes) {
        let Some(client_id) = client_id_for(connection) else {
            debug!("dropping message on reserved handle 0");
            return;
        };
        match decode_frame(data) {
            Ok(frame) => self.events.enqueue(NetworkEvent::data(client_id, frame)),
            Err(err) => debug!(client_id, error = %err, "dropping malformed message"),
        }
    }
}
