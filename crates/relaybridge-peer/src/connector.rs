use bytes::Bytes;
use relaybridge_frame::decode_frame;
use relaybridge_transport::{
    pump_connection, ConnectionCallbacks, ConnectionHandle, ConnectionInfo, DeliveryMode,
    PeerIdentity, RelaySocket,
};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::events::{EventQueue, NetworkEvent};
use crate::table::SERVER_CLIENT_ID;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Connecting,
    Connected,
    Closed,
}

/// The client role: one outbound connection to a target peer.
#[derive(Debug)]
pub struct ClientRole {
    connection: ConnectionHandle,
    target: PeerIdentity,
    phase: Phase,
}

impl ClientRole {
    /// Open an outbound connection request to `target`.
    ///
    /// Returns before the handshake completes; success is reported later as a
    /// connect event for [`SERVER_CLIENT_ID`].
    pub fn start<R: RelaySocket + ?Sized>(relay: &mut R, target: PeerIdentity) -> Result<Self> {
        let connection = relay.connect(target)?;
        info!(%target, %connection, "connecting to host");
        Ok(Self {
            connection,
            target,
            phase: Phase::Connecting,
        })
    }

    /// Dispatch pending relay events for the outbound connection.
    pub fn pump<R: RelaySocket + ?Sized>(
        &mut self,
        relay: &mut R,
        events: &mut EventQueue,
        max_events: usize,
    ) -> usize {
        let connection = self.connection;
        let mut session = ClientSession { role: self, events };
        pump_connection(relay, connection, &mut session, max_events)
    }

    /// Transmit an already framed message to the host.
    pub fn send<R: RelaySocket + ?Sized>(
        &self,
        relay: &mut R,
        wire: &[u8],
        mode: DeliveryMode,
    ) -> Result<()> {
        relay.send(self.connection, wire, mode)?;
        Ok(())
    }

    /// Close the outbound connection. Errors are logged, never returned.
    pub fn close<R: RelaySocket + ?Sized>(&mut self, relay: &mut R) {
        if self.phase == Phase::Closed {
            return;
        }
        self.phase = Phase::Closed;
        match relay.close(self.connection) {
            Ok(()) => info!(connection = %self.connection, "disconnected from host"),
            Err(err) => warn!(connection = %self.connection, error = %err, "close failed"),
        }
    }

    pub fn connection(&self) -> ConnectionHandle {
        self.connection
    }

    pub fn target(&self) -> PeerIdentity {
        self.target
    }

    pub fn is_connected(&self) -> bool {
        self.phase == Phase::Connected
    }
}

/// Routes outbound-connection callbacks into the event queue.
struct ClientSession<'a> {
    role: &'a mut ClientRole,
    events: &'a mut EventQueue,
}

impl<R: RelaySocket + ?Sized> ConnectionCallbacks<R> for ClientSession<'_> {
    fn on_connecting(&mut self, _relay: &mut R, info: &ConnectionInfo) {
        debug!(connection = %info.handle, host = %info.identity, "handshake in progress");
    }

    fn on_connected(&mut self, _relay: &mut R, info: &ConnectionInfo) {
        info!(connection = %info.handle, host = %info.identity, "connected to host");
        self.role.phase = Phase::Connected;
        self.events.enqueue(NetworkEvent::connect(SERVER_CLIENT_ID));
    }

    fn on_disconnected(&mut self, relay: &mut R, info: &ConnectionInfo) {
        info!(
            connection = %info.handle,
            host = %info.identity,
            state = ?info.state,
            "host connection lost"
        );
        if self.role.phase != Phase::Closed {
            self.role.phase = Phase::Closed;
            if let Err(err) = relay.close(info.handle) {
                debug!(connection = %info.handle, error = %err, "release after disconnect failed");
            }
        }
        self.events.enqueue(NetworkEvent::disconnect(SERVER_CLIENT_ID));
    }

    fn on_message(&mut self, _relay: &mut R, data: Bytes) {
        match decode_frame(data) {
            Ok(frame) => self
                .events
                .enqueue(NetworkEvent::data(SERVER_CLIENT_ID, frame)),
            Err(err) => debug!(error = %err, "dropping malformed message from host"),
        }
    }
}
