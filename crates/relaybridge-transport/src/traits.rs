use std::fmt;
use std::time::Duration;

use bytes::Bytes;

use crate::error::Result;

/// Largest single message a relay socket accepts: 512 KiB.
pub const MAX_MESSAGE_SIZE: usize = 512 * 1024;

/// Relay-assigned handle for one connection.
///
/// Handles are never zero and stay unique for the lifetime of the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionHandle(pub u32);

impl ConnectionHandle {
    /// The raw numeric id of this connection.
    pub fn id(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ConnectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn#{}", self.0)
    }
}

/// Relay-assigned handle for a listening acceptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenHandle(pub u32);

impl ListenHandle {
    pub fn id(self) -> u32 {
        self.0
    }
}

/// Network identity of a relay peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerIdentity(pub u64);

impl fmt::Display for PeerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "peer:{}", self.0)
    }
}

/// How the relay delivers a single message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeliveryMode {
    /// Retransmitted until acknowledged, delivered in order.
    Reliable,
    /// Sent once; may be dropped or reordered.
    Unreliable,
}

/// Lifecycle state of a relay connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Connected,
    /// The remote end closed the connection.
    ClosedByPeer,
    /// The local relay gave up on the connection (no route, timeout).
    ProblemDetectedLocally,
}

/// Snapshot passed with every lifecycle notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionInfo {
    pub handle: ConnectionHandle,
    pub identity: PeerIdentity,
    pub state: ConnectionState,
}

/// Connection quality stats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionStatus {
    pub state: ConnectionState,
    /// Smoothed round-trip time as measured by the relay.
    pub ping: Duration,
}

/// One raw notification drained from a relay socket.
#[derive(Debug, Clone, PartialEq)]
pub enum SocketEvent {
    Connecting(ConnectionInfo),
    Connected(ConnectionInfo),
    Disconnected(ConnectionInfo),
    Message {
        connection: ConnectionHandle,
        data: Bytes,
    },
}

/// The raw relay socket library.
///
/// Implementations deliver raw byte messages without any notion of logical
/// channels. Lifecycle notifications are only produced while
/// [`run_callbacks`](RelaySocket::run_callbacks) is being driven; raw events
/// are then drained one at a time with the `next_*_event` methods.
pub trait RelaySocket {
    /// Perform the one-time relay network access handshake.
    fn init_network(&mut self) -> Result<()>;

    /// True once [`init_network`](RelaySocket::init_network) has succeeded.
    fn is_network_ready(&self) -> bool;

    /// Open an outbound connection request to `target`.
    fn connect(&mut self, target: PeerIdentity) -> Result<ConnectionHandle>;

    /// Open a listening acceptor for this identity.
    fn listen(&mut self) -> Result<ListenHandle>;

    /// Accept a pending inbound connection reported by `on_connecting`.
    fn accept(&mut self, connection: ConnectionHandle) -> Result<()>;

    /// Transmit raw bytes over a connected connection.
    fn send(&mut self, connection: ConnectionHandle, data: &[u8], mode: DeliveryMode)
        -> Result<()>;

    /// Close a connection. The remote end is notified with a disconnect.
    fn close(&mut self, connection: ConnectionHandle) -> Result<()>;

    /// Close a listening acceptor and every connection accepted on it.
    fn close_listen(&mut self, listen: ListenHandle) -> Result<()>;

    /// Periodic maintenance dispatch (keepalives, handshake progress).
    fn run_callbacks(&mut self);

    /// Drain the next raw event for an outbound connection.
    fn next_connection_event(&mut self, connection: ConnectionHandle) -> Option<SocketEvent>;

    /// Drain the next raw event for a listening acceptor.
    fn next_listen_event(&mut self, listen: ListenHandle) -> Option<SocketEvent>;

    /// Quality stats for a live connection.
    fn connection_status(&self, connection: ConnectionHandle) -> Option<ConnectionStatus>;
}

/// Lifecycle callbacks for a single outbound connection.
pub trait ConnectionCallbacks<R: ?Sized> {
    /// Informational; the outbound handshake is in progress.
    fn on_connecting(&mut self, _relay: &mut R, _info: &ConnectionInfo) {}

    fn on_connected(&mut self, relay: &mut R, info: &ConnectionInfo);

    fn on_disconnected(&mut self, relay: &mut R, info: &ConnectionInfo);

    fn on_message(&mut self, relay: &mut R, data: Bytes);
}

/// Lifecycle callbacks for a listening acceptor serving many connections.
pub trait ListenCallbacks<R: ?Sized> {
    /// A new inbound attempt. Implementations must call
    /// [`RelaySocket::accept`] or the peer never becomes connected.
    fn on_connecting(&mut self, relay: &mut R, info: &ConnectionInfo);

    fn on_connected(&mut self, relay: &mut R, info: &ConnectionInfo);

    fn on_disconnected(&mut self, relay: &mut R, info: &ConnectionInfo);

    fn on_message(&mut self, relay: &mut R, connection: ConnectionHandle, data: Bytes);
}

/// Drain up to `max_events` raw events from an outbound connection and
/// dispatch them to `callbacks` in arrival order.
///
/// Returns the number of events dispatched.
pub fn pump_connection<R, C>(
    relay: &mut R,
    connection: ConnectionHandle,
    callbacks: &mut C,
    max_events: usize,
) -> usize
where
    R: RelaySocket + ?Sized,
    C: ConnectionCallbacks<R> + ?Sized,
{
    let mut dispatched = 0usize;
    while dispatched < max_events {
        let Some(event) = relay.next_connection_event(connection) else {
            break;
        };
        match event {
            SocketEvent::Connecting(info) => callbacks.on_connecting(relay, &info),
            SocketEvent::Connected(info) => callbacks.on_connected(relay, &info),
            SocketEvent::Disconnected(info) => callbacks.on_disconnected(relay, &info),
            SocketEvent::Message { data, .. } => callbacks.on_message(relay, data),
        }
        dispatched += 1;
    }
    dispatched
}

/// Drain up to `max_events` raw events from a listening acceptor and
/// dispatch them to `callbacks` in arrival order.
pub fn pump_listen<R, C>(
    relay: &mut R,
    listen: ListenHandle,
    callbacks: &mut C,
    max_events: usize,
) -> usize
where
    R: RelaySocket + ?Sized,
    C: ListenCallbacks<R> + ?Sized,
{
    let mut dispatched = 0usize;
    while dispatched < max_events {
        let Some(event) = relay.next_listen_event(listen) else {
            break;
        };
        match event {
            SocketEvent::Connecting(info) => callbacks.on_connecting(relay, &info),
            SocketEvent::Connected(info) => callbacks.on_connected(relay, &info),
            SocketEvent::Disconnected(info) => callbacks.on_disconnected(relay, &info),
            SocketEvent::Message { connection, data } => {
                callbacks.on_message(relay, connection, data)
            }
        }
        dispatched += 1;
    }
    dispatched
}
