use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, trace};

use crate::error::{Result, TransportError};
use crate::traits::{
    ConnectionHandle, ConnectionInfo, ConnectionState, ConnectionStatus, DeliveryMode,
    ListenHandle, PeerIdentity, RelaySocket, SocketEvent, MAX_MESSAGE_SIZE,
};

/// In-process relay network.
///
/// Every [`LoopbackRelay`] endpoint created from the same network can reach
/// the others by [`PeerIdentity`]. Lifecycle notifications are staged and
/// only delivered when the owning endpoint calls
/// [`run_callbacks`](RelaySocket::run_callbacks); messages are queued at the
/// receiver as soon as they are sent.
#[derive(Clone, Default)]
pub struct LoopbackNetwork {
    hub: Arc<Mutex<Hub>>,
}

impl LoopbackNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an endpoint that acts as `identity` on this network.
    pub fn endpoint(&self, identity: PeerIdentity) -> LoopbackRelay {
        LoopbackRelay {
            hub: self.hub.clone(),
            identity,
            ready: false,
        }
    }

    /// Make the next `count` calls to `init_network` fail.
    pub fn fail_next_inits(&self, count: u32) {
        lock(&self.hub).failed_inits_remaining = count;
    }

    /// Round-trip time reported by `connection_status`.
    pub fn set_ping(&self, ping: Duration) {
        lock(&self.hub).ping = ping;
    }
}

/// One endpoint on a [`LoopbackNetwork`].
pub struct LoopbackRelay {
    hub: Arc<Mutex<Hub>>,
    identity: PeerIdentity,
    ready: bool,
}

impl LoopbackRelay {
    /// The identity this endpoint connects and listens as.
    pub fn identity(&self) -> PeerIdentity {
        self.identity
    }

    /// Queue a raw event directly on one of this endpoint's outbound
    /// connections, bypassing the remote side.
    pub fn inject_connection_event(&self, connection: ConnectionHandle, event: SocketEvent) {
        let mut hub = lock(&self.hub);
        if let Some(link) = hub.links.get_mut(&connection.id()) {
            link.queue.push_back(event);
        }
    }

    /// Queue a raw event directly on this endpoint's listen socket.
    pub fn inject_listen_event(&self, event: SocketEvent) {
        let mut hub = lock(&self.hub);
        if let Some(listener) = hub.listeners.get_mut(&self.identity) {
            listener.queue.push_back(event);
        }
    }

    fn hub(&self) -> MutexGuard<'_, Hub> {
        lock(&self.hub)
    }

    fn ensure_ready(&self) -> Result<()> {
        if self.ready {
            Ok(())
        } else {
            Err(TransportError::NotInitialized)
        }
    }
}

impl std::fmt::Debug for LoopbackRelay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoopbackRelay")
            .field("identity", &self.identity)
            .field("ready", &self.ready)
            .finish()
    }
}

impl RelaySocket for LoopbackRelay {
    fn init_network(&mut self) -> Result<()> {
        let mut hub = self.hub();
        if hub.failed_inits_remaining > 0 {
            hub.failed_inits_remaining -= 1;
            return Err(TransportError::NetworkUnavailable(
                "relay access handshake rejected".to_string(),
            ));
        }
        drop(hub);
        self.ready = true;
        Ok(())
    }

    fn is_network_ready(&self) -> bool {
        self.ready
    }

    fn connect(&mut self, target: PeerIdentity) -> Result<ConnectionHandle> {
        self.ensure_ready()?;
        let mut hub = self.hub();

        let local = hub.alloc_handle();
        hub.links.insert(local, Link::new(self.identity, target, None));
        hub.stage(local, Notice::Connecting);

        if hub.listeners.contains_key(&target) {
            let remote = hub.alloc_handle();
            hub.links
                .insert(remote, Link::new(target, self.identity, Some(target)));
            if let Some(link) = hub.links.get_mut(&local) {
                link.peer = Some(remote);
            }
            if let Some(link) = hub.links.get_mut(&remote) {
                link.peer = Some(local);
            }
            hub.stage(remote, Notice::Connecting);
            debug!(from = %self.identity, to = %target, local, remote, "loopback connect");
        } else {
            hub.stage(
                local,
                Notice::Disconnected(ConnectionState::ProblemDetectedLocally),
            );
            debug!(from = %self.identity, to = %target, "no listener at target");
        }

        Ok(ConnectionHandle(local))
    }

    fn listen(&mut self) -> Result<ListenHandle> {
        self.ensure_ready()?;
        let mut hub = self.hub();
        if hub.listeners.contains_key(&self.identity) {
            return Err(TransportError::AlreadyListening(self.identity));
        }
        let handle = ListenHandle(hub.alloc_handle());
        hub.listeners.insert(
            self.identity,
            Listener {
                handle,
                queue: VecDeque::new(),
            },
        );
        Ok(handle)
    }

    fn accept(&mut self, connection: ConnectionHandle) -> Result<()> {
        let mut hub = self.hub();
        let link = hub
            .links
            .get(&connection.id())
            .filter(|link| link.owner == self.identity && link.accepted_on.is_some())
            .ok_or(TransportError::InvalidConnection(connection.id()))?;
        if link.state != ConnectionState::Connecting {
            return Err(TransportError::NotConnected(connection.id()));
        }
        let peer = link.peer;

        hub.stage(connection.id(), Notice::Connected);
        if let Some(peer) = peer {
            hub.stage(peer, Notice::Connected);
        }
        Ok(())
    }

    fn send(
        &mut self,
        connection: ConnectionHandle,
        data: &[u8],
        mode: DeliveryMode,
    ) -> Result<()> {
        if data.len() > MAX_MESSAGE_SIZE {
            return Err(TransportError::MessageTooLarge {
                size: data.len(),
                max: MAX_MESSAGE_SIZE,
            });
        }

        let mut hub = self.hub();
        let link = hub
            .links
            .get(&connection.id())
            .filter(|link| link.owner == self.identity)
            .ok_or(TransportError::InvalidConnection(connection.id()))?;
        if link.state != ConnectionState::Connected {
            return Err(TransportError::NotConnected(connection.id()));
        }
        let Some(peer) = link.peer else {
            return Err(TransportError::NotConnected(connection.id()));
        };

        trace!(connection = connection.id(), len = data.len(), ?mode, "loopback send");
        let message = SocketEvent::Message {
            connection: ConnectionHandle(peer),
            data: Bytes::copy_from_slice(data),
        };
        let receiver_pending = hub
            .links
            .get(&peer)
            .map(|remote| remote.state == ConnectionState::Connecting);
        match receiver_pending {
            // Receiver has not seen its own connected notice yet.
            Some(true) => {
                if let Some(remote) = hub.links.get_mut(&peer) {
                    remote.held.push_back(message);
                }
            }
            Some(false) => hub.deliver(peer, message),
            None => {}
        }
        Ok(())
    }

    fn close(&mut self, connection: ConnectionHandle) -> Result<()> {
        let mut hub = self.hub();
        let owned = hub
            .links
            .get(&connection.id())
            .is_some_and(|link| link.owner == self.identity);
        if !owned {
            return Err(TransportError::InvalidConnection(connection.id()));
        }
        hub.sever(connection.id());
        Ok(())
    }

    fn close_listen(&mut self, listen: ListenHandle) -> Result<()> {
        let mut hub = self.hub();
        match hub.listeners.get(&self.identity) {
            Some(listener) if listener.handle == listen => {}
            _ => return Err(TransportError::InvalidListenSocket(listen.id())),
        }
        hub.listeners.remove(&self.identity);

        let accepted: Vec<u32> = hub
            .links
            .iter()
            .filter(|(_, link)| link.accepted_on == Some(self.identity))
            .map(|(handle, _)| *handle)
            .collect();
        for handle in accepted {
            hub.sever(handle);
        }
        Ok(())
    }

    fn run_callbacks(&mut self) {
        let mut hub = self.hub();
        let staged = std::mem::take(&mut hub.staged);
        let mut retained = VecDeque::new();

        for (handle, notice) in staged {
            let Some(link) = hub.links.get_mut(&handle) else {
                continue;
            };
            if link.owner != self.identity {
                retained.push_back((handle, notice));
                continue;
            }

            let mut held = VecDeque::new();
            let event = match notice {
                Notice::Connecting => SocketEvent::Connecting(link.info(handle)),
                Notice::Connected => {
                    if link.state != ConnectionState::Connecting {
                        continue;
                    }
                    link.state = ConnectionState::Connected;
                    held = std::mem::take(&mut link.held);
                    SocketEvent::Connected(link.info(handle))
                }
                Notice::Disconnected(state) => {
                    link.state = state;
                    link.held.clear();
                    SocketEvent::Disconnected(link.info(handle))
                }
            };
            hub.deliver(handle, event);
            for message in held {
                hub.deliver(handle, message);
            }
        }

        hub.staged = retained;
    }

    fn next_connection_event(&mut self, connection: ConnectionHandle) -> Option<SocketEvent> {
        let mut hub = self.hub();
        let link = hub.links.get_mut(&connection.id())?;
        if link.owner != self.identity || link.accepted_on.is_some() {
            return None;
        }
        link.queue.pop_front()
    }

    fn next_listen_event(&mut self, listen: ListenHandle) -> Option<SocketEvent> {
        let mut hub = self.hub();
        let listener = hub.listeners.get_mut(&self.identity)?;
        if listener.handle != listen {
            return None;
        }
        listener.queue.pop_front()
    }

    fn connection_status(&self, connection: ConnectionHandle) -> Option<ConnectionStatus> {
        let hub = self.hub();
        let link = hub.links.get(&connection.id())?;
        Some(ConnectionStatus {
            state: link.state,
            ping: hub.ping,
        })
    }
}

fn lock(hub: &Mutex<Hub>) -> MutexGuard<'_, Hub> {
    hub.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Default)]
struct Hub {
    next_handle: u32,
    listeners: HashMap<PeerIdentity, Listener>,
    links: HashMap<u32, Link>,
    staged: VecDeque<(u32, Notice)>,
    ping: Duration,
    failed_inits_remaining: u32,
}

impl Hub {
    fn alloc_handle(&mut self) -> u32 {
        self.next_handle = self.next_handle.wrapping_add(1).max(1);
        self.next_handle
    }

    fn stage(&mut self, handle: u32, notice: Notice) {
        self.staged.push_back((handle, notice));
    }

    /// Queue an event where the owner of `handle` will drain it.
    fn deliver(&mut self, handle: u32, event: SocketEvent) {
        let Some(link) = self.links.get_mut(&handle) else {
            return;
        };
        match link.accepted_on {
            Some(owner) => {
                if let Some(listener) = self.listeners.get_mut(&owner) {
                    listener.queue.push_back(event);
                }
            }
            None => link.queue.push_back(event),
        }
    }

    /// Drop `handle` and tell the other end it was closed by its peer.
    fn sever(&mut self, handle: u32) {
        let Some(link) = self.links.remove(&handle) else {
            return;
        };
        let Some(peer) = link.peer else {
            return;
        };
        if let Some(remote) = self.links.get_mut(&peer) {
            remote.peer = None;
            if matches!(
                remote.state,
                ConnectionState::Connecting | ConnectionState::Connected
            ) {
                self.stage(peer, Notice::Disconnected(ConnectionState::ClosedByPeer));
            }
        }
    }
}

struct Listener {
    handle: ListenHandle,
    queue: VecDeque<SocketEvent>,
}

struct Link {
    owner: PeerIdentity,
    remote: PeerIdentity,
    peer: Option<u32>,
    state: ConnectionState,
    /// Set for inbound connections; their events go to this identity's listener.
    accepted_on: Option<PeerIdentity>,
    queue: VecDeque<SocketEvent>,
    /// Messages that arrived before this end saw its connected notice.
    held: VecDeque<SocketEvent>,
}

impl Link {
    fn new(owner: PeerIdentity, remote: PeerIdentity, accepted_on: Option<PeerIdentity>) -> Self {
        Self {
            owner,
            remote,
            peer: None,
            state: ConnectionState::Connecting,
            accepted_on,
            queue: VecDeque::new(),
            held: VecDeque::new(),
        }
    }

    fn info(&self, handle: u32) -> ConnectionInfo {
        ConnectionInfo {
            handle: ConnectionHandle(handle),
            identity: self.remote,
            state: self.state,
        }
    }
}

#[derive(Clone, Copy)]
enum Notice {
    Connecting,
    Connected,
    Disconnected(ConnectionState),
}
