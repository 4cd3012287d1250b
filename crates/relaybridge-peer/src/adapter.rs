use std::fmt;
use std::time::Duration;

use bytes::BytesMut;
use relaybridge_frame::{encode_frame, ChannelId, ChannelRegistry};
use relaybridge_transport::{ConnectionHandle, PeerIdentity, RelaySocket};
use tracing::{debug, info, warn};

use crate::config::AdapterConfig;
use crate::connector::ClientRole;
use crate::error::{PeerError, Result};
use crate::events::{EventQueue, NetworkEvent};
use crate::listener::HostRole;
use crate::network::RelayNetwork;
use crate::table::{ClientId, SERVER_CLIENT_ID};

/// Which role the adapter is currently playing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Idle,
    Client,
    Host,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Idle => f.write_str("idle"),
            Role::Client => f.write_str("client"),
            Role::Host => f.write_str("host"),
        }
    }
}

/// Result of starting a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartStatus {
    /// The outbound handshake is in flight; poll for a connect event.
    Pending,
    /// The acceptor is open.
    Ready,
}

enum RoleState {
    Idle,
    Client(ClientRole),
    Host(HostRole),
}

/// Bridges channel-addressed sends and a pull-based event queue onto a
/// channel-unaware relay socket.
///
/// All calls happen on the caller's thread. Relay callbacks only fire inside
/// [`poll`](Self::poll) (event dispatch) and [`maintain`](Self::maintain)
/// (relay housekeeping), so the queue and connection table need no locking.
pub struct RelayAdapter<R: RelaySocket> {
    relay: R,
    config: AdapterConfig,
    channels: ChannelRegistry,
    network: RelayNetwork,
    events: EventQueue,
    role: RoleState,
    initialized: bool,
}

impl<R: RelaySocket> RelayAdapter<R> {
    pub fn new(relay: R, config: AdapterConfig) -> Self {
        let network = RelayNetwork::new(config.init_retry_interval());
        Self {
            relay,
            config,
            channels: ChannelRegistry::default(),
            network,
            events: EventQueue::new(),
            role: RoleState::Idle,
            initialized: false,
        }
    }

    /// Build the channel registry, clear pending state and start the relay
    /// network handshake.
    ///
    /// An invalid config or a duplicate channel id aborts initialization. A failed relay
    /// handshake does not; it is retried from [`maintain`](Self::maintain).
    pub fn init(&mut self) -> Result<()> {
        let role = self.role();
        if role != Role::Idle {
            return Err(PeerError::RoleActive(role));
        }

        self.config.validate()?;
        self.channels = ChannelRegistry::with_defaults(&self.config.channels)?;
        self.events.clear();
        self.initialized = true;
        info!(channels = self.channels.len(), "adapter initialized");

        self.network.initialize(&mut self.relay);
        Ok(())
    }

    /// Open one outbound connection to `target`.
    ///
    /// Returns [`StartStatus::Pending`]; the connect (or disconnect) event
    /// for [`SERVER_CLIENT_ID`] arrives through [`poll`](Self::poll).
    pub fn start_as_client(&mut self, target: PeerIdentity) -> Result<StartStatus> {
        self.ensure_startable()?;
        let client = ClientRole::start(&mut self.relay, target)?;
        self.role = RoleState::Client(client);
        Ok(StartStatus::Pending)
    }

    /// Open the listening acceptor.
    pub fn start_as_server(&mut self) -> Result<StartStatus> {
        self.ensure_startable()?;
        let host = HostRole::start(&mut self.relay)?;
        self.role = RoleState::Host(host);
        Ok(StartStatus::Ready)
    }

    /// Frame `payload` with `channel` and send it to `client_id`.
    ///
    /// Unknown clients are logged and skipped. Unregistered channels fall
    /// back to the default channel's delivery mode.
    pub fn send(&mut self, client_id: ClientId, payload: &[u8], channel: ChannelId) -> Result<()> {
        if !self.channels.contains(channel) {
            debug!(channel, "send on unregistered channel");
        }
        let mode = self.channels.resolve(channel);

        let mut wire = BytesMut::new();
        encode_frame(channel, payload, &mut wire);

        match &self.role {
            RoleState::Idle => Err(PeerError::NoActiveRole),
            RoleState::Client(client) => {
                if client_id != SERVER_CLIENT_ID {
                    info!(client_id, "client role can only send to the host");
                    return Ok(());
                }
                client.send(&mut self.relay, &wire, mode)
            }
            RoleState::Host(host) => host.send(&mut self.relay, client_id, &wire, mode),
        }
    }

    /// Pump the active role's relay events, then return the oldest pending
    /// event, or an [`EventKind::Nothing`](crate::EventKind::Nothing) event
    /// stamped with the current time.
    pub fn poll(&mut self) -> NetworkEvent {
        let max = self.config.max_messages_per_pump;
        match &mut self.role {
            RoleState::Idle => 0,
            RoleState::Client(client) => client.pump(&mut self.relay, &mut self.events, max),
            RoleState::Host(host) => host.pump(&mut self.relay, &mut self.events, max),
        };
        self.events.dequeue().unwrap_or_else(NetworkEvent::nothing)
    }

    /// Low-frequency maintenance tick. Call regularly whether or not
    /// [`poll`](Self::poll) is being called.
    pub fn maintain(&mut self) {
        self.network.maintain(&mut self.relay);
    }

    /// Close one client's connection.
    ///
    /// On a client-role adapter, [`SERVER_CLIENT_ID`] disconnects from the
    /// host. Unknown ids are logged and ignored.
    pub fn disconnect_client(&mut self, client_id: ClientId) {
        if let RoleState::Host(host) = &mut self.role {
            host.disconnect_client(&mut self.relay, client_id);
        } else if self.role() == Role::Client && client_id == SERVER_CLIENT_ID {
            self.disconnect_self();
        } else {
            warn!(client_id, role = %self.role(), "disconnect requested for unknown client");
        }
    }

    /// Leave the session: a client drops its host connection, a host stops
    /// hosting. The adapter returns to [`Role::Idle`].
    pub fn disconnect_self(&mut self) {
        match std::mem::replace(&mut self.role, RoleState::Idle) {
            RoleState::Idle => debug!("disconnect_self with no active role"),
            RoleState::Client(mut client) => client.close(&mut self.relay),
            RoleState::Host(mut host) => host.close(&mut self.relay),
        }
    }

    /// Best-effort teardown of whichever role is active. Never fails.
    ///
    /// Pending events are discarded and [`init`](Self::init) must be called
    /// again before restarting.
    pub fn shutdown(&mut self) {
        self.disconnect_self();
        self.events.clear();
        self.initialized = false;
        info!("adapter shut down");
    }

    /// The client id that denotes the host on a client-role adapter.
    pub fn server_client_id(&self) -> ClientId {
        SERVER_CLIENT_ID
    }

    /// Round-trip time to `client_id` as measured by the relay.
    pub fn current_rtt(&self, client_id: ClientId) -> Option<Duration> {
        let handle = self.connection_handle(client_id)?;
        self.relay
            .connection_status(handle)
            .map(|status| status.ping)
    }

    pub fn role(&self) -> Role {
        match self.role {
            RoleState::Idle => Role::Idle,
            RoleState::Client(_) => Role::Client,
            RoleState::Host(_) => Role::Host,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Clients currently tracked by the host role.
    pub fn connected_clients(&self) -> usize {
        match &self.role {
            RoleState::Host(host) => host.client_count(),
            RoleState::Client(client) => usize::from(client.is_connected()),
            RoleState::Idle => 0,
        }
    }

    pub fn channels(&self) -> &ChannelRegistry {
        &self.channels
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    pub fn pending_events(&self) -> usize {
        self.events.len()
    }

    pub fn relay(&self) -> &R {
        &self.relay
    }

    pub fn relay_mut(&mut self) -> &mut R {
        &mut self.relay
    }

    fn connection_handle(&self, client_id: ClientId) -> Option<ConnectionHandle> {
        match &self.role {
            RoleState::Client(client) if client_id == SERVER_CLIENT_ID => {
                Some(client.connection())
            }
            RoleState::Host(host) => host.connection(client_id).map(|conn| conn.handle),
            _ => None,
        }
    }

    fn ensure_startable(&self) -> Result<()> {
        if !self.initialized {
            return Err(PeerError::NotInitialized);
        }
        let role = self.role();
        if role != Role::Idle {
            return Err(PeerError::RoleActive(role));
        }
        if !self.relay.is_network_ready() {
            return Err(PeerError::RelayUnavailable);
        }
        Ok(())
    }
}
