//! Dual-role session management over a relay socket.
//!
//! This is the layer a host networking stack talks to. Start as a client or
//! a host, send on logical channels, and drain a single ordered event queue
//! with [`RelayAdapter::poll`].

pub mod adapter;
pub mod config;
pub mod connector;
pub mod error;
pub mod events;
pub mod listener;
pub mod network;
pub mod table;

pub use adapter::{RelayAdapter, Role, StartStatus};
pub use config::AdapterConfig;
pub use connector::ClientRole;
pub use error::{PeerError, Result};
pub use events::{EventKind, EventQueue, NetworkEvent};
pub use listener::HostRole;
pub use network::RelayNetwork;
pub use table::{ClientId, Connection, ConnectionTable, SERVER_CLIENT_ID};
