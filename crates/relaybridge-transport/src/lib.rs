//! Relay socket abstraction.
//!
//! Describes the raw, channel-unaware relay layer that relaybridge sits on:
//! - Outbound connections and listening acceptors addressed by numeric handles
//! - Raw byte messages with a per-send delivery mode
//! - Callback-style connection lifecycle notifications, dispatched by `pump_*`
//!
//! This is the lowest layer of relaybridge. [`LoopbackNetwork`] provides an
//! in-process relay with the same contract for tests and local tooling.

pub mod error;
pub mod loopback;
pub mod traits;

pub use error::{Result, TransportError};
pub use loopback::{LoopbackNetwork, LoopbackRelay};
pub use traits::{
    pump_connection, pump_listen, ConnectionCallbacks, ConnectionHandle, ConnectionInfo,
    ConnectionState, ConnectionStatus, DeliveryMode, ListenCallbacks, ListenHandle, PeerIdentity,
    RelaySocket, SocketEvent, MAX_MESSAGE_SIZE,
};
