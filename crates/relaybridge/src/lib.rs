//! Channel-multiplexing adapter between a host networking layer and a
//! relay socket.
//!
//! relaybridge lets an engine-agnostic networking layer (connect, send on a
//! channel, poll, disconnect) run over a relay socket that only moves raw
//! byte messages.
//!
//! # Crate Structure
//!
//! - [`transport`]: Relay socket contract and in-process loopback relay
//! - [`frame`]: Trailing channel-tag framing and the channel registry
//! - [`peer`]: Client/host session management (behind `peer` feature)

/// Re-export transport types.
pub mod transport {
    pub use relaybridge_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use relaybridge_frame::*;
}

/// Re-export peer types (requires `peer` feature).
#[cfg(feature = "peer")]
pub mod peer {
    pub use relaybridge_peer::*;
}
