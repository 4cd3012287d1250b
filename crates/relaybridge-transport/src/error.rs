use crate::traits::PeerIdentity;

/// Errors reported by a relay socket implementation.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The one-time relay network access handshake failed.
    #[error("relay network unavailable: {0}")]
    NetworkUnavailable(String),

    /// An operation was attempted before the relay network was initialized.
    #[error("relay network not initialized")]
    NotInitialized,

    /// The connection handle does not refer to a live connection.
    #[error("invalid connection handle {0}")]
    InvalidConnection(u32),

    /// The listen socket handle does not refer to an open acceptor.
    #[error("invalid listen socket handle {0}")]
    InvalidListenSocket(u32),

    /// The connection exists but is not in the connected state.
    #[error("connection {0} is not connected")]
    NotConnected(u32),

    /// A listen socket is already open for this identity.
    #[error("already listening as {0}")]
    AlreadyListening(PeerIdentity),

    /// The message exceeds the relay's per-message limit.
    #[error("message too large ({size} bytes, max {max})")]
    MessageTooLarge { size: usize, max: usize },
}

pub type Result<T> = std::result::Result<T, TransportError>;
