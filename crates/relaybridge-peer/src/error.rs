use std::path::PathBuf;

use crate::adapter::Role;

/// Errors that can occur in adapter operations.
#[derive(Debug, thiserror::Error)]
pub enum PeerError {
    /// Relay-level error.
    #[error("transport error: {0}")]
    Transport(#[from] relaybridge_transport::TransportError),

    /// Framing or channel registration error.
    #[error("frame error: {0}")]
    Frame(#[from] relaybridge_frame::FrameError),

    /// JSON configuration error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration file could not be read.
    #[error("failed to read config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A configuration value is out of range.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// `init` has not been called, or the adapter was shut down.
    #[error("adapter not initialized")]
    NotInitialized,

    /// The relay network access handshake has not succeeded yet.
    #[error("relay network not ready")]
    RelayUnavailable,

    /// A role is already active; shut down before starting another.
    #[error("adapter already running as {0}")]
    RoleActive(Role),

    /// No client or host role is active.
    #[error("no active role")]
    NoActiveRole,
}

pub type Result<T> = std::result::Result<T, PeerError>;
