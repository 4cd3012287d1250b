//! Built-in channel IDs and per-channel delivery policy.
//!
//! Channels 0-31 are reserved for built-in use.
//! Channels 32-255 are available for application-defined use.

use relaybridge_transport::DeliveryMode;
use serde::{Deserialize, Serialize};

/// Logical stream identifier. Must fit the single trailing wire byte.
pub type ChannelId = u8;

/// Adapter-internal traffic (large, ordered, must arrive).
pub const INTERNAL: ChannelId = 0;

/// Clock synchronization samples.
pub const TIME_SYNC: ChannelId = 1;

/// Fallback channel for sends on unregistered channel ids.
pub const DEFAULT: ChannelId = 2;

/// Remote calls that must arrive in order.
pub const RELIABLE_RPC: ChannelId = 3;

/// Remote calls where the latest value wins.
pub const UNRELIABLE_RPC: ChannelId = 4;

/// First user-defined channel ID.
pub const USER_CHANNEL_START: ChannelId = 32;

/// Requested reliability semantics for a channel.
///
/// Unrecognized policy names deserialize to [`ChannelPolicy::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelPolicy {
    Reliable,
    ReliableSequenced,
    ReliableFragmentedSequenced,
    Unreliable,
    UnreliableSequenced,
    #[serde(other)]
    Other,
}

impl ChannelPolicy {
    /// The relay delivery mode used for this policy.
    ///
    /// Sequencing and fragmentation are the relay's concern; only the
    /// reliable/unreliable split reaches it. Unknown policies are reliable.
    pub fn delivery_mode(self) -> DeliveryMode {
        match self {
            ChannelPolicy::Unreliable | ChannelPolicy::UnreliableSequenced => {
                DeliveryMode::Unreliable
            }
            ChannelPolicy::Reliable
            | ChannelPolicy::ReliableSequenced
            | ChannelPolicy::ReliableFragmentedSequenced
            | ChannelPolicy::Other => DeliveryMode::Reliable,
        }
    }
}

/// One declared channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub id: ChannelId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub policy: ChannelPolicy,
}

impl ChannelConfig {
    pub fn new(id: ChannelId, policy: ChannelPolicy) -> Self {
        Self {
            id,
            name: None,
            policy,
        }
    }

    pub fn named(id: ChannelId, name: impl Into<String>, policy: ChannelPolicy) -> Self {
        Self {
            id,
            name: Some(name.into()),
            policy,
        }
    }

    /// Declared name, or the built-in name for the id.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or_else(|| channel_name(self.id))
    }
}

/// The channels every registry starts with.
pub fn default_channels() -> Vec<ChannelConfig> {
    vec![
        ChannelConfig::new(INTERNAL, ChannelPolicy::ReliableFragmentedSequenced),
        ChannelConfig::new(TIME_SYNC, ChannelPolicy::Unreliable),
        ChannelConfig::new(DEFAULT, ChannelPolicy::ReliableSequenced),
        ChannelConfig::new(RELIABLE_RPC, ChannelPolicy::ReliableSequenced),
        ChannelConfig::new(UNRELIABLE_RPC, ChannelPolicy::UnreliableSequenced),
    ]
}

/// Returns a human-readable name for a channel ID.
pub fn channel_name(id: ChannelId) -> &'static str {
    match id {
        INTERNAL => "INTERNAL",
        TIME_SYNC => "TIME_SYNC",
        DEFAULT => "DEFAULT",
        RELIABLE_RPC => "RELIABLE_RPC",
        UNRELIABLE_RPC => "UNRELIABLE_RPC",
        5..=31 => "RESERVED",
        _ => "USER",
    }
}

/// Returns true if the channel ID is in the reserved range.
pub fn is_reserved(id: ChannelId) -> bool {
    id < USER_CHANNEL_START
}
