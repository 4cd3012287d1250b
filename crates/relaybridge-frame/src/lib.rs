//! Channel multiplexing over a channel-unaware relay.
//!
//! The relay only moves raw byte messages, so every message carries its
//! logical channel as a single trailing byte:
//! - `payload ++ channel` on the wire, one byte of overhead
//! - Channels map to a relay delivery mode through a [`ChannelRegistry`]
//!   built once at startup

pub mod channel;
pub mod codec;
pub mod error;
pub mod registry;

pub use channel::{
    channel_name, default_channels, ChannelConfig, ChannelId, ChannelPolicy, DEFAULT, INTERNAL,
    RELIABLE_RPC, TIME_SYNC, UNRELIABLE_RPC, USER_CHANNEL_START,
};
pub use codec::{decode_frame, encode_frame, Frame, CHANNEL_TAG_SIZE};
pub use error::{FrameError, Result};
pub use registry::ChannelRegistry;
