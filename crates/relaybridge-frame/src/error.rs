use crate::channel::ChannelId;

/// Errors that can occur while framing messages or registering channels.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// A raw message had no trailing channel byte.
    #[error("empty message (missing channel tag)")]
    EmptyMessage,

    /// The same channel id was registered twice.
    #[error("channel {0} registered more than once")]
    DuplicateChannel(ChannelId),
}

pub type Result<T> = std::result::Result<T, FrameError>;
