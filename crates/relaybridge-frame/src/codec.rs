use bytes::{BufMut, Bytes, BytesMut};

use crate::channel::ChannelId;
use crate::error::{FrameError, Result};

/// Wire overhead per message: one trailing channel byte.
pub const CHANNEL_TAG_SIZE: usize = 1;

/// A message with its logical channel recovered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// The channel this message belongs to.
    pub channel: ChannelId,
    /// The message payload, without the channel tag.
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame.
    pub fn new(channel: ChannelId, payload: impl Into<Bytes>) -> Self {
        Self {
            channel,
            payload: payload.into(),
        }
    }

    /// The total wire size of this frame (payload + tag).
    pub fn wire_size(&self) -> usize {
        self.payload.len() + CHANNEL_TAG_SIZE
    }

    /// Encode this frame into a fresh buffer.
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.wire_size());
        encode_frame(self.channel, &self.payload, &mut buf);
        buf.freeze()
    }
}

/// Encode a message into the wire format.
///
/// Wire format:
/// ```text
/// ┌──────────────────────┬──────────────┐
/// │ Payload              │ Channel (1B) │
/// │ (N bytes, verbatim)  │              │
/// └──────────────────────┴──────────────┘
/// ```
pub fn encode_frame(channel: ChannelId, payload: &[u8], dst: &mut BytesMut) {
    dst.reserve(payload.len() + CHANNEL_TAG_SIZE);
    dst.put_slice(payload);
    dst.put_u8(channel);
}

/// Decode one raw relay message.
///
/// The payload is a zero-copy slice of `raw`. A zero-length message has no
/// channel tag and is rejected.
pub fn decode_frame(raw: Bytes) -> Result<Frame> {
    let Some(&channel) = raw.last() else {
        return Err(FrameError::EmptyMessage);
    };
    let payload = raw.slice(..raw.len() - CHANNEL_TAG_SIZE);
    Ok(Frame { channel, payload })
}
