use std::collections::VecDeque;
use std::time::SystemTime;

use bytes::Bytes;
use relaybridge_frame::{ChannelId, Frame, INTERNAL};

use crate::table::{ClientId, SERVER_CLIENT_ID};

/// What a polled event reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Connect,
    Disconnect,
    Data,
    /// Nothing was pending.
    Nothing,
}

/// One transport event handed to the caller by `poll`.
///
/// `channel` and `payload` are only meaningful for [`EventKind::Data`].
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkEvent {
    pub kind: EventKind,
    pub client_id: ClientId,
    pub channel: ChannelId,
    pub payload: Bytes,
    pub timestamp: SystemTime,
}

impl NetworkEvent {
    pub fn connect(client_id: ClientId) -> Self {
        Self::control(EventKind::Connect, client_id)
    }

    pub fn disconnect(client_id: ClientId) -> Self {
        Self::control(EventKind::Disconnect, client_id)
    }

    pub fn data(client_id: ClientId, frame: Frame) -> Self {
        Self {
            kind: EventKind::Data,
            client_id,
            channel: frame.channel,
            payload: frame.payload,
            timestamp: SystemTime::now(),
        }
    }

    /// The idle result, stamped with the current time.
    pub fn nothing() -> Self {
        Self::control(EventKind::Nothing, SERVER_CLIENT_ID)
    }

    fn control(kind: EventKind, client_id: ClientId) -> Self {
        Self {
            kind,
            client_id,
            channel: INTERNAL,
            payload: Bytes::new(),
            timestamp: SystemTime::now(),
        }
    }
}

/// Unbounded FIFO of events waiting to be polled.
#[derive(Debug, Default)]
pub struct EventQueue {
    pending: VecDeque<NetworkEvent>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, event: NetworkEvent) {
        self.pending.push_back(event);
    }

    /// Oldest pending event.
    pub fn dequeue(&mut self) -> Option<NetworkEvent> {
        self.pending.pop_front()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}
