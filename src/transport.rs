//! Outbound transport seam.
//!
//! The socket itself (connect, reconnect, framing, delivery) lives outside this
//! crate. `GameClient` only needs somewhere to put outbound frames; the host
//! feeds connect/disconnect notifications and inbound frames back in.

use std::collections::VecDeque;

use serde::Serialize;
use serde_json::Value;

use crate::error::TransportError;
use crate::protocol::ClientMessage;

/// Outbound half of the bidirectional event channel.
pub trait Transport {
    /// Send one message. Fire-and-forget: no acknowledgement is awaited.
    fn emit(&mut self, message: &ClientMessage) -> Result<(), TransportError>;
}

/// One outbound frame: event name plus JSON payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutboundFrame {
    pub event: &'static str,
    pub data: Value,
}

impl OutboundFrame {
    pub fn encode(message: &ClientMessage) -> Result<Self, TransportError> {
        let event = message.event();
        let data = message
            .payload()
            .map_err(|source| TransportError::Encode { event, source })?;
        Ok(Self { event, data })
    }
}

/// Buffering transport.
///
/// Frames queue up in emit order until the host drains them into its socket.
/// Once closed, further emits fail with `TransportError::Closed`.
#[derive(Debug, Default)]
pub struct OutboundQueue {
    frames: VecDeque<OutboundFrame>,
    closed: bool,
}

impl OutboundQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take every queued frame, oldest first.
    pub fn drain(&mut self) -> Vec<OutboundFrame> {
        self.frames.drain(..).collect()
    }

    /// Queued frames, oldest first.
    pub fn frames(&self) -> impl Iterator<Item = &OutboundFrame> {
        self.frames.iter()
    }

    /// Queued frames with the given event name.
    pub fn frames_for<'a>(&'a self, event: &'a str) -> impl Iterator<Item = &'a OutboundFrame> {
        self.frames.iter().filter(move |f| f.event == event)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn close(&mut self) {
        self.closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Transport for OutboundQueue {
    fn emit(&mut self, message: &ClientMessage) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        self.frames.push_back(OutboundFrame::encode(message)?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{AuthenticatePayload, CreateRoomPayload};
    use serde_json::json;

    fn auth(id: &str) -> ClientMessage {
        ClientMessage::Authenticate(AuthenticatePayload {
            client_id: id.to_string(),
        })
    }

    #[test]
    fn test_queue_preserves_order() {
        let mut queue = OutboundQueue::new();
        queue.emit(&auth("c1")).unwrap();
        queue
            .emit(&ClientMessage::CreateRoom(CreateRoomPayload {
                name: "room".to_string(),
                password: "pw".to_string(),
            }))
            .unwrap();

        let frames = queue.drain();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].event, "authenticate");
        assert_eq!(frames[0].data, json!({"clientId": "c1"}));
        assert_eq!(frames[1].event, "create room");
        assert!(queue.is_empty());
    }

    #[test]
    fn test_frames_for() {
        let mut queue = OutboundQueue::new();
        queue.emit(&auth("c1")).unwrap();
        queue.emit(&auth("c1")).unwrap();

        assert_eq!(queue.frames_for("authenticate").count(), 2);
        assert_eq!(queue.frames_for("join room").count(), 0);
    }

    #[test]
    fn test_closed_queue_rejects() {
        let mut queue = OutboundQueue::new();
        queue.close();
        assert!(matches!(queue.emit(&auth("c1")), Err(TransportError::Closed)));
        assert!(queue.is_empty());
    }
}
