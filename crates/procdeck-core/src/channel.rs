use crate::DeckError;
use std::collections::VecDeque;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender, error::TryRecvError};

/// Payload carried by a channel; anything JSON can express
pub type Message = serde_json::Value;

/// One endpoint of a duplex, non-blocking-pollable message pipe.
///
/// Each direction is an independent FIFO stream. Sends never block and apply no
/// backpressure: a producer that outpaces its consumer grows the queue without
/// bound. Receiving follows a poll-then-receive discipline so the caller never
/// blocks waiting for the peer.
#[derive(Debug)]
pub struct Channel {
    outgoing: UnboundedSender<Message>,
    incoming: UnboundedReceiver<Message>,
    pending: VecDeque<Message>,
    peer_gone: bool,
}

impl Channel {
    /// Two connected in-memory endpoints
    pub fn pair() -> (Channel, Channel) {
        let (left_tx, right_rx) = mpsc::unbounded_channel();
        let (right_tx, left_rx) = mpsc::unbounded_channel();
        (
            Channel::from_parts(left_tx, left_rx),
            Channel::from_parts(right_tx, right_rx),
        )
    }

    /// Build an endpoint over queues fed and drained by some transport
    pub fn from_parts(outgoing: UnboundedSender<Message>, incoming: UnboundedReceiver<Message>) -> Self {
        Self {
            outgoing,
            incoming,
            pending: VecDeque::new(),
            peer_gone: false,
        }
    }

    pub fn send(&self, item: impl Into<Message>) -> Result<(), DeckError> {
        self.outgoing
            .send(item.into())
            .map_err(|_| DeckError::PeerClosed)
    }

    /// True iff at least one item can be received without blocking
    pub fn poll(&mut self) -> bool {
        if self.pending.is_empty() {
            match self.incoming.try_recv() {
                Ok(item) => self.pending.push_back(item),
                Err(TryRecvError::Empty) => {}
                Err(TryRecvError::Disconnected) => self.peer_gone = true,
            }
        }
        !self.pending.is_empty()
    }

    /// Dequeue one item. Only meaningful after `poll()` returned true.
    pub fn receive(&mut self) -> Result<Message, DeckError> {
        if self.poll() {
            self.pending.pop_front().ok_or(DeckError::ChannelEmpty)
        } else if self.peer_gone {
            Err(DeckError::PeerClosed)
        } else {
            Err(DeckError::ChannelEmpty)
        }
    }

    /// The peer dropped its endpoint and every item it sent has been received
    pub fn is_exhausted(&mut self) -> bool {
        !self.poll() && self.peer_gone
    }

    /// Whether the peer stopped accepting items
    pub fn is_send_closed(&self) -> bool {
        self.outgoing.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fifo_per_direction() {
        let (mut parent, mut child) = Channel::pair();
        for i in 1..=3 {
            child.send(i).unwrap();
        }
        parent.send("Yup").unwrap();

        let mut received = Vec::new();
        while parent.poll() {
            received.push(parent.receive().unwrap());
        }
        assert_eq!(received, vec![json!(1), json!(2), json!(3)]);

        assert!(child.poll());
        assert_eq!(child.receive().unwrap(), json!("Yup"));
        assert!(!child.poll());
    }

    #[test]
    fn test_receive_on_empty_channel() {
        let (mut parent, _child) = Channel::pair();
        assert!(!parent.poll());
        assert!(matches!(parent.receive(), Err(DeckError::ChannelEmpty)));
    }

    #[test]
    fn test_poll_is_idempotent() {
        let (mut parent, child) = Channel::pair();
        child.send(7).unwrap();
        assert!(parent.poll());
        assert!(parent.poll());
        assert_eq!(parent.receive().unwrap(), json!(7));
        assert!(!parent.poll());
    }

    #[test]
    fn test_peer_closed() {
        let (mut parent, child) = Channel::pair();
        child.send("last").unwrap();
        drop(child);

        assert!(parent.is_send_closed());
        assert!(matches!(parent.send(1), Err(DeckError::PeerClosed)));

        // items sent before the peer left are still delivered
        assert!(!parent.is_exhausted());
        assert_eq!(parent.receive().unwrap(), json!("last"));
        assert!(matches!(parent.receive(), Err(DeckError::PeerClosed)));
        assert!(parent.is_exhausted());
    }
}
