//! Transport seams between the pipeline and whatever serves connections
//!
//! - **Subscriber** — the registry-side handle the broadcaster delivers to
//! - **FrameSink** / **PeerSignal** — the two halves of one live connection
//!   as seen by its session
//! - **Acceptor** — a source of new connections

use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;

/// One encoded wire message, shared by every subscriber of a publish pass
pub type Frame = Arc<str>;

/// Outcome of a single delivery attempt
///
/// A failure is terminal for the handle it was attempted on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    Failed(String),
}

impl Delivery {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Delivery::Delivered)
    }
}

/// Registry-side handle to one connected subscriber
#[async_trait]
pub trait Subscriber: Send + Sync {
    /// Attempt to hand one frame to the subscriber
    async fn send(&self, frame: Frame) -> Delivery;

    /// Whether the subscriber's side has gone away
    fn is_closed(&self) -> bool;
}

/// Subscriber backed by a bounded queue drained by its session
///
/// The queue decouples the broadcaster from the socket: a delivery only
/// waits for queue space, never for the network.
#[derive(Debug, Clone)]
pub struct ChannelSubscriber {
    tx: mpsc::Sender<Frame>,
}

impl ChannelSubscriber {
    /// Create a handle and the receiving end its session drains
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<Frame>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (Self { tx }, rx)
    }
}

#[async_trait]
impl Subscriber for ChannelSubscriber {
    async fn send(&self, frame: Frame) -> Delivery {
        match self.tx.send(frame).await {
            Ok(()) => Delivery::Delivered,
            Err(_) => Delivery::Failed("session receiver closed".to_string()),
        }
    }

    fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Outbound half of a live connection
#[async_trait]
pub trait FrameSink: Send {
    /// Write one text frame to the peer
    async fn send_frame(&mut self, frame: &str) -> Delivery;

    /// Best-effort close notification to the peer
    async fn close(&mut self);
}

/// Inbound half of a live connection
#[async_trait]
pub trait PeerSignal: Send {
    /// Resolve once the peer has disconnected
    ///
    /// Inbound data is discarded. Must be cancel-safe: the session
    /// re-polls it after every delivered frame.
    async fn closed(&mut self);
}

/// Source of newly accepted connections
#[async_trait]
pub trait Acceptor: Send {
    type Sink: FrameSink + 'static;
    type Peer: PeerSignal + 'static;

    /// Wait for the next connection
    ///
    /// `Ok(None)` means the acceptor is exhausted. `Err` is
    /// `SentinelError::AcceptFailed` and is transient.
    async fn accept(&mut self) -> Result<Option<(Self::Sink, Self::Peer)>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_subscriber_delivers() {
        let (sub, mut rx) = ChannelSubscriber::channel(4);
        assert_eq!(sub.send(Frame::from("hello")).await, Delivery::Delivered);
        assert_eq!(rx.recv().await.as_deref(), Some("hello"));
    }

    #[tokio::test]
    async fn test_channel_subscriber_fails_after_receiver_drop() {
        let (sub, rx) = ChannelSubscriber::channel(4);
        assert!(!sub.is_closed());
        drop(rx);

        assert!(sub.is_closed());
        assert!(!sub.send(Frame::from("x")).await.is_delivered());
    }

    #[test]
    fn test_zero_buffer_is_clamped() {
        // mpsc::channel panics on zero capacity
        let (sub, _rx) = ChannelSubscriber::channel(0);
        assert!(!sub.is_closed());
    }
}
