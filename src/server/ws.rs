//! WebSocket transport for subscription sessions
//!
//! The `/ws` handler only performs the handshake. Upgraded sockets are
//! handed to a [`WsAcceptor`], which the server drives with
//! [`accept_loop`](crate::session::accept_loop) like any other transport.

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use super::state::AppState;
use crate::error::{Result, SentinelError};
use crate::transport::{Acceptor, Delivery, FrameSink, PeerSignal};

/// Handshakes waiting for the accept loop
pub const ACCEPT_BACKLOG: usize = 64;

/// Outcome of one handshake
pub type Upgraded = Result<WebSocket>;

/// Outbound half of an upgraded socket
pub struct WsSink(SplitSink<WebSocket, Message>);

#[async_trait]
impl FrameSink for WsSink {
    async fn send_frame(&mut self, frame: &str) -> Delivery {
        match self.0.send(Message::Text(frame.to_string())).await {
            Ok(()) => Delivery::Delivered,
            Err(e) => Delivery::Failed(e.to_string()),
        }
    }

    async fn close(&mut self) {
        // Peer may already be gone
        let _ = self.0.send(Message::Close(None)).await;
        let _ = self.0.close().await;
    }
}

/// Inbound half of an upgraded socket
pub struct WsPeer(SplitStream<WebSocket>);

#[async_trait]
impl PeerSignal for WsPeer {
    async fn closed(&mut self) {
        while let Some(msg) = self.0.next().await {
            match msg {
                Ok(Message::Close(_)) | Err(_) => return,
                Ok(_) => {}
            }
        }
    }
}

/// Upgraded sockets queued by the `/ws` handler
pub struct WsAcceptor {
    rx: mpsc::Receiver<Upgraded>,
}

impl WsAcceptor {
    /// Sender for the handler side and the acceptor that drains it
    pub fn channel(backlog: usize) -> (mpsc::Sender<Upgraded>, Self) {
        let (tx, rx) = mpsc::channel(backlog.max(1));
        (tx, Self { rx })
    }
}

#[async_trait]
impl Acceptor for WsAcceptor {
    type Sink = WsSink;
    type Peer = WsPeer;

    async fn accept(&mut self) -> Result<Option<(WsSink, WsPeer)>> {
        match self.rx.recv().await {
            None => Ok(None),
            Some(Err(e)) => Err(e),
            Some(Ok(socket)) => {
                let (sink, stream) = socket.split();
                Ok(Some((WsSink(sink), WsPeer(stream))))
            }
        }
    }
}

/// GET /ws — handshake, then queue the socket for the accept loop
pub async fn upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    if state.shutdown.is_cancelled() {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }

    let failed = state.accepted.clone();
    let accepted = state.accepted;

    ws.on_failed_upgrade(move |e: axum::Error| {
        let err = SentinelError::AcceptFailed(e.to_string());
        if failed.try_send(Err(err)).is_err() {
            tracing::warn!(error = %e, "WebSocket handshake failed");
        }
    })
    .on_upgrade(move |socket| async move {
        if accepted.send(Ok(socket)).await.is_err() {
            tracing::debug!("Accept loop stopped; dropping upgraded socket");
        }
    })
}
