//! Subscription session — one subscriber connection from accept to teardown
//!
//! ```text
//! Connecting ──register──► Active ──peer gone / send error / reaped / shutdown──► Closed
//!      └────────────── registry full ─────────────────────────────────────────────┘
//! ```
//!
//! Whatever ends a session, its registry entry is removed exactly once:
//! `close` unregisters idempotently and `Drop` covers a task that is
//! aborted mid-stream.

use crate::broadcast::{Registry, SubscriberHandle};
use crate::error::SentinelError;
use crate::registry::RegistrationId;
use crate::transport::{Acceptor, ChannelSubscriber, Delivery, Frame, FrameSink, PeerSignal};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// Lifecycle state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Active,
    Closed,
}

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// Peer disconnected
    PeerDisconnected,
    /// Writing to the peer failed or timed out
    SendFailed,
    /// The broadcaster removed the entry after a failed delivery
    Reaped,
    /// Process shutdown
    Shutdown,
    /// Registry was full; never became active
    Rejected,
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CloseReason::PeerDisconnected => "peer_disconnected",
            CloseReason::SendFailed => "send_failed",
            CloseReason::Reaped => "reaped",
            CloseReason::Shutdown => "shutdown",
            CloseReason::Rejected => "rejected",
        };
        f.write_str(s)
    }
}

/// Per-session tuning
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Outbound queue depth between broadcaster and socket
    pub buffer: usize,

    /// Bound on one socket write
    pub send_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            buffer: 64,
            send_timeout: Duration::from_secs(5),
        }
    }
}

/// One subscriber connection
pub struct Session {
    /// Session identifier for logs (ses-<uuid>)
    id: String,
    registry: Arc<Registry>,
    config: SessionConfig,
    state: SessionState,
    registration: Option<RegistrationId>,
}

impl Session {
    pub fn new(registry: Arc<Registry>, config: SessionConfig) -> Self {
        Self {
            id: format!("ses-{}", uuid::Uuid::new_v4()),
            registry,
            config,
            state: SessionState::Connecting,
            registration: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn registration(&self) -> Option<RegistrationId> {
        self.registration
    }

    /// `Connecting → Active`: register a queue-backed handle
    ///
    /// Returns the receiving end of the queue. On a full registry the
    /// session goes straight to `Closed`. Only valid once, from `Connecting`.
    pub fn activate(&mut self) -> crate::Result<mpsc::Receiver<Frame>> {
        if self.state != SessionState::Connecting {
            return Err(SentinelError::InvalidState(format!(
                "session {} cannot activate from {:?}",
                self.id, self.state
            )));
        }
        let (handle, frames) = ChannelSubscriber::channel(self.config.buffer);
        let handle: SubscriberHandle = Arc::new(handle);

        match self.registry.register(handle) {
            Ok(id) => {
                self.registration = Some(id);
                self.state = SessionState::Active;
                tracing::info!(session = %self.id, registration = %id, "Session active");
                Ok(frames)
            }
            Err(e) => {
                self.state = SessionState::Closed;
                Err(e)
            }
        }
    }

    /// `Active → Closed`, removing the registry entry if still present
    ///
    /// Calling it again is a no-op.
    pub fn close(&mut self, reason: CloseReason) {
        if self.state == SessionState::Closed {
            return;
        }
        self.state = SessionState::Closed;
        if let Some(id) = self.registration {
            let removed = self.registry.unregister(id);
            tracing::info!(
                session = %self.id,
                registration = %id,
                reason = %reason,
                removed,
                "Session closed"
            );
        }
    }

    /// Drive the session until it closes
    ///
    /// Streams queued frames to `sink` while watching `peer` for
    /// disconnection and `shutdown` for process exit.
    pub async fn run<S, P>(
        mut self,
        mut sink: S,
        mut peer: P,
        shutdown: CancellationToken,
    ) -> CloseReason
    where
        S: FrameSink,
        P: PeerSignal,
    {
        let mut frames = match self.activate() {
            Ok(frames) => frames,
            Err(e) => {
                tracing::warn!(session = %self.id, error = %e, "Rejecting subscriber");
                sink.close().await;
                return CloseReason::Rejected;
            }
        };

        let reason = loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => break CloseReason::Shutdown,

                _ = peer.closed() => break CloseReason::PeerDisconnected,

                frame = frames.recv() => {
                    let Some(frame) = frame else {
                        // Every sender is gone: the broadcaster dropped our entry
                        break CloseReason::Reaped;
                    };
                    let sent = tokio::time::timeout(
                        self.config.send_timeout,
                        sink.send_frame(&frame),
                    )
                    .await;
                    match sent {
                        Ok(Delivery::Delivered) => {}
                        Ok(Delivery::Failed(e)) => {
                            tracing::debug!(error = %e, "Socket write failed");
                            break CloseReason::SendFailed;
                        }
                        Err(_) => {
                            tracing::debug!("Socket write timed out");
                            break CloseReason::SendFailed;
                        }
                    }
                }
            }
        };

        self.close(reason);
        drop(frames);
        sink.close().await;
        reason
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.state != SessionState::Closed {
            self.close(CloseReason::Shutdown);
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("registration", &self.registration)
            .finish()
    }
}

/// Accept connections until the acceptor is exhausted or shutdown fires
///
/// Each connection runs as its own task on `tracker`. Accept failures are
/// logged and the loop keeps going. Returns the number of sessions spawned.
pub async fn accept_loop<A: Acceptor>(
    mut acceptor: A,
    registry: Arc<Registry>,
    config: SessionConfig,
    shutdown: CancellationToken,
    tracker: TaskTracker,
) -> usize {
    let mut spawned = 0;
    loop {
        let accepted = tokio::select! {
            _ = shutdown.cancelled() => break,
            accepted = acceptor.accept() => accepted,
        };

        match accepted {
            Ok(Some((sink, peer))) => {
                let session = Session::new(registry.clone(), config.clone());
                tracker.spawn(session.run(sink, peer, shutdown.clone()));
                spawned += 1;
            }
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(error = %e, "Accept failed; continuing");
            }
        }
    }
    spawned
}
