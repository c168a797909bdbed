//! # a3s-sentinel
//!
//! Real-time fan-out of security events to connected viewers, with every
//! event durably recorded for later retrieval.
//!
//! ## Overview
//!
//! A single producer drives the pipeline: each record is appended to the
//! durable store and then broadcast to every live subscriber. Subscribers
//! come and go concurrently; a subscriber whose delivery fails is removed
//! without affecting anyone else.
//!
//! ## Quick Start
//!
//! ```rust
//! use a3s_sentinel::{Broadcaster, ChannelSubscriber, EventRecord, Registry, Severity};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example() -> a3s_sentinel::Result<()> {
//! let registry = Arc::new(Registry::new(1024));
//! let broadcaster = Broadcaster::new(registry.clone(), Duration::from_millis(250));
//!
//! let (viewer, mut frames) = ChannelSubscriber::channel(16);
//! registry.register(Arc::new(viewer))?;
//!
//! let report = broadcaster
//!     .publish(EventRecord::new("USB mounted", "Employee 3", Severity::High))
//!     .await?;
//! assert_eq!(report.delivered, 1);
//! println!("{}", frames.recv().await.unwrap());
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - **EventRecord** — immutable event data, also the wire payload
//! - **DurableStore** trait — append/read persistence (memory, JSONL file)
//! - **EventSource** / **EventPump** — produce → append → publish on a cadence
//! - **SubscriberRegistry** — live subscriber set keyed by registration id
//! - **Broadcaster** — bounded, isolated fan-out that reaps failed subscribers
//! - **Session** — per-connection accept/stream/teardown lifecycle
//! - **server** — axum HTTP + WebSocket surface

pub mod broadcast;
pub mod cli;
pub mod config;
pub mod error;
pub mod registry;
pub mod server;
pub mod session;
pub mod source;
pub mod store;
pub mod transport;
pub mod types;

// Re-export core types
pub use broadcast::{Broadcaster, PublishReport, Registry, SubscriberHandle};
pub use config::SentinelConfig;
pub use error::{Result, SentinelError};
pub use registry::{RegistrationId, SubscriberRegistry};
pub use session::{accept_loop, CloseReason, Session, SessionConfig, SessionState};
pub use source::{EventPump, EventSource, PumpReport, SyntheticSource};
pub use store::{DurableStore, FileStore, LogStore, MemoryStore};
pub use transport::{Acceptor, ChannelSubscriber, Delivery, Frame, FrameSink, PeerSignal, Subscriber};
pub use types::{EventRecord, Severity, WireMessage};
