//! Fan-out broadcaster
//!
//! Delivers one record to every registered subscriber and reaps the ones
//! whose delivery fails. Deliveries run concurrently, each bounded by a
//! timeout, and one subscriber's failure (including a panic inside its
//! `send`) never affects the others.

use crate::error::{Result, SentinelError};
use crate::registry::{RegistrationId, SubscriberRegistry};
use crate::transport::{Delivery, Frame, Subscriber};
use crate::types::{EventRecord, WireMessage};
use futures::future::join_all;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

/// Shared handle stored in the registry
pub type SubscriberHandle = Arc<dyn Subscriber>;

/// Registry of live subscriber handles
pub type Registry = SubscriberRegistry<SubscriberHandle>;

/// Result of one publish pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishReport {
    /// Subscribers that accepted the frame
    pub delivered: usize,

    /// Entries removed because delivery failed
    pub reaped: Vec<RegistrationId>,
}

/// Delivers records to every subscriber in a registry
pub struct Broadcaster {
    registry: Arc<Registry>,
    delivery_timeout: Duration,
}

impl Broadcaster {
    pub fn new(registry: Arc<Registry>, delivery_timeout: Duration) -> Self {
        Self {
            registry,
            delivery_timeout,
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Encode a record once and deliver it to every current subscriber
    ///
    /// Only fails if the record cannot be encoded; delivery failures are
    /// handled by unregistering the affected subscriber.
    pub async fn publish(&self, record: EventRecord) -> Result<PublishReport> {
        let frame: Frame = WireMessage::from(record).encode()?.into();
        Ok(self.publish_frame(frame).await)
    }

    /// Deliver a pre-encoded frame to every current subscriber
    pub async fn publish_frame(&self, frame: Frame) -> PublishReport {
        let targets = self.registry.snapshot();
        if targets.is_empty() {
            return PublishReport::default();
        }

        let attempts = targets.into_iter().map(|(id, handle)| {
            let frame = frame.clone();
            async move {
                let outcome = self.deliver(&handle, frame).await;
                (id, outcome)
            }
        });

        let mut report = PublishReport::default();
        for (id, outcome) in join_all(attempts).await {
            match outcome {
                Delivery::Delivered => report.delivered += 1,
                Delivery::Failed(reason) => {
                    let err = SentinelError::DeliveryFailed {
                        registration: id.as_u64(),
                        reason,
                    };
                    if self.registry.unregister(id) {
                        tracing::warn!(registration = %id, error = %err, "Reaped subscriber");
                        report.reaped.push(id);
                    }
                }
            }
        }

        tracing::debug!(
            delivered = report.delivered,
            reaped = report.reaped.len(),
            "Broadcast complete"
        );
        report
    }

    async fn deliver(&self, handle: &SubscriberHandle, frame: Frame) -> Delivery {
        if handle.is_closed() {
            return Delivery::Failed("subscriber closed".to_string());
        }

        let attempt = AssertUnwindSafe(handle.send(frame)).catch_unwind();
        match tokio::time::timeout(self.delivery_timeout, attempt).await {
            Ok(Ok(delivery)) => delivery,
            Ok(Err(_)) => Delivery::Failed("subscriber panicked during send".to_string()),
            Err(_) => Delivery::Failed(format!(
                "delivery timed out after {}ms",
                self.delivery_timeout.as_millis()
            )),
        }
    }
}
