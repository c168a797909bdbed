//! Event sources and the driving pump
//!
//! The pump is the single producer: it pulls a record from its source,
//! appends it to the log store, then hands it to the broadcaster, and
//! waits at least one interval before the next record. Because there is
//! one pump, append order and broadcast order are the production order.

use crate::broadcast::Broadcaster;
use crate::store::LogStore;
use crate::types::{EventRecord, Severity};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Anything that can produce event records on demand
pub trait EventSource: Send {
    /// Produce the next record; every field must be populated
    fn next(&mut self) -> EventRecord;
}

impl<F> EventSource for F
where
    F: FnMut() -> EventRecord + Send,
{
    fn next(&mut self) -> EventRecord {
        self()
    }
}

/// Activity kinds emitted by the synthetic source
pub const SYNTHETIC_EVENTS: [&str; 5] = [
    "Login attempt",
    "USB mounted",
    "Suspicious process",
    "Network spike",
    "File exfiltration",
];

/// Random demo activity across a fixed population of employees
pub struct SyntheticSource {
    rng: StdRng,
    population: u32,
}

impl SyntheticSource {
    /// Source drawing subjects from `Employee 1..=population`
    pub fn new(population: u32) -> Self {
        Self {
            rng: StdRng::from_entropy(),
            population: population.max(1),
        }
    }

    /// Deterministic source for tests and benchmarks
    pub fn with_seed(population: u32, seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            population: population.max(1),
        }
    }
}

impl Default for SyntheticSource {
    fn default() -> Self {
        Self::new(9)
    }
}

impl EventSource for SyntheticSource {
    fn next(&mut self) -> EventRecord {
        let description = SYNTHETIC_EVENTS
            .choose(&mut self.rng)
            .copied()
            .unwrap_or(SYNTHETIC_EVENTS[0]);
        let severity = Severity::ALL
            .choose(&mut self.rng)
            .copied()
            .unwrap_or(Severity::Low);
        let employee = self.rng.gen_range(1..=self.population);
        EventRecord::new(description, format!("Employee {employee}"), severity)
    }
}

/// Counters for one pump run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PumpReport {
    pub produced: u64,
    pub persisted: u64,
    pub persist_failures: u64,

    /// Sum of successful deliveries across all publishes
    pub delivered: u64,
}

/// Produce → append → publish loop on a fixed cadence
pub struct EventPump<S> {
    source: S,
    logs: LogStore,
    broadcaster: Arc<Broadcaster>,
    interval: Duration,
    report: PumpReport,
}

/// Shortest spacing the pump accepts; `tokio::time::interval` rejects zero
pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

impl<S: EventSource> EventPump<S> {
    /// Create a pump; intervals below `MIN_INTERVAL` are raised to it
    pub fn new(
        source: S,
        logs: LogStore,
        broadcaster: Arc<Broadcaster>,
        interval: Duration,
    ) -> Self {
        Self {
            source,
            logs,
            broadcaster,
            interval: interval.max(MIN_INTERVAL),
            report: PumpReport::default(),
        }
    }

    /// Counters so far
    pub fn report(&self) -> &PumpReport {
        &self.report
    }

    /// Produce, persist, and broadcast one record
    ///
    /// A persistence failure is logged and counted but does not stop the
    /// broadcast: live delivery takes priority over the durable copy.
    pub async fn step(&mut self) -> EventRecord {
        let record = self.source.next();
        self.report.produced += 1;

        match self.logs.append(&record).await {
            Ok(()) => self.report.persisted += 1,
            Err(e) => {
                self.report.persist_failures += 1;
                tracing::warn!(error = %e, "Failed to persist event; broadcasting anyway");
            }
        }

        match self.broadcaster.publish(record.clone()).await {
            Ok(published) => self.report.delivered += published.delivered as u64,
            Err(e) => tracing::error!(error = %e, "Failed to encode event for broadcast"),
        }

        tracing::debug!(
            event = record.description(),
            employee = record.subject(),
            severity = %record.severity(),
            "Event produced"
        );
        record
    }

    /// Run until `shutdown` is cancelled
    ///
    /// The first record is produced immediately; later ones are spaced by
    /// at least the configured interval.
    pub async fn run(mut self, shutdown: CancellationToken) -> PumpReport {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(interval_ms = self.interval.as_millis() as u64, "Event pump started");
        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    self.step().await;
                }
            }
        }

        tracing::info!(
            produced = self.report.produced,
            persisted = self.report.persisted,
            persist_failures = self.report.persist_failures,
            "Event pump stopped"
        );
        self.report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::Registry;
    use crate::store::MemoryStore;
    use crate::transport::ChannelSubscriber;

    fn pump_parts() -> (Arc<MemoryStore>, LogStore, Arc<Broadcaster>) {
        let store = Arc::new(MemoryStore::new());
        let logs = LogStore::new(store.clone());
        let broadcaster = Arc::new(Broadcaster::new(
            Arc::new(Registry::new(16)),
            Duration::from_millis(100),
        ));
        (store, logs, broadcaster)
    }

    #[test]
    fn test_synthetic_source_populates_fields() {
        let mut source = SyntheticSource::with_seed(9, 7);
        for _ in 0..100 {
            let record = source.next();
            assert!(SYNTHETIC_EVENTS.contains(&record.description()));
            let n: u32 = record
                .subject()
                .strip_prefix("Employee ")
                .unwrap()
                .parse()
                .unwrap();
            assert!((1..=9).contains(&n));
        }
    }

    #[test]
    fn test_seeded_sources_agree() {
        let mut a = SyntheticSource::with_seed(9, 42);
        let mut b = SyntheticSource::with_seed(9, 42);
        for _ in 0..10 {
            let (ra, rb) = (a.next(), b.next());
            assert_eq!(ra.description(), rb.description());
            assert_eq!(ra.subject(), rb.subject());
            assert_eq!(ra.severity(), rb.severity());
        }
    }

    #[test]
    fn test_closure_is_a_source() {
        let mut n = 0;
        let mut source = move || {
            n += 1;
            EventRecord::new(format!("E{n}"), "Employee 1", Severity::Low)
        };
        assert_eq!(EventSource::next(&mut source).description(), "E1");
        assert_eq!(EventSource::next(&mut source).description(), "E2");
    }

    #[tokio::test]
    async fn test_step_appends_then_publishes() {
        let (store, logs, broadcaster) = pump_parts();
        let (sub, mut rx) = ChannelSubscriber::channel(4);
        broadcaster.registry().register(Arc::new(sub)).unwrap();

        let mut pump = EventPump::new(
            SyntheticSource::with_seed(9, 1),
            logs,
            broadcaster,
            Duration::from_millis(10),
        );
        let record = pump.step().await;

        assert_eq!(store.len(crate::store::LOG_COLLECTION).await, 1);
        let frame = rx.recv().await.unwrap();
        assert!(frame.contains(record.subject()));
        assert_eq!(
            pump.report(),
            &PumpReport {
                produced: 1,
                persisted: 1,
                persist_failures: 0,
                delivered: 1,
            }
        );
    }

    #[tokio::test]
    async fn test_step_broadcasts_when_store_is_down() {
        let (store, logs, broadcaster) = pump_parts();
        store.set_available(false);
        let (sub, mut rx) = ChannelSubscriber::channel(4);
        broadcaster.registry().register(Arc::new(sub)).unwrap();

        let mut pump = EventPump::new(
            SyntheticSource::with_seed(9, 2),
            logs,
            broadcaster,
            Duration::from_millis(10),
        );
        pump.step().await;

        assert!(rx.recv().await.is_some());
        assert_eq!(pump.report().persist_failures, 1);
        assert_eq!(pump.report().delivered, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_interval_is_clamped() {
        let (store, logs, broadcaster) = pump_parts();
        let shutdown = CancellationToken::new();
        let pump = EventPump::new(
            SyntheticSource::with_seed(9, 4),
            logs,
            broadcaster,
            Duration::ZERO,
        );
        let task = tokio::spawn(pump.run(shutdown.clone()));

        tokio::time::sleep(Duration::from_millis(5)).await;
        shutdown.cancel();
        let report = task.await.unwrap();

        assert!(report.produced >= 1);
        assert_eq!(store.len(crate::store::LOG_COLLECTION).await as u64, report.persisted);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_respects_interval_and_shutdown() {
        let (store, logs, broadcaster) = pump_parts();
        let shutdown = CancellationToken::new();
        let pump = EventPump::new(
            SyntheticSource::with_seed(9, 3),
            logs,
            broadcaster,
            Duration::from_secs(1),
        );
        let task = tokio::spawn(pump.run(shutdown.clone()));

        // Ticks at t=0, 1s, 2s
        tokio::time::sleep(Duration::from_millis(2500)).await;
        shutdown.cancel();
        let report = task.await.unwrap();

        assert_eq!(report.produced, 3);
        assert_eq!(store.len(crate::store::LOG_COLLECTION).await, 3);
    }
}
