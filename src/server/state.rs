use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::ws::Upgraded;
use crate::broadcast::Registry;
use crate::config::SentinelConfig;
use crate::store::LogStore;

/// Shared application state accessible to all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub logs: LogStore,
    pub registry: Arc<Registry>,
    pub config: Arc<SentinelConfig>,

    /// Process shutdown signal observed by every session
    pub shutdown: CancellationToken,

    /// Handshake results forwarded to the accept loop
    pub accepted: mpsc::Sender<Upgraded>,
}

impl AppState {
    pub fn new(
        logs: LogStore,
        registry: Arc<Registry>,
        config: Arc<SentinelConfig>,
        shutdown: CancellationToken,
        accepted: mpsc::Sender<Upgraded>,
    ) -> Self {
        Self {
            logs,
            registry,
            config,
            shutdown,
            accepted,
        }
    }
}
