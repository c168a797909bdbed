pub mod api;
pub mod router;
pub mod state;
pub mod ws;

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::broadcast::{Broadcaster, Registry};
use crate::config::SentinelConfig;
use crate::error::{Result, SentinelError};
use crate::session::accept_loop;
use crate::source::{EventPump, EventSource, PumpReport, SyntheticSource};
use crate::store::{DurableStore, FileStore, LogStore, MemoryStore};

/// Pick the store backend named by the config.
pub fn open_store(config: &SentinelConfig) -> Arc<dyn DurableStore> {
    match &config.store_path {
        Some(path) => Arc::new(FileStore::new(path)),
        None => Arc::new(MemoryStore::new()),
    }
}

/// Start the server with the given configuration and run until `shutdown`.
pub async fn start(config: SentinelConfig, shutdown: CancellationToken) -> Result<PumpReport> {
    config.validate()?;
    let store = open_store(&config);
    tracing::info!(backend = store.name(), "Opened durable store");

    let bind_addr = config.bind_address();
    let listener = TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| SentinelError::Server(format!("Failed to bind to {bind_addr}: {e}")))?;
    tracing::info!("Server listening on {bind_addr}");

    let registry = Arc::new(Registry::new(config.max_subscribers));
    serve(
        listener,
        config,
        store,
        registry,
        SyntheticSource::default(),
        shutdown,
    )
    .await
}

/// Run the pump and the HTTP/WebSocket server on an already bound listener.
///
/// Sessions register in `registry`. Returns once `shutdown` is cancelled
/// (or the server fails), the pump has stopped, and every session has run
/// its teardown.
pub async fn serve<S>(
    listener: TcpListener,
    config: SentinelConfig,
    store: Arc<dyn DurableStore>,
    registry: Arc<Registry>,
    source: S,
    shutdown: CancellationToken,
) -> Result<PumpReport>
where
    S: EventSource + 'static,
{
    let logs = LogStore::new(store);
    let broadcaster = Arc::new(Broadcaster::new(registry.clone(), config.delivery_timeout()));

    let pump = EventPump::new(source, logs.clone(), broadcaster, config.interval());
    let pump_task = tokio::spawn(pump.run(shutdown.clone()));

    let (accepted, acceptor) = ws::WsAcceptor::channel(ws::ACCEPT_BACKLOG);
    let sessions = TaskTracker::new();
    let accept_task = tokio::spawn(accept_loop(
        acceptor,
        registry.clone(),
        config.session(),
        shutdown.clone(),
        sessions.clone(),
    ));

    let app_state = state::AppState::new(
        logs,
        registry.clone(),
        Arc::new(config),
        shutdown.clone(),
        accepted,
    );
    let app = router::build(app_state);

    let signal = shutdown.clone();
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async move { signal.cancelled().await })
        .await;

    // Make sure the pump and sessions stop even if the server failed
    shutdown.cancel();
    match accept_task.await {
        Ok(spawned) => tracing::debug!(sessions = spawned, "Accept loop stopped"),
        Err(e) => tracing::error!(error = %e, "Accept loop task failed"),
    }
    sessions.close();
    sessions.wait().await;

    let report = pump_task
        .await
        .map_err(|e| SentinelError::Server(format!("Event pump task failed: {e}")))?;
    tracing::info!(remaining = registry.len(), "Shutdown complete");

    served.map_err(|e| SentinelError::Server(format!("Server error: {e}")))?;
    Ok(report)
}
