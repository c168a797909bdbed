//! WebSocket transport integration tests
//!
//! Runs the full server on an ephemeral port and talks to `/ws` with a real
//! client: handshake, the JSON envelope on the wire, and registry teardown
//! when either side ends the connection.

use a3s_sentinel::server::serve;
use a3s_sentinel::{MemoryStore, PumpReport, Registry, SentinelConfig, SyntheticSource};
use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

struct Running {
    addr: SocketAddr,
    registry: Arc<Registry>,
    shutdown: CancellationToken,
    task: JoinHandle<a3s_sentinel::Result<PumpReport>>,
}

async fn start_server() -> Running {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let registry = Arc::new(Registry::new(8));
    let shutdown = CancellationToken::new();
    let config = SentinelConfig {
        interval_ms: 20,
        ..Default::default()
    };

    let task = tokio::spawn(serve(
        listener,
        config,
        Arc::new(MemoryStore::new()),
        registry.clone(),
        SyntheticSource::with_seed(9, 11),
        shutdown.clone(),
    ));
    Running {
        addr,
        registry,
        shutdown,
        task,
    }
}

async fn connect(addr: SocketAddr) -> Client {
    let (client, _) = connect_async(format!("ws://{addr}/ws")).await.unwrap();
    client
}

async fn next_text(client: &mut Client) -> String {
    let read = async {
        loop {
            match client.next().await {
                Some(Ok(Message::Text(text))) => return text,
                Some(Ok(_)) => continue,
                other => panic!("stream ended before a text frame: {other:?}"),
            }
        }
    };
    tokio::time::timeout(Duration::from_secs(5), read)
        .await
        .expect("no frame within 5s")
}

async fn wait_for_len(registry: &Registry, len: usize) {
    for _ in 0..400 {
        if registry.len() == len {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("registry never reached {len} entries (now {})", registry.len());
}

#[tokio::test]
async fn test_client_receives_log_envelope() {
    let server = start_server().await;
    let mut client = connect(server.addr).await;
    wait_for_len(&server.registry, 1).await;

    let text = next_text(&mut client).await;
    let frame: serde_json::Value = serde_json::from_str(&text).unwrap();

    let top = frame.as_object().unwrap();
    assert_eq!(top.len(), 2);
    assert_eq!(frame["type"], "log");

    let payload = frame["payload"].as_object().unwrap();
    let mut keys: Vec<&str> = payload.keys().map(String::as_str).collect();
    keys.sort_unstable();
    assert_eq!(keys, vec!["employee", "event", "occurred_at", "severity"]);
    assert!(payload["employee"].as_str().unwrap().starts_with("Employee "));
    assert!(["low", "medium", "high"].contains(&payload["severity"].as_str().unwrap()));
    assert!(chrono::DateTime::parse_from_rfc3339(payload["occurred_at"].as_str().unwrap()).is_ok());

    client.close(None).await.unwrap();
    wait_for_len(&server.registry, 0).await;

    server.shutdown.cancel();
    let report = server.task.await.unwrap().unwrap();
    assert!(report.delivered >= 1);
}

#[tokio::test]
async fn test_clients_share_frames() {
    let server = start_server().await;
    let mut first = connect(server.addr).await;
    let mut second = connect(server.addr).await;
    wait_for_len(&server.registry, 2).await;

    // Anything the later client sees was published to both
    let b = next_text(&mut second).await;
    let mut a = next_text(&mut first).await;
    for _ in 0..100 {
        if a == b {
            break;
        }
        a = next_text(&mut first).await;
    }
    assert_eq!(a, b);

    drop(first);
    wait_for_len(&server.registry, 1).await;

    server.shutdown.cancel();
    server.task.await.unwrap().unwrap();
    assert!(server.registry.is_empty());
}

#[tokio::test]
async fn test_shutdown_closes_connected_clients() {
    let server = start_server().await;
    let mut client = connect(server.addr).await;
    wait_for_len(&server.registry, 1).await;
    next_text(&mut client).await;

    server.shutdown.cancel();
    server.task.await.unwrap().unwrap();
    assert!(server.registry.is_empty());

    let ended = tokio::time::timeout(Duration::from_secs(5), async {
        while let Some(msg) = client.next().await {
            match msg {
                Ok(Message::Close(_)) | Err(_) => return,
                Ok(_) => {}
            }
        }
    })
    .await;
    assert!(ended.is_ok());
}
