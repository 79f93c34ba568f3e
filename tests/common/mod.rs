//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::{body::Bytes, Json, Router};
use chrono::{DateTime, TimeZone, Utc};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use traffic_redirector::config::EdgeConfig;
use traffic_redirector::lifecycle::Components;
use traffic_redirector::storage::{MemoryObjectStore, ObjectStore};
use traffic_redirector::traffic::FixedClock;
use traffic_redirector::EdgeServer;

pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 14, 15, 9, 26).unwrap()
}

/// A server over `store` with a frozen clock.
#[allow(dead_code)]
pub fn server_with_store(config: EdgeConfig, store: Option<Arc<dyn ObjectStore>>) -> EdgeServer {
    let components =
        Components::with_store(store).clock(Arc::new(FixedClock::new(fixed_now(), 271)));
    EdgeServer::with_components(config, components).unwrap()
}

/// A server logging into a fresh memory store, and that store.
#[allow(dead_code)]
pub fn memory_server(config: EdgeConfig) -> (EdgeServer, MemoryObjectStore) {
    let store = MemoryObjectStore::new();
    let server = server_with_store(config, Some(Arc::new(store.clone())));
    (server, store)
}

/// Start a mock backend answering every request with the given status,
/// content type and body. Returns its bound address.
#[allow(dead_code)]
pub async fn start_mock_backend(status: u16, content_type: &'static str, body: String) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let body = Arc::new(body);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let body = body.clone();
                    tokio::spawn(async move {
                        // Read the request head; bodies in these tests are small.
                        let mut buf = vec![0u8; 16 * 1024];
                        let _ = socket.read(&mut buf).await;

                        let status_text = match status {
                            200 => "200 OK",
                            201 => "201 Created",
                            404 => "404 Not Found",
                            500 => "500 Internal Server Error",
                            _ => "200 OK",
                        };
                        let response_str = format!(
                            "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            content_type,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Start a backend answering every request with `{"received": <body bytes>}`,
/// with no limit on the request body.
#[allow(dead_code)]
pub async fn start_echo_backend() -> SocketAddr {
    let app = Router::new()
        .fallback(|body: Bytes| async move { Json(serde_json::json!({ "received": body.len() })) })
        .layer(DefaultBodyLimit::disable());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

/// Start a backend that accepts connections and never answers.
#[allow(dead_code)]
pub async fn start_silent_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    addr
}
