//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use mesh_tap_proxy::bridge::WebSocketBridge;
use mesh_tap_proxy::config::{ClusterConfig, ProxyConfig};
use mesh_tap_proxy::{HttpServer, Shutdown};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::Message;

pub const TOKEN: &str = "T";

/// One request seen by the mock HTTP upstream.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub target: String,
    pub headers: Vec<(String, String)>,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Mock HTTP upstream answering every request with a fixed status and body.
pub struct MockUpstream {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockUpstream {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

pub async fn start_http_upstream(status: u16, body: impl Into<String>) -> MockUpstream {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let requests = Arc::new(Mutex::new(Vec::new()));
    let recorded = requests.clone();
    let body: String = body.into();

    tokio::spawn(async move {
        loop {
            let (mut socket, _) = match listener.accept().await {
                Ok(conn) => conn,
                Err(_) => break,
            };
            let recorded = recorded.clone();
            let body = body.clone();
            tokio::spawn(async move {
                let mut buf = Vec::new();
                let mut chunk = [0u8; 1024];
                while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut chunk).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => buf.extend_from_slice(&chunk[..n]),
                    }
                }

                let head = String::from_utf8_lossy(&buf).to_string();
                let mut lines = head.split("\r\n");
                let mut request_line = lines.next().unwrap_or_default().split(' ');
                let method = request_line.next().unwrap_or_default().to_string();
                let target = request_line.next().unwrap_or_default().to_string();
                let headers = lines
                    .take_while(|l| !l.is_empty())
                    .filter_map(|l| l.split_once(':'))
                    .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
                    .collect();
                recorded.lock().unwrap().push(RecordedRequest {
                    method,
                    target,
                    headers,
                });

                let reason = axum::http::StatusCode::from_u16(status)
                    .ok()
                    .and_then(|s| s.canonical_reason())
                    .unwrap_or("Unknown");
                let response = format!(
                    "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    reason,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    MockUpstream { addr, requests }
}

/// What the mock tap upstream observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TapEvent {
    Connected {
        path: String,
        authorization: Option<String>,
    },
    Frame(String),
    Closed,
}

/// Mock tap WebSocket upstream.
pub struct MockTap {
    pub addr: SocketAddr,
    pub events: mpsc::UnboundedReceiver<TapEvent>,
    connections: Arc<AtomicUsize>,
}

impl MockTap {
    pub fn url(&self) -> String {
        format!("ws://{}/api/tap", self.addr)
    }

    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    pub async fn next_event(&mut self) -> TapEvent {
        tokio::time::timeout(Duration::from_secs(5), self.events.recv())
            .await
            .expect("timed out waiting for tap event")
            .expect("tap event channel closed")
    }
}

/// What the mock tap does once its script has been sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapEnd {
    /// Keep the stream open until the peer closes.
    Wait,
    /// Send a close frame.
    Close,
    /// Drop the TCP stream without a closing handshake.
    Drop,
}

/// Start a tap upstream. After the first client frame it sends `script` in
/// order, then ends as `end` says.
pub async fn start_tap_upstream(script: Vec<Message>, end: TapEnd) -> MockTap {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (events_tx, events) = mpsc::unbounded_channel();
    let connections = Arc::new(AtomicUsize::new(0));
    let counter = connections.clone();

    tokio::spawn(async move {
        loop {
            let (stream, _) = match listener.accept().await {
                Ok(conn) => conn,
                Err(_) => break,
            };
            counter.fetch_add(1, Ordering::SeqCst);
            let events_tx = events_tx.clone();
            let script = script.clone();
            tokio::spawn(async move {
                let mut seen = None;
                let callback = |req: &Request, resp: Response| {
                    let authorization = req
                        .headers()
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        .map(String::from);
                    seen = Some((req.uri().path().to_string(), authorization));
                    Ok::<Response, ErrorResponse>(resp)
                };
                let mut socket = match tokio_tungstenite::accept_hdr_async(stream, callback).await {
                    Ok(socket) => socket,
                    Err(_) => return,
                };
                if let Some((path, authorization)) = seen {
                    let _ = events_tx.send(TapEvent::Connected {
                        path,
                        authorization,
                    });
                }

                let mut subscribed = false;
                while let Some(message) = socket.next().await {
                    match message {
                        Ok(Message::Text(text)) => {
                            let _ = events_tx.send(TapEvent::Frame(text.as_str().to_string()));
                            if !subscribed {
                                subscribed = true;
                                for frame in script.iter().cloned() {
                                    if socket.send(frame).await.is_err() {
                                        break;
                                    }
                                }
                                match end {
                                    TapEnd::Wait => {}
                                    TapEnd::Close => {
                                        let _ = socket.close(None).await;
                                    }
                                    TapEnd::Drop => break,
                                }
                            }
                        }
                        Ok(Message::Close(_)) | Err(_) => break,
                        Ok(_) => {}
                    }
                }
                let _ = events_tx.send(TapEvent::Closed);
            });
        }
    });

    MockTap {
        addr,
        events,
        connections,
    }
}

pub fn proxy_config(cluster_url: &str) -> ProxyConfig {
    let mut config = ProxyConfig::default();
    config.clusters.push(ClusterConfig {
        name: "test".into(),
        url: cluster_url.into(),
        service_account_token: Some(TOKEN.into()),
    });
    config.timeouts.connect_secs = 2;
    config.timeouts.upstream_secs = 5;
    config.timeouts.handshake_secs = 5;
    config
}

pub struct RunningProxy {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub bridge: Arc<WebSocketBridge>,
}

impl RunningProxy {
    pub fn http_url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/tap", self.addr)
    }
}

impl Drop for RunningProxy {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Start the proxy on an ephemeral port.
pub async fn start_proxy(config: ProxyConfig) -> RunningProxy {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server = HttpServer::new(config, shutdown.clone()).unwrap();
    let bridge = server.bridge().clone();

    tokio::spawn(async move {
        let _ = server.run(listener).await;
    });

    RunningProxy {
        addr,
        shutdown,
        bridge,
    }
}

pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}
