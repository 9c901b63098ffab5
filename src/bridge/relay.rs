//! Client↔upstream relay for tap sessions.
//!
//! # Responsibilities
//! - Wait for the client's subscription (bounded)
//! - Open the upstream tap socket with the bearer token and scoped TLS trust
//! - Send the translated subscription frame exactly once
//! - Forward upstream text/binary frames to the client unchanged, in order
//! - Close the other side when either side closes, fails or shutdown fires

use std::time::Duration;

use axum::extract::ws::{close_code, CloseFrame, Message, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{header::AUTHORIZATION, HeaderValue};
use tokio_tungstenite::tungstenite::Message as UpstreamMessage;
use tokio_tungstenite::{connect_async_tls_with_config, MaybeTlsStream, WebSocketStream};

use crate::bridge::session::{BridgeSession, SessionTracker};
use crate::bridge::subscription::{ClientSubscription, TapRequest};
use crate::bridge::BridgeError;
use crate::cluster::{ClusterEndpoint, TransportTrust};
use crate::config::{TimeoutConfig, UpstreamConfig};
use crate::error::ProxyResult;
use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::resilience::with_deadline;

type UpstreamSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;
type ClientSink = SplitSink<WebSocket, Message>;
type ClientStream = SplitStream<WebSocket>;

/// How a session ended.
#[derive(Debug)]
enum SessionEnd {
    /// Client closed or went away.
    ClientClosed,
    /// Upstream closed the tap stream.
    UpstreamClosed,
    /// Process shutdown.
    Shutdown,
    Failed(BridgeError),
}

impl SessionEnd {
    fn outcome(&self) -> &'static str {
        match self {
            SessionEnd::ClientClosed => "client_closed",
            SessionEnd::UpstreamClosed => "upstream_closed",
            SessionEnd::Shutdown => "shutdown",
            SessionEnd::Failed(e) => e.outcome(),
        }
    }

    /// Close frame owed to the client, if it is still connected.
    fn client_close_frame(&self) -> Option<CloseFrame> {
        let (code, reason) = match self {
            SessionEnd::ClientClosed => return None,
            SessionEnd::UpstreamClosed => (close_code::NORMAL, "upstream closed".to_string()),
            SessionEnd::Shutdown => (close_code::AWAY, "proxy shutting down".to_string()),
            SessionEnd::Failed(e) => (e.close_code(), close_reason(e)),
        };
        Some(CloseFrame {
            code,
            reason: reason.into(),
        })
    }
}

/// Close reasons must fit in a control frame (125 bytes incl. the code).
fn close_reason(error: &BridgeError) -> String {
    let mut reason = error.to_string();
    if reason.len() > 120 {
        let mut cut = 120;
        while !reason.is_char_boundary(cut) {
            cut -= 1;
        }
        reason.truncate(cut);
    }
    reason
}

/// Accepts client sessions and pairs each with one upstream tap connection.
pub struct WebSocketBridge {
    tap_url: String,
    authorization: Option<String>,
    trust: TransportTrust,
    subscription_timeout: Duration,
    handshake_timeout: Duration,
    sessions: SessionTracker,
    shutdown: Shutdown,
}

impl WebSocketBridge {
    /// Build a bridge for `endpoint`. Performs no network activity.
    pub fn new(
        endpoint: &ClusterEndpoint,
        upstream: &UpstreamConfig,
        timeouts: &TimeoutConfig,
        shutdown: Shutdown,
    ) -> ProxyResult<Self> {
        let tap_url = match &upstream.tap_url {
            Some(url) => url.clone(),
            None => endpoint.tap_url(&upstream.proxy_prefix)?,
        };
        let trust = TransportTrust::from_insecure_flag(upstream.insecure_skip_tls_verify);
        if trust.is_insecure() {
            tracing::warn!(
                cluster = %endpoint.name(),
                "TLS verification disabled for upstream tap connections"
            );
        }

        Ok(Self {
            tap_url,
            authorization: endpoint.authorization(),
            trust,
            subscription_timeout: Duration::from_secs(timeouts.subscription_secs),
            handshake_timeout: Duration::from_secs(timeouts.handshake_secs),
            sessions: SessionTracker::new(),
            shutdown,
        })
    }

    pub fn tap_url(&self) -> &str {
        &self.tap_url
    }

    pub fn sessions(&self) -> &SessionTracker {
        &self.sessions
    }

    /// Run one session to completion on an upgraded client socket.
    pub async fn serve(&self, socket: WebSocket) {
        let guard = self.sessions.track();
        let mut session = BridgeSession::new(guard.id());
        let mut shutdown = self.shutdown.subscribe();
        metrics::record_session_opened();
        tracing::info!(session_id = %session.id(), "Tap session opened");

        let (mut client_tx, mut client_rx) = socket.split();
        let end = self
            .run(&mut session, &mut client_tx, &mut client_rx, &mut shutdown)
            .await;
        session.close();

        if let Some(frame) = end.client_close_frame() {
            let _ = client_tx.send(Message::Close(Some(frame))).await;
        }
        let _ = client_tx.close().await;

        match &end {
            SessionEnd::Failed(e) => tracing::warn!(
                session_id = %session.id(),
                error = %e,
                "Tap session failed"
            ),
            other => tracing::info!(
                session_id = %session.id(),
                outcome = other.outcome(),
                "Tap session closed"
            ),
        }
        metrics::record_session_closed(end.outcome());
    }

    async fn run(
        &self,
        session: &mut BridgeSession,
        client_tx: &mut ClientSink,
        client_rx: &mut ClientStream,
        shutdown: &mut broadcast::Receiver<()>,
    ) -> SessionEnd {
        let waited = tokio::select! {
            waited = with_deadline("subscription", self.subscription_timeout, await_subscription(client_rx)) => waited,
            _ = shutdown.recv() => return SessionEnd::Shutdown,
        };
        let subscription = match waited {
            Ok(Ok(Some(subscription))) => subscription,
            Ok(Ok(None)) => return SessionEnd::ClientClosed,
            Ok(Err(e)) => return SessionEnd::Failed(e),
            Err(timed_out) => return SessionEnd::Failed(BridgeError::SubscriptionTimeout(timed_out)),
        };

        tracing::info!(
            session_id = %session.id(),
            resource = %subscription.resource,
            namespace = %subscription.namespace,
            "Subscribing to upstream tap"
        );

        let upstream = tokio::select! {
            connected = self.connect_upstream() => match connected {
                Ok(upstream) => upstream,
                Err(e) => return SessionEnd::Failed(e),
            },
            _ = shutdown.recv() => return SessionEnd::Shutdown,
        };
        let (mut upstream_tx, mut upstream_rx) = upstream.split();

        let end = match TapRequest::from(&subscription).to_json() {
            Ok(frame) => match upstream_tx.send(UpstreamMessage::text(frame)).await {
                Ok(()) => {
                    session.start_streaming(subscription);
                    relay(session, client_tx, client_rx, &mut upstream_rx, shutdown).await
                }
                Err(e) => SessionEnd::Failed(BridgeError::Upstream(e)),
            },
            Err(e) => SessionEnd::Failed(e),
        };

        if let Err(e) = upstream_tx.close().await {
            tracing::debug!(session_id = %session.id(), error = %e, "Upstream close failed");
        }
        end
    }

    async fn connect_upstream(&self) -> Result<UpstreamSocket, BridgeError> {
        let mut request = self.tap_url.as_str().into_client_request()?;
        if let Some(authorization) = &self.authorization {
            let value =
                HeaderValue::from_str(authorization).map_err(|_| BridgeError::InvalidAuthorization)?;
            request.headers_mut().insert(AUTHORIZATION, value);
        }
        let connector = self.trust.websocket_connector()?;

        let (socket, response) = with_deadline(
            "upstream handshake",
            self.handshake_timeout,
            connect_async_tls_with_config(request, None, false, connector),
        )
        .await
        .map_err(BridgeError::UpstreamTimeout)??;

        tracing::debug!(status = %response.status(), "Upstream tap connected");
        Ok(socket)
    }
}

impl std::fmt::Debug for WebSocketBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebSocketBridge")
            .field("tap_url", &self.tap_url)
            .field("has_token", &self.authorization.is_some())
            .field("trust", &self.trust)
            .field("active_sessions", &self.sessions.active_count())
            .finish()
    }
}

/// AwaitingSubscription: the first data frame decides the subscription.
/// `Ok(None)` means the client left first.
async fn await_subscription(
    client_rx: &mut ClientStream,
) -> Result<Option<ClientSubscription>, BridgeError> {
    while let Some(message) = client_rx.next().await {
        match message {
            Ok(Message::Text(text)) => return ClientSubscription::parse(text.as_str().as_bytes()).map(Some),
            Ok(Message::Binary(data)) => return ClientSubscription::parse(&data).map(Some),
            Ok(Message::Close(_)) => return Ok(None),
            Ok(_) => continue,
            Err(e) => {
                tracing::debug!(error = %e, "Client socket error before subscription");
                return Ok(None);
            }
        }
    }
    Ok(None)
}

/// Streaming: forward upstream frames until one side ends.
async fn relay(
    session: &BridgeSession,
    client_tx: &mut ClientSink,
    client_rx: &mut ClientStream,
    upstream_rx: &mut SplitStream<UpstreamSocket>,
    shutdown: &mut broadcast::Receiver<()>,
) -> SessionEnd {
    loop {
        tokio::select! {
            message = upstream_rx.next() => {
                let forward = match message {
                    Some(Ok(UpstreamMessage::Text(text))) => Message::Text(text.as_str().into()),
                    Some(Ok(UpstreamMessage::Binary(data))) => Message::Binary(data),
                    Some(Ok(UpstreamMessage::Close(_))) | None => return SessionEnd::UpstreamClosed,
                    // Ping/pong are answered by the upstream socket itself.
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => return SessionEnd::Failed(BridgeError::Upstream(e)),
                };
                if client_tx.send(forward).await.is_err() {
                    return SessionEnd::ClientClosed;
                }
                metrics::record_message_relayed();
            }
            message = client_rx.next() => match message {
                Some(Ok(Message::Close(_))) | None => return SessionEnd::ClientClosed,
                Some(Ok(Message::Text(_))) | Some(Ok(Message::Binary(_))) => {
                    tracing::warn!(
                        session_id = %session.id(),
                        "Ignoring client message after subscription"
                    );
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!(session_id = %session.id(), error = %e, "Client socket error");
                    return SessionEnd::ClientClosed;
                }
            },
            _ = shutdown.recv() => return SessionEnd::Shutdown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_close_frames() {
        assert!(SessionEnd::ClientClosed.client_close_frame().is_none());

        let frame = SessionEnd::UpstreamClosed.client_close_frame().unwrap();
        assert_eq!(frame.code, close_code::NORMAL);

        let frame = SessionEnd::Failed(BridgeError::MalformedSubscription("bad".into()))
            .client_close_frame()
            .unwrap();
        assert_eq!(frame.code, close_code::PROTOCOL);
        assert_eq!(frame.reason.as_str(), "malformed subscription: bad");
    }

    #[test]
    fn test_close_reason_truncated() {
        let long = BridgeError::MalformedSubscription("é".repeat(200));
        let reason = close_reason(&long);
        assert!(reason.len() <= 120);
    }

    #[test]
    fn test_tap_url_override() {
        let endpoint = ClusterEndpoint::new("c", "https://h", Some("T".into())).unwrap();
        let mut upstream = UpstreamConfig::default();

        let derived = WebSocketBridge::new(
            &endpoint,
            &upstream,
            &TimeoutConfig::default(),
            Shutdown::new(),
        )
        .unwrap();
        assert!(derived.tap_url().starts_with("wss://h/api/v1/namespaces/linkerd"));
        assert!(derived.tap_url().ends_with("/proxy/api/tap"));

        upstream.tap_url = Some("wss://127.0.0.1:59436/tap".into());
        let configured = WebSocketBridge::new(
            &endpoint,
            &upstream,
            &TimeoutConfig::default(),
            Shutdown::new(),
        )
        .unwrap();
        assert_eq!(configured.tap_url(), "wss://127.0.0.1:59436/tap");
    }
}
