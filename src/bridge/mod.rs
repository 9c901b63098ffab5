//! WebSocket bridge subsystem.
//!
//! # Data Flow
//! ```text
//! Client ──upgrade──▶ session (AwaitingSubscription)
//!     first message {resource, namespace}
//!     → subscription.rs (parse, translate to TapRequest)
//!     → relay.rs (open upstream tap socket with Bearer token, send TapRequest)
//!
//! Client ◀──── tap frames, verbatim, in order ────  Upstream   (Streaming)
//! ```
//!
//! # Design Decisions
//! - Upstream opened lazily: the subscription is only known after the first message
//! - Only the first client message subscribes; later ones are ignored
//! - Either side closing closes the other; errors end only their own session

pub mod relay;
pub mod session;
pub mod subscription;

use axum::extract::ws::close_code;
use thiserror::Error;
use tokio_tungstenite::tungstenite;

use crate::resilience::TimedOut;

pub use relay::WebSocketBridge;
pub use session::{BridgeSession, SessionId, SessionState, SessionTracker};
pub use subscription::{ClientSubscription, TapRequest, TAP_REQUEST_ID};

/// Errors that end a single bridge session.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// First client message was not a valid subscription.
    #[error("malformed subscription: {0}")]
    MalformedSubscription(String),

    /// Client never sent a subscription.
    #[error(transparent)]
    SubscriptionTimeout(TimedOut),

    /// Upstream handshake did not finish in time.
    #[error(transparent)]
    UpstreamTimeout(TimedOut),

    /// Upstream connect, handshake or stream failure.
    #[error("upstream websocket error: {0}")]
    Upstream(#[from] tungstenite::Error),

    /// Could not build the scoped TLS connector.
    #[error("upstream TLS setup failed: {0}")]
    Tls(#[from] native_tls::Error),

    /// Bearer token is not a valid header value.
    #[error("authorization header is not a valid header value")]
    InvalidAuthorization,

    #[error("failed to encode tap request: {0}")]
    Encode(#[from] serde_json::Error),
}

impl BridgeError {
    /// Close code sent to the client when this error ends the session.
    pub fn close_code(&self) -> u16 {
        match self {
            BridgeError::MalformedSubscription(_) => close_code::PROTOCOL,
            BridgeError::SubscriptionTimeout(_) => close_code::POLICY,
            _ => close_code::ERROR,
        }
    }

    /// Short label for metrics.
    pub fn outcome(&self) -> &'static str {
        match self {
            BridgeError::MalformedSubscription(_) => "malformed_subscription",
            BridgeError::SubscriptionTimeout(_) => "subscription_timeout",
            BridgeError::UpstreamTimeout(_) => "upstream_timeout",
            _ => "upstream_error",
        }
    }
}
