//! Error taxonomy shared by the cluster, upstream and HTTP layers.

use axum::http::StatusCode;
use thiserror::Error;

/// Errors surfaced by router construction and upstream calls.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// Missing or malformed cluster descriptor. Fatal at startup.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Transport-level failure reaching the orchestration API.
    #[error("upstream unreachable at {url}: {reason}")]
    UpstreamUnreachable {
        url: String,
        reason: String,
        timed_out: bool,
    },

    /// Non-success status, non-JSON body or unexpected response shape.
    #[error("upstream protocol error from {url}: {reason}")]
    UpstreamProtocol {
        url: String,
        reason: String,
        status: Option<StatusCode>,
        body: Option<String>,
    },
}

impl ProxyError {
    /// Stable name used in error response bodies.
    pub fn name(&self) -> &'static str {
        match self {
            ProxyError::Configuration(_) => "ConfigurationError",
            ProxyError::UpstreamUnreachable { .. } => "UpstreamUnreachableError",
            ProxyError::UpstreamProtocol { .. } => "UpstreamProtocolError",
        }
    }

    pub(crate) fn unreachable(url: &str, err: &reqwest::Error) -> Self {
        ProxyError::UpstreamUnreachable {
            url: url.to_string(),
            reason: err.to_string(),
            timed_out: err.is_timeout(),
        }
    }

    pub(crate) fn protocol(url: &str, reason: impl Into<String>) -> Self {
        ProxyError::UpstreamProtocol {
            url: url.to_string(),
            reason: reason.into(),
            status: None,
            body: None,
        }
    }
}

/// Result type for proxy operations.
pub type ProxyResult<T> = Result<T, ProxyError>;
