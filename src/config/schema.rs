//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Proxy prefix routing a call through the platform API to the Linkerd web service.
pub const DEFAULT_PROXY_PREFIX: &str = "/api/v1/namespaces/linkerd/services/linkerd-web:8084/proxy";

/// Root configuration for the tap proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Cluster descriptors. A router serves exactly one of them.
    pub clusters: Vec<ClusterConfig>,

    /// Which cluster descriptor this router uses.
    pub cluster: Option<ClusterSelector>,

    /// Upstream addressing and transport trust.
    pub upstream: UpstreamConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:7007").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:7007".to_string(),
        }
    }
}

/// One orchestration-platform API endpoint and its access token.
#[derive(Clone, Deserialize, Serialize)]
pub struct ClusterConfig {
    /// Cluster identifier used by the selector and in logs.
    #[serde(default)]
    pub name: String,

    /// Absolute API server URL (e.g., "https://10.0.0.1:6443").
    #[serde(default)]
    pub url: String,

    /// Service-account bearer token.
    #[serde(default, alias = "serviceAccountToken")]
    pub service_account_token: Option<String>,
}

impl std::fmt::Debug for ClusterConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterConfig")
            .field("name", &self.name)
            .field("url", &self.url)
            .field(
                "service_account_token",
                &self.service_account_token.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

/// Explicit cluster selection: a descriptor name or a zero-based index.
///
/// In TOML, `cluster = "prod"` selects by name and `cluster = 1` by index.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ClusterSelector {
    Index(usize),
    Name(String),
}

impl std::fmt::Display for ClusterSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClusterSelector::Index(i) => write!(f, "index {}", i),
            ClusterSelector::Name(n) => write!(f, "name '{}'", n),
        }
    }
}

/// Upstream addressing.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Path prefix appended to the cluster URL for every proxied call.
    pub proxy_prefix: String,

    /// Tap WebSocket URL. Derived from the cluster URL when unset.
    pub tap_url: Option<String>,

    /// Accept any certificate from the upstream. INSECURE: only for clusters
    /// reached through a trusted local tunnel.
    pub insecure_skip_tls_verify: bool,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            proxy_prefix: DEFAULT_PROXY_PREFIX.to_string(),
            tap_url: None,
            insecure_skip_tls_verify: false,
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Upstream connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Total upstream HTTP call timeout in seconds.
    pub upstream_secs: u64,

    /// Router-wide request timeout in seconds.
    pub request_secs: u64,

    /// Upstream WebSocket handshake timeout in seconds.
    pub handshake_secs: u64,

    /// How long a new WebSocket client may take to send its subscription.
    pub subscription_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            upstream_secs: 15,
            request_secs: 30,
            handshake_secs: 10,
            subscription_secs: 30,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
