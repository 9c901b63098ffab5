//! Authenticated HTTP client for the platform's service proxy.
//!
//! # Responsibilities
//! - Build the proxied URL for a relative API path
//! - Attach the bearer token
//! - Validate the status before parsing the JSON body
//! - Map transport and protocol failures onto `ProxyError`

use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::header::AUTHORIZATION;
use serde_json::Value;

use crate::cluster::{ClusterEndpoint, TransportTrust};
use crate::config::{TimeoutConfig, UpstreamConfig};
use crate::error::{ProxyError, ProxyResult};
use crate::observability::metrics;

/// Upstream error bodies are kept for diagnostics up to this many bytes.
const MAX_ERROR_BODY_BYTES: usize = 4096;

/// One outbound call, addressed relative to the proxy prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxiedRequest {
    relative_path: String,
}

impl ProxiedRequest {
    pub fn new(relative_path: impl Into<String>) -> Self {
        Self {
            relative_path: relative_path.into(),
        }
    }

    /// Fully-qualified upstream URL for this request.
    pub fn url(&self, endpoint: &ClusterEndpoint, proxy_prefix: &str) -> String {
        endpoint.proxied_url(proxy_prefix, &self.relative_path)
    }
}

/// HTTP client bound to one cluster endpoint.
#[derive(Clone)]
pub struct UpstreamHttpClient {
    client: reqwest::Client,
    endpoint: Arc<ClusterEndpoint>,
    proxy_prefix: String,
}

impl UpstreamHttpClient {
    /// Build a client. Performs no network activity.
    pub fn new(
        endpoint: Arc<ClusterEndpoint>,
        upstream: &UpstreamConfig,
        timeouts: &TimeoutConfig,
    ) -> ProxyResult<Self> {
        let trust = TransportTrust::from_insecure_flag(upstream.insecure_skip_tls_verify);
        if trust.is_insecure() {
            tracing::warn!(
                cluster = %endpoint.name(),
                "TLS verification disabled for upstream HTTP client"
            );
        }

        let builder = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .timeout(Duration::from_secs(timeouts.upstream_secs))
            .user_agent(concat!("mesh-tap-proxy/", env!("CARGO_PKG_VERSION")));
        let client = trust
            .apply_to_http(builder)
            .build()
            .map_err(|e| ProxyError::Configuration(format!("upstream HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint,
            proxy_prefix: upstream.proxy_prefix.clone(),
        })
    }

    /// Fully-qualified upstream URL for `relative_path`.
    pub fn url_for(&self, relative_path: &str) -> String {
        ProxiedRequest::new(relative_path).url(&self.endpoint, &self.proxy_prefix)
    }

    /// GET `relative_path` through the proxy prefix and return the parsed JSON body.
    pub async fn request(&self, relative_path: &str) -> ProxyResult<Value> {
        let url = self.url_for(relative_path);
        let start = Instant::now();

        let mut builder = self.client.get(&url);
        if let Some(authorization) = self.endpoint.authorization() {
            builder = builder.header(AUTHORIZATION, authorization);
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                metrics::record_upstream_request("error", start);
                tracing::warn!(url = %url, error = %e, timed_out = e.is_timeout(), "Upstream unreachable");
                return Err(ProxyError::unreachable(&url, &e));
            }
        };

        let status = response.status();
        metrics::record_upstream_request(status.as_str(), start);

        let body = response
            .bytes()
            .await
            .map_err(|e| ProxyError::unreachable(&url, &e))?;

        if !status.is_success() {
            let end = body.len().min(MAX_ERROR_BODY_BYTES);
            let text = String::from_utf8_lossy(&body[..end]).into_owned();
            tracing::warn!(url = %url, status = %status, "Upstream returned non-success status");
            return Err(ProxyError::UpstreamProtocol {
                url,
                reason: format!("upstream returned {}", status),
                status: Some(status),
                body: Some(text),
            });
        }

        tracing::debug!(
            url = %url,
            status = %status,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Upstream request completed"
        );

        serde_json::from_slice(&body)
            .map_err(|e| ProxyError::protocol(&url, format!("invalid JSON body: {}", e)))
    }
}

impl std::fmt::Debug for UpstreamHttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamHttpClient")
            .field("endpoint", &self.endpoint)
            .field("proxy_prefix", &self.proxy_prefix)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client_for(url: &str) -> UpstreamHttpClient {
        let endpoint = Arc::new(ClusterEndpoint::new("test", url, Some("T".into())).unwrap());
        let timeouts = TimeoutConfig {
            connect_secs: 1,
            upstream_secs: 2,
            ..TimeoutConfig::default()
        };
        UpstreamHttpClient::new(endpoint, &UpstreamConfig::default(), &timeouts).unwrap()
    }

    #[test]
    fn test_proxied_request_url() {
        let endpoint = ClusterEndpoint::new("test", "https://h", None).unwrap();
        let request = ProxiedRequest::new("/api/pods?namespace=ns1");
        assert_eq!(
            request.url(&endpoint, "/prefix"),
            "https://h/prefix/api/pods?namespace=ns1"
        );
    }

    #[test]
    fn test_url_for() {
        let client = client_for("https://h/");
        assert_eq!(
            client.url_for("/api/pods?namespace=ns1"),
            "https://h/api/v1/namespaces/linkerd/services/linkerd-web:8084/proxy/api/pods?namespace=ns1"
        );
    }

    #[tokio::test]
    async fn test_connection_refused_is_unreachable() {
        // Bind then drop to get a port nothing listens on.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = client_for(&format!("http://{}", addr));
        let err = client.request("/api/pods").await.unwrap_err();
        assert!(matches!(err, ProxyError::UpstreamUnreachable { .. }));
    }
}
