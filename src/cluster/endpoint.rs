//! Cluster endpoint resolution.
//!
//! # Responsibilities
//! - Pick one cluster descriptor via an explicit selector
//! - Validate its URL and token
//! - Produce the immutable `ClusterEndpoint` shared by all sessions

use axum::http::HeaderValue;
use url::Url;

use crate::config::schema::{ClusterConfig, ClusterSelector};
use crate::error::{ProxyError, ProxyResult};

/// Path of the tap stream below the proxy prefix.
pub const TAP_PATH: &str = "/api/tap";

/// Base URL and credentials of the cluster a router talks to.
///
/// Built once at router construction and never mutated afterwards.
#[derive(Clone, PartialEq, Eq)]
pub struct ClusterEndpoint {
    name: String,
    base_url: String,
    bearer_token: Option<String>,
}

impl ClusterEndpoint {
    /// Create an endpoint, validating the URL and token.
    pub fn new(
        name: impl Into<String>,
        base_url: &str,
        bearer_token: Option<String>,
    ) -> ProxyResult<Self> {
        let name = name.into();
        let trimmed = base_url.trim();
        if trimmed.is_empty() {
            return Err(ProxyError::Configuration(format!(
                "cluster '{}' has no url",
                name
            )));
        }

        let parsed = Url::parse(trimmed).map_err(|e| {
            ProxyError::Configuration(format!("cluster '{}' url '{}': {}", name, trimmed, e))
        })?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(ProxyError::Configuration(format!(
                "cluster '{}' url must be http or https, got '{}'",
                name,
                parsed.scheme()
            )));
        }

        if let Some(token) = &bearer_token {
            if token.trim().is_empty() {
                return Err(ProxyError::Configuration(format!(
                    "cluster '{}' has an empty service account token",
                    name
                )));
            }
            if HeaderValue::from_str(&format!("Bearer {}", token)).is_err() {
                return Err(ProxyError::Configuration(format!(
                    "cluster '{}' service account token is not a valid header value",
                    name
                )));
            }
        }

        Ok(Self {
            name,
            base_url: trimmed.trim_end_matches('/').to_string(),
            bearer_token,
        })
    }

    /// Cluster name from configuration (may be empty).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Value for the `Authorization` header, if a token is configured.
    pub fn authorization(&self) -> Option<String> {
        self.bearer_token
            .as_ref()
            .map(|token| format!("Bearer {}", token))
    }

    /// Fully-qualified URL of a call routed through the platform proxy.
    pub fn proxied_url(&self, proxy_prefix: &str, relative_path: &str) -> String {
        format!("{}{}{}", self.base_url, proxy_prefix, relative_path)
    }

    /// Tap WebSocket URL derived from the base URL (`https` → `wss`, `http` → `ws`).
    pub fn tap_url(&self, proxy_prefix: &str) -> ProxyResult<String> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| ProxyError::Configuration(e.to_string()))?;
        let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
        url.set_scheme(scheme).map_err(|_| {
            ProxyError::Configuration(format!("cannot derive tap url from '{}'", self.base_url))
        })?;
        Ok(format!(
            "{}{}{}",
            url.as_str().trim_end_matches('/'),
            proxy_prefix,
            TAP_PATH
        ))
    }
}

impl std::fmt::Debug for ClusterEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterEndpoint")
            .field("name", &self.name)
            .field("base_url", &self.base_url)
            .field("has_token", &self.bearer_token.is_some())
            .finish()
    }
}

/// Resolve the cluster endpoint a router should use.
///
/// Without a selector, a single configured cluster is used; several clusters
/// require an explicit selection.
pub fn resolve(
    clusters: &[ClusterConfig],
    selector: Option<&ClusterSelector>,
) -> ProxyResult<ClusterEndpoint> {
    if clusters.is_empty() {
        return Err(ProxyError::Configuration(
            "no cluster descriptors configured".to_string(),
        ));
    }

    let descriptor = match selector {
        Some(ClusterSelector::Index(i)) => clusters.get(*i).ok_or_else(|| {
            ProxyError::Configuration(format!(
                "cluster index {} out of range ({} configured)",
                i,
                clusters.len()
            ))
        })?,
        Some(ClusterSelector::Name(name)) => clusters
            .iter()
            .find(|c| &c.name == name)
            .ok_or_else(|| ProxyError::Configuration(format!("no cluster named '{}'", name)))?,
        None if clusters.len() == 1 => &clusters[0],
        None => {
            return Err(ProxyError::Configuration(format!(
                "{} clusters configured; select one with `cluster`",
                clusters.len()
            )))
        }
    };

    ClusterEndpoint::new(
        descriptor.name.clone(),
        &descriptor.url,
        descriptor.service_account_token.clone(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::DEFAULT_PROXY_PREFIX;

    fn cluster(name: &str, url: &str, token: Option<&str>) -> ClusterConfig {
        ClusterConfig {
            name: name.into(),
            url: url.into(),
            service_account_token: token.map(String::from),
        }
    }

    #[test]
    fn test_empty_list_is_configuration_error() {
        let err = resolve(&[], None).unwrap_err();
        assert!(matches!(err, ProxyError::Configuration(_)));
    }

    #[test]
    fn test_single_cluster_without_selector() {
        let endpoint = resolve(&[cluster("a", "https://h/", Some("T"))], None).unwrap();
        assert_eq!(endpoint.base_url(), "https://h");
        assert_eq!(endpoint.authorization().as_deref(), Some("Bearer T"));
    }

    #[test]
    fn test_ambiguous_without_selector() {
        let clusters = [cluster("a", "https://h1", None), cluster("b", "https://h2", None)];
        assert!(matches!(
            resolve(&clusters, None),
            Err(ProxyError::Configuration(_))
        ));
    }

    #[test]
    fn test_select_by_name_and_index() {
        let clusters = [cluster("a", "https://h1", None), cluster("b", "https://h2", None)];

        let by_name = resolve(&clusters, Some(&ClusterSelector::Name("b".into()))).unwrap();
        assert_eq!(by_name.base_url(), "https://h2");

        let by_index = resolve(&clusters, Some(&ClusterSelector::Index(0))).unwrap();
        assert_eq!(by_index.name(), "a");

        assert!(resolve(&clusters, Some(&ClusterSelector::Index(2))).is_err());
        assert!(resolve(&clusters, Some(&ClusterSelector::Name("c".into()))).is_err());
    }

    #[test]
    fn test_missing_or_bad_url() {
        assert!(resolve(&[cluster("a", "", None)], None).is_err());
        assert!(resolve(&[cluster("a", "h:6443/relative", None)], None).is_err());
        assert!(resolve(&[cluster("a", "ftp://h", None)], None).is_err());
    }

    #[test]
    fn test_blank_token_rejected() {
        assert!(resolve(&[cluster("a", "https://h", Some("  "))], None).is_err());
    }

    #[test]
    fn test_token_must_be_header_safe() {
        for token in ["T\r\nX-Evil: 1", "T\nbad", "T\u{7f}"] {
            let err = ClusterEndpoint::new("a", "https://h", Some(token.into())).unwrap_err();
            assert!(matches!(err, ProxyError::Configuration(_)));
        }
        assert!(resolve(&[cluster("a", "https://h", Some("T\nbad"))], None).is_err());
    }

    #[test]
    fn test_proxied_url() {
        let endpoint = ClusterEndpoint::new("a", "https://h", Some("T".into())).unwrap();
        assert_eq!(
            endpoint.proxied_url(DEFAULT_PROXY_PREFIX, "/api/pods?namespace=ns1"),
            "https://h/api/v1/namespaces/linkerd/services/linkerd-web:8084/proxy/api/pods?namespace=ns1"
        );
    }

    #[test]
    fn test_tap_url_derivation() {
        let secure = ClusterEndpoint::new("a", "https://127.0.0.1:59436", None).unwrap();
        assert_eq!(
            secure.tap_url(DEFAULT_PROXY_PREFIX).unwrap(),
            "wss://127.0.0.1:59436/api/v1/namespaces/linkerd/services/linkerd-web:8084/proxy/api/tap"
        );

        let plain = ClusterEndpoint::new("a", "http://h", None).unwrap();
        assert!(plain.tap_url("/p").unwrap().starts_with("ws://h/p/api/tap"));
    }

    #[test]
    fn test_debug_hides_token() {
        let endpoint = ClusterEndpoint::new("a", "https://h", Some("secret".into())).unwrap();
        assert!(!format!("{:?}", endpoint).contains("secret"));
    }
}
