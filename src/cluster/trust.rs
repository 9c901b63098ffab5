//! Transport trust for upstream connections.
//!
//! Trust is scoped to each upstream client. No process-wide TLS setting
//! is changed.

use tokio_tungstenite::Connector;

/// Certificate policy applied to one upstream connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportTrust {
    /// Verify certificates against the system roots.
    #[default]
    Verify,
    /// INSECURE: accept any certificate and hostname. Only for upstreams reached
    /// through a trusted local tunnel such as `kubectl proxy`.
    AcceptInvalidCerts,
}

impl TransportTrust {
    pub fn from_insecure_flag(insecure_skip_tls_verify: bool) -> Self {
        if insecure_skip_tls_verify {
            TransportTrust::AcceptInvalidCerts
        } else {
            TransportTrust::Verify
        }
    }

    pub fn is_insecure(&self) -> bool {
        matches!(self, TransportTrust::AcceptInvalidCerts)
    }

    /// Apply this policy to an HTTP client under construction.
    pub fn apply_to_http(&self, builder: reqwest::ClientBuilder) -> reqwest::ClientBuilder {
        match self {
            TransportTrust::Verify => builder,
            TransportTrust::AcceptInvalidCerts => builder
                .danger_accept_invalid_certs(true)
                .danger_accept_invalid_hostnames(true),
        }
    }

    /// Connector for the upstream WebSocket. `None` keeps the default verifying connector.
    pub fn websocket_connector(&self) -> Result<Option<Connector>, native_tls::Error> {
        match self {
            TransportTrust::Verify => Ok(None),
            TransportTrust::AcceptInvalidCerts => {
                let tls = native_tls::TlsConnector::builder()
                    .danger_accept_invalid_certs(true)
                    .danger_accept_invalid_hostnames(true)
                    .build()?;
                Ok(Some(Connector::NativeTls(tls)))
            }
        }
    }
}
