//! Cluster addressing subsystem.
//!
//! # Data Flow
//! ```text
//! ProxyConfig.clusters + ProxyConfig.cluster (selector)
//!     → endpoint.rs (resolve, validate URL + token)
//!     → Arc<ClusterEndpoint> (immutable, shared by HTTP handlers and bridge sessions)
//!
//! ProxyConfig.upstream.insecure_skip_tls_verify
//!     → trust.rs (TransportTrust, handed to each upstream client)
//! ```
//!
//! # Design Decisions
//! - One cluster per router instance; multiple clusters need multiple routers
//! - Resolution is pure and runs before any network activity

pub mod endpoint;
pub mod trust;

pub use endpoint::{resolve, ClusterEndpoint, TAP_PATH};
pub use trust::TransportTrust;
