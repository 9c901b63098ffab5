//! Linkerd tap proxy library.
//!
//! Relays HTTP queries and live tap streams from clients to the Linkerd web
//! service inside a Kubernetes cluster, through the API server's service proxy.

pub mod bridge;
pub mod cluster;
pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod upstream;

pub use config::schema::ProxyConfig;
pub use error::{ProxyError, ProxyResult};
pub use http::{create_router, HttpServer};
pub use lifecycle::Shutdown;
