//! Upstream HTTP subsystem.
//!
//! # Data Flow
//! ```text
//! handler
//!     → client.rs (ProxiedRequest → <base><proxy prefix><relative path>, Bearer token)
//!     → status check → JSON
//!     → pods.rs (decode + filter for the deployment route)
//! ```
//!
//! # Design Decisions
//! - Status validated before parsing; non-2xx is a protocol error, never swallowed
//! - One call per invocation, no retries

pub mod client;
pub mod pods;

pub use client::{ProxiedRequest, UpstreamHttpClient};
pub use pods::{deployment_key, filter_by_deployment, pods_path, PodList};
