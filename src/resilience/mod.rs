//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Upstream HTTP call:
//!     → reqwest client connect + total timeouts
//! Bridge session:
//!     → timeouts.rs (subscription wait, upstream handshake)
//! Router:
//!     → tower-http TimeoutLayer (whole request)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - No retries at this layer; retry policy belongs to the caller

pub mod timeouts;

pub use timeouts::{with_deadline, TimedOut};
