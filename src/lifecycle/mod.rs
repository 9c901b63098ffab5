//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Logging → Metrics → Build router (fail fast) → Bind → Serve
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting → Close bridge sessions → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Fail fast: a configuration error never reaches the listener
//! - Shutdown has timeout: sessions that do not drain are abandoned

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
