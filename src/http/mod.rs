//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (request ID)
//!     → handlers.rs
//!         /deployment/... → upstream::UpstreamHttpClient → filter → JSON
//!         /health         → constant
//!         /tap            → bridge::WebSocketBridge
//!     → response.rs (ProxyError → JSON error response)
//! ```

pub mod handlers;
pub mod request;
pub mod response;
pub mod server;

pub use request::{RequestIdExt, X_REQUEST_ID};
pub use server::{create_router, AppState, HttpServer};
