//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Resolve the cluster endpoint (fails before any network activity)
//! - Create the Axum Router with all handlers
//! - Wire up middleware (tracing, timeout, request ID)
//! - Serve until shutdown, then let bridge sessions drain

use std::sync::Arc;
use std::time::Duration;

use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::bridge::WebSocketBridge;
use crate::cluster::{self, ClusterEndpoint};
use crate::config::ProxyConfig;
use crate::error::ProxyResult;
use crate::http::handlers::{deployment_pods, health_check, tap};
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};
use crate::lifecycle::Shutdown;
use crate::upstream::UpstreamHttpClient;

/// How long bridge sessions get to close after shutdown.
const SESSION_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Application state injected into handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    pub endpoint: Arc<ClusterEndpoint>,
    pub upstream: UpstreamHttpClient,
    pub bridge: Arc<WebSocketBridge>,
}

impl AppState {
    /// Resolve the cluster and build the upstream clients.
    ///
    /// Fails with `ProxyError::Configuration` without touching the network.
    pub fn new(config: &ProxyConfig, shutdown: Shutdown) -> ProxyResult<Self> {
        let endpoint = Arc::new(cluster::resolve(&config.clusters, config.cluster.as_ref())?);
        let upstream = UpstreamHttpClient::new(endpoint.clone(), &config.upstream, &config.timeouts)?;
        let bridge = Arc::new(WebSocketBridge::new(
            &endpoint,
            &config.upstream,
            &config.timeouts,
            shutdown,
        )?);

        tracing::info!(
            cluster = %endpoint.name(),
            base_url = %endpoint.base_url(),
            tap_url = %bridge.tap_url(),
            "Cluster endpoint resolved"
        );

        Ok(Self {
            endpoint,
            upstream,
            bridge,
        })
    }
}

/// Build the router for `config`.
pub fn create_router(config: &ProxyConfig, shutdown: Shutdown) -> ProxyResult<Router> {
    let state = AppState::new(config, shutdown)?;
    Ok(HttpServer::build_router(config, state))
}

/// HTTP and WebSocket server for the tap proxy.
pub struct HttpServer {
    router: Router,
    state: AppState,
    shutdown: Shutdown,
}

impl HttpServer {
    /// Create a server. Fails on configuration errors.
    pub fn new(config: ProxyConfig, shutdown: Shutdown) -> ProxyResult<Self> {
        let state = AppState::new(&config, shutdown.clone())?;
        let router = Self::build_router(&config, state.clone());
        Ok(Self {
            router,
            state,
            shutdown,
        })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    pub fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        Router::new()
            .route("/deployment/{namespace}/{deployment}", get(deployment_pods))
            .route("/health", get(health_check))
            .route("/tap", get(tap))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http())
            .layer(set_request_id_layer())
    }

    pub fn bridge(&self) -> &Arc<WebSocketBridge> {
        &self.state.bridge
    }

    /// Serve on `listener` until the shutdown coordinator fires.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let mut stop = self.shutdown.subscribe();
        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = stop.recv().await;
            })
            .await?;

        let sessions = self.state.bridge.sessions();
        if !sessions.wait_idle(SESSION_DRAIN_TIMEOUT).await {
            tracing::warn!(
                remaining = sessions.active_count(),
                "Tap sessions still open after drain timeout"
            );
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
