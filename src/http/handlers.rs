//! Route handlers.
//!
//! - `GET /deployment/{namespace}/{deployment}`: pods of one deployment
//! - `GET /health`: liveness, no upstream call
//! - `GET /tap`: WebSocket upgrade into a bridge session

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::Response;
use axum::Json;
use serde::Serialize;
use serde_json::Value;

use crate::error::{ProxyError, ProxyResult};
use crate::http::request::RequestIdExt;
use crate::http::server::AppState;
use crate::upstream::{deployment_key, filter_by_deployment, pods_path, PodList, UpstreamHttpClient};

/// Body of `GET /health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
}

/// Constant liveness status.
pub fn health() -> HealthStatus {
    HealthStatus { status: "ok" }
}

/// Pods whose `deployment` is `<namespace>/<deployment>`, in upstream order.
///
/// No matching pods is an empty list, not an error.
pub async fn list_pods_for_deployment(
    upstream: &UpstreamHttpClient,
    namespace: &str,
    deployment: &str,
) -> ProxyResult<Vec<Value>> {
    let path = pods_path(namespace);
    let body = upstream.request(&path).await?;

    let pods: PodList = serde_json::from_value(body).map_err(|e| {
        ProxyError::protocol(
            &upstream.url_for(&path),
            format!("unexpected pods response shape: {}", e),
        )
    })?;

    Ok(filter_by_deployment(
        pods.into_pods(),
        &deployment_key(namespace, deployment),
    ))
}

pub async fn deployment_pods(
    State(state): State<AppState>,
    Path((namespace, deployment)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Json<Vec<Value>>, ProxyError> {
    tracing::debug!(
        request_id = %headers.request_id(),
        cluster = %state.endpoint.name(),
        namespace = %namespace,
        deployment = %deployment,
        "Listing deployment pods"
    );

    let pods = list_pods_for_deployment(&state.upstream, &namespace, &deployment).await?;

    tracing::debug!(
        request_id = %headers.request_id(),
        matched = pods.len(),
        "Deployment pods listed"
    );
    Ok(Json(pods))
}

pub async fn health_check(headers: HeaderMap) -> Json<HealthStatus> {
    tracing::info!(request_id = %headers.request_id(), "PONG!");
    Json(health())
}

pub async fn tap(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    let bridge = state.bridge.clone();
    ws.on_upgrade(move |socket| async move { bridge.serve(socket).await })
}
