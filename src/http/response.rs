//! Error responses.
//!
//! # Responsibilities
//! - Map `ProxyError` to a status code
//! - Render a JSON error body the client can show
//!
//! # Design Decisions
//! - Upstream failures are 502, upstream timeouts 504, configuration 500
//! - The upstream status and body are surfaced, never swallowed

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::error::ProxyError;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
    pub response: ResponseDetail,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDetail {
    pub name: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upstream_status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upstream_body: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseDetail {
    pub status_code: u16,
}

/// Status code sent to the client for an error.
pub fn status_for(error: &ProxyError) -> StatusCode {
    match error {
        ProxyError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
        ProxyError::UpstreamUnreachable { timed_out: true, .. } => StatusCode::GATEWAY_TIMEOUT,
        ProxyError::UpstreamUnreachable { .. } | ProxyError::UpstreamProtocol { .. } => {
            StatusCode::BAD_GATEWAY
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = status_for(&self);
        tracing::error!(status = %status, error = %self, "Request failed");

        let (upstream_status, upstream_body) = match &self {
            ProxyError::UpstreamProtocol { status, body, .. } => {
                (status.map(|s| s.as_u16()), body.clone())
            }
            _ => (None, None),
        };

        let body = ErrorBody {
            error: ErrorDetail {
                name: self.name(),
                message: self.to_string(),
                upstream_status,
                upstream_body,
            },
            response: ResponseDetail {
                status_code: status.as_u16(),
            },
        };
        (status, Json(body)).into_response()
    }
}
