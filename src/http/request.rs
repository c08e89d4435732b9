//! Request handling and transformation.
//!
//! # Responsibilities
//! - Name the headers the gateway owns
//! - Generate (UUID v4) and read the per-request correlation ID
//! - Buffer the inbound body and hand a `BackendRequest` to the backend

use axum::body::Body;
use axum::http::{HeaderName, HeaderValue, Request};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

use crate::backend::{BackendError, BackendRequest};

/// Header carrying the per-request correlation ID.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Header carrying the verified token subject to the backend.
pub const AUTHENTICATED_SUBJECT: HeaderName = HeaderName::from_static("x-authenticated-subject");

/// Assigns a UUID v4 to requests that arrive without an `x-request-id`.
#[derive(Debug, Clone, Copy, Default)]
pub struct GatewayRequestId;

impl MakeRequestId for GatewayRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Correlation ID of a request, or `"unknown"` if the layer did not run.
pub fn request_id<B>(request: &Request<B>) -> String {
    request
        .headers()
        .get(&X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string()
}

/// Buffer the body (up to `limit` bytes) and build the backend's view of the request.
pub async fn into_backend_request(
    request: Request<Body>,
    limit: usize,
) -> Result<BackendRequest, BackendError> {
    let (parts, body) = request.into_parts();
    let body = axum::body::to_bytes(body, limit)
        .await
        .map_err(|e| BackendError::InvalidRequest(format!("request body rejected: {e}")))?;

    Ok(BackendRequest {
        method: parts.method,
        uri: parts.uri,
        headers: parts.headers,
        body,
    })
}
