//! CORS preflight answering.

use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{header::ACCESS_CONTROL_REQUEST_METHOD, Method, Request},
    middleware::Next,
    response::Response,
};

use crate::http::response;
use crate::http::server::GatewayState;
use crate::observability::metrics::{self, Outcome};

/// `OPTIONS` carrying `Access-Control-Request-Method`. Bare `OPTIONS` is an ordinary request.
pub fn is_preflight<B>(request: &Request<B>) -> bool {
    request.method() == Method::OPTIONS
        && request.headers().contains_key(ACCESS_CONTROL_REQUEST_METHOD)
}

/// Answers preflights with 204 before the authorizer sees them.
pub async fn preflight_middleware(
    State(state): State<GatewayState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let runtime = state.load();
    if !runtime.config.cors.preflight || !is_preflight(&request) {
        return next.run(request).await;
    }

    tracing::debug!(path = %request.uri().path(), "answering CORS preflight");
    metrics::record_request(Method::OPTIONS.as_str(), 204, Outcome::Preflight, Instant::now());
    response::preflight(&runtime.cors)
}
