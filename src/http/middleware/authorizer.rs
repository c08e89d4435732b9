//! Bearer-token authorizer.
//!
//! Runs before every forwarded request. A rejected request never reaches the
//! backend and gets the 401 envelope with the full CORS set.

use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderValue, Request},
    middleware::Next,
    response::Response,
};

use crate::auth::{bearer_token, AuthError, Claims};
use crate::http::request::{request_id, AUTHENTICATED_SUBJECT};
use crate::http::response;
use crate::http::server::GatewayState;
use crate::observability::metrics::{self, Outcome};

pub async fn authorizer_middleware(
    State(state): State<GatewayState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let start = Instant::now();
    let runtime = state.load();

    // Only the gateway may assert who the caller is.
    request.headers_mut().remove(&AUTHENTICATED_SUBJECT);

    let verified = match bearer_token(request.headers()) {
        Ok(token) => runtime.verifier.verify(token).await,
        Err(e) => Err(e),
    };

    match verified.and_then(|claims| subject_header(&claims).map(|v| (claims, v))) {
        Ok((claims, subject)) => {
            tracing::debug!(
                request_id = %request_id(&request),
                subject = %claims.sub,
                "request authorized"
            );
            request.headers_mut().insert(AUTHENTICATED_SUBJECT, subject);
            request.extensions_mut().insert(claims);
            next.run(request).await
        }
        Err(e) => {
            tracing::warn!(
                request_id = %request_id(&request),
                method = %request.method(),
                path = %request.uri().path(),
                reason = e.reason(),
                error = %e,
                "request rejected by authorizer"
            );
            metrics::record_auth_rejection(e.reason());
            metrics::record_request(
                request.method().as_str(),
                401,
                Outcome::Unauthorized,
                start,
            );
            response::unauthorized(&runtime.cors)
        }
    }
}

fn subject_header(claims: &Claims) -> Result<HeaderValue, AuthError> {
    HeaderValue::from_str(&claims.sub)
        .map_err(|_| AuthError::Malformed("subject is not a valid header value".to_string()))
}
