//! Response envelopes.
//!
//! # Responsibilities
//! - Wrap backend outcomes in one of two fixed shapes
//! - Attach CORS headers consistently per shape
//!
//! # Envelopes
//! - Success: 200, backend payload verbatim, origin + allow-headers + allow-methods
//! - Error: 400, backend error payload verbatim, origin only
//!
//! Authorizer rejections and preflight answers carry the full header set.
//! The asymmetry between success and error header sets is what existing
//! browser clients were built against; keep it.

use axum::body::{Body, Bytes};
use axum::http::header::{
    InvalidHeaderValue, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_TYPE,
};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::Response;

use crate::backend::{BackendError, BackendReply};
use crate::config::CorsConfig;

const JSON: HeaderValue = HeaderValue::from_static("application/json");

/// Pre-parsed CORS header values.
#[derive(Debug, Clone)]
pub struct CorsHeaders {
    allow_origin: HeaderValue,
    allow_headers: HeaderValue,
    allow_methods: HeaderValue,
}

impl CorsHeaders {
    pub fn from_config(config: &CorsConfig) -> Result<Self, InvalidHeaderValue> {
        Ok(Self {
            allow_origin: HeaderValue::from_str(&config.allow_origin)?,
            allow_headers: HeaderValue::from_str(&config.allow_headers)?,
            allow_methods: HeaderValue::from_str(&config.allow_methods)?,
        })
    }

    /// Origin, allow-headers and allow-methods.
    pub fn apply_full(&self, headers: &mut HeaderMap) {
        headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, self.allow_origin.clone());
        headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, self.allow_headers.clone());
        headers.insert(ACCESS_CONTROL_ALLOW_METHODS, self.allow_methods.clone());
    }

    pub fn apply_origin_only(&self, headers: &mut HeaderMap) {
        headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, self.allow_origin.clone());
    }
}

impl Default for CorsHeaders {
    fn default() -> Self {
        let config = CorsConfig::default();
        Self {
            allow_origin: HeaderValue::from_static("*"),
            allow_headers: HeaderValue::from_str(&config.allow_headers)
                .unwrap_or_else(|_| HeaderValue::from_static("")),
            allow_methods: HeaderValue::from_str(&config.allow_methods)
                .unwrap_or_else(|_| HeaderValue::from_static("")),
        }
    }
}

/// Classify a backend outcome into the success or error envelope.
pub fn envelope(outcome: Result<BackendReply, BackendError>, cors: &CorsHeaders) -> Response {
    match outcome {
        Ok(reply) => success(reply, cors),
        Err(error) => failure(error, cors),
    }
}

/// 200 with the backend payload and the full CORS set.
pub fn success(reply: BackendReply, cors: &CorsHeaders) -> Response {
    let mut response = build(StatusCode::OK, reply.content_type, reply.body);
    cors.apply_full(response.headers_mut());
    response
}

/// 400 with the backend error payload and only the origin header.
pub fn failure(error: BackendError, cors: &CorsHeaders) -> Response {
    let (content_type, body) = error.into_payload();
    let mut response = build(StatusCode::BAD_REQUEST, content_type, body);
    cors.apply_origin_only(response.headers_mut());
    response
}

/// 401 from the authorizer, full CORS set so browsers can read it.
pub fn unauthorized(cors: &CorsHeaders) -> Response {
    let mut response = build(
        StatusCode::UNAUTHORIZED,
        Some(JSON),
        Bytes::from_static(br#"{"message":"Unauthorized"}"#),
    );
    cors.apply_full(response.headers_mut());
    response
}

/// 204 answer to a CORS preflight.
pub fn preflight(cors: &CorsHeaders) -> Response {
    let mut response = build(StatusCode::NO_CONTENT, None, Bytes::new());
    cors.apply_full(response.headers_mut());
    response
}

fn build(status: StatusCode, content_type: Option<HeaderValue>, body: Bytes) -> Response {
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    if let Some(content_type) = content_type {
        response.headers_mut().insert(CONTENT_TYPE, content_type);
    }
    response
}
