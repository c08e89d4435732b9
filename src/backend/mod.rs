//! Backend collaborator behind the gateway.
//!
//! The gateway treats the backend as opaque: it hands over a normalized
//! request and gets back either a reply (the backend's "OK") or an error.
//! Anything richer than that is the backend's business.

pub mod upstream;

pub use upstream::UpstreamBackend;

use std::time::Duration;

use async_trait::async_trait;
use axum::body::Bytes;
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode, Uri};
use thiserror::Error;

/// Request as forwarded to the backend: method, path, headers and body, unmodified.
#[derive(Debug, Clone)]
pub struct BackendRequest {
    pub method: Method,
    /// Path and query, exactly as received.
    pub uri: Uri,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// A successful backend answer.
#[derive(Debug, Clone)]
pub struct BackendReply {
    pub status: StatusCode,
    pub content_type: Option<HeaderValue>,
    pub body: Bytes,
}

impl BackendReply {
    pub fn json(body: impl Into<Bytes>) -> Self {
        Self {
            status: StatusCode::OK,
            content_type: Some(HeaderValue::from_static("application/json")),
            body: body.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum BackendError {
    /// The backend answered, but not with success. Payload kept verbatim.
    #[error("backend returned status {status}")]
    Status {
        status: StatusCode,
        content_type: Option<HeaderValue>,
        body: Bytes,
    },

    #[error("backend unavailable: {0}")]
    Unavailable(String),

    #[error("backend timed out after {0:?}")]
    Timeout(Duration),

    #[error("request rejected: {0}")]
    InvalidRequest(String),

    /// The handler itself failed.
    #[error("backend failed: {0}")]
    Failed(String),
}

impl BackendError {
    /// Content type and body for the error envelope.
    ///
    /// Backend-supplied payloads pass through untouched; failures without one
    /// get a `{"message": ...}` document.
    pub fn into_payload(self) -> (Option<HeaderValue>, Bytes) {
        match self {
            Self::Status {
                content_type, body, ..
            } => (content_type, body),
            other => {
                let body = serde_json::json!({ "message": other.to_string() }).to_string();
                (
                    Some(HeaderValue::from_static("application/json")),
                    Bytes::from(body),
                )
            }
        }
    }

    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Status { .. } => "status",
            Self::Unavailable(_) => "unavailable",
            Self::Timeout(_) => "timeout",
            Self::InvalidRequest(_) => "invalid_request",
            Self::Failed(_) => "failed",
        }
    }
}

/// The application logic behind the edge.
#[async_trait]
pub trait BackendHandler: Send + Sync {
    async fn handle(&self, request: BackendRequest) -> Result<BackendReply, BackendError>;
}
