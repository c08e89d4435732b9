//! Client-side error taxonomy.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// The configured base URL could not be turned into an https URL.
    #[error("invalid base url: {0}")]
    InvalidBaseUrl(String),

    /// The request could not be built (bad path, header, or body).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Network failure or timeout.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The edge refused the bearer token (or its absence).
    #[error("authorization rejected (status {status})")]
    Unauthorized { status: u16, body: String },

    /// Any other non-2xx answer, including the edge's uniform 400 envelope.
    #[error("request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    /// A 2xx body that did not match the expected shape.
    #[error("response decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ClientError {
    /// Whether a read that failed this way may succeed when sent again.
    ///
    /// Authorization rejections are final: resending the same token cannot help.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Status { .. })
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized { status, .. } | Self::Status { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
