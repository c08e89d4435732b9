//! Client SDK for the edge gateway.
//!
//! # Data Flow
//! ```text
//! caller
//!     → retry.rs (idempotent reads only: bounded attempts, fixed delay)
//!     → client.rs (pre-send: attach bearer token; post-receive: classify)
//!     → edge gateway
//! ```
//!
//! Writes go through [`AuthenticatedHttpClient`] directly and are never retried.

pub mod client;
pub mod error;
pub mod request;
pub mod retry;
pub mod token;
pub mod url;

pub use client::{AuthOutcome, AuthenticatedHttpClient, ClientConfig};
pub use error::ClientError;
pub use request::{InboundResponse, OutboundRequest};
pub use retry::{FetchOutcome, RetryConfig, RetryingFetcher};
pub use token::{SessionTokenProvider, StaticTokenProvider, TokenError, TokenProvider};
pub use crate::url::normalize_base_url;
