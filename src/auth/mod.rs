//! Bearer token verification for the authorizer.
//!
//! # Data Flow
//! ```text
//! Authorization: Bearer <jwt>
//!     → verifier.rs (header, signature, exp, iss, aud, token_use)
//!     → jwks.rs (issuer keys, cached with TTL, refreshed on unknown kid)
//!     → Claims (inserted into request extensions)
//! ```

pub mod claims;
pub mod jwks;
pub mod verifier;

pub use claims::{Audience, Claims};
pub use jwks::{Jwk, Jwks, JwksCache};
pub use verifier::{bearer_token, JwtVerifier, TokenVerifier};

use thiserror::Error;

/// Why a request failed authorization.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("authorization header missing")]
    Missing,

    #[error("authorization header is not a bearer token")]
    BadScheme,

    #[error("token malformed: {0}")]
    Malformed(String),

    #[error("signing key `{0}` not published by issuer")]
    UnknownKey(String),

    #[error("token signature invalid")]
    InvalidSignature,

    #[error("token expired")]
    Expired,

    #[error("token issuer mismatch")]
    IssuerMismatch,

    #[error("token audience mismatch")]
    AudienceMismatch,

    #[error("token_use `{0}` not accepted")]
    TokenUse(String),

    #[error("issuer keys unavailable: {0}")]
    KeySource(String),
}

impl AuthError {
    /// Short label for logs and metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Missing => "missing",
            Self::BadScheme => "bad_scheme",
            Self::Malformed(_) => "malformed",
            Self::UnknownKey(_) => "unknown_key",
            Self::InvalidSignature => "invalid_signature",
            Self::Expired => "expired",
            Self::IssuerMismatch => "issuer",
            Self::AudienceMismatch => "audience",
            Self::TokenUse(_) => "token_use",
            Self::KeySource(_) => "key_source",
        }
    }
}
