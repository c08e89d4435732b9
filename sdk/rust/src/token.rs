//! Bearer token sources.
//!
//! The client never caches a token: every send asks the provider again, so
//! rotation and expiry are handled by whoever owns the session.

use async_trait::async_trait;
use std::sync::RwLock;
use thiserror::Error;

/// Why a token could not be produced.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("no active session")]
    NoSession,

    #[error("session expired")]
    Expired,

    #[error("token provider failed: {0}")]
    Provider(String),
}

/// Produces a bearer token for the current session, or fails.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn bearer_token(&self) -> Result<String, TokenError>;
}

/// A provider that always returns the same token (or never has one).
#[derive(Debug, Clone, Default)]
pub struct StaticTokenProvider {
    token: Option<String>,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }

    /// A provider with no session.
    pub fn none() -> Self {
        Self { token: None }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn bearer_token(&self) -> Result<String, TokenError> {
        self.token.clone().ok_or(TokenError::NoSession)
    }
}

/// A session whose token can be replaced or cleared while clients hold it.
///
/// The SDK only reads from it; sign-in, refresh and sign-out belong to the
/// owner of the session.
#[derive(Debug, Default)]
pub struct SessionTokenProvider {
    token: RwLock<Option<String>>,
}

impl SessionTokenProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install (or rotate) the session token.
    pub fn sign_in(&self, token: impl Into<String>) {
        if let Ok(mut guard) = self.token.write() {
            *guard = Some(token.into());
        }
    }

    pub fn sign_out(&self) {
        if let Ok(mut guard) = self.token.write() {
            *guard = None;
        }
    }
}

#[async_trait]
impl TokenProvider for SessionTokenProvider {
    async fn bearer_token(&self) -> Result<String, TokenError> {
        let guard = self
            .token
            .read()
            .map_err(|_| TokenError::Provider("session lock poisoned".to_string()))?;
        guard.clone().ok_or(TokenError::NoSession)
    }
}
