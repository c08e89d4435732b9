//! Retry policy for idempotent reads.
//!
//! # Design Decisions
//! - Fixed delay between attempts, no exponential growth or jitter
//! - Attempts are strictly sequential within one fetch
//! - Exhaustion degrades to an empty result plus an error message; callers
//!   never see the failure itself
//! - Authorization rejections stop immediately (a resend cannot fix them)

use serde::de::DeserializeOwned;
use std::future::Future;
use std::time::Duration;

use crate::client::AuthenticatedHttpClient;
use crate::error::ClientError;
use crate::request::OutboundRequest;

#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts including the first one (default: 3).
    pub max_attempts: u32,
    /// Pause between attempts (default: 1000ms).
    pub delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_millis(1000),
        }
    }
}

impl RetryConfig {
    #[must_use]
    pub const fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Result of a retry-wrapped read. Always well-shaped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutcome<T> {
    pub items: Vec<T>,
    /// Human-readable failure; `None` on success.
    pub error: Option<String>,
    pub attempts: u32,
}

impl<T> FetchOutcome<T> {
    fn success(items: Vec<T>, attempts: u32) -> Self {
        Self {
            items,
            error: None,
            attempts,
        }
    }

    fn degraded(message: String, attempts: u32) -> Self {
        Self {
            items: Vec::new(),
            error: Some(message),
            attempts,
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.error.is_some()
    }
}

/// Per-invocation bookkeeping; never shared between fetches.
struct RetryState {
    attempts_remaining: u32,
    last_error: Option<ClientError>,
}

impl RetryState {
    fn new(max_attempts: u32) -> Self {
        Self {
            attempts_remaining: max_attempts.max(1),
            last_error: None,
        }
    }
}

/// Wraps reads on an [`AuthenticatedHttpClient`] with bounded retries.
///
/// Only for idempotent reads. Writes must go through the client directly.
#[derive(Clone)]
pub struct RetryingFetcher {
    client: AuthenticatedHttpClient,
    config: RetryConfig,
}

impl RetryingFetcher {
    pub fn new(client: AuthenticatedHttpClient, config: RetryConfig) -> Self {
        Self { client, config }
    }

    pub fn client(&self) -> &AuthenticatedHttpClient {
        &self.client
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// GET `path` and read the list stored under `field`.
    ///
    /// A 2xx body without the field (or with a malformed one) counts as
    /// success with an empty list.
    pub async fn fetch_list<T: DeserializeOwned>(&self, path: &str, field: &str) -> FetchOutcome<T> {
        self.fetch(OutboundRequest::get(path), field).await
    }

    /// Send `request` with retries and read the list stored under `field`.
    ///
    /// Only idempotent reads are accepted; anything else degrades without
    /// being sent (`attempts == 0`).
    pub async fn fetch<T: DeserializeOwned>(
        &self,
        request: OutboundRequest,
        field: &str,
    ) -> FetchOutcome<T> {
        if !request.is_idempotent_read() {
            tracing::error!(
                method = %request.method(),
                path = %request.path(),
                "refusing to retry a non-idempotent request"
            );
            return FetchOutcome::degraded(
                format!(
                    "refusing to retry non-idempotent {} {}",
                    request.method(),
                    request.path()
                ),
                0,
            );
        }

        let client = &self.client;
        self.fetch_with_retry(|| {
            let request = request.clone();
            async move {
                client
                    .send(request)
                    .await
                    .map(|response| response.list_field(field))
            }
        })
        .await
    }

    /// Run `operation` until it succeeds, fails non-retryably, or the
    /// attempt budget is spent.
    pub async fn fetch_with_retry<T, F, Fut>(&self, mut operation: F) -> FetchOutcome<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Vec<T>, ClientError>>,
    {
        let mut state = RetryState::new(self.config.max_attempts);
        let mut attempts = 0;

        loop {
            attempts += 1;
            state.attempts_remaining -= 1;

            match operation().await {
                Ok(items) => return FetchOutcome::success(items, attempts),
                Err(error) if !error.is_retryable() => {
                    tracing::error!(attempt = attempts, error = %error, "read failed, not retrying");
                    return FetchOutcome::degraded(error.to_string(), attempts);
                }
                Err(error) => {
                    if state.attempts_remaining == 0 {
                        tracing::error!(attempts, error = %error, "read failed, retries exhausted");
                        state.last_error = Some(error);
                        break;
                    }

                    tracing::warn!(
                        attempt = attempts,
                        remaining = state.attempts_remaining,
                        delay = ?self.config.delay,
                        error = %error,
                        "read failed, retrying"
                    );
                    state.last_error = Some(error);
                    tokio::time::sleep(self.config.delay).await;
                }
            }
        }

        let message = match state.last_error {
            Some(error) => format!("request failed after {attempts} attempts: {error}"),
            None => format!("request failed after {attempts} attempts"),
        };
        FetchOutcome::degraded(message, attempts)
    }
}
