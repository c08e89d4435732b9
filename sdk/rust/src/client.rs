use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::error::ClientError;
use crate::request::{InboundResponse, OutboundRequest};
use crate::token::{TokenError, TokenProvider};
use crate::url::normalize_base_url;

/// Settings for [`AuthenticatedHttpClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Edge base URL; normalized to https on construction.
    pub base_url: String,
    /// Whole-request timeout; expiry surfaces as a transport failure.
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub user_agent: String,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            user_agent: concat!("edge-sdk/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// What the pre-send hook did with the session token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    /// `Authorization: Bearer <token>` was attached.
    Attached,
    /// No token was available; the request went out without the header.
    Skipped(TokenError),
}

/// HTTP client that injects the session's bearer token into every request.
///
/// Token lookup failures never block a request: it is sent unauthenticated
/// and the edge decides. Nothing here retries.
#[derive(Clone)]
pub struct AuthenticatedHttpClient {
    http: Client,
    base_url: Url,
    tokens: Arc<dyn TokenProvider>,
}

impl AuthenticatedHttpClient {
    pub fn new(config: &ClientConfig, tokens: Arc<dyn TokenProvider>) -> Result<Self, ClientError> {
        let base_url = normalize_base_url(&config.base_url)?;
        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(&config.user_agent)
            .build()?;

        Ok(Self::from_parts(http, base_url, tokens))
    }

    /// Build from a prepared transport and an already-resolved base URL.
    ///
    /// The URL is used as given, without https normalization.
    pub fn from_parts(http: Client, base_url: Url, tokens: Arc<dyn TokenProvider>) -> Self {
        Self {
            http,
            base_url,
            tokens,
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub async fn send(&self, request: OutboundRequest) -> Result<InboundResponse, ClientError> {
        self.send_observed(request).await.1
    }

    /// Send and also report whether a bearer token was attached.
    pub async fn send_observed(
        &self,
        request: OutboundRequest,
    ) -> (AuthOutcome, Result<InboundResponse, ClientError>) {
        let (method, path, mut headers, body) = request.into_parts();
        let auth = self.authorize(&mut headers).await;

        let url = match self.resolve(&path) {
            Ok(url) => url,
            Err(e) => return (auth, Err(e)),
        };

        tracing::debug!(method = %method, url = %url, auth = ?auth, "sending request");

        let mut builder = self.http.request(method, url).headers(headers);
        if let Some(body) = body {
            builder = builder.body(body);
        }

        let result = match builder.send().await {
            Ok(response) => Self::classify(response).await,
            Err(e) => {
                tracing::debug!(error = %e, "transport failure");
                Err(ClientError::Transport(e))
            }
        };

        (auth, result)
    }

    pub async fn get(&self, path: &str) -> Result<InboundResponse, ClientError> {
        self.send(OutboundRequest::get(path)).await
    }

    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<InboundResponse, ClientError> {
        self.send(OutboundRequest::post(path).json(body)?).await
    }

    pub async fn put_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<InboundResponse, ClientError> {
        self.send(OutboundRequest::put(path).json(body)?).await
    }

    pub async fn delete(&self, path: &str) -> Result<InboundResponse, ClientError> {
        self.send(OutboundRequest::delete(path)).await
    }

    async fn authorize(&self, headers: &mut HeaderMap) -> AuthOutcome {
        headers.remove(AUTHORIZATION);

        let token = match self.tokens.bearer_token().await {
            Ok(token) => token,
            Err(e) => {
                tracing::debug!(reason = %e, "no bearer token, sending unauthenticated");
                return AuthOutcome::Skipped(e);
            }
        };

        let token = token.trim();
        if token.is_empty() {
            return AuthOutcome::Skipped(TokenError::NoSession);
        }

        match HeaderValue::from_str(&format!("Bearer {token}")) {
            Ok(mut value) => {
                value.set_sensitive(true);
                headers.insert(AUTHORIZATION, value);
                AuthOutcome::Attached
            }
            Err(_) => AuthOutcome::Skipped(TokenError::Provider(
                "token is not a valid header value".to_string(),
            )),
        }
    }

    fn resolve(&self, path: &str) -> Result<Url, ClientError> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let joined = if path.starts_with('/') {
            format!("{base}{path}")
        } else {
            format!("{base}/{path}")
        };
        Url::parse(&joined).map_err(|e| ClientError::InvalidRequest(format!("{path}: {e}")))
    }

    async fn classify(response: reqwest::Response) -> Result<InboundResponse, ClientError> {
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?.to_vec();

        if status.is_success() {
            return Ok(InboundResponse::new(status, headers, body));
        }

        let body = String::from_utf8_lossy(&body).into_owned();
        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            Err(ClientError::Unauthorized {
                status: status.as_u16(),
                body,
            })
        } else {
            Err(ClientError::Status {
                status: status.as_u16(),
                body,
            })
        }
    }
}
