//! Shared utilities for gateway integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use axum::Router;
use edge_gateway::backend::{BackendError, BackendHandler, BackendReply, BackendRequest};
use edge_gateway::config::GatewayConfig;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::json;
use tokio::net::TcpListener;

pub const ISSUER: &str = "https://issuer.example.com";
pub const SECRET: &[u8] = b"integration-secret";

/// Gateway config verifying HS256 tokens signed with `SECRET`.
pub fn test_config() -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.auth.issuer = ISSUER.to_string();
    config.auth.hs256_secret = Some(String::from_utf8_lossy(SECRET).into_owned());
    config
}

pub fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

pub fn mint(claims: serde_json::Value) -> String {
    encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET)).unwrap()
}

/// A valid token for `sub`.
pub fn token_for(sub: &str) -> String {
    mint(json!({ "sub": sub, "iss": ISSUER, "exp": now() + 3600 }))
}

/// What the backend saw of one request.
#[derive(Debug, Clone)]
pub struct Seen {
    pub method: String,
    pub path_and_query: String,
    pub subject: Option<String>,
    pub request_id: Option<String>,
    pub authorization: Option<String>,
    pub body: Vec<u8>,
}

type Respond = dyn Fn(&BackendRequest) -> Result<BackendReply, BackendError> + Send + Sync;

/// In-process backend that records requests and answers with a fixed function.
pub struct RecordingBackend {
    seen: Mutex<Vec<Seen>>,
    delay: Option<Duration>,
    respond: Box<Respond>,
}

impl RecordingBackend {
    pub fn new(
        respond: impl Fn(&BackendRequest) -> Result<BackendReply, BackendError> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            seen: Mutex::new(Vec::new()),
            delay: None,
            respond: Box::new(respond),
        })
    }

    /// Backend that answers only after `delay`.
    pub fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            seen: Mutex::new(Vec::new()),
            delay: Some(delay),
            respond: Box::new(|_| Ok(BackendReply::json("{}"))),
        })
    }

    pub fn ok(body: &'static str) -> Arc<Self> {
        Self::new(move |_| Ok(BackendReply::json(body)))
    }

    pub fn seen(&self) -> Vec<Seen> {
        self.seen.lock().unwrap().clone()
    }
}

fn header(request: &BackendRequest, name: &str) -> Option<String> {
    request
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

#[async_trait]
impl BackendHandler for RecordingBackend {
    async fn handle(&self, request: BackendRequest) -> Result<BackendReply, BackendError> {
        self.seen.lock().unwrap().push(Seen {
            method: request.method.to_string(),
            path_and_query: request
                .uri
                .path_and_query()
                .map(|pq| pq.as_str().to_string())
                .unwrap_or_default(),
            subject: header(&request, "x-authenticated-subject"),
            request_id: header(&request, "x-request-id"),
            authorization: header(&request, "authorization"),
            body: request.body.to_vec(),
        });
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        (self.respond)(&request)
    }
}

/// Serve `app` on an ephemeral local port.
pub async fn serve(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}
