//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router: every method on every path goes to one handler
//! - Wire up middleware (request ID, tracing, concurrency limit, preflight, authorizer)
//! - Hold the hot-swappable runtime (config, verifier, backend, CORS values)
//! - Bind to a plain or TLS listener and shut down gracefully

use std::net::SocketAddr;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::from_fn_with_state,
    response::Response,
    routing::any,
    Router,
};
use axum_server::tls_rustls::RustlsConfig;
use futures_util::FutureExt;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower::limit::GlobalConcurrencyLimitLayer;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::auth::{AuthError, JwtVerifier, TokenVerifier};
use crate::backend::{BackendError, BackendHandler, UpstreamBackend};
use crate::config::GatewayConfig;
use crate::http::middleware::{authorizer_middleware, preflight_middleware};
use crate::http::request::{into_backend_request, request_id, GatewayRequestId, X_REQUEST_ID};
use crate::http::response::{self, CorsHeaders};
use crate::observability::metrics::{self, Outcome};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("authorizer setup failed: {0}")]
    Auth(#[from] AuthError),

    #[error("backend setup failed: {0}")]
    Backend(#[from] BackendError),

    #[error("invalid CORS header value in configuration")]
    Cors,
}

/// Everything a request needs, swapped as a unit on reload.
pub struct Runtime {
    pub config: GatewayConfig,
    pub verifier: Arc<dyn TokenVerifier>,
    pub backend: Arc<dyn BackendHandler>,
    pub cors: CorsHeaders,
}

/// Shared state injected into middleware and handlers.
#[derive(Clone)]
pub struct GatewayState {
    runtime: Arc<ArcSwap<Runtime>>,
}

impl GatewayState {
    pub fn new(runtime: Runtime) -> Self {
        Self {
            runtime: Arc::new(ArcSwap::from_pointee(runtime)),
        }
    }

    /// Snapshot of the current runtime. In-flight requests keep theirs across a reload.
    pub fn load(&self) -> Arc<Runtime> {
        self.runtime.load_full()
    }

    pub fn store(&self, runtime: Runtime) {
        self.runtime.store(Arc::new(runtime));
    }
}

/// The edge gateway.
///
/// A verifier or backend supplied by the embedder is pinned: reloads keep it
/// and only rebuild the components derived from configuration.
#[derive(Clone)]
pub struct GatewayServer {
    state: GatewayState,
    pinned_verifier: Option<Arc<dyn TokenVerifier>>,
    pinned_backend: Option<Arc<dyn BackendHandler>>,
}

impl GatewayServer {
    /// Gateway with the JWT verifier and upstream backend described by `config`.
    pub fn new(config: GatewayConfig) -> Result<Self, ServerError> {
        Self::build(config, None, None)
    }

    /// Gateway in front of an in-process backend handler.
    pub fn with_backend(
        config: GatewayConfig,
        backend: Arc<dyn BackendHandler>,
    ) -> Result<Self, ServerError> {
        Self::build(config, None, Some(backend))
    }

    /// Gateway with both collaborators supplied.
    pub fn with_components(
        config: GatewayConfig,
        verifier: Arc<dyn TokenVerifier>,
        backend: Arc<dyn BackendHandler>,
    ) -> Result<Self, ServerError> {
        Self::build(config, Some(verifier), Some(backend))
    }

    fn build(
        config: GatewayConfig,
        pinned_verifier: Option<Arc<dyn TokenVerifier>>,
        pinned_backend: Option<Arc<dyn BackendHandler>>,
    ) -> Result<Self, ServerError> {
        let runtime = runtime_for(config, None, &pinned_verifier, &pinned_backend)?;
        Ok(Self {
            state: GatewayState::new(runtime),
            pinned_verifier,
            pinned_backend,
        })
    }

    pub fn state(&self) -> GatewayState {
        self.state.clone()
    }

    /// Swap in a new configuration.
    ///
    /// The verifier (and its key cache) and the backend client survive when
    /// their sections are unchanged. The concurrency limit is fixed when the
    /// router is built.
    pub fn reload(&self, config: GatewayConfig) -> Result<(), ServerError> {
        let current = self.state.load();
        let runtime = runtime_for(
            config,
            Some(&current),
            &self.pinned_verifier,
            &self.pinned_backend,
        )?;
        self.state.store(runtime);
        tracing::info!("gateway runtime reloaded");
        Ok(())
    }

    /// Build the Axum router with all middleware layers.
    pub fn router(&self) -> Router {
        let max_concurrent = self.state.load().config.listener.max_concurrent_requests;

        Router::new()
            .route("/", any(forward_handler))
            .route("/{*path}", any(forward_handler))
            .layer(from_fn_with_state(self.state.clone(), authorizer_middleware))
            .layer(from_fn_with_state(self.state.clone(), preflight_middleware))
            .with_state(self.state.clone())
            .layer(GlobalConcurrencyLimitLayer::new(max_concurrent))
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, GatewayRequestId))
    }

    /// Serve plain HTTP until `shutdown` fires, applying config updates as they arrive.
    pub async fn run(
        self,
        listener: TcpListener,
        updates: mpsc::UnboundedReceiver<GatewayConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "gateway listening");

        let reloader = self.spawn_reloader(updates);
        let app = self
            .router()
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("shutdown signal received, draining connections");
            })
            .await?;

        reloader.abort();
        tracing::info!("gateway stopped");
        Ok(())
    }

    /// Serve HTTPS on `addr` until `shutdown` fires.
    pub async fn run_tls(
        self,
        addr: SocketAddr,
        tls: RustlsConfig,
        updates: mpsc::UnboundedReceiver<GatewayConfig>,
        mut shutdown: broadcast::Receiver<()>,
        drain_timeout: Duration,
    ) -> Result<(), ServerError> {
        tracing::info!(address = %addr, "gateway listening (TLS)");

        let reloader = self.spawn_reloader(updates);
        let handle = axum_server::Handle::new();
        let signal = handle.clone();
        tokio::spawn(async move {
            let _ = shutdown.recv().await;
            tracing::info!("shutdown signal received, draining connections");
            signal.graceful_shutdown(Some(drain_timeout));
        });

        axum_server::bind_rustls(addr, tls)
            .handle(handle)
            .serve(
                self.router()
                    .into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await?;

        reloader.abort();
        tracing::info!("gateway stopped");
        Ok(())
    }

    fn spawn_reloader(
        &self,
        mut updates: mpsc::UnboundedReceiver<GatewayConfig>,
    ) -> tokio::task::JoinHandle<()> {
        let server = self.clone();
        tokio::spawn(async move {
            while let Some(config) = updates.recv().await {
                if let Err(e) = server.reload(config) {
                    tracing::error!(error = %e, "config reload rejected, keeping current runtime");
                }
            }
        })
    }
}

fn runtime_for(
    config: GatewayConfig,
    current: Option<&Runtime>,
    pinned_verifier: &Option<Arc<dyn TokenVerifier>>,
    pinned_backend: &Option<Arc<dyn BackendHandler>>,
) -> Result<Runtime, ServerError> {
    let verifier: Arc<dyn TokenVerifier> = match (pinned_verifier, current) {
        (Some(verifier), _) => verifier.clone(),
        (None, Some(current)) if current.config.auth == config.auth => current.verifier.clone(),
        (None, _) => Arc::new(JwtVerifier::from_config(&config.auth)?),
    };

    let backend: Arc<dyn BackendHandler> = match (pinned_backend, current) {
        (Some(backend), _) => backend.clone(),
        (None, Some(current)) if current.config.backend == config.backend => {
            current.backend.clone()
        }
        (None, _) => Arc::new(UpstreamBackend::new(&config.backend.upstream_url)?),
    };

    let cors = CorsHeaders::from_config(&config.cors).map_err(|_| ServerError::Cors)?;

    Ok(Runtime {
        config,
        verifier,
        backend,
        cors,
    })
}

/// Forwards an authorized request to the backend and wraps the outcome.
async fn forward_handler(State(state): State<GatewayState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let runtime = state.load();
    let request_id = request_id(&request);
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    tracing::debug!(
        request_id = %request_id,
        method = %method,
        path = %path,
        "forwarding request"
    );

    let timeout = Duration::from_secs(runtime.config.timeouts.backend_secs);
    let outcome = match into_backend_request(request, runtime.config.backend.max_body_bytes).await
    {
        Ok(backend_request) => {
            let call = AssertUnwindSafe(runtime.backend.handle(backend_request)).catch_unwind();
            match tokio::time::timeout(timeout, call).await {
                Ok(Ok(result)) => result,
                Ok(Err(_)) => {
                    tracing::error!(request_id = %request_id, "backend handler panicked");
                    Err(BackendError::Failed("backend panicked".to_string()))
                }
                Err(_) => Err(BackendError::Timeout(timeout)),
            }
        }
        Err(e) => Err(e),
    };

    match &outcome {
        Ok(_) => metrics::record_request(method.as_str(), 200, Outcome::Success, start),
        Err(e) => {
            tracing::warn!(
                request_id = %request_id,
                method = %method,
                path = %path,
                kind = e.kind(),
                error = %e,
                "backend reported failure"
            );
            metrics::record_request(method.as_str(), 400, Outcome::Error, start);
        }
    }

    response::envelope(outcome, &runtime.cors)
}
