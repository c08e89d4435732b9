//! Startup orchestration.
//!
//! Config first, then logging and metrics, then the watcher, then the
//! listener. Any startup error is fatal.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use crate::config::{load_config, ConfigError, ConfigWatcher};
use crate::http::{GatewayServer, ServerError};
use crate::lifecycle::Shutdown;
use crate::net::{load_tls_config, TlsError};
use crate::observability::{init_logging, init_metrics};

/// How long TLS connections get to finish after shutdown starts.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Server(#[from] ServerError),

    #[error("TLS error: {0}")]
    Tls(#[from] TlsError),

    #[error("metrics exporter error: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error("config watcher error: {0}")]
    Watch(#[from] notify::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid address `{0}`")]
    Address(String),
}

#[derive(Debug, Clone)]
pub struct StartupOptions {
    pub config_path: PathBuf,
    /// Reload the config file when it changes.
    pub watch: bool,
}

/// Run the gateway until a termination signal.
pub async fn run(options: StartupOptions) -> Result<(), StartupError> {
    let config = load_config(&options.config_path)?;
    init_logging(&config.observability);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = ?options.config_path,
        "edge-gateway starting"
    );
    tracing::info!(
        bind_address = %config.listener.bind_address,
        tls = config.listener.tls.is_some(),
        issuer = %config.auth.issuer,
        upstream = %config.backend.upstream_url,
        max_concurrent_requests = config.listener.max_concurrent_requests,
        backend_timeout_secs = config.timeouts.backend_secs,
        "configuration loaded"
    );

    if config.observability.metrics_enabled {
        init_metrics(parse_addr(&config.observability.metrics_address)?)?;
    }

    let (_watcher, updates) = if options.watch {
        let (watcher, updates) = ConfigWatcher::new(&options.config_path, config.clone());
        (Some(watcher.run()?), updates)
    } else {
        let (_, updates) = mpsc::unbounded_channel();
        (None, updates)
    };

    let shutdown = Shutdown::new();
    let stop = shutdown.subscribe();
    shutdown.trigger_on_signal();

    let server = GatewayServer::new(config.clone())?;
    match &config.listener.tls {
        Some(tls) => {
            let addr = parse_addr(&config.listener.bind_address)?;
            let rustls =
                load_tls_config(Path::new(&tls.cert_path), Path::new(&tls.key_path)).await?;
            server
                .run_tls(addr, rustls, updates, stop, DRAIN_TIMEOUT)
                .await?;
        }
        None => {
            let listener = TcpListener::bind(&config.listener.bind_address).await?;
            server.run(listener, updates, stop).await?;
        }
    }

    tracing::info!("shutdown complete");
    Ok(())
}

fn parse_addr(raw: &str) -> Result<SocketAddr, StartupError> {
    raw.parse()
        .map_err(|_| StartupError::Address(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_config_file_is_fatal() {
        let err = run(StartupOptions {
            config_path: PathBuf::from("/nonexistent/edge.toml"),
            watch: false,
        })
        .await
        .unwrap_err();
        assert!(matches!(err, StartupError::Config(ConfigError::Io(_))));
    }

    #[test]
    fn test_parse_addr() {
        assert!(parse_addr("127.0.0.1:8443").is_ok());
        assert!(matches!(parse_addr("localhost"), Err(StartupError::Address(_))));
    }
}
