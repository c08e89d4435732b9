//! Metrics collection and exposition.
//!
//! # Metrics
//! - `edge_requests_total` (counter): requests by method, envelope status, outcome
//! - `edge_request_duration_seconds` (histogram): latency by method and outcome
//! - `edge_auth_rejections_total` (counter): authorizer rejections by reason
//!
//! Recording is a no-op until a recorder is installed, so the request path
//! never checks whether metrics are enabled.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Request outcome label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Error,
    Unauthorized,
    Preflight,
}

impl Outcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Unauthorized => "unauthorized",
            Self::Preflight => "preflight",
        }
    }
}

/// Install the Prometheus recorder and its scrape listener. Must run inside a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "metrics endpoint listening");
    Ok(())
}

pub fn record_request(method: &str, status: u16, outcome: Outcome, start: Instant) {
    counter!(
        "edge_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "outcome" => outcome.as_str()
    )
    .increment(1);
    histogram!(
        "edge_request_duration_seconds",
        "method" => method.to_string(),
        "outcome" => outcome.as_str()
    )
    .record(start.elapsed().as_secs_f64());
}

pub fn record_auth_rejection(reason: &'static str) {
    counter!("edge_auth_rejections_total", "reason" => reason).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_request("GET", 200, Outcome::Success, Instant::now());
        record_auth_rejection("missing");
    }

    #[test]
    fn test_outcome_labels() {
        assert_eq!(Outcome::Unauthorized.as_str(), "unauthorized");
        assert_eq!(Outcome::Preflight.as_str(), "preflight");
    }
}
