//! Structured logging.
//!
//! `RUST_LOG` wins over `observability.log_level`; the format comes from
//! `observability.log_format`.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFormat, ObservabilityConfig};

/// Directive used when neither `RUST_LOG` nor the config sets a level.
pub const DEFAULT_DIRECTIVE: &str = "edge_gateway=info,tower_http=info";

/// Filter directive for the configured level.
///
/// A bare level (`debug`) is scoped to this crate and tower-http so dependency
/// chatter stays at its own defaults; anything else is used as written.
pub fn directive(level: &str) -> String {
    let level = level.trim();
    if level.is_empty() {
        return DEFAULT_DIRECTIVE.to_string();
    }
    if level.contains('=') || level.contains(',') {
        return level.to_string();
    }
    format!("edge_gateway={level},tower_http={level}")
}

/// Install the global subscriber. Returns `false` if one was already set.
pub fn init_logging(config: &ObservabilityConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(directive(&config.log_level)));

    let registry = tracing_subscriber::registry().with(filter);
    let installed = match config.log_format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).try_init(),
    };
    installed.is_ok()
}
