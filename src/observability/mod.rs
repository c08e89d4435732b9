//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Gateway request path produces:
//!     → logging.rs (structured log events, request ID on every line via TraceLayer spans)
//!     → metrics.rs (request counters, latency histogram, authorizer rejections)
//!
//! Consumers:
//!     → stdout (pretty for development, JSON for aggregation)
//!     → Prometheus scrape endpoint (when enabled)
//! ```

pub mod logging;
pub mod metrics;

pub use self::logging::init_logging;
pub use self::metrics::init_metrics;
