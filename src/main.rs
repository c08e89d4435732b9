//! Edge gateway
//!
//! A single authenticated entry point in front of a backend handler.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request          ┌──────────────────────────────────────────────────────┐
//!     ────────────────────────┼─▶ request id ─▶ trace ─▶ concurrency limit          │
//!                             │                               │                      │
//!                             │                               ▼                      │
//!                             │   CORS preflight ──(204)──▶ authorizer ──(401)─┐     │
//!                             │                               │                │     │
//!                             │                               ▼                │     │
//!                             │                        backend handler ───────▶│     │
//!                             │                               │                │     │
//!     Client Response         │                               ▼                │     │
//!     ◀───────────────────────┼── envelope (200 + CORS │ 400 + origin) ◀───────┘     │
//!                             │                                                      │
//!                             │   config (TOML, hot reload) · logging · metrics      │
//!                             └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use edge_gateway::lifecycle::{self, StartupOptions};

#[derive(Parser)]
#[command(name = "edge-gateway")]
#[command(about = "Authenticated edge gateway", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, env = "EDGE_CONFIG", default_value = "edge.toml")]
    config: PathBuf,

    /// Reload the configuration file when it changes.
    #[arg(long)]
    watch: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    lifecycle::run(StartupOptions {
        config_path: cli.config,
        watch: cli.watch,
    })
    .await?;

    Ok(())
}
