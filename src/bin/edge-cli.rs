use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use edge_sdk::{
    AuthenticatedHttpClient, ClientConfig, ClientError, InboundResponse, RetryConfig,
    RetryingFetcher, StaticTokenProvider, TokenProvider,
};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "edge-cli")]
#[command(about = "Client for services behind the edge gateway", long_about = None)]
struct Cli {
    /// Gateway base URL; `http://` and bare hosts are upgraded to `https://`.
    #[arg(short, long, env = "EDGE_URL", default_value = "localhost:8443")]
    url: String,

    /// Bearer token. Without one, requests go out unauthenticated.
    #[arg(short, long, env = "EDGE_TOKEN")]
    token: Option<String>,

    /// Attempts for `list`, including the first.
    #[arg(long, default_value_t = 3)]
    attempts: u32,

    /// Pause between `list` attempts.
    #[arg(long, default_value_t = 1000)]
    delay_ms: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a list field with retries; always prints `{items, error, attempts}`
    List {
        path: String,
        /// Top-level field holding the list
        #[arg(short, long)]
        field: String,
    },
    /// GET a path once
    Get { path: String },
    /// POST a JSON document
    Post {
        path: String,
        #[arg(short, long)]
        data: String,
    },
    /// DELETE a path
    Delete { path: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let tokens: Arc<dyn TokenProvider> = match cli.token {
        Some(token) => Arc::new(StaticTokenProvider::new(token)),
        None => Arc::new(StaticTokenProvider::none()),
    };
    let client = AuthenticatedHttpClient::new(&ClientConfig::new(cli.url), tokens)?;

    match cli.command {
        Commands::List { path, field } => {
            let retry = RetryConfig::default()
                .with_max_attempts(cli.attempts)
                .with_delay(Duration::from_millis(cli.delay_ms));
            let outcome = RetryingFetcher::new(client, retry)
                .fetch_list::<Value>(&path, &field)
                .await;
            let document = serde_json::json!({
                "items": outcome.items,
                "error": outcome.error,
                "attempts": outcome.attempts,
            });
            println!("{}", serde_json::to_string_pretty(&document)?);
        }
        Commands::Get { path } => print_response(client.get(&path).await)?,
        Commands::Post { path, data } => {
            let body: Value = serde_json::from_str(&data)?;
            print_response(client.post_json(&path, &body).await)?;
        }
        Commands::Delete { path } => print_response(client.delete(&path).await)?,
    }

    Ok(())
}

fn print_response(
    result: Result<InboundResponse, ClientError>,
) -> Result<(), Box<dyn std::error::Error>> {
    match result {
        Ok(response) => {
            match response.json::<Value>() {
                Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
                Err(_) => println!("{}", response.text()),
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}
