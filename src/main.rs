//! Endpoint router (v1)
//!
//! ```text
//!     caller (fetch / embedding app)
//!         │
//!         ▼
//!  ┌──────────────┐  hit   ┌──────────────┐
//!  │  Dispatcher  │───────▶│ ResponseCache│
//!  └──────┬───────┘        └──────────────┘
//!         │ miss
//!         ▼
//!  ┌──────────────┐        ┌──────────────┐
//!  │   ranking    │◀───────│   registry   │◀──── HealthMonitor (timer)
//!  └──────┬───────┘        └──────────────┘
//!         │ candidates           ▲
//!         ▼                      │ passive health + history
//!  ┌──────────────┐        ┌─────┴────────┐
//!  │     gate     │───────▶│  Transport   │────▶ endpoint A / B / C
//!  └──────────────┘        └──────────────┘
//! ```
//!
//! `serve` runs the health monitor and admin API until SIGINT/SIGTERM.
//! `fetch` routes a single request and prints the payload.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use endpoint_router::config::loader::load_config;
use endpoint_router::lifecycle::{wait_for_signal, RouterService};
use endpoint_router::observability::{logging, metrics};
use endpoint_router::{Capability, RequestOptions};

#[derive(Parser)]
#[command(name = "endpoint-router", version)]
#[command(about = "Resilient multi-endpoint request router", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "router.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run health checks and the admin API until interrupted
    Serve,
    /// Route one request and print the payload
    Fetch {
        /// Capability class to route to
        #[arg(long)]
        capability: String,

        /// Request path appended to the endpoint base URL
        #[arg(long)]
        path: String,

        /// Query parameter, repeatable
        #[arg(long = "query", value_name = "KEY=VALUE", value_parser = parse_pair)]
        query: Vec<(String, String)>,

        /// Header override, repeatable
        #[arg(long = "header", value_name = "NAME=VALUE", value_parser = parse_pair)]
        header: Vec<(String, String)>,
    },
}

fn parse_pair(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok((key.trim().to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{}'", raw)),
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = load_config(&cli.config)?;
    logging::init_logging(&config.observability);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %cli.config.display(),
        endpoints = config.endpoints.len(),
        "endpoint-router starting"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    match cli.command {
        Commands::Serve => {
            let mut service = RouterService::build(config)?;
            service.start().await?;
            wait_for_signal().await;
            service.shutdown().await;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Fetch {
            capability,
            path,
            query,
            header,
        } => {
            let options = query
                .into_iter()
                .fold(RequestOptions::new(), |options, (k, v)| options.query(k, v));
            let options = header
                .into_iter()
                .fold(options, |options, (k, v)| options.header(k, v));

            let service = RouterService::build(config)?;
            service.restore_history().await;

            let result = service
                .route(&Capability::new(&capability), &path, &options)
                .await;
            // Persist the outcome before the runtime goes away.
            service.shutdown().await;

            match result.into_result() {
                Ok(success) => {
                    tracing::info!(
                        endpoint = success.endpoint.as_deref().unwrap_or("cache"),
                        retries = success.retries,
                        cache_hit = success.cache_hit,
                        "Fetch succeeded"
                    );
                    println!("{}", success.payload);
                    Ok(ExitCode::SUCCESS)
                }
                Err(failure) => {
                    eprintln!(
                        "error: {} ({} failed attempts)",
                        failure.message, failure.retries
                    );
                    Ok(ExitCode::FAILURE)
                }
            }
        }
    }
}
