//! Regional Shopping CLI
//!
//! Command-line interface for running the shopping assistant API.

use clap::{Parser, Subcommand};
use std::path::Path;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use regional_shopping::{
    ApiServer, AppConfig, AppContext, AppState, Capability, MetricsService, Result,
};

/// Health response from the API.
#[derive(Debug, serde::Deserialize)]
struct HealthResponse {
    status: String,
    version: String,
    uptime: u64,
}

#[derive(Parser)]
#[command(name = "regional-shopping")]
#[command(author, version, about = "Regional shopping assistant", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init {
        /// Output path for configuration file
        #[arg(short, long, default_value = "config.toml")]
        output: String,
    },

    /// Start the HTTP API
    Start {
        /// HTTP API listen address (overrides config)
        #[arg(long)]
        api_addr: Option<String>,

        /// Enable semantic search (downloads ~90MB embedding model on first use)
        #[arg(long)]
        enable_semantic_search: bool,
    },

    /// Run one search in process and print the results as JSON
    Search {
        /// Capability to query: semantic, tavily or duckduckgo
        #[arg(long, default_value = "semantic")]
        capability: String,

        /// Maximum number of results
        #[arg(short, long)]
        limit: Option<usize>,

        /// Search text
        query: String,
    },

    /// Check API health
    Health {
        /// API endpoint to check
        #[arg(long, default_value = "http://localhost:5000")]
        endpoint: String,
    },
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn load_config(path: &str) -> Result<AppConfig> {
    let mut config = if Path::new(path).exists() {
        info!("Loading configuration from: {}", path);
        AppConfig::load(path)?
    } else {
        info!("Using default configuration");
        AppConfig::default()
    };
    config.apply_env_overrides();
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    match cli.command {
        Commands::Init { output } => {
            info!("Writing default configuration to: {}", output);
            AppConfig::default().save(&output)?;
            info!("Configuration saved successfully");
        }

        Commands::Start {
            api_addr,
            enable_semantic_search,
        } => {
            info!("Starting regional shopping assistant...");

            let mut config = load_config(&cli.config)?;
            if let Some(addr) = api_addr {
                config.api.listen_address = addr;
            }
            if enable_semantic_search {
                info!("Semantic search requested (downloading ~90MB model if needed)");
                config.search.enable_semantic = true;
            }
            config.validate()?;

            let context = AppContext::new(config.clone());
            let manager = context.service_manager().await?;
            let report = manager.health_check();
            for (capability, health) in &report.services {
                info!("  {}: {}", capability, health.state.as_str());
            }

            let state = AppState::new(manager, MetricsService::new(config.metrics.clone()));
            let listen_address = config.api.listen_address.clone();
            let api_server = ApiServer::with_state(config.api.clone(), state);

            let server = tokio::spawn(async move {
                if let Err(e) = api_server.run(&listen_address).await {
                    error!("API server error: {}", e);
                }
            });

            info!("Press Ctrl+C to stop");

            tokio::select! {
                _ = signal::ctrl_c() => {
                    info!("Received shutdown signal");
                }
                result = server => {
                    if let Err(e) = result {
                        warn!("API server task ended: {}", e);
                    }
                }
            }
            context.shutdown().await;
            info!("Stopped");
        }

        Commands::Search {
            capability,
            limit,
            query,
        } => {
            let config = load_config(&cli.config)?;
            let capability: Capability = capability.parse()?;
            let context = AppContext::new(config);
            let manager = context.service_manager().await?;
            let limit = limit.unwrap_or(manager.default_limit());

            let results = manager.search(capability, &query, limit).await?;
            info!(
                "{} result(s) from {} ({})",
                results.len(),
                capability,
                manager.state(capability).as_str()
            );
            println!("{}", serde_json::to_string_pretty(&results)?);
            context.shutdown().await;
        }

        Commands::Health { endpoint } => {
            info!("Checking API health at: {}", endpoint);

            let health_url = format!("{}/health", endpoint.trim_end_matches('/'));
            match tokio::time::timeout(Duration::from_secs(5), check_health(&health_url)).await {
                Ok(Ok(response)) => {
                    info!("Status: {}", response.status);
                    info!("Version: {}", response.version);
                    info!("Uptime: {} seconds", response.uptime);
                }
                Ok(Err(e)) => {
                    error!("Health check failed: {}", e);
                    std::process::exit(1);
                }
                Err(_) => {
                    error!("Health check timed out");
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}

/// Fetch and decode `/health`.
async fn check_health(url: &str) -> Result<HealthResponse> {
    let response = reqwest::get(url).await?.error_for_status()?;
    Ok(response.json().await?)
}
