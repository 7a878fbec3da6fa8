//! Synthetic monitoring agent
//!
//! Connects to the synthetic monitoring API server and keeps the
//! authenticated channel open until interrupted.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sm_agent::{ApiConnector, ExponentialBackoff};
use sm_core::config::{self, AgentConfig};

#[derive(Parser)]
#[command(name = "sm-agent")]
#[command(about = "Synthetic monitoring agent - connects to the API server over gRPC")]
#[command(version)]
struct Args {
    /// API server address (host or host:port)
    #[arg(long, env = "SM_API_SERVER_ADDRESS")]
    api_server_address: Option<String>,

    /// API token sent as a bearer token on every call
    #[arg(long, env = "SM_API_TOKEN", hide_env_values = true)]
    api_token: Option<String>,

    /// Connect without TLS. The API token is sent in plaintext.
    #[arg(long)]
    api_insecure: bool,

    /// Dial timeout in seconds
    #[arg(long, value_name = "SECONDS")]
    connect_timeout: Option<u64>,

    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write the merged configuration to PATH and exit
    #[arg(long, value_name = "PATH")]
    write_config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| args.log_level.clone()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Synthetic monitoring agent starting...");

    let config = load_config(&args)?;
    config.validate().context("Invalid configuration")?;

    if let Some(path) = &args.write_config {
        config::save_config(path, &config)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;
        tracing::info!(path = %path.display(), "Configuration written");
        return Ok(());
    }

    if config.api_token.is_empty() {
        tracing::warn!("No API token configured; the API server will likely reject calls");
    }
    if config.allow_insecure {
        tracing::warn!(
            address = %config.api_server_address,
            "Insecure mode enabled: the API token travels unencrypted"
        );
    }

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for ctrl-c: {}", e);
            return;
        }
        tracing::info!("Interrupt received, shutting down");
        shutdown.cancel();
    });

    let backoff = ExponentialBackoff::from_config(&config.backoff);
    let connector = ApiConnector::new(config);

    let channel = match connector.connect_with_retry(&cancel, backoff).await {
        Ok(channel) => channel,
        Err(e) if e.is_cancelled() => {
            tracing::info!("Connection attempt cancelled");
            return Ok(());
        }
        Err(e) => {
            return Err(e).with_context(|| {
                format!(
                    "Failed to connect to API server at {}",
                    connector.config().api_server_address
                )
            })
        }
    };

    tracing::info!(
        address = %connector.config().api_server_address,
        "API channel ready"
    );

    cancel.cancelled().await;
    drop(channel);
    tracing::info!("Agent stopped");
    Ok(())
}

/// Load the config file (if any) and apply command-line overrides
fn load_config(args: &Args) -> Result<AgentConfig> {
    let mut config: AgentConfig = match &args.config {
        Some(path) => config::load_config(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => {
            let path = config::default_config_path();
            if path.exists() {
                config::load_config(&path).unwrap_or_else(|e| {
                    tracing::warn!("Failed to load config from {:?}: {}", path, e);
                    AgentConfig::default()
                })
            } else {
                AgentConfig::default()
            }
        }
    };

    if let Some(address) = &args.api_server_address {
        config.api_server_address = address.clone();
    }
    if let Some(token) = &args.api_token {
        config.api_token = token.as_str().into();
    }
    if args.api_insecure {
        config.allow_insecure = true;
    }
    if let Some(secs) = args.connect_timeout {
        config.connect_timeout = Duration::from_secs(secs);
    }

    Ok(config)
}
