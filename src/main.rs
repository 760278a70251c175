//! StatEnv Gateway binary.
//!
//! An edge API gateway: browsers call `/{app}/{api}`, the gateway
//! checks the origin whitelist and the per-client quota, then forwards
//! the request to the configured third-party API with the credential
//! injected server-side. Responses can be cached per API with a TTL.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use statenv_gateway::config::{load_config, GatewayConfig};
use statenv_gateway::http::HttpServer;
use statenv_gateway::security::secrets::EnvSecretStore;

#[derive(Debug, Parser)]
#[command(name = "statenv-gateway", about = "Edge API gateway")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "gateway.toml")]
    config: PathBuf,
}

/// Default tracing filter when `RUST_LOG` is unset; the configured
/// level applies to the gateway and its HTTP trace layer.
fn default_filter(level: &str) -> String {
    format!("statenv_gateway={level},tower_http={level}")
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let (config, config_missing) = if args.config.exists() {
        (load_config(&args.config)?, false)
    } else {
        (GatewayConfig::default(), true)
    };

    // Initialize tracing subscriber; RUST_LOG overrides the config.
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            tracing_subscriber::EnvFilter::new(default_filter(&config.observability.log_level))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("statenv-gateway v0.1.0 starting");
    if config_missing {
        tracing::warn!(path = %args.config.display(), "Config file not found, using defaults");
    }

    tracing::info!(
        bind_address = %config.listener.bind_address,
        apps = config.apps.len(),
        rate_limit = config.rate_limit.max_requests,
        window_secs = config.rate_limit.window_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            statenv_gateway::observability::metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let local_addr = listener.local_addr()?;
    tracing::info!(address = %local_addr, "Listening for connections");

    let server = HttpServer::new(config, Arc::new(EnvSecretStore));
    server.run(listener).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
