//! Edge Authentication Agent
//!
//! Keeps a fleet of authentication handlers in sync with the access
//! control policies defined on a control plane.
//!
//! # Architecture Overview
//!
//! ```text
//!   control plane ◀──(poll /acps)── AcpWatcher ──(diff + notify)──┐
//!                                                                 ▼
//!                                                  build_routes → DispatchTable
//!                                                                 │ (atomic swap)
//!                                                                 ▼
//!   proxy forward-auth ──▶ AuthServer ──▶ handler at "/" + name ──▶ allow / deny / challenge
//! ```
//!
//! The watcher is the only writer of policy state; the server only ever
//! swaps in complete tables, so a malformed policy set can never be
//! partially live.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use acp_agent::acp::source::{DirSource, PlatformClient, PolicySource};
use acp_agent::acp::AcpWatcher;
use acp_agent::config::{load_config, validate_config, AgentConfig, ConfigError};
use acp_agent::http::AuthServer;
use acp_agent::lifecycle::{listen_for_signals, Shutdown};
use acp_agent::observability::metrics;

#[derive(Parser)]
#[command(name = "acp-agent")]
#[command(about = "Edge agent syncing access control policies", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long)]
    config: Option<std::path::PathBuf>,

    /// Override the configured log level.
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => {
            let config = AgentConfig::default();
            validate_config(&config).map_err(ConfigError::Validation)?;
            config
        }
    };

    let log_level = cli
        .log_level
        .unwrap_or_else(|| config.observability.log_level.clone());

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("acp_agent={},tower_http=info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("acp-agent v0.1.0 starting");

    tracing::info!(
        listen_addr = %config.server.listen_addr,
        poll_interval_secs = config.platform.poll_interval_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let source: Arc<dyn PolicySource> = match &config.acp.dir {
        Some(dir) => {
            tracing::info!(dir = %dir.display(), "Using local policy directory");
            Arc::new(DirSource::new(dir.clone()))
        }
        None => {
            let url = url::Url::parse(&config.platform.url)?;
            tracing::info!(url = %url, "Using control plane policy source");
            Arc::new(PlatformClient::new(url, config.platform.token.clone()))
        }
    };

    let server = AuthServer::new(Duration::from_secs(config.server.request_timeout_secs));
    let watcher = AcpWatcher::new(source, vec![server.update_acp_fn()])
        .with_poll_interval(Duration::from_secs(config.platform.poll_interval_secs));

    let shutdown = Shutdown::new();
    tokio::spawn(watcher.run(shutdown.subscribe()));
    tokio::spawn(listen_for_signals(shutdown.clone()));

    let listener = TcpListener::bind(&config.server.listen_addr).await?;
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
