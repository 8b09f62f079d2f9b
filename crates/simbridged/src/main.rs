//! simbridged: the scheduling bridge daemon.
//!
//! Single binary with two modes:
//! - `serve`: the bridge itself (state store, scheduling engine and
//!   ticker, reconciler against the simulated orchestrator, REST API)
//! - `mock-extender`: the permissive extender the bridge can score against
//!
//! # Usage
//!
//! ```text
//! simbridged mock-extender --port 8081
//! simbridged serve --config simbridge.toml --extender-url http://localhost:8081
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use simbridged::bridge::run_bridge;
use simbridged::config::BridgeConfig;

#[derive(Parser)]
#[command(name = "simbridged", about = "Simulator-to-orchestrator scheduling bridge")]
struct Cli {
    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the submission API and run the scheduler.
    Serve {
        /// Path to a simbridge.toml file.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Port to listen on (overrides `server.port`).
        #[arg(long)]
        port: Option<u16>,

        /// Extender base URL (overrides `extender.url`).
        #[arg(long)]
        extender_url: Option<String>,

        /// Scheduling ticker interval in milliseconds (overrides `scheduler.interval_ms`).
        #[arg(long)]
        ticker_interval_ms: Option<u64>,

        /// Disable the background ticker; schedule on submission only.
        #[arg(long)]
        no_ticker: bool,
    },

    /// Run the permissive mock extender.
    MockExtender {
        /// Port to listen on.
        #[arg(long, default_value = "8081")]
        port: u16,
    },
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,simbridged=debug,simbridge=debug"));

    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match cli.command {
        Command::Serve {
            config,
            port,
            extender_url,
            ticker_interval_ms,
            no_ticker,
        } => {
            let mut config = BridgeConfig::load(config.as_deref())?;
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(url) = extender_url {
                config.extender.url = url;
            }
            if let Some(ms) = ticker_interval_ms {
                config.scheduler.interval_ms = ms;
            }
            if no_ticker {
                config.scheduler.enabled = false;
            }
            run_bridge(config).await
        }
        Command::MockExtender { port } => run_mock_extender(port).await,
    }
}

async fn run_mock_extender(port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    simbridge_extender::mock::serve(addr, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
        info!("shutdown signal received");
    })
    .await?;
    info!("mock extender stopped");
    Ok(())
}
