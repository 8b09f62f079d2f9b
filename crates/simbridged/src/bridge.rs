//! Bridge mode: serves the submission API and runs the scheduling ticker.
//!
//! In this mode, the daemon:
//! 1. Builds the cluster state store and metrics
//! 2. Connects the HTTP extender client
//! 3. Starts the in-process simulated orchestrator
//! 4. Runs the scheduling ticker in the background
//! 5. Serves the REST API until Ctrl-C

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

use simbridge_api::{ApiState, build_router};
use simbridge_extender::{Extender, HttpExtenderClient};
use simbridge_metrics::BridgeMetrics;
use simbridge_reconcile::{InMemoryGateway, OrchestratorGateway, Reconciler};
use simbridge_scheduler::SchedulingEngine;
use simbridge_state::ClusterStateStore;

use crate::config::BridgeConfig;

/// Every long-lived component of one bridge process.
pub struct Bridge {
    pub state: ApiState,
}

impl Bridge {
    /// Wire the components together around the given extender and gateway.
    pub fn assemble(
        config: &BridgeConfig,
        extender: Arc<dyn Extender>,
        gateway: Arc<dyn OrchestratorGateway>,
    ) -> Self {
        let store = ClusterStateStore::new();
        let metrics = Arc::new(BridgeMetrics::new());
        let engine = Arc::new(SchedulingEngine::new(
            store.clone(),
            extender,
            metrics.clone(),
        ));
        let reconciler = Arc::new(Reconciler::new(
            gateway,
            metrics.clone(),
            config.gateway.namespace.clone(),
        ));

        Self {
            state: ApiState {
                store,
                engine,
                reconciler,
                metrics,
                budgets: config.wait_budgets(),
            },
        }
    }

    pub fn router(&self) -> Router {
        build_router(self.state.clone())
    }

    /// Start the background scheduling ticker.
    pub fn spawn_ticker(&self, interval: Duration, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        let engine = self.state.engine.clone();
        tokio::spawn(async move {
            engine.run_ticker(interval, shutdown).await;
        })
    }
}

/// HTTP extender client from config.
pub fn http_extender(config: &BridgeConfig) -> anyhow::Result<Arc<dyn Extender>> {
    let client = HttpExtenderClient::new(&config.extender.url, config.extender_timeout())?;
    Ok(Arc::new(client))
}

/// Run the bridge until Ctrl-C.
pub async fn run_bridge(config: BridgeConfig) -> anyhow::Result<()> {
    config.validate()?;
    info!(extender = %config.extender.url, "simbridge daemon starting");

    // ── Components ───────────────────────────────────────────────
    let extender = http_extender(&config)?;
    let gateway: Arc<dyn OrchestratorGateway> = Arc::new(InMemoryGateway::new(
        config.gateway.namespace.clone(),
        config.gateway.ready_after_polls,
    ));
    let bridge = Bridge::assemble(&config, extender, gateway);
    info!(namespace = %config.gateway.namespace, "simulated orchestrator initialized");

    // ── Background tasks ─────────────────────────────────────────
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let ticker_handle = if config.scheduler.enabled {
        Some(bridge.spawn_ticker(config.ticker_interval(), shutdown_rx))
    } else {
        info!("scheduling ticker disabled, passes run on submission only");
        None
    };

    // ── REST API server ──────────────────────────────────────────
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    info!(%addr, "API server starting");
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, bridge.router())
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "failed to listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
            info!("shutdown signal received");
            let _ = shutdown_tx.send(true);
        })
        .await?;

    if let Some(handle) = ticker_handle {
        let _ = handle.await;
    }

    info!("simbridge daemon stopped");
    Ok(())
}
