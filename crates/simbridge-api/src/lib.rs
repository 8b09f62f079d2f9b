//! simbridge-api: REST API for the scheduling bridge.
//!
//! Accepts node sets and job batches from the simulator, drives them
//! through reconciliation and scheduling, and reports job placement.
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | POST | `/nodes` | Replace the node set and reconcile it into the orchestrator |
//! | GET | `/nodes` | List nodes |
//! | DELETE | `/nodes/delete-all` | Delete every node |
//! | POST | `/pods` | Submit a single job |
//! | GET | `/pods` | List jobs |
//! | POST | `/schedule-pods` | Submit a batch and wait until it is placed |
//! | GET | `/pods/{id}/status` | Get one job |
//! | DELETE | `/pods/{id}` | Delete one job |
//! | DELETE | `/pods/delete-all` | Delete every job |
//! | GET | `/metrics` | Prometheus exposition |

pub mod error;
pub mod handlers;

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, post};

use simbridge_metrics::BridgeMetrics;
use simbridge_reconcile::{ConvergenceBudget, Reconciler};
use simbridge_scheduler::SchedulingEngine;
use simbridge_state::ClusterStateStore;

pub use error::{ApiError, ApiResult};

/// Wait budgets applied by the submission handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitBudgets {
    /// Submitted nodes reporting ready.
    pub nodes: ConvergenceBudget,
    /// Submitted jobs leaving Pending, then being placed.
    pub jobs: ConvergenceBudget,
}

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub store: ClusterStateStore,
    pub engine: Arc<SchedulingEngine>,
    pub reconciler: Arc<Reconciler>,
    pub metrics: Arc<BridgeMetrics>,
    pub budgets: WaitBudgets,
}

/// Build the complete API router.
pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/nodes", get(handlers::list_nodes).post(handlers::submit_nodes))
        .route("/nodes/delete-all", delete(handlers::delete_all_nodes))
        .route("/pods", get(handlers::list_jobs).post(handlers::submit_job))
        .route("/schedule-pods", post(handlers::schedule_jobs))
        .route("/pods/delete-all", delete(handlers::delete_all_jobs))
        .route("/pods/{id}", delete(handlers::delete_job))
        .route("/pods/{id}/status", get(handlers::job_status))
        .route("/metrics", get(handlers::prometheus_metrics))
        .with_state(state)
}
