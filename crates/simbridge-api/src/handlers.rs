//! REST API handlers.
//!
//! Handlers read and write through the `ClusterStateStore`, push changes
//! to the orchestrator through the `Reconciler`, and wrap every JSON body
//! in `ApiResponse`. Submissions reach the orchestrator first; the store
//! is only written once the orchestrator accepted them.

use std::convert::Infallible;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Serialize;
use tracing::{info, warn};

use simbridge_reconcile::{Convergence, await_convergence};
use simbridge_state::{Job, JobId, JobStatus, Node, NodeId, validate_jobs, validate_nodes};

use crate::ApiState;
use crate::error::{ApiError, ApiResult};

/// Response wrapper for consistent API format.
#[derive(serde::Serialize)]
struct ApiResponse<T: serde::Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: serde::Serialize> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
        })
    }
}

pub(crate) fn error_response(msg: &str, status: StatusCode) -> impl IntoResponse {
    (
        status,
        Json(ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(msg.to_string()),
        }),
    )
}

fn bad_payload(rejection: JsonRejection) -> ApiError {
    ApiError::Validation(rejection.body_text())
}

/// Accepted jobs always start Pending with no assignment.
fn reset_to_pending(job: &mut Job) {
    job.status = Some(JobStatus::Pending);
    job.node_name = None;
    job.node_id = None;
}

// ── Nodes ──────────────────────────────────────────────────────

/// Body of a successful `POST /nodes`.
#[derive(Debug, Serialize)]
pub struct NodesAccepted {
    pub received: usize,
    pub deleted: usize,
    pub upserted: usize,
}

/// Body of a successful delete-all.
#[derive(Debug, Serialize)]
pub struct Cleared {
    pub orchestrator: usize,
    pub store: usize,
}

/// GET /nodes
pub async fn list_nodes(State(state): State<ApiState>) -> impl IntoResponse {
    ApiResponse::ok(state.store.snapshot_nodes().await)
}

/// POST /nodes
///
/// Reconciles the submitted node set into the orchestrator, replaces the
/// store's node set once that succeeded, and waits for every submitted
/// node to report ready.
pub async fn submit_nodes(
    State(state): State<ApiState>,
    payload: Result<Json<Vec<Node>>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(nodes) = payload.map_err(bad_payload)?;
    validate_nodes(&nodes)?;

    let ids: Vec<NodeId> = nodes.iter().map(|n| n.id).collect();
    let report = state.reconciler.reconcile(&nodes).await?;
    let received = state.store.upsert_nodes(nodes).await;

    state
        .reconciler
        .await_nodes_ready(&ids, state.budgets.nodes)
        .await?;

    info!(received, deleted = report.deleted, upserted = report.upserted, "node set accepted");
    Ok(ApiResponse::ok(NodesAccepted {
        received,
        deleted: report.deleted,
        upserted: report.upserted,
    }))
}

/// DELETE /nodes/delete-all
pub async fn delete_all_nodes(State(state): State<ApiState>) -> ApiResult<impl IntoResponse> {
    let orchestrator = state.reconciler.delete_all_nodes().await?;
    let store = state.store.clear_nodes().await;
    Ok(ApiResponse::ok(Cleared {
        orchestrator,
        store,
    }))
}

// ── Jobs ───────────────────────────────────────────────────────

/// GET /pods
pub async fn list_jobs(State(state): State<ApiState>) -> impl IntoResponse {
    ApiResponse::ok(state.store.list_jobs().await)
}

/// POST /pods
pub async fn submit_job(
    State(state): State<ApiState>,
    payload: Result<Json<Job>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(mut job) = payload.map_err(bad_payload)?;
    validate_jobs(std::slice::from_ref(&job))?;
    reset_to_pending(&mut job);

    state.reconciler.create_jobs(std::slice::from_ref(&job)).await?;
    state.store.upsert_jobs(vec![job.clone()]).await;

    info!(job_id = job.id, job = %job.name, "job submitted");
    Ok((StatusCode::CREATED, ApiResponse::ok(job)))
}

/// POST /schedule-pods
///
/// Accepts a batch, runs scheduling passes until none of it is Pending,
/// binds the scheduled jobs in the orchestrator, waits for placement and
/// returns the final records.
pub async fn schedule_jobs(
    State(state): State<ApiState>,
    payload: Result<Json<Vec<Job>>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(mut jobs) = payload.map_err(bad_payload)?;
    validate_jobs(&jobs)?;
    jobs.iter_mut().for_each(reset_to_pending);

    state.reconciler.create_jobs(&jobs).await?;
    let ids = state.store.upsert_jobs(jobs).await;

    let budget = state.budgets.jobs;
    let outcome = await_convergence(
        || {
            let engine = state.engine.clone();
            let ids = ids.clone();
            async move {
                engine.run_pass().await;
                let batch = engine.store().jobs_by_ids(&ids).await;
                Ok::<_, Infallible>(batch.iter().all(|j| j.status() != JobStatus::Pending))
            }
        },
        budget,
    )
    .await;

    match outcome {
        Ok(Convergence::Converged { .. }) => {}
        Ok(Convergence::TimedOut { attempts }) => {
            state.metrics.record_convergence_timeout();
            let outstanding: Vec<JobId> = state
                .store
                .jobs_by_ids(&ids)
                .await
                .iter()
                .filter(|j| j.status() == JobStatus::Pending)
                .map(|j| j.id)
                .collect();
            warn!(attempts, ?outstanding, "jobs still pending after scheduling budget");
            return Err(ApiError::Timeout {
                target: "jobs scheduled",
                attempts,
                outstanding,
            });
        }
        Err(never) => match never {},
    }

    let mut bound = Vec::new();
    for job in state.store.jobs_by_ids(&ids).await {
        if job.status() != JobStatus::Scheduled {
            continue;
        }
        if let Some(node_name) = job.node_name.as_deref() {
            state.reconciler.bind_job(job.id, node_name).await?;
            bound.push(job.id);
        }
    }
    state.reconciler.await_jobs_placed(&bound, budget).await?;

    let records = state.store.jobs_by_ids(&ids).await;
    let unschedulable = records
        .iter()
        .filter(|j| j.status() == JobStatus::Unschedulable)
        .count();
    info!(
        submitted = ids.len(),
        placed = bound.len(),
        unschedulable,
        "batch scheduled"
    );
    Ok(ApiResponse::ok(records))
}

/// GET /pods/{id}/status
pub async fn job_status(
    State(state): State<ApiState>,
    Path(id): Path<JobId>,
) -> ApiResult<impl IntoResponse> {
    let job = state.store.get_job(id).await?;
    Ok(ApiResponse::ok(job))
}

/// DELETE /pods/{id}
pub async fn delete_job(
    State(state): State<ApiState>,
    Path(id): Path<JobId>,
) -> ApiResult<impl IntoResponse> {
    state.store.get_job(id).await?;
    state.reconciler.delete_job(id).await?;
    state.store.remove_job(id).await;
    Ok(ApiResponse::ok("deleted"))
}

/// DELETE /pods/delete-all
pub async fn delete_all_jobs(State(state): State<ApiState>) -> ApiResult<impl IntoResponse> {
    let orchestrator = state.reconciler.delete_all_jobs().await?;
    let store = state.store.clear_jobs().await;
    Ok(ApiResponse::ok(Cleared {
        orchestrator,
        store,
    }))
}

// ── Prometheus ─────────────────────────────────────────────────

/// GET /metrics
pub async fn prometheus_metrics(State(state): State<ApiState>) -> impl IntoResponse {
    let counts = state.store.counts().await;
    let body = simbridge_metrics::render_prometheus(&state.metrics.snapshot(), &counts);
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
}
