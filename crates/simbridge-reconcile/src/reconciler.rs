//! Reconciler: drives the orchestrator toward the desired state.
//!
//! Every gateway failure is counted in [`BridgeMetrics`] and surfaced as
//! [`ReconcileError::Gateway`]; every exhausted convergence budget is
//! counted and surfaced as [`ReconcileError::TimedOut`] with the ids that
//! were still outstanding.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use simbridge_metrics::BridgeMetrics;
use simbridge_state::{Job, JobId, Node, NodeId};

use crate::differ::{NodeDiff, diff};
use crate::error::{GatewayError, ReconcileError, ReconcileResult};
use crate::gateway::{GatewayFuture, OrchestratorGateway};
use crate::poller::{Convergence, ConvergenceBudget, await_convergence};

/// What one reconciliation applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub deleted: usize,
    pub upserted: usize,
}

/// A reconciliation step already applied to the orchestrator.
#[derive(Debug)]
enum AppliedStep {
    Deleted(Node),
    Upserted { id: NodeId, previous: Option<Node> },
}

type ReadinessCheck = for<'a> fn(&'a dyn OrchestratorGateway, i64) -> GatewayFuture<'a, bool>;

fn node_ready(gateway: &dyn OrchestratorGateway, id: NodeId) -> GatewayFuture<'_, bool> {
    gateway.is_node_ready(id)
}

fn job_placed(gateway: &dyn OrchestratorGateway, id: JobId) -> GatewayFuture<'_, bool> {
    gateway.is_job_placed(id)
}

/// Applies desired state through an [`OrchestratorGateway`].
pub struct Reconciler {
    gateway: Arc<dyn OrchestratorGateway>,
    metrics: Arc<BridgeMetrics>,
    namespace: String,
}

impl Reconciler {
    pub fn new(
        gateway: Arc<dyn OrchestratorGateway>,
        metrics: Arc<BridgeMetrics>,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            gateway,
            metrics,
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Bring the orchestrator's node set in line with `desired`.
    ///
    /// Deletions are applied before upserts. If listing the observed nodes
    /// fails nothing is applied. If a later delete or upsert fails, the
    /// steps already applied are undone in reverse order before the error
    /// is returned, so the orchestrator is left with the node set it had.
    pub async fn reconcile(&self, desired: &[Node]) -> ReconcileResult<ReconcileReport> {
        let observed = self.gateway_call(self.gateway.list_nodes().await)?;
        let plan = diff(desired, &observed);

        if plan.is_empty() {
            debug!(nodes = desired.len(), "node set already converged");
            return Ok(ReconcileReport::default());
        }

        let mut applied = Vec::with_capacity(plan.to_delete.len() + plan.to_upsert.len());
        if let Err(e) = self.apply(&plan, &observed, &mut applied).await {
            self.roll_back(applied).await;
            return Err(self.gateway_failure(e));
        }

        let report = ReconcileReport {
            deleted: plan.to_delete.len(),
            upserted: plan.to_upsert.len(),
        };
        info!(
            deleted = report.deleted,
            upserted = report.upserted,
            "node set reconciled"
        );
        Ok(report)
    }

    async fn apply(
        &self,
        plan: &NodeDiff,
        observed: &[Node],
        applied: &mut Vec<AppliedStep>,
    ) -> Result<(), GatewayError> {
        for node in &plan.to_delete {
            self.gateway.delete_node(node.id).await?;
            debug!(node_id = node.id, name = %node.name, "node deleted");
            applied.push(AppliedStep::Deleted(node.clone()));
        }
        for node in &plan.to_upsert {
            self.gateway.create_node(node).await?;
            debug!(node_id = node.id, name = %node.name, "node upserted");
            let previous = observed.iter().find(|o| o.id == node.id).cloned();
            applied.push(AppliedStep::Upserted {
                id: node.id,
                previous,
            });
        }
        Ok(())
    }

    /// Undo applied steps, newest first. Best effort: a step that cannot
    /// be undone is logged and the rest are still attempted.
    async fn roll_back(&self, applied: Vec<AppliedStep>) {
        let steps = applied.len();
        let mut failed = 0usize;
        for step in applied.into_iter().rev() {
            let result = match &step {
                AppliedStep::Deleted(node) => self.gateway.create_node(node).await,
                AppliedStep::Upserted {
                    previous: Some(node),
                    ..
                } => self.gateway.create_node(node).await,
                AppliedStep::Upserted { id, previous: None } => {
                    self.gateway.delete_node(*id).await
                }
            };
            if let Err(e) = result {
                failed += 1;
                error!(error = %e, ?step, "could not undo reconciliation step");
            }
        }
        if failed == 0 {
            info!(steps, "partial reconciliation rolled back");
        } else {
            self.metrics.record_gateway_failure();
            error!(steps, failed, "partial reconciliation left in place");
        }
    }

    /// Wait until every node in `ids` reports ready. Returns the attempts used.
    pub async fn await_nodes_ready(
        &self,
        ids: &[NodeId],
        budget: ConvergenceBudget,
    ) -> ReconcileResult<u32> {
        self.await_all("nodes ready", ids, budget, node_ready).await
    }

    /// Wait until every job in `ids` is placed. Returns the attempts used.
    pub async fn await_jobs_placed(
        &self,
        ids: &[JobId],
        budget: ConvergenceBudget,
    ) -> ReconcileResult<u32> {
        self.await_all("jobs placed", ids, budget, job_placed).await
    }

    pub async fn create_jobs(&self, jobs: &[Job]) -> ReconcileResult<()> {
        for job in jobs {
            self.gateway_call(self.gateway.create_job(job).await)?;
        }
        debug!(count = jobs.len(), "jobs created in orchestrator");
        Ok(())
    }

    pub async fn bind_job(&self, id: JobId, node_name: &str) -> ReconcileResult<()> {
        self.gateway_call(self.gateway.bind_job(id, node_name).await)?;
        debug!(job_id = id, node = %node_name, "job bound");
        Ok(())
    }

    pub async fn delete_job(&self, id: JobId) -> ReconcileResult<()> {
        self.gateway_call(self.gateway.delete_job(id).await)?;
        Ok(())
    }

    /// Delete every job in this reconciler's namespace. Returns how many.
    pub async fn delete_all_jobs(&self) -> ReconcileResult<usize> {
        let jobs = self.gateway_call(self.gateway.list_jobs(&self.namespace).await)?;
        for job in &jobs {
            self.gateway_call(self.gateway.delete_job(job.id).await)?;
        }
        info!(count = jobs.len(), namespace = %self.namespace, "all jobs deleted");
        Ok(jobs.len())
    }

    /// Delete every node the orchestrator knows. Returns how many.
    pub async fn delete_all_nodes(&self) -> ReconcileResult<usize> {
        let nodes = self.gateway_call(self.gateway.list_nodes().await)?;
        for node in &nodes {
            self.gateway_call(self.gateway.delete_node(node.id).await)?;
        }
        info!(count = nodes.len(), "all nodes deleted");
        Ok(nodes.len())
    }

    async fn await_all(
        &self,
        target: &'static str,
        ids: &[i64],
        budget: ConvergenceBudget,
        check: ReadinessCheck,
    ) -> ReconcileResult<u32> {
        if ids.is_empty() {
            return Ok(0);
        }

        // Shrinks as ids converge, so only stragglers are re-checked.
        let remaining = Arc::new(Mutex::new(ids.to_vec()));
        let gateway = self.gateway.clone();

        let outcome = await_convergence(
            {
                let remaining = remaining.clone();
                move || {
                    let gateway = gateway.clone();
                    let remaining = remaining.clone();
                    async move {
                        let mut remaining = remaining.lock().await;
                        let mut still_waiting = Vec::with_capacity(remaining.len());
                        for &id in remaining.iter() {
                            if !check(gateway.as_ref(), id).await? {
                                still_waiting.push(id);
                            }
                        }
                        *remaining = still_waiting;
                        Ok::<_, GatewayError>(remaining.is_empty())
                    }
                }
            },
            budget,
        )
        .await;

        match outcome {
            Ok(Convergence::Converged { attempts }) => {
                debug!(target, attempts, count = ids.len(), "converged");
                Ok(attempts)
            }
            Ok(Convergence::TimedOut { attempts }) => {
                self.metrics.record_convergence_timeout();
                let outstanding = remaining.lock().await.clone();
                warn!(target, attempts, ?outstanding, "convergence timed out");
                Err(ReconcileError::TimedOut {
                    target,
                    attempts,
                    outstanding,
                })
            }
            Err(e) => Err(self.gateway_failure(e)),
        }
    }

    fn gateway_call<T>(&self, result: Result<T, GatewayError>) -> ReconcileResult<T> {
        result.map_err(|e| self.gateway_failure(e))
    }

    fn gateway_failure(&self, e: GatewayError) -> ReconcileError {
        warn!(error = %e, "orchestrator call failed");
        self.metrics.record_gateway_failure();
        ReconcileError::Gateway(e)
    }
}
