//! ClusterStateStore: the in-memory registry of nodes and jobs.
//!
//! One `RwLock` guards both collections. Node replacement swaps the whole
//! map under the exclusive lock, so a reader sees either the old node set
//! or the new one, never a mix. Maps are `BTreeMap`s keyed by id, which
//! gives snapshots a stable id order.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{StateError, StateResult};
use crate::types::*;

#[derive(Debug, Default)]
struct Inner {
    nodes: BTreeMap<NodeId, Node>,
    jobs: BTreeMap<JobId, Job>,
    revisions: BTreeMap<JobId, Revision>,
    last_revision: u64,
}

/// Collection sizes at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StoreCounts {
    pub nodes: usize,
    pub pending: usize,
    pub scheduled: usize,
    pub unschedulable: usize,
}

/// Thread-safe cluster state shared by the API handlers and the scheduler.
#[derive(Clone, Default)]
pub struct ClusterStateStore {
    inner: Arc<RwLock<Inner>>,
}

impl ClusterStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Nodes ──────────────────────────────────────────────────────

    /// Replace the entire node set. Returns the new node count.
    ///
    /// A later entry with a repeated id overwrites an earlier one; callers
    /// that need strictness run [`validate_nodes`](crate::validate_nodes) first.
    pub async fn upsert_nodes(&self, nodes: Vec<Node>) -> usize {
        let replacement: BTreeMap<NodeId, Node> =
            nodes.into_iter().map(|node| (node.id, node)).collect();
        let count = replacement.len();

        let mut inner = self.inner.write().await;
        inner.nodes = replacement;
        drop(inner);

        debug!(count, "node set replaced");
        count
    }

    /// Copy of the current node set, ordered by id.
    pub async fn snapshot_nodes(&self) -> Vec<Node> {
        let inner = self.inner.read().await;
        inner.nodes.values().cloned().collect()
    }

    /// Drop every node. Returns how many were removed.
    pub async fn clear_nodes(&self) -> usize {
        let mut inner = self.inner.write().await;
        let removed = inner.nodes.len();
        inner.nodes.clear();
        removed
    }

    // ── Jobs ───────────────────────────────────────────────────────

    /// Merge jobs by id, overwriting any prior record. A job without an
    /// explicit status is stored as `Pending`, and a job that is not
    /// `Scheduled` is stored without an assignment. Each stored record gets
    /// a new [`Revision`]. Returns the ids in input order.
    pub async fn upsert_jobs(&self, jobs: Vec<Job>) -> Vec<JobId> {
        let mut ids = Vec::with_capacity(jobs.len());
        let mut inner = self.inner.write().await;
        for mut job in jobs {
            let status = *job.status.get_or_insert(JobStatus::Pending);
            if status != JobStatus::Scheduled {
                job.node_id = None;
                job.node_name = None;
            }
            inner.last_revision += 1;
            let revision = Revision(inner.last_revision);
            inner.revisions.insert(job.id, revision);
            ids.push(job.id);
            inner.jobs.insert(job.id, job);
        }
        drop(inner);

        debug!(count = ids.len(), "jobs upserted");
        ids
    }

    /// Look up a single job.
    pub async fn get_job(&self, id: JobId) -> StateResult<Job> {
        let inner = self.inner.read().await;
        inner.jobs.get(&id).cloned().ok_or(StateError::JobNotFound(id))
    }

    /// Every job, ordered by id.
    pub async fn list_jobs(&self) -> Vec<Job> {
        let inner = self.inner.read().await;
        inner.jobs.values().cloned().collect()
    }

    /// The jobs with the given ids, in the given order. Unknown ids are skipped.
    pub async fn jobs_by_ids(&self, ids: &[JobId]) -> Vec<Job> {
        let inner = self.inner.read().await;
        ids.iter().filter_map(|id| inner.jobs.get(id).cloned()).collect()
    }

    /// Snapshot of the jobs currently waiting for placement.
    pub async fn pending_jobs(&self) -> Vec<Job> {
        let inner = self.inner.read().await;
        inner
            .jobs
            .values()
            .filter(|job| job.status() == JobStatus::Pending)
            .cloned()
            .collect()
    }

    /// Pending jobs with the revision each was read at.
    pub async fn pending_snapshot(&self) -> Vec<PendingJob> {
        let inner = self.inner.read().await;
        inner
            .jobs
            .values()
            .filter(|job| job.status() == JobStatus::Pending)
            .filter_map(|job| {
                let revision = *inner.revisions.get(&job.id)?;
                Some(PendingJob {
                    job: job.clone(),
                    revision,
                })
            })
            .collect()
    }

    /// Record the result of a scheduling attempt. Together with
    /// [`set_job_outcome_at`](Self::set_job_outcome_at) this is the only
    /// way status and assignment fields change after submission.
    pub async fn set_job_outcome(&self, id: JobId, outcome: JobOutcome) -> StateResult<()> {
        let mut inner = self.inner.write().await;
        let job = inner.jobs.get_mut(&id).ok_or(StateError::JobNotFound(id))?;
        Self::apply_outcome(job, outcome);
        Ok(())
    }

    /// Like [`set_job_outcome`](Self::set_job_outcome), but only if the job
    /// is still at `revision`. A resubmitted job fails with
    /// [`StateError::Superseded`] and keeps its new record.
    pub async fn set_job_outcome_at(
        &self,
        id: JobId,
        revision: Revision,
        outcome: JobOutcome,
    ) -> StateResult<()> {
        let mut inner = self.inner.write().await;
        let inner = &mut *inner;
        let job = inner.jobs.get_mut(&id).ok_or(StateError::JobNotFound(id))?;
        if inner.revisions.get(&id) != Some(&revision) {
            return Err(StateError::Superseded(id));
        }
        Self::apply_outcome(job, outcome);
        Ok(())
    }

    fn apply_outcome(job: &mut Job, outcome: JobOutcome) {

        job.status = Some(outcome.status());
        match outcome {
            JobOutcome::Scheduled { node_id, node_name } => {
                job.node_id = Some(node_id);
                job.node_name = Some(node_name);
            }
            JobOutcome::Unschedulable => {
                job.node_id = None;
                job.node_name = None;
            }
        }
    }

    /// Remove one job. Returns true if it existed.
    pub async fn remove_job(&self, id: JobId) -> bool {
        let mut inner = self.inner.write().await;
        let existed = inner.jobs.remove(&id).is_some();
        inner.revisions.remove(&id);
        debug!(job_id = id, existed, "job removed");
        existed
    }

    /// Drop every job. Returns how many were removed.
    pub async fn clear_jobs(&self) -> usize {
        let mut inner = self.inner.write().await;
        let removed = inner.jobs.len();
        inner.jobs.clear();
        inner.revisions.clear();
        removed
    }

    /// Node count and job counts per status.
    pub async fn counts(&self) -> StoreCounts {
        let inner = self.inner.read().await;
        let mut counts = StoreCounts {
            nodes: inner.nodes.len(),
            ..StoreCounts::default()
        };
        for job in inner.jobs.values() {
            match job.status() {
                JobStatus::Pending => counts.pending += 1,
                JobStatus::Scheduled => counts.scheduled += 1,
                JobStatus::Unschedulable => counts.unschedulable += 1,
            }
        }
        counts
    }
}
