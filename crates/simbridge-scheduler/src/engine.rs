//! Scheduling engine: runs passes over the Pending jobs.
//!
//! A pass snapshots the Pending jobs once, then resolves each one
//! independently: a job either lands on a node (Scheduled), is proven
//! unplaceable (Unschedulable), or is deferred to the next pass because
//! the extender could not be consulted. Passes are serialized by an
//! internal mutex, so the ticker and on-submit triggers never overlap.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, watch};
use tracing::{debug, info, warn};

use simbridge_extender::{Extender, ExtenderPhase};
use simbridge_metrics::BridgeMetrics;
use simbridge_state::{ClusterStateStore, JobId, JobOutcome, NodeId, PendingJob, StateError};

use crate::error::{SchedulerError, SchedulerResult};
use crate::selector;

/// Why a job could not be placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnschedulableReason {
    /// The node set was empty.
    NoNodes,
    /// The extender filtered out every node.
    NoneFiltered,
    /// No priority entry named a filtered node.
    NoPriorityMatch,
}

/// What a pass decided for one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Scheduled { node_id: NodeId, node_name: String },
    Unschedulable(UnschedulableReason),
    /// The extender call for this phase failed; the job stays Pending.
    Deferred(ExtenderPhase),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobReport {
    pub job_id: JobId,
    pub decision: Decision,
}

/// Summary of one scheduling pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    pub jobs: Vec<JobReport>,
}

impl PassReport {
    pub fn scheduled(&self) -> usize {
        self.count(|d| matches!(d, Decision::Scheduled { .. }))
    }

    pub fn unschedulable(&self) -> usize {
        self.count(|d| matches!(d, Decision::Unschedulable(_)))
    }

    pub fn deferred(&self) -> usize {
        self.count(|d| matches!(d, Decision::Deferred(_)))
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    fn count(&self, pred: impl Fn(&Decision) -> bool) -> usize {
        self.jobs.iter().filter(|r| pred(&r.decision)).count()
    }
}

/// Places Pending jobs onto nodes using an extender.
pub struct SchedulingEngine {
    store: ClusterStateStore,
    extender: Arc<dyn Extender>,
    metrics: Arc<BridgeMetrics>,
    pass_lock: Mutex<()>,
}

impl SchedulingEngine {
    pub fn new(
        store: ClusterStateStore,
        extender: Arc<dyn Extender>,
        metrics: Arc<BridgeMetrics>,
    ) -> Self {
        Self {
            store,
            extender,
            metrics,
            pass_lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &ClusterStateStore {
        &self.store
    }

    pub fn metrics(&self) -> &Arc<BridgeMetrics> {
        &self.metrics
    }

    /// Run a pass, waiting for any in-flight pass to finish first.
    pub async fn run_pass(&self) -> PassReport {
        let _guard = self.pass_lock.lock().await;
        self.pass().await
    }

    /// Run a pass unless one is already in flight, in which case the
    /// trigger is dropped and `None` is returned.
    pub async fn try_run_pass(&self) -> Option<PassReport> {
        let Ok(_guard) = self.pass_lock.try_lock() else {
            debug!("scheduling pass already running, skipping trigger");
            return None;
        };
        Some(self.pass().await)
    }

    /// Trigger [`try_run_pass`](Self::try_run_pass) every `interval` until
    /// `shutdown` changes.
    pub async fn run_ticker(&self, interval: Duration, mut shutdown: watch::Receiver<bool>) {
        info!(interval_ms = interval.as_millis() as u64, "scheduling ticker started");

        loop {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {
                    if let Some(report) = self.try_run_pass().await {
                        debug!(jobs = report.jobs.len(), "ticker pass complete");
                    }
                }
                _ = shutdown.changed() => {
                    info!("scheduling ticker shutting down");
                    break;
                }
            }
        }
    }

    async fn pass(&self) -> PassReport {
        let pending = self.store.pending_snapshot().await;
        let mut report = PassReport::default();

        for pending_job in &pending {
            let job = &pending_job.job;
            match self.schedule_job(pending_job).await {
                Ok(decision) => report.jobs.push(JobReport {
                    job_id: job.id,
                    decision,
                }),
                Err(SchedulerError::Extender(e)) => {
                    warn!(job_id = job.id, error = %e, "extender unavailable, job stays pending");
                    self.metrics.record_extender_failure(e.phase);
                    report.jobs.push(JobReport {
                        job_id: job.id,
                        decision: Decision::Deferred(e.phase),
                    });
                }
                Err(SchedulerError::State(StateError::JobNotFound(id))) => {
                    debug!(job_id = id, "job removed during pass");
                }
                Err(SchedulerError::State(StateError::Superseded(id))) => {
                    debug!(job_id = id, "job resubmitted during pass, decision dropped");
                }
                Err(SchedulerError::State(e)) => {
                    warn!(job_id = job.id, error = %e, "failed to record scheduling outcome");
                }
            }
        }

        self.metrics
            .record_pass(report.scheduled(), report.unschedulable(), report.deferred());
        if !report.is_empty() {
            info!(
                pending = pending.len(),
                scheduled = report.scheduled(),
                unschedulable = report.unschedulable(),
                deferred = report.deferred(),
                "scheduling pass complete"
            );
        }
        report
    }

    async fn schedule_job(&self, pending: &PendingJob) -> SchedulerResult<Decision> {
        let job = &pending.job;
        let nodes = self.store.snapshot_nodes().await;
        if nodes.is_empty() {
            return self
                .mark_unschedulable(pending, UnschedulableReason::NoNodes)
                .await;
        }

        let filtered = self.extender.filter(job, &nodes).await?;
        if filtered.is_empty() {
            return self
                .mark_unschedulable(pending, UnschedulableReason::NoneFiltered)
                .await;
        }

        let priorities = self.extender.prioritize(job, &filtered).await?;
        let Some(node) = selector::select(&filtered, &priorities) else {
            return self
                .mark_unschedulable(pending, UnschedulableReason::NoPriorityMatch)
                .await;
        };

        self.store
            .set_job_outcome_at(
                job.id,
                pending.revision,
                JobOutcome::Scheduled {
                    node_id: node.id,
                    node_name: node.name.clone(),
                },
            )
            .await?;
        info!(job_id = job.id, job = %job.name, node = %node.name, node_id = node.id, "job scheduled");

        Ok(Decision::Scheduled {
            node_id: node.id,
            node_name: node.name.clone(),
        })
    }

    async fn mark_unschedulable(
        &self,
        pending: &PendingJob,
        reason: UnschedulableReason,
    ) -> SchedulerResult<Decision> {
        let job = &pending.job;
        self.store
            .set_job_outcome_at(job.id, pending.revision, JobOutcome::Unschedulable)
            .await?;
        info!(job_id = job.id, job = %job.name, ?reason, "job unschedulable");
        Ok(Decision::Unschedulable(reason))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use simbridge_extender::{
        ExtenderCause, ExtenderError, ExtenderFuture, ExtenderResult, HostPriority,
        HostPriorityList,
    };
    use simbridge_state::{Job, JobStatus, Node};
    use tokio::sync::Notify;

    type FilterFn = Box<dyn Fn(&Job, &[Node]) -> ExtenderResult<Vec<Node>> + Send + Sync>;
    type PrioritizeFn = Box<dyn Fn(&Job, &[Node]) -> ExtenderResult<HostPriorityList> + Send + Sync>;

    /// Extender whose answers are fixed closures.
    struct Scripted {
        filter: FilterFn,
        prioritize: PrioritizeFn,
        filter_calls: AtomicUsize,
    }

    impl Scripted {
        fn new<F, P>(filter: F, prioritize: P) -> Arc<Self>
        where
            F: Fn(&Job, &[Node]) -> ExtenderResult<Vec<Node>> + Send + Sync + 'static,
            P: Fn(&Job, &[Node]) -> ExtenderResult<HostPriorityList> + Send + Sync + 'static,
        {
            Arc::new(Self {
                filter: Box::new(filter),
                prioritize: Box::new(prioritize),
                filter_calls: AtomicUsize::new(0),
            })
        }

        fn permissive(score: i64) -> Arc<Self> {
            Self::new(
                |_, nodes| Ok(nodes.to_vec()),
                move |_, nodes| {
                    Ok(nodes.iter().map(|n| HostPriority::new(n.name.clone(), score)).collect())
                },
            )
        }
    }

    impl Extender for Scripted {
        fn filter<'a>(&'a self, job: &'a Job, nodes: &'a [Node]) -> ExtenderFuture<'a, Vec<Node>> {
            self.filter_calls.fetch_add(1, Ordering::SeqCst);
            let result = (self.filter)(job, nodes);
            Box::pin(async move { result })
        }

        fn prioritize<'a>(
            &'a self,
            job: &'a Job,
            nodes: &'a [Node],
        ) -> ExtenderFuture<'a, HostPriorityList> {
            let result = (self.prioritize)(job, nodes);
            Box::pin(async move { result })
        }
    }

    fn transport_error(phase: ExtenderPhase) -> ExtenderError {
        ExtenderError::new(phase, ExtenderCause::Transport("connection refused".into()))
    }

    fn two_nodes() -> Vec<Node> {
        vec![Node::new(1, "vm-1", 4000, 8192), Node::new(2, "vm-2", 2000, 4096)]
    }

    async fn engine_with(extender: Arc<dyn Extender>, nodes: Vec<Node>, jobs: Vec<Job>) -> SchedulingEngine {
        let store = ClusterStateStore::new();
        store.upsert_nodes(nodes).await;
        store.upsert_jobs(jobs).await;
        SchedulingEngine::new(store, extender, Arc::new(BridgeMetrics::new()))
    }

    #[tokio::test]
    async fn highest_priority_node_is_chosen() {
        let extender = Scripted::new(
            |_, nodes| Ok(nodes.to_vec()),
            |_, _| Ok(vec![HostPriority::new("vm-1", 80), HostPriority::new("vm-2", 95)]),
        );
        let engine = engine_with(extender, two_nodes(), vec![Job::new(1, "cloudlet-1", 1000, 1024)]).await;

        let report = engine.run_pass().await;
        assert_eq!(report.scheduled(), 1);

        let job = engine.store().get_job(1).await.unwrap();
        assert_eq!(job.status(), JobStatus::Scheduled);
        assert_eq!(job.node_name.as_deref(), Some("vm-2"));
        assert_eq!(job.node_id, Some(2));
    }

    #[tokio::test]
    async fn empty_filter_result_is_unschedulable() {
        let extender = Scripted::new(
            |_, _| Ok(vec![]),
            |_, _| panic!("prioritize must not be called"),
        );
        let engine = engine_with(extender, two_nodes(), vec![Job::new(1, "cloudlet-1", 1000, 1024)]).await;

        let report = engine.run_pass().await;
        assert_eq!(
            report.jobs[0].decision,
            Decision::Unschedulable(UnschedulableReason::NoneFiltered)
        );

        let job = engine.store().get_job(1).await.unwrap();
        assert_eq!(job.status(), JobStatus::Unschedulable);
        assert!(job.node_name.is_none());
        assert!(job.node_id.is_none());
    }

    #[tokio::test]
    async fn filter_transport_error_leaves_job_pending() {
        let extender = Scripted::new(
            |_, _| Err(transport_error(ExtenderPhase::Filter)),
            |_, _| panic!("prioritize must not be called"),
        );
        let engine = engine_with(extender, two_nodes(), vec![Job::new(1, "cloudlet-1", 1000, 1024)]).await;

        let report = engine.run_pass().await;
        assert_eq!(report.jobs[0].decision, Decision::Deferred(ExtenderPhase::Filter));
        assert_eq!(engine.store().get_job(1).await.unwrap().status(), JobStatus::Pending);
        assert_eq!(engine.metrics().snapshot().filter_failures, 1);
    }

    #[tokio::test]
    async fn prioritize_error_leaves_job_pending() {
        let extender = Scripted::new(
            |_, nodes| Ok(nodes.to_vec()),
            |_, _| Err(transport_error(ExtenderPhase::Prioritize)),
        );
        let engine = engine_with(extender, two_nodes(), vec![Job::new(1, "cloudlet-1", 1000, 1024)]).await;

        let report = engine.run_pass().await;
        assert_eq!(report.deferred(), 1);
        assert_eq!(engine.store().get_job(1).await.unwrap().status(), JobStatus::Pending);
        assert_eq!(engine.metrics().snapshot().prioritize_failures, 1);
    }

    #[tokio::test]
    async fn empty_node_set_is_unschedulable_without_calling_extender() {
        let extender = Scripted::permissive(100);
        let engine = engine_with(
            extender.clone(),
            vec![],
            vec![Job::new(1, "a", 10, 10), Job::new(2, "b", 10, 10)],
        )
        .await;

        let report = engine.run_pass().await;
        assert_eq!(report.unschedulable(), 2);
        assert_eq!(extender.filter_calls.load(Ordering::SeqCst), 0);
        for id in [1, 2] {
            assert_eq!(engine.store().get_job(id).await.unwrap().status(), JobStatus::Unschedulable);
        }
    }

    #[tokio::test]
    async fn unmatched_priorities_are_unschedulable() {
        let extender = Scripted::new(
            |_, nodes| Ok(nodes.to_vec()),
            |_, _| Ok(vec![HostPriority::new("ghost", 100)]),
        );
        let engine = engine_with(extender, two_nodes(), vec![Job::new(1, "a", 10, 10)]).await;

        let report = engine.run_pass().await;
        assert_eq!(
            report.jobs[0].decision,
            Decision::Unschedulable(UnschedulableReason::NoPriorityMatch)
        );
    }

    #[tokio::test]
    async fn failures_are_independent_per_job() {
        let extender = Scripted::new(
            |job, nodes| {
                if job.id == 2 {
                    Err(transport_error(ExtenderPhase::Filter))
                } else {
                    Ok(nodes.to_vec())
                }
            },
            |_, nodes| Ok(vec![HostPriority::new(nodes[0].name.clone(), 1)]),
        );
        let jobs = vec![Job::new(1, "a", 1, 1), Job::new(2, "b", 1, 1), Job::new(3, "c", 1, 1)];
        let engine = engine_with(extender, two_nodes(), jobs).await;

        let report = engine.run_pass().await;
        assert_eq!(report.scheduled(), 2);
        assert_eq!(report.deferred(), 1);
        assert_eq!(engine.store().get_job(2).await.unwrap().status(), JobStatus::Pending);
    }

    #[tokio::test]
    async fn second_pass_skips_resolved_jobs() {
        let extender = Scripted::permissive(100);
        let engine = engine_with(extender.clone(), two_nodes(), vec![Job::new(1, "a", 1, 1)]).await;

        engine.run_pass().await;
        let calls_after_first = extender.filter_calls.load(Ordering::SeqCst);
        let second = engine.run_pass().await;

        assert!(second.is_empty());
        assert_eq!(extender.filter_calls.load(Ordering::SeqCst), calls_after_first);
        assert_eq!(engine.metrics().snapshot().passes, 2);
    }

    #[tokio::test]
    async fn deferred_job_is_retried_next_pass() {
        let fail_first = Arc::new(AtomicUsize::new(0));
        let counter = fail_first.clone();
        let extender = Scripted::new(
            move |_, nodes| {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(transport_error(ExtenderPhase::Filter))
                } else {
                    Ok(nodes.to_vec())
                }
            },
            |_, _| Ok(vec![HostPriority::new("vm-1", 10)]),
        );
        let engine = engine_with(extender, two_nodes(), vec![Job::new(1, "a", 1, 1)]).await;

        assert_eq!(engine.run_pass().await.deferred(), 1);
        assert_eq!(engine.run_pass().await.scheduled(), 1);
        assert_eq!(engine.store().get_job(1).await.unwrap().node_name.as_deref(), Some("vm-1"));
    }

    /// Extender that blocks inside `filter` until released.
    struct Gated {
        entered: Notify,
        release: Notify,
        filter_calls: AtomicUsize,
    }

    impl Gated {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                entered: Notify::new(),
                release: Notify::new(),
                filter_calls: AtomicUsize::new(0),
            })
        }
    }

    impl Extender for Gated {
        fn filter<'a>(&'a self, _job: &'a Job, nodes: &'a [Node]) -> ExtenderFuture<'a, Vec<Node>> {
            Box::pin(async move {
                self.filter_calls.fetch_add(1, Ordering::SeqCst);
                self.entered.notify_one();
                self.release.notified().await;
                Ok(nodes.to_vec())
            })
        }

        fn prioritize<'a>(
            &'a self,
            _job: &'a Job,
            nodes: &'a [Node],
        ) -> ExtenderFuture<'a, HostPriorityList> {
            Box::pin(async move { Ok(nodes.iter().map(|n| HostPriority::new(n.name.clone(), 1)).collect()) })
        }
    }

    #[tokio::test]
    async fn try_run_pass_skips_while_a_pass_is_running() {
        let gated = Gated::new();
        let engine = Arc::new(engine_with(gated.clone(), two_nodes(), vec![Job::new(1, "a", 1, 1)]).await);

        let running = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.run_pass().await })
        };
        gated.entered.notified().await;

        assert!(engine.try_run_pass().await.is_none());

        gated.release.notify_one();
        let report = running.await.unwrap();
        assert_eq!(report.scheduled(), 1);

        let after = engine.try_run_pass().await.unwrap();
        assert!(after.is_empty());
    }

    #[tokio::test]
    async fn blocking_passes_run_one_after_another() {
        let gated = Gated::new();
        let engine = Arc::new(engine_with(gated.clone(), two_nodes(), vec![Job::new(1, "a", 1, 1)]).await);

        let first = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.run_pass().await })
        };
        gated.entered.notified().await;

        engine.store().upsert_jobs(vec![Job::new(2, "b", 1, 1)]).await;
        let second = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.run_pass().await })
        };

        // The second pass is parked on the pass lock, not in the extender.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(gated.filter_calls.load(Ordering::SeqCst), 1);
        assert!(!second.is_finished());

        gated.release.notify_one();
        let first = first.await.unwrap();
        assert_eq!(first.jobs.len(), 1);
        assert_eq!(first.jobs[0].job_id, 1);

        gated.entered.notified().await;
        assert_eq!(gated.filter_calls.load(Ordering::SeqCst), 2);
        gated.release.notify_one();
        let second = second.await.unwrap();
        assert_eq!(second.jobs.len(), 1);
        assert_eq!(second.jobs[0].job_id, 2);
        assert_eq!(engine.store().counts().await.scheduled, 2);
    }

    #[tokio::test]
    async fn resubmission_during_pass_keeps_job_pending() {
        let gated = Gated::new();
        let engine = Arc::new(engine_with(gated.clone(), two_nodes(), vec![Job::new(1, "a", 1, 1)]).await);

        let running = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.run_pass().await })
        };
        gated.entered.notified().await;

        engine.store().upsert_jobs(vec![Job::new(1, "a-resubmitted", 2, 2)]).await;
        gated.release.notify_one();

        let report = running.await.unwrap();
        assert!(report.is_empty());
        let job = engine.store().get_job(1).await.unwrap();
        assert_eq!(job.status(), JobStatus::Pending);
        assert_eq!(job.node_name, None);

        // The next pass decides on the resubmitted record.
        gated.release.notify_one();
        assert_eq!(engine.run_pass().await.scheduled(), 1);
        assert_eq!(engine.store().get_job(1).await.unwrap().name, "a-resubmitted");
    }

    #[tokio::test(start_paused = true)]
    async fn ticker_schedules_until_shutdown() {
        let engine = Arc::new(engine_with(Scripted::permissive(100), two_nodes(), vec![]).await);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let ticker = {
            let engine = engine.clone();
            tokio::spawn(async move {
                engine.run_ticker(Duration::from_millis(500), shutdown_rx).await;
            })
        };

        engine.store().upsert_jobs(vec![Job::new(9, "late", 1, 1)]).await;
        tokio::time::sleep(Duration::from_millis(1200)).await;
        assert_eq!(engine.store().get_job(9).await.unwrap().status(), JobStatus::Scheduled);
        assert!(engine.metrics().snapshot().passes >= 2);

        shutdown_tx.send(true).unwrap();
        ticker.await.unwrap();
    }
}
