//! In-memory simulated orchestrator.
//!
//! Nodes report ready after a configurable number of readiness polls, and
//! jobs count as placed once bound to a node that exists. Individual
//! operations can be made to fail so callers can exercise their error
//! paths.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use simbridge_state::{Job, JobId, Node, NodeId};

use crate::error::{GatewayError, GatewayResult};
use crate::gateway::{GatewayFuture, OrchestratorGateway};

/// Gateway operations that can have failures injected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatewayOp {
    ListNodes,
    ListJobs,
    CreateNode,
    DeleteNode,
    CreateJob,
    DeleteJob,
    BindJob,
    Readiness,
}

struct SimNode {
    node: Node,
    readiness_polls: u32,
}

struct SimJob {
    job: Job,
    namespace: String,
    bound_to: Option<String>,
}

#[derive(Default)]
struct SimState {
    nodes: BTreeMap<NodeId, SimNode>,
    jobs: BTreeMap<JobId, SimJob>,
    failing: HashSet<GatewayOp>,
    /// Successes left before a single injected failure.
    fail_once_after: HashMap<GatewayOp, u32>,
}

/// Orchestrator simulated in process memory.
#[derive(Clone)]
pub struct InMemoryGateway {
    state: Arc<RwLock<SimState>>,
    namespace: String,
    ready_after_polls: u32,
}

impl InMemoryGateway {
    /// Jobs are created in `namespace`; nodes report ready on the
    /// `ready_after_polls`-th readiness check (0 or 1 means immediately).
    pub fn new(namespace: impl Into<String>, ready_after_polls: u32) -> Self {
        Self {
            state: Arc::new(RwLock::new(SimState::default())),
            namespace: namespace.into(),
            ready_after_polls,
        }
    }

    /// Make every future call of `op` fail until cleared.
    pub async fn inject_failure(&self, op: GatewayOp) {
        self.state.write().await.failing.insert(op);
    }

    /// Let `op` succeed `after` more times, then fail exactly once.
    pub async fn inject_one_failure(&self, op: GatewayOp, after: u32) {
        self.state.write().await.fail_once_after.insert(op, after);
    }

    pub async fn clear_failures(&self) {
        let mut state = self.state.write().await;
        state.failing.clear();
        state.fail_once_after.clear();
    }

    /// Names of the nodes currently present, ordered by id.
    pub async fn node_names(&self) -> Vec<String> {
        let state = self.state.read().await;
        state.nodes.values().map(|n| n.node.name.clone()).collect()
    }

    /// Node a job is bound to, if any.
    pub async fn binding(&self, id: JobId) -> Option<String> {
        let state = self.state.read().await;
        state.jobs.get(&id).and_then(|j| j.bound_to.clone())
    }

    pub async fn job_count(&self) -> usize {
        self.state.read().await.jobs.len()
    }

    fn check(state: &mut SimState, op: GatewayOp) -> GatewayResult<()> {
        let injected = Err(GatewayError::Unavailable(format!("injected failure for {op:?}")));
        if state.failing.contains(&op) {
            return injected;
        }
        match state.fail_once_after.get_mut(&op) {
            Some(0) => {
                state.fail_once_after.remove(&op);
                injected
            }
            Some(left) => {
                *left -= 1;
                Ok(())
            }
            None => Ok(()),
        }
    }
}

impl Default for InMemoryGateway {
    fn default() -> Self {
        Self::new("default", 1)
    }
}

impl OrchestratorGateway for InMemoryGateway {
    fn list_nodes(&self) -> GatewayFuture<'_, Vec<Node>> {
        Box::pin(async move {
            let mut state = self.state.write().await;
            Self::check(&mut state, GatewayOp::ListNodes)?;
            Ok(state.nodes.values().map(|n| n.node.clone()).collect())
        })
    }

    fn list_jobs<'a>(&'a self, namespace: &'a str) -> GatewayFuture<'a, Vec<Job>> {
        Box::pin(async move {
            let mut state = self.state.write().await;
            Self::check(&mut state, GatewayOp::ListJobs)?;
            Ok(state
                .jobs
                .values()
                .filter(|j| j.namespace == namespace)
                .map(|j| j.job.clone())
                .collect())
        })
    }

    fn create_node<'a>(&'a self, node: &'a Node) -> GatewayFuture<'a, ()> {
        Box::pin(async move {
            let mut state = self.state.write().await;
            Self::check(&mut state, GatewayOp::CreateNode)?;
            state
                .nodes
                .entry(node.id)
                .and_modify(|existing| existing.node = node.clone())
                .or_insert_with(|| SimNode {
                    node: node.clone(),
                    readiness_polls: 0,
                });
            debug!(node_id = node.id, name = %node.name, "simulated node applied");
            Ok(())
        })
    }

    fn delete_node(&self, id: NodeId) -> GatewayFuture<'_, ()> {
        Box::pin(async move {
            let mut state = self.state.write().await;
            Self::check(&mut state, GatewayOp::DeleteNode)?;
            state.nodes.remove(&id);
            Ok(())
        })
    }

    fn create_job<'a>(&'a self, job: &'a Job) -> GatewayFuture<'a, ()> {
        Box::pin(async move {
            let mut state = self.state.write().await;
            Self::check(&mut state, GatewayOp::CreateJob)?;
            state.jobs.insert(
                job.id,
                SimJob {
                    job: job.clone(),
                    namespace: self.namespace.clone(),
                    bound_to: None,
                },
            );
            Ok(())
        })
    }

    fn delete_job(&self, id: JobId) -> GatewayFuture<'_, ()> {
        Box::pin(async move {
            let mut state = self.state.write().await;
            Self::check(&mut state, GatewayOp::DeleteJob)?;
            state.jobs.remove(&id);
            Ok(())
        })
    }

    fn bind_job<'a>(&'a self, id: JobId, node_name: &'a str) -> GatewayFuture<'a, ()> {
        Box::pin(async move {
            let mut state = self.state.write().await;
            Self::check(&mut state, GatewayOp::BindJob)?;
            if !state.nodes.values().any(|n| n.node.name == node_name) {
                return Err(GatewayError::NotFound {
                    kind: "node",
                    id: node_name.to_string(),
                });
            }
            let job = state.jobs.get_mut(&id).ok_or_else(|| GatewayError::NotFound {
                kind: "job",
                id: id.to_string(),
            })?;
            job.bound_to = Some(node_name.to_string());
            job.job.node_name = Some(node_name.to_string());
            Ok(())
        })
    }

    fn is_node_ready(&self, id: NodeId) -> GatewayFuture<'_, bool> {
        Box::pin(async move {
            let mut state = self.state.write().await;
            Self::check(&mut state, GatewayOp::Readiness)?;
            let Some(node) = state.nodes.get_mut(&id) else {
                return Ok(false);
            };
            node.readiness_polls = node.readiness_polls.saturating_add(1);
            Ok(node.readiness_polls >= self.ready_after_polls)
        })
    }

    fn is_job_placed(&self, id: JobId) -> GatewayFuture<'_, bool> {
        Box::pin(async move {
            let mut state = self.state.write().await;
            Self::check(&mut state, GatewayOp::Readiness)?;
            let Some(job) = state.jobs.get(&id) else {
                return Ok(false);
            };
            Ok(job
                .bound_to
                .as_ref()
                .is_some_and(|name| state.nodes.values().any(|n| &n.node.name == name)))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vm(id: NodeId) -> Node {
        Node::new(id, format!("vm-{id}"), 1000, 1024)
    }

    #[tokio::test]
    async fn create_node_replaces_existing() {
        let gw = InMemoryGateway::default();
        gw.create_node(&vm(1)).await.unwrap();

        let mut bigger = vm(1);
        bigger.mips_available = 9000;
        gw.create_node(&bigger).await.unwrap();

        let nodes = gw.list_nodes().await.unwrap();
        assert_eq!(nodes, vec![bigger]);
    }

    #[tokio::test]
    async fn node_becomes_ready_after_polls() {
        let gw = InMemoryGateway::new("default", 3);
        gw.create_node(&vm(1)).await.unwrap();

        assert!(!gw.is_node_ready(1).await.unwrap());
        assert!(!gw.is_node_ready(1).await.unwrap());
        assert!(gw.is_node_ready(1).await.unwrap());
        assert!(!gw.is_node_ready(99).await.unwrap());
    }

    #[tokio::test]
    async fn deleting_unknown_objects_is_a_noop() {
        let gw = InMemoryGateway::default();
        gw.delete_node(42).await.unwrap();
        gw.delete_job(42).await.unwrap();
    }

    #[tokio::test]
    async fn job_is_placed_once_bound_to_existing_node() {
        let gw = InMemoryGateway::default();
        gw.create_node(&vm(1)).await.unwrap();
        gw.create_job(&Job::new(7, "cloudlet-7", 10, 10)).await.unwrap();

        assert!(!gw.is_job_placed(7).await.unwrap());
        gw.bind_job(7, "vm-1").await.unwrap();
        assert!(gw.is_job_placed(7).await.unwrap());
        assert_eq!(gw.binding(7).await.as_deref(), Some("vm-1"));

        gw.delete_node(1).await.unwrap();
        assert!(!gw.is_job_placed(7).await.unwrap());
    }

    #[tokio::test]
    async fn bind_rejects_unknown_targets() {
        let gw = InMemoryGateway::default();
        gw.create_node(&vm(1)).await.unwrap();

        let err = gw.bind_job(7, "vm-1").await.unwrap_err();
        assert!(matches!(err, GatewayError::NotFound { kind: "job", .. }));

        gw.create_job(&Job::new(7, "cloudlet-7", 10, 10)).await.unwrap();
        let err = gw.bind_job(7, "vm-9").await.unwrap_err();
        assert!(matches!(err, GatewayError::NotFound { kind: "node", .. }));
    }

    #[tokio::test]
    async fn jobs_are_listed_by_namespace() {
        let gw = InMemoryGateway::new("sim", 1);
        gw.create_job(&Job::new(1, "a", 1, 1)).await.unwrap();

        assert_eq!(gw.list_jobs("sim").await.unwrap().len(), 1);
        assert!(gw.list_jobs("default").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn injected_failures_until_cleared() {
        let gw = InMemoryGateway::default();
        gw.inject_failure(GatewayOp::ListNodes).await;

        assert!(matches!(gw.list_nodes().await, Err(GatewayError::Unavailable(_))));
        gw.create_node(&vm(1)).await.unwrap();

        gw.clear_failures().await;
        assert_eq!(gw.list_nodes().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn one_failure_after_successes() {
        let gw = InMemoryGateway::default();
        gw.inject_one_failure(GatewayOp::CreateNode, 1).await;

        gw.create_node(&vm(1)).await.unwrap();
        assert!(gw.create_node(&vm(2)).await.is_err());
        gw.create_node(&vm(2)).await.unwrap();
        assert_eq!(gw.node_names().await, vec!["vm-1", "vm-2"]);
    }
}
