//! Orchestrator gateway: the seam to the downstream cluster.

use std::future::Future;
use std::pin::Pin;

use simbridge_state::{Job, JobId, Node, NodeId};

use crate::error::GatewayResult;

/// Boxed future alias for gateway calls.
pub type GatewayFuture<'a, T> = Pin<Box<dyn Future<Output = GatewayResult<T>> + Send + 'a>>;

/// CRUD and readiness queries against the orchestrator that actually
/// hosts nodes and jobs.
///
/// Deletes of unknown objects succeed, so callers can retry freely.
pub trait OrchestratorGateway: Send + Sync {
    fn list_nodes(&self) -> GatewayFuture<'_, Vec<Node>>;

    fn list_jobs<'a>(&'a self, namespace: &'a str) -> GatewayFuture<'a, Vec<Job>>;

    /// Create the node, or replace it if one with the same id exists.
    fn create_node<'a>(&'a self, node: &'a Node) -> GatewayFuture<'a, ()>;

    fn delete_node(&self, id: NodeId) -> GatewayFuture<'_, ()>;

    fn create_job<'a>(&'a self, job: &'a Job) -> GatewayFuture<'a, ()>;

    fn delete_job(&self, id: JobId) -> GatewayFuture<'_, ()>;

    /// Record the scheduling decision for a job in the orchestrator.
    fn bind_job<'a>(&'a self, id: JobId, node_name: &'a str) -> GatewayFuture<'a, ()>;

    fn is_node_ready(&self, id: NodeId) -> GatewayFuture<'_, bool>;

    fn is_job_placed(&self, id: JobId) -> GatewayFuture<'_, bool>;
}
