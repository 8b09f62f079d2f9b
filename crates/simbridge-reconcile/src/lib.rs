//! simbridge-reconcile: keeping the orchestrator in step with the store.
//!
//! The downstream orchestrator is reached through the
//! [`OrchestratorGateway`] trait. The [`Reconciler`] diffs the desired node
//! set against what the gateway reports, applies deletions then upserts,
//! and waits for the result to converge with a bounded poller.
//!
//! # Architecture
//!
//! ```text
//! Reconciler
//!   ├── reconcile(desired)
//!   │     ├── gateway.list_nodes()          (observe; failure applies nothing)
//!   │     ├── differ::diff(desired, observed)
//!   │     ├── gateway.delete_node() × to_delete
//!   │     └── gateway.create_node() × to_upsert
//!   ├── await_nodes_ready(ids, budget)  ─┐
//!   └── await_jobs_placed(ids, budget)  ─┴→ poller::await_convergence
//!
//! InMemoryGateway: simulated orchestrator with readiness delay and
//! failure injection
//! ```

pub mod differ;
pub mod error;
pub mod gateway;
pub mod memory;
pub mod poller;
pub mod reconciler;

pub use differ::{NodeDiff, diff};
pub use error::{GatewayError, GatewayResult, ReconcileError, ReconcileResult};
pub use gateway::{GatewayFuture, OrchestratorGateway};
pub use memory::{GatewayOp, InMemoryGateway};
pub use poller::{Convergence, ConvergenceBudget, await_convergence};
pub use reconciler::{ReconcileReport, Reconciler};
