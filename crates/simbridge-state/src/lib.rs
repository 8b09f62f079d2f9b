//! simbridge-state: in-memory cluster state for SimBridge.
//!
//! Holds the authoritative view of the simulated cluster: the node set
//! submitted by the simulator and every job it has asked us to place.
//!
//! # Architecture
//!
//! Both collections live behind a single `tokio::sync::RwLock`. Reads
//! (snapshots, lookups) take the shared lock; every structural mutation
//! takes the exclusive lock for the duration of one in-memory update only.
//! Callers never receive references into the maps, only owned copies.
//!
//! The `ClusterStateStore` is `Clone` + `Send` + `Sync` (backed by `Arc`)
//! and can be shared across async tasks.

pub mod error;
pub mod store;
pub mod types;
pub mod validate;

pub use error::{StateError, StateResult};
pub use store::{ClusterStateStore, StoreCounts};
pub use types::*;
pub use validate::{validate_jobs, validate_nodes};
