//! simbridge-scheduler: extender-driven job placement.
//!
//! Every Pending job in the [`ClusterStateStore`](simbridge_state::ClusterStateStore)
//! is offered to an [`Extender`](simbridge_extender::Extender), and the
//! best-scoring surviving node is recorded as the job's placement.
//!
//! # Architecture
//!
//! ```text
//! SchedulingEngine
//!   ├── pass_lock (one pass at a time, system-wide)
//!   │     ├── run_pass()      ← submission handlers (waits its turn)
//!   │     └── try_run_pass()  ← background ticker (skips if busy)
//!   └── per Pending job
//!         ├── snapshot nodes ── empty ──────────────→ Unschedulable
//!         ├── extender.filter ── error ─────────────→ stays Pending
//!         │                   └─ no survivors ──────→ Unschedulable
//!         ├── extender.prioritize ── error ─────────→ stays Pending
//!         └── selector::select ── no match ─────────→ Unschedulable
//!                              └─ best node ────────→ Scheduled
//! ```

pub mod engine;
pub mod error;
pub mod selector;

pub use engine::{Decision, JobReport, PassReport, SchedulingEngine, UnschedulableReason};
pub use error::{SchedulerError, SchedulerResult};
pub use selector::select;
