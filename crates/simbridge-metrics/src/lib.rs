//! simbridge-metrics: observability for the scheduling bridge.
//!
//! Counts scheduling passes and their outcomes, extender and gateway
//! failures, and convergence timeouts. Placement failures (jobs that end
//! Unschedulable) are counted apart from operational failures.
//!
//! # Architecture
//!
//! ```text
//! BridgeMetrics (shared via Arc)
//!   ├── record_pass()               ← SchedulingEngine, once per pass
//!   ├── record_extender_failure()   ← SchedulingEngine, per failed call
//!   ├── record_gateway_failure()    ← Reconciler / API handlers
//!   ├── record_convergence_timeout()← Reconciler / API handlers
//!   └── snapshot() → MetricsSnapshot
//!
//! Prometheus exposition
//!   └── render_prometheus(snapshot, store counts) → text/plain for /metrics
//! ```

pub mod counters;
pub mod prometheus;

pub use counters::{BridgeMetrics, MetricsSnapshot};
pub use prometheus::render_prometheus;
