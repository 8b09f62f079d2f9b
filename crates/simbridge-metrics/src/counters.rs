//! Bridge counters.
//!
//! Lock-free: every counter is an `AtomicU64` bumped with relaxed ordering.

use std::sync::atomic::{AtomicU64, Ordering};

use simbridge_extender::ExtenderPhase;
use tracing::debug;

/// Monotonic counters for one bridge process.
#[derive(Debug, Default)]
pub struct BridgeMetrics {
    passes: AtomicU64,
    jobs_scheduled: AtomicU64,
    jobs_unschedulable: AtomicU64,
    jobs_deferred: AtomicU64,
    filter_failures: AtomicU64,
    prioritize_failures: AtomicU64,
    gateway_failures: AtomicU64,
    convergence_timeouts: AtomicU64,
}

/// Point-in-time copy of every counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub passes: u64,
    pub jobs_scheduled: u64,
    pub jobs_unschedulable: u64,
    pub jobs_deferred: u64,
    pub filter_failures: u64,
    pub prioritize_failures: u64,
    pub gateway_failures: u64,
    pub convergence_timeouts: u64,
}

impl BridgeMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one completed scheduling pass and what it did.
    pub fn record_pass(&self, scheduled: usize, unschedulable: usize, deferred: usize) {
        self.passes.fetch_add(1, Ordering::Relaxed);
        self.jobs_scheduled
            .fetch_add(scheduled as u64, Ordering::Relaxed);
        self.jobs_unschedulable
            .fetch_add(unschedulable as u64, Ordering::Relaxed);
        self.jobs_deferred
            .fetch_add(deferred as u64, Ordering::Relaxed);
        debug!(scheduled, unschedulable, deferred, "pass recorded");
    }

    pub fn record_extender_failure(&self, phase: ExtenderPhase) {
        let counter = match phase {
            ExtenderPhase::Filter => &self.filter_failures,
            ExtenderPhase::Prioritize => &self.prioritize_failures,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_gateway_failure(&self) {
        self.gateway_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_convergence_timeout(&self) {
        self.convergence_timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            passes: self.passes.load(Ordering::Relaxed),
            jobs_scheduled: self.jobs_scheduled.load(Ordering::Relaxed),
            jobs_unschedulable: self.jobs_unschedulable.load(Ordering::Relaxed),
            jobs_deferred: self.jobs_deferred.load(Ordering::Relaxed),
            filter_failures: self.filter_failures.load(Ordering::Relaxed),
            prioritize_failures: self.prioritize_failures.load(Ordering::Relaxed),
            gateway_failures: self.gateway_failures.load(Ordering::Relaxed),
            convergence_timeouts: self.convergence_timeouts.load(Ordering::Relaxed),
        }
    }
}
