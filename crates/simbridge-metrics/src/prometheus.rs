//! Prometheus text exposition format.
//!
//! Renders the bridge counters plus the store's current job/node gauges
//! for scraping by a Prometheus server or compatible agent.

use simbridge_state::StoreCounts;

use crate::counters::MetricsSnapshot;

/// Render counters and store gauges into Prometheus text format.
pub fn render_prometheus(metrics: &MetricsSnapshot, store: &StoreCounts) -> String {
    let mut out = String::new();

    counter(
        &mut out,
        "simbridge_scheduling_passes_total",
        "Scheduling passes completed.",
        metrics.passes,
    );

    out.push_str("# HELP simbridge_job_outcomes_total Jobs resolved or deferred by scheduling passes.\n");
    out.push_str("# TYPE simbridge_job_outcomes_total counter\n");
    for (outcome, value) in [
        ("scheduled", metrics.jobs_scheduled),
        ("unschedulable", metrics.jobs_unschedulable),
        ("deferred", metrics.jobs_deferred),
    ] {
        out.push_str(&format!(
            "simbridge_job_outcomes_total{{outcome=\"{outcome}\"}} {value}\n"
        ));
    }

    out.push_str("# HELP simbridge_extender_failures_total Failed extender calls.\n");
    out.push_str("# TYPE simbridge_extender_failures_total counter\n");
    for (phase, value) in [
        ("filter", metrics.filter_failures),
        ("prioritize", metrics.prioritize_failures),
    ] {
        out.push_str(&format!(
            "simbridge_extender_failures_total{{phase=\"{phase}\"}} {value}\n"
        ));
    }

    counter(
        &mut out,
        "simbridge_gateway_failures_total",
        "Failed orchestrator gateway calls.",
        metrics.gateway_failures,
    );
    counter(
        &mut out,
        "simbridge_convergence_timeouts_total",
        "Convergence waits that exhausted their attempt budget.",
        metrics.convergence_timeouts,
    );

    out.push_str("# HELP simbridge_nodes Nodes in the desired node set.\n");
    out.push_str("# TYPE simbridge_nodes gauge\n");
    out.push_str(&format!("simbridge_nodes {}\n", store.nodes));

    out.push_str("# HELP simbridge_jobs Jobs in the store by status.\n");
    out.push_str("# TYPE simbridge_jobs gauge\n");
    for (status, value) in [
        ("Pending", store.pending),
        ("Scheduled", store.scheduled),
        ("Unschedulable", store.unschedulable),
    ] {
        out.push_str(&format!("simbridge_jobs{{status=\"{status}\"}} {value}\n"));
    }

    out
}

fn counter(out: &mut String, name: &str, help: &str, value: u64) {
    out.push_str(&format!("# HELP {name} {help}\n"));
    out.push_str(&format!("# TYPE {name} counter\n"));
    out.push_str(&format!("{name} {value}\n"));
}
