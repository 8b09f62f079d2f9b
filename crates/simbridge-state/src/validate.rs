//! Submission validation.
//!
//! Runs before anything touches the store, so a rejected batch leaves
//! no trace.

use std::collections::HashSet;

use crate::error::{StateError, StateResult};
use crate::types::{Job, Node};

/// Check a node batch: unique ids and names, non-empty names,
/// non-negative capacities.
pub fn validate_nodes(nodes: &[Node]) -> StateResult<()> {
    let mut ids = HashSet::new();
    let mut names = HashSet::new();

    for node in nodes {
        if node.name.trim().is_empty() {
            return Err(StateError::Validation(format!("node {} has an empty name", node.id)));
        }
        if node.mips_available < 0 || node.ram_available < 0 {
            return Err(StateError::Validation(format!(
                "node {} has negative capacity",
                node.id
            )));
        }
        if !ids.insert(node.id) {
            return Err(StateError::Validation(format!("duplicate node id {}", node.id)));
        }
        if !names.insert(node.name.as_str()) {
            return Err(StateError::Validation(format!("duplicate node name {:?}", node.name)));
        }
    }
    Ok(())
}

/// Check a job batch: unique ids, non-negative requests, utilization
/// fractions within `0.0..=1.0`.
pub fn validate_jobs(jobs: &[Job]) -> StateResult<()> {
    let mut ids = HashSet::new();

    for job in jobs {
        if job.mips_requested < 0 || job.ram_requested < 0 {
            return Err(StateError::Validation(format!("job {} has a negative request", job.id)));
        }
        for fraction in [job.utilization_cpu, job.utilization_ram, job.utilization_bw]
            .into_iter()
            .flatten()
        {
            if !(0.0..=1.0).contains(&fraction) {
                return Err(StateError::Validation(format!(
                    "job {} has utilization {fraction} outside 0.0-1.0",
                    job.id
                )));
            }
        }
        if !ids.insert(job.id) {
            return Err(StateError::Validation(format!("duplicate job id {}", job.id)));
        }
    }
    Ok(())
}
