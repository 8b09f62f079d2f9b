//! Domain types for the SimBridge state store.
//!
//! Field names on the wire follow the simulator's JSON contract
//! (`mipsAvailable`, `ramRequested`, `vmId`, ...), so the serde renames
//! here are part of the external interface.

use serde::{Deserialize, Deserializer, Serialize};

/// Identity of a simulated node (the simulator's VM/container id).
pub type NodeId = i64;

/// Identity of a simulated job (the simulator's cloudlet id).
pub type JobId = i64;

// ── Node ──────────────────────────────────────────────────────────

/// A schedulable node as described by the simulator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    /// Available compute capacity (speed units).
    #[serde(rename = "mipsAvailable")]
    pub mips_available: i64,
    /// Available memory capacity (MB).
    #[serde(rename = "ramAvailable")]
    pub ram_available: i64,
    /// Processing element count.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pes: Option<u32>,
    /// Bandwidth.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bw: Option<i64>,
    /// Storage size.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<i64>,
    /// Node class tag, e.g. "vm" or "container".
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub node_type: Option<String>,
}

impl Node {
    /// A node with only the required attributes set.
    pub fn new(id: NodeId, name: impl Into<String>, mips_available: i64, ram_available: i64) -> Self {
        Self {
            id,
            name: name.into(),
            mips_available,
            ram_available,
            pes: None,
            bw: None,
            size: None,
            node_type: None,
        }
    }
}

// ── Job ───────────────────────────────────────────────────────────

/// Scheduling status of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobStatus {
    Pending,
    Scheduled,
    Unschedulable,
}

impl JobStatus {
    /// Whether the scheduler is done with a job in this status.
    pub fn is_terminal(self) -> bool {
        !matches!(self, JobStatus::Pending)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobStatus::Pending => "Pending",
            JobStatus::Scheduled => "Scheduled",
            JobStatus::Unschedulable => "Unschedulable",
        };
        f.write_str(s)
    }
}

/// A simulated workload unit (cloudlet) awaiting placement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: JobId,
    pub name: String,
    #[serde(default)]
    pub mips_requested: i64,
    #[serde(default)]
    pub ram_requested: i64,

    /// Cloudlet length, carried opaquely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_size: Option<i64>,

    /// Utilization fractions in `0.0..=1.0`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utilization_cpu: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utilization_ram: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utilization_bw: Option<f64>,

    /// `None` until the store has accepted the job; an empty string on the
    /// wire is treated as unset.
    #[serde(default, deserialize_with = "status_or_unset")]
    pub status: Option<JobStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_name: Option<String>,
    #[serde(default, rename = "vmId")]
    pub node_id: Option<NodeId>,
    /// Routing hint for the downstream orchestrator; never interpreted here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduler_name: Option<String>,
}

impl Job {
    /// A job with only the required attributes set and no status.
    pub fn new(id: JobId, name: impl Into<String>, mips_requested: i64, ram_requested: i64) -> Self {
        Self {
            id,
            name: name.into(),
            mips_requested,
            ram_requested,
            length: None,
            pes: None,
            file_size: None,
            output_size: None,
            utilization_cpu: None,
            utilization_ram: None,
            utilization_bw: None,
            status: None,
            node_name: None,
            node_id: None,
            scheduler_name: None,
        }
    }

    /// Effective status; an unset status counts as pending.
    pub fn status(&self) -> JobStatus {
        self.status.unwrap_or(JobStatus::Pending)
    }
}

fn status_or_unset<'de, D>(deserializer: D) -> Result<Option<JobStatus>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref() {
        None | Some("") => Ok(None),
        Some("Pending") => Ok(Some(JobStatus::Pending)),
        Some("Scheduled") => Ok(Some(JobStatus::Scheduled)),
        Some("Unschedulable") => Ok(Some(JobStatus::Unschedulable)),
        Some(other) => Err(serde::de::Error::unknown_variant(
            other,
            &["Pending", "Scheduled", "Unschedulable"],
        )),
    }
}

/// Result of one scheduling attempt, written back through
/// [`ClusterStateStore::set_job_outcome`](crate::ClusterStateStore::set_job_outcome).
///
/// An assignment only exists on the `Scheduled` variant, so a job can
/// never carry a node without being scheduled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Scheduled { node_id: NodeId, node_name: String },
    Unschedulable,
}

/// Store-assigned version of a job record. Every submission of a job
/// gets a fresh, higher revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Revision(pub(crate) u64);

/// A Pending job as snapshotted at the start of a scheduling pass.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingJob {
    pub job: Job,
    pub revision: Revision,
}

impl JobOutcome {
    pub fn status(&self) -> JobStatus {
        match self {
            JobOutcome::Scheduled { .. } => JobStatus::Scheduled,
            JobOutcome::Unschedulable => JobStatus::Unschedulable,
        }
    }
}
