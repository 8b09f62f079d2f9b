//! Wire types for the extender protocol.

use serde::{Deserialize, Serialize};

use simbridge_state::{Job, Node};

/// Request body for both `/filter` and `/prioritize`: one job and the
/// candidate nodes it may land on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExtenderArgs {
    pub pod: Job,
    pub nodes: Vec<Node>,
}

impl ExtenderArgs {
    pub fn new(job: &Job, nodes: &[Node]) -> Self {
        Self {
            pod: job.clone(),
            nodes: nodes.to_vec(),
        }
    }
}

/// Response body of `/filter`.
///
/// `nodes: None` (field absent or `null`) means the extender did not
/// narrow the candidates; `Some(vec![])` means nothing survived.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FilterResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nodes: Option<Vec<Node>>,
}

impl FilterResult {
    /// Resolve the surviving nodes against the candidates that were sent.
    pub fn into_survivors(self, candidates: &[Node]) -> Vec<Node> {
        match self.nodes {
            Some(nodes) => nodes,
            None => candidates.to_vec(),
        }
    }
}

/// One scored host in a `/prioritize` response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HostPriority {
    pub host: String,
    pub score: i64,
}

impl HostPriority {
    pub fn new(host: impl Into<String>, score: i64) -> Self {
        Self {
            host: host.into(),
            score,
        }
    }
}

/// Response body of `/prioritize`. Order carries no meaning to the
/// extender, but the selector breaks ties by position.
pub type HostPriorityList = Vec<HostPriority>;

#[cfg(test)]
mod tests {
    use super::*;

    fn candidates() -> Vec<Node> {
        vec![Node::new(1, "vm-1", 4000, 8192), Node::new(2, "vm-2", 2000, 4096)]
    }

    #[test]
    fn absent_nodes_pass_everything_through() {
        let result: FilterResult = serde_json::from_str("{}").unwrap();
        assert_eq!(result.into_survivors(&candidates()), candidates());
    }

    #[test]
    fn null_nodes_pass_everything_through() {
        let result: FilterResult = serde_json::from_str(r#"{"nodes":null}"#).unwrap();
        assert_eq!(result.into_survivors(&candidates()).len(), 2);
    }

    #[test]
    fn empty_nodes_means_none_survive() {
        let result: FilterResult = serde_json::from_str(r#"{"nodes":[]}"#).unwrap();
        assert!(result.into_survivors(&candidates()).is_empty());
    }

    #[test]
    fn args_wire_shape() {
        let job = Job::new(1, "cloudlet-1", 1000, 1024);
        let args = ExtenderArgs::new(&job, &candidates());
        let value = serde_json::to_value(&args).unwrap();

        assert_eq!(value["pod"]["name"], "cloudlet-1");
        assert_eq!(value["nodes"][1]["name"], "vm-2");
    }

    #[test]
    fn priority_list_decodes() {
        let list: HostPriorityList =
            serde_json::from_str(r#"[{"host":"vm-1","score":80},{"host":"vm-2","score":-3}]"#).unwrap();
        assert_eq!(list, vec![HostPriority::new("vm-1", 80), HostPriority::new("vm-2", -3)]);
    }
}
