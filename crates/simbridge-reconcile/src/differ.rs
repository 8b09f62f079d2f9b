//! Desired-vs-observed node diffing.

use std::collections::HashMap;

use simbridge_state::{Node, NodeId};

/// Changes needed to move the observed node set to the desired one.
/// Apply `to_delete` before `to_upsert`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeDiff {
    /// Observed nodes whose id is not desired, in observed order.
    pub to_delete: Vec<Node>,
    /// Desired nodes that are missing or differ in any field, in desired order.
    pub to_upsert: Vec<Node>,
}

impl NodeDiff {
    pub fn is_empty(&self) -> bool {
        self.to_delete.is_empty() && self.to_upsert.is_empty()
    }
}

/// Compare node sets by id, with full field equality for nodes present in both.
pub fn diff(desired: &[Node], observed: &[Node]) -> NodeDiff {
    let desired_by_id: HashMap<NodeId, &Node> = desired.iter().map(|n| (n.id, n)).collect();
    let observed_by_id: HashMap<NodeId, &Node> = observed.iter().map(|n| (n.id, n)).collect();

    let to_delete = observed
        .iter()
        .filter(|n| !desired_by_id.contains_key(&n.id))
        .cloned()
        .collect();

    let to_upsert = desired
        .iter()
        .filter(|n| observed_by_id.get(&n.id).is_none_or(|o| **o != **n))
        .cloned()
        .collect();

    NodeDiff {
        to_delete,
        to_upsert,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: NodeId, name: &str, mips: i64) -> Node {
        Node::new(id, name, mips, 1024)
    }

    /// Apply a diff to an observed set the way the reconciler does.
    fn apply(observed: &mut Vec<Node>, d: &NodeDiff) {
        observed.retain(|n| !d.to_delete.iter().any(|x| x.id == n.id));
        for n in &d.to_upsert {
            match observed.iter_mut().find(|o| o.id == n.id) {
                Some(existing) => *existing = n.clone(),
                None => observed.push(n.clone()),
            }
        }
    }

    #[test]
    fn identical_sets_produce_nothing() {
        let nodes = vec![node(1, "vm-1", 100), node(2, "vm-2", 200)];
        assert!(diff(&nodes, &nodes).is_empty());
    }

    #[test]
    fn order_does_not_matter() {
        let a = vec![node(1, "vm-1", 100), node(2, "vm-2", 200)];
        let b = vec![node(2, "vm-2", 200), node(1, "vm-1", 100)];
        assert!(diff(&a, &b).is_empty());
    }

    #[test]
    fn missing_and_extra_nodes() {
        let desired = vec![node(1, "vm-1", 100), node(3, "vm-3", 300)];
        let observed = vec![node(1, "vm-1", 100), node(2, "vm-2", 200)];

        let d = diff(&desired, &observed);
        assert_eq!(d.to_delete, vec![node(2, "vm-2", 200)]);
        assert_eq!(d.to_upsert, vec![node(3, "vm-3", 300)]);
    }

    #[test]
    fn any_field_change_triggers_upsert() {
        let observed = vec![node(1, "vm-1", 100)];

        let mut changed = node(1, "vm-1", 100);
        changed.bw = Some(1000);
        assert_eq!(diff(&[changed.clone()], &observed).to_upsert, vec![changed]);

        let renamed = node(1, "vm-one", 100);
        let d = diff(&[renamed.clone()], &observed);
        assert_eq!(d.to_upsert, vec![renamed]);
        assert!(d.to_delete.is_empty());
    }

    #[test]
    fn empty_desired_deletes_everything() {
        let observed = vec![node(1, "vm-1", 100), node(2, "vm-2", 200)];
        let d = diff(&[], &observed);
        assert_eq!(d.to_delete.len(), 2);
        assert!(d.to_upsert.is_empty());
    }

    #[test]
    fn second_diff_after_apply_is_empty() {
        let desired = vec![node(1, "vm-1", 150), node(3, "vm-3", 300)];
        let mut observed = vec![node(1, "vm-1", 100), node(2, "vm-2", 200)];

        let first = diff(&desired, &observed);
        assert!(!first.is_empty());
        apply(&mut observed, &first);

        assert!(diff(&desired, &observed).is_empty());
    }
}
