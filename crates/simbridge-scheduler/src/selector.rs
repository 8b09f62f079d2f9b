//! Node selection from extender priorities.

use simbridge_extender::HostPriority;
use simbridge_state::Node;

/// Pick the node with the highest priority score.
///
/// Walks `priorities` in order, resolving each host against `filtered` by
/// name (first match wins). A candidate replaces the running best only on
/// a strictly greater score, so ties go to the earliest priority entry.
/// Entries naming unknown hosts are skipped. Returns `None` when no entry
/// names a filtered node.
pub fn select<'a>(filtered: &'a [Node], priorities: &[HostPriority]) -> Option<&'a Node> {
    let mut best: Option<(&Node, i64)> = None;

    for entry in priorities {
        let Some(node) = filtered.iter().find(|n| n.name == entry.host) else {
            continue;
        };
        match best {
            Some((_, score)) if entry.score <= score => {}
            _ => best = Some((node, entry.score)),
        }
    }

    best.map(|(node, _)| node)
}
