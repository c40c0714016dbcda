use crate::id::NodeID;
use crate::scene::{Flag, SceneError, SceneGraph};

/// The result of flipping a node's flag: which nodes below it now show (or render) differently.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Propagation {
    pub root: NodeID,
    pub flag: Flag,
    /// The root's own flag after the toggle.
    pub own: bool,
    /// Descendants whose effective value changed, in outliner order. The root itself is not included.
    pub affected: Vec<NodeID>,
}

/// Descendants of `root` whose effective `flag` changed, given the root's effective value before the change.
///
/// If the root's effective value didn't change (some ancestor forces it off either way), nothing below it did
/// either. Otherwise every descendant changed along with it, except those held off by their own flag or that
/// of a node between them and the root.
pub(super) fn affected(
    graph: &SceneGraph,
    root: NodeID,
    flag: Flag,
    effective_before: bool,
) -> Result<Vec<NodeID>, SceneError> {
    if graph.effective(root, flag)? == effective_before {
        return Ok(Vec::new());
    }
    let mut affected = Vec::new();
    let mut stack: Vec<NodeID> = graph.children_of(Some(root))?.iter().rev().copied().collect();
    while let Some(id) = stack.pop() {
        let Some(node) = graph.get(id) else {
            continue;
        };
        // Off on its own, so it and everything under it stays off.
        if !node.flag(flag) {
            continue;
        }
        affected.push(id);
        stack.extend(node.children().iter().rev().copied());
    }
    Ok(affected)
}
