//! Turning a drag-and-drop gesture into a list of moves.

use crate::id::NodeID;
use crate::scene::{SceneError, SceneGraph};

/// A drop that passed validation.
#[derive(Debug, PartialEq, Eq)]
pub(super) struct DropPlan {
    pub target: Option<NodeID>,
    /// Nodes to move, in outliner order. Nodes dragged along with a dragged ancestor are not listed.
    pub moves: Vec<NodeID>,
    /// The moved nodes end up just above this one, or at the bottom if None.
    anchor: Option<NodeID>,
}

/// Check the whole drop before anything is touched. Either every dragged node can go, or none do.
///
/// `position` indexes the target's children as they are before the drop.
pub(super) fn plan(
    graph: &SceneGraph,
    dragged: &[NodeID],
    target: Option<NodeID>,
    position: usize,
) -> Result<DropPlan, SceneError> {
    if let Some(target) = target {
        let node = graph.get(target).ok_or(SceneError::NotFound(target))?;
        if !node.is_group() {
            return Err(SceneError::InvalidParent(target));
        }
    }
    for &id in dragged {
        if !graph.contains(id) {
            return Err(SceneError::NotFound(id));
        }
        if let Some(target) = target {
            if id == target || graph.is_ancestor_of(id, target) {
                return Err(SceneError::InvalidDrop {
                    dragged: id,
                    target,
                });
            }
        }
    }

    let dragged: hashbrown::HashSet<NodeID> = dragged.iter().copied().collect();
    let moves: Vec<NodeID> = graph
        .iter_display_order()
        .map(|(_, id)| id)
        .filter(|id| dragged.contains(id))
        // Already coming along inside its dragged ancestor.
        .filter(|id| !graph.ancestors(*id).any(|ancestor| dragged.contains(&ancestor)))
        .collect();

    let order = graph.children_of(target)?;
    let anchor = order[position.min(order.len())..]
        .iter()
        .copied()
        .find(|id| !dragged.contains(id));
    Ok(DropPlan {
        target,
        moves,
        anchor,
    })
}

impl DropPlan {
    /// Where `id` should be inserted into the target, as [`SceneGraph::move_node`] counts it, given the moves
    /// that have already happened.
    pub fn index_for(&self, graph: &SceneGraph, id: NodeID) -> Result<Option<usize>, SceneError> {
        let Some(anchor) = self.anchor else {
            return Ok(None);
        };
        let order = graph.children_of(self.target)?;
        let anchor_idx = order
            .iter()
            .position(|child| *child == anchor)
            .ok_or(SceneError::NotFound(anchor))?;
        // Leaving from above the anchor shifts it up by one.
        Ok(Some(match order.iter().position(|child| *child == id) {
            Some(own) if own < anchor_idx => anchor_idx - 1,
            _ => anchor_idx,
        }))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::scene::NodeKind;

    #[test]
    fn nested_and_duplicate_ids_collapse() {
        let mut graph = SceneGraph::default();
        let target = graph.create_node(NodeKind::Group, "T", None).unwrap();
        let group = graph.create_node(NodeKind::Group, "G", None).unwrap();
        let inner = graph.create_node(NodeKind::Point, "I", Some(group)).unwrap();
        let line = graph.create_node(NodeKind::Line, "L", None).unwrap();

        let plan = plan(&graph, &[line, inner, group, line], Some(target), 0).unwrap();
        assert_eq!(plan.moves, vec![group, line]);
        assert_eq!(plan.anchor, None);
    }
    #[test]
    fn anchor_skips_dragged() {
        let mut graph = SceneGraph::default();
        let a = graph.create_node(NodeKind::Point, "A", None).unwrap();
        let b = graph.create_node(NodeKind::Point, "B", None).unwrap();
        let c = graph.create_node(NodeKind::Point, "C", None).unwrap();
        let plan = plan(&graph, &[b], None, 1).unwrap();
        assert_eq!(plan.anchor, Some(c));
        assert_eq!(plan.index_for(&graph, b).unwrap(), Some(1));
        assert_eq!(plan.index_for(&graph, a).unwrap(), Some(1));
        // Past the end.
        assert_eq!(super::plan(&graph, &[a], None, 10).unwrap().anchor, None);
    }
    #[test]
    fn rejects_before_planning() {
        let mut graph = SceneGraph::default();
        let outer = graph.create_node(NodeKind::Group, "O", None).unwrap();
        let inner = graph.create_node(NodeKind::Group, "I", Some(outer)).unwrap();
        let point = graph.create_node(NodeKind::Point, "P", None).unwrap();
        assert_eq!(
            plan(&graph, &[point, outer], Some(inner), 0),
            Err(SceneError::InvalidDrop {
                dragged: outer,
                target: inner
            })
        );
        assert_eq!(
            plan(&graph, &[outer], Some(point), 0),
            Err(SceneError::InvalidParent(point))
        );
        let ghost = NodeID::from_raw(77).unwrap();
        assert_eq!(
            plan(&graph, &[ghost], None, 0),
            Err(SceneError::NotFound(ghost))
        );
    }
}
