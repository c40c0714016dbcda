//! Plain-data images of a [`SceneGraph`].
//!
//! A snapshot is what a reader on another thread should hold on to instead of the graph itself, and it is the
//! shape a save file needs to round-trip: ids, kinds, labels, both flags, parent and child order.

use super::{Node, NodeFlags, NodeKind, SceneGraph};
use crate::id::{IdAllocator, NodeID};

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct NodeRecord {
    pub id: NodeID,
    pub kind: NodeKind,
    pub label: String,
    pub visible: bool,
    pub render_enabled: bool,
    pub parent: Option<NodeID>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeID>,
}
impl NodeRecord {
    pub(super) fn from_node(id: NodeID, node: Node) -> Self {
        Self {
            id,
            kind: node.kind,
            visible: node.visible(),
            render_enabled: node.render_enabled(),
            label: node.label,
            parent: node.parent,
            children: node.children,
        }
    }
    pub(super) fn to_node(&self) -> Node {
        let mut flags = NodeFlags::empty();
        flags.set(NodeFlags::VISIBLE, self.visible);
        flags.set(NodeFlags::RENDER_ENABLED, self.render_enabled);
        Node {
            kind: self.kind,
            label: self.label.clone(),
            flags,
            parent: self.parent,
            children: self.children.clone(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SceneSnapshot {
    /// Top level nodes, top first.
    pub roots: Vec<NodeID>,
    /// Every node, in outliner order.
    pub nodes: Vec<NodeRecord>,
}
impl SceneSnapshot {
    #[must_use]
    pub fn get(&self, id: NodeID) -> Option<&NodeRecord> {
        self.nodes.iter().find(|record| record.id == id)
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SnapshotError {
    #[error("{0} appears more than once")]
    Duplicate(NodeID),
    #[error("{0} is referenced but has no record")]
    Dangling(NodeID),
    #[error("{0} disagrees with its parent about where it lives")]
    ParentMismatch(NodeID),
    #[error("{0} has children but is not a group")]
    NotAGroup(NodeID),
    #[error("{0} can't be reached from any root")]
    Unreachable(NodeID),
}

impl SceneGraph {
    /// Copy the whole graph out as plain data.
    #[must_use]
    pub fn snapshot(&self) -> SceneSnapshot {
        let nodes = self
            .iter_display_order()
            .filter_map(|(_, id)| {
                let node = self.nodes.get(&id)?;
                Some(NodeRecord::from_node(id, node.clone()))
            })
            .collect();
        SceneSnapshot {
            roots: self.roots.clone(),
            nodes,
        }
    }
    /// Rebuild a graph from a snapshot, checking that it describes a well-formed forest.
    /// Every restored ID is reserved in `ids`, so nodes created afterwards never collide.
    pub fn from_snapshot(
        snapshot: &SceneSnapshot,
        mut ids: impl IdAllocator + 'static,
    ) -> Result<Self, SnapshotError> {
        let mut records = hashbrown::HashMap::with_capacity(snapshot.nodes.len());
        for record in &snapshot.nodes {
            if records.insert(record.id, record).is_some() {
                return Err(SnapshotError::Duplicate(record.id));
            }
        }

        // Walk down from the roots. Each node must be reached exactly once, through the parent it names.
        let mut reached = hashbrown::HashSet::with_capacity(records.len());
        let mut stack: Vec<(Option<NodeID>, NodeID)> =
            snapshot.roots.iter().map(|root| (None, *root)).collect();
        while let Some((parent, id)) = stack.pop() {
            let record = records.get(&id).ok_or(SnapshotError::Dangling(id))?;
            if !reached.insert(id) {
                return Err(SnapshotError::Duplicate(id));
            }
            if record.parent != parent {
                return Err(SnapshotError::ParentMismatch(id));
            }
            if !record.children.is_empty() && !record.kind.can_have_children() {
                return Err(SnapshotError::NotAGroup(id));
            }
            stack.extend(record.children.iter().map(|child| (Some(id), *child)));
        }
        // Anything left over is floating, possibly in a cycle of its own.
        if let Some(floating) = snapshot.nodes.iter().find(|record| !reached.contains(&record.id)) {
            return Err(SnapshotError::Unreachable(floating.id));
        }

        let nodes = snapshot
            .nodes
            .iter()
            .map(|record| {
                ids.reserve(record.id);
                (record.id, record.to_node())
            })
            .collect();
        Ok(Self {
            nodes,
            roots: snapshot.roots.clone(),
            ids: Box::new(ids),
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::id::Sequential;

    fn id(raw: u64) -> NodeID {
        NodeID::from_raw(raw).unwrap()
    }
    fn record(raw: u64, kind: NodeKind, parent: Option<u64>, children: &[u64]) -> NodeRecord {
        NodeRecord {
            id: id(raw),
            kind,
            label: format!("Item {raw}"),
            visible: true,
            render_enabled: true,
            parent: parent.map(id),
            children: children.iter().copied().map(id).collect(),
        }
    }

    #[test]
    fn round_trip() {
        let mut graph = SceneGraph::default();
        let group = graph.create_node(NodeKind::Group, "Group", None).unwrap();
        let circle = graph
            .create_node(NodeKind::Circle, "Circle", Some(group))
            .unwrap();
        let line = graph.create_node(NodeKind::Line, "Line", None).unwrap();
        graph.set_render_enabled(circle, false).unwrap();
        graph.set_visible(line, false).unwrap();

        let snapshot = graph.snapshot();
        let restored = SceneGraph::from_snapshot(&snapshot, Sequential::default()).unwrap();
        assert_eq!(restored.snapshot(), snapshot);
        assert!(!restored.get(circle).unwrap().render_enabled());
        assert_eq!(restored.children_of(Some(group)).unwrap(), &[circle]);
    }
    #[test]
    fn restored_ids_are_reserved() {
        let snapshot = SceneSnapshot {
            roots: vec![id(10)],
            nodes: vec![record(10, NodeKind::Group, None, &[])],
        };
        let mut graph = SceneGraph::from_snapshot(&snapshot, Sequential::default()).unwrap();
        let fresh = graph.create_node(NodeKind::Point, "new", None).unwrap();
        assert_eq!(fresh.id(), 11);
    }
    #[test]
    fn rejects_malformed() {
        // Child under a point.
        let not_group = SceneSnapshot {
            roots: vec![id(1)],
            nodes: vec![
                record(1, NodeKind::Point, None, &[2]),
                record(2, NodeKind::Line, Some(1), &[]),
            ],
        };
        assert_eq!(
            SceneGraph::from_snapshot(&not_group, Sequential::default()).err(),
            Some(SnapshotError::NotAGroup(id(1)))
        );
        // Child pointing at the wrong parent.
        let mismatch = SceneSnapshot {
            roots: vec![id(1)],
            nodes: vec![
                record(1, NodeKind::Group, None, &[2]),
                record(2, NodeKind::Line, None, &[]),
            ],
        };
        assert_eq!(
            SceneGraph::from_snapshot(&mismatch, Sequential::default()).err(),
            Some(SnapshotError::ParentMismatch(id(2)))
        );
        // Two groups containing each other, hanging off nothing.
        let cycle = SceneSnapshot {
            roots: vec![],
            nodes: vec![
                record(1, NodeKind::Group, Some(2), &[2]),
                record(2, NodeKind::Group, Some(1), &[1]),
            ],
        };
        assert_eq!(
            SceneGraph::from_snapshot(&cycle, Sequential::default()).err(),
            Some(SnapshotError::Unreachable(id(1)))
        );
        // Child listed that doesn't exist.
        let dangling = SceneSnapshot {
            roots: vec![id(1)],
            nodes: vec![record(1, NodeKind::Group, None, &[7])],
        };
        assert_eq!(
            SceneGraph::from_snapshot(&dangling, Sequential::default()).err(),
            Some(SnapshotError::Dangling(id(7)))
        );
    }
}
