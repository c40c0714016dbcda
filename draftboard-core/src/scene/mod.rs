//! # Scene
//!
//! The entities of a drawing form a forest: drawable primitives (points, lines, ...) as leaves and groups as
//! the only nodes allowed to own children. The [`SceneGraph`] is the sole owner of every node. Everything
//! else, including nodes referring to their parent and children, refers to nodes by [`NodeID`].
//!
//! Visibility and render participation are stored per node exactly as the user set them. The values consumers
//! should act on are the *effective* ones, the AND of a node's own flag with every ancestor's, and those are
//! always computed from the ancestor chain rather than stored. A re-parented node can never be left holding a
//! stale inherited flag.

pub mod commands;
pub mod snapshot;
pub mod writer;

use crate::id::{IdAllocator, NodeID};

pub use snapshot::{NodeRecord, SceneSnapshot, SnapshotError};

#[derive(
    Copy,
    Clone,
    PartialEq,
    Eq,
    Hash,
    Debug,
    serde::Serialize,
    serde::Deserialize,
    strum::AsRefStr,
    strum::Display,
    strum::EnumIter,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NodeKind {
    Point,
    Line,
    Circle,
    Parametric,
    /// The only kind which may own children.
    Group,
    Generic,
}
impl NodeKind {
    #[must_use]
    pub fn can_have_children(self) -> bool {
        matches!(self, Self::Group)
    }
}

bitflags::bitflags! {
    /// The per-node flags, as set by the user.
    #[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
    pub struct NodeFlags: u8 {
        const VISIBLE = 1;
        const RENDER_ENABLED = 1 << 1;
    }
}
impl Default for NodeFlags {
    fn default() -> Self {
        Self::all()
    }
}

/// One axis of [`NodeFlags`]. The two axes are independent of each other, and each propagates down the tree
/// on its own.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, strum::Display)]
pub enum Flag {
    Visible,
    RenderEnabled,
}
impl Flag {
    #[must_use]
    pub fn bits(self) -> NodeFlags {
        match self {
            Self::Visible => NodeFlags::VISIBLE,
            Self::RenderEnabled => NodeFlags::RENDER_ENABLED,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    kind: NodeKind,
    label: String,
    flags: NodeFlags,
    // Lookup convenience only. The parent's `children` (or the root order) owns the link.
    parent: Option<NodeID>,
    children: Vec<NodeID>,
}
impl Node {
    fn new(kind: NodeKind, label: String, parent: Option<NodeID>) -> Self {
        Self {
            kind,
            label,
            flags: NodeFlags::default(),
            parent,
            children: Vec::new(),
        }
    }
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        self.kind
    }
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }
    #[must_use]
    pub fn flags(&self) -> NodeFlags {
        self.flags
    }
    #[must_use]
    pub fn flag(&self, flag: Flag) -> bool {
        self.flags.contains(flag.bits())
    }
    #[must_use]
    pub fn visible(&self) -> bool {
        self.flag(Flag::Visible)
    }
    #[must_use]
    pub fn render_enabled(&self) -> bool {
        self.flag(Flag::RenderEnabled)
    }
    #[must_use]
    pub fn parent(&self) -> Option<NodeID> {
        self.parent
    }
    /// Children, top first.
    #[must_use]
    pub fn children(&self) -> &[NodeID] {
        &self.children
    }
    #[must_use]
    pub fn is_group(&self) -> bool {
        self.kind.can_have_children()
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    #[error("{0} not found")]
    NotFound(NodeID),
    #[error("{0} is missing or can't hold children")]
    InvalidParent(NodeID),
    #[error("can't move {node} into itself or its own [grand]child {parent}")]
    WouldCycle { node: NodeID, parent: NodeID },
    #[error("can't drop {dragged} into {target}, which it contains")]
    InvalidDrop { dragged: NodeID, target: NodeID },
}

/// A subtree cut out of the graph, with everything needed to put it back exactly where it was.
#[derive(Clone, Debug, PartialEq)]
pub struct RemovedSubtree {
    /// Parent it was removed from, or None if it was a root.
    pub parent: Option<NodeID>,
    /// Position within that parent's children.
    pub index: usize,
    pub root: NodeRecord,
    /// Everything below the root, in pre-order.
    pub descendants: Vec<NodeRecord>,
}
impl RemovedSubtree {
    /// Every removed node in pre-order, root first.
    pub fn records(&self) -> impl Iterator<Item = &NodeRecord> + '_ {
        std::iter::once(&self.root).chain(&self.descendants)
    }
    pub fn ids(&self) -> impl Iterator<Item = NodeID> + '_ {
        self.records().map(|record| record.id)
    }
}

pub struct SceneGraph {
    nodes: hashbrown::HashMap<NodeID, Node>,
    roots: Vec<NodeID>,
    ids: Box<dyn IdAllocator>,
}
impl Default for SceneGraph {
    fn default() -> Self {
        Self::with_allocator(crate::id::Sequential::default())
    }
}
impl std::fmt::Debug for SceneGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneGraph")
            .field("nodes", &self.nodes)
            .field("roots", &self.roots)
            .finish_non_exhaustive()
    }
}
impl SceneGraph {
    #[must_use]
    pub fn with_allocator(ids: impl IdAllocator + 'static) -> Self {
        Self {
            nodes: hashbrown::HashMap::new(),
            roots: Vec::new(),
            ids: Box::new(ids),
        }
    }
    #[must_use]
    pub fn get(&self, id: NodeID) -> Option<&Node> {
        self.nodes.get(&id)
    }
    fn node(&self, id: NodeID) -> Result<&Node, SceneError> {
        self.nodes.get(&id).ok_or(SceneError::NotFound(id))
    }
    fn node_mut(&mut self, id: NodeID) -> Result<&mut Node, SceneError> {
        self.nodes.get_mut(&id).ok_or(SceneError::NotFound(id))
    }
    #[must_use]
    pub fn contains(&self, id: NodeID) -> bool {
        self.nodes.contains_key(&id)
    }
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
    /// Top level nodes, top first.
    #[must_use]
    pub fn roots(&self) -> &[NodeID] {
        &self.roots
    }
    /// Ordered children of a group, or the root order if `parent` is None.
    pub fn children_of(&self, parent: Option<NodeID>) -> Result<&[NodeID], SceneError> {
        match parent {
            Some(parent) => Ok(&self.node(parent)?.children),
            None => Ok(&self.roots),
        }
    }
    fn order_mut(&mut self, parent: Option<NodeID>) -> Result<&mut Vec<NodeID>, SceneError> {
        match parent {
            Some(parent) => Ok(&mut self.node_mut(parent)?.children),
            None => Ok(&mut self.roots),
        }
    }
    pub fn parent_of(&self, id: NodeID) -> Result<Option<NodeID>, SceneError> {
        Ok(self.node(id)?.parent)
    }
    /// Position of the node within its parent's (or the root) order.
    pub fn index_of(&self, id: NodeID) -> Result<usize, SceneError> {
        let parent = self.parent_of(id)?;
        self.children_of(parent)?
            .iter()
            .position(|child| *child == id)
            // A node missing from its own parent's order would be a broken tree.
            .ok_or(SceneError::NotFound(id))
    }
    /// Walk from the node's parent up to its root. Unknown IDs have no ancestors.
    #[must_use]
    pub fn ancestors(&self, id: NodeID) -> Ancestors<'_> {
        Ancestors {
            graph: self,
            next: self.nodes.get(&id).and_then(Node::parent),
        }
    }
    /// Is `ancestor` a parent, grandparent, ... of `node`? A node is not its own ancestor.
    #[must_use]
    pub fn is_ancestor_of(&self, ancestor: NodeID, node: NodeID) -> bool {
        self.ancestors(node).any(|id| id == ancestor)
    }
    /// Every node below `id`, in pre-order (the order an outliner shows them).
    pub fn descendants(&self, id: NodeID) -> Result<Descendants<'_>, SceneError> {
        let node = self.node(id)?;
        Ok(Descendants {
            graph: self,
            stack: node.children.iter().rev().map(|child| (1, *child)).collect(),
        })
    }
    /// Every node of the scene as `(depth, id)`, in the order an outliner shows them. Roots have depth 0.
    #[must_use]
    pub fn iter_display_order(&self) -> Descendants<'_> {
        Descendants {
            graph: self,
            stack: self.roots.iter().rev().map(|root| (0, *root)).collect(),
        }
    }
    /// The node's own flag ANDed with every ancestor's.
    pub fn effective(&self, id: NodeID, flag: Flag) -> Result<bool, SceneError> {
        let own = self.node(id)?.flag(flag);
        Ok(own
            && self
                .ancestors(id)
                .all(|ancestor| self.nodes.get(&ancestor).is_some_and(|node| node.flag(flag))))
    }
    pub fn effective_visible(&self, id: NodeID) -> Result<bool, SceneError> {
        self.effective(id, Flag::Visible)
    }
    pub fn effective_render_enabled(&self, id: NodeID) -> Result<bool, SceneError> {
        self.effective(id, Flag::RenderEnabled)
    }
    /// Create a node as the last child of `parent`, or as the last root.
    pub fn create_node(
        &mut self,
        kind: NodeKind,
        label: impl Into<String>,
        parent: Option<NodeID>,
    ) -> Result<NodeID, SceneError> {
        if let Some(parent) = parent {
            if !self.get(parent).is_some_and(Node::is_group) {
                return Err(SceneError::InvalidParent(parent));
            }
        }
        let id = self.ids.allocate();
        self.nodes.insert(id, Node::new(kind, label.into(), parent));
        self.order_mut(parent)?.push(id);
        Ok(id)
    }
    /// Move the node (children and all) to be the `index`th child of `new_parent`, or of the root if None.
    ///
    /// `index` counts within the destination *after* the node has left its old place. An index too large,
    /// or None, puts it at the bottom.
    pub fn move_node(
        &mut self,
        node: NodeID,
        new_parent: Option<NodeID>,
        index: Option<usize>,
    ) -> Result<(), SceneError> {
        let old_parent = self.parent_of(node)?;
        if let Some(parent) = new_parent {
            if !self.node(parent)?.is_group() {
                return Err(SceneError::InvalidParent(parent));
            }
            // Are we trying to move into ourselves or one of our own children?
            if parent == node || self.is_ancestor_of(node, parent) {
                return Err(SceneError::WouldCycle { node, parent });
            }
        }
        // Everything is checked, nothing below may fail.
        let old_index = self.index_of(node)?;
        self.order_mut(old_parent)?.remove(old_index);
        let destination = self.order_mut(new_parent)?;
        let index = index.map_or(destination.len(), |index| index.min(destination.len()));
        destination.insert(index, node);
        self.node_mut(node)?.parent = new_parent;
        Ok(())
    }
    /// Delete the node and everything below it. Returns every removed ID.
    pub fn remove_subtree(
        &mut self,
        node: NodeID,
    ) -> Result<hashbrown::HashSet<NodeID>, SceneError> {
        Ok(self.detach_subtree(node)?.ids().collect())
    }
    /// Cut a subtree out of the graph, keeping everything needed to restore it.
    pub fn detach_subtree(&mut self, node: NodeID) -> Result<RemovedSubtree, SceneError> {
        let parent = self.parent_of(node)?;
        let index = self.index_of(node)?;
        let ids: Vec<NodeID> = std::iter::once(node)
            .chain(self.descendants(node)?.map(|(_, id)| id))
            .collect();

        self.order_mut(parent)?.remove(index);
        let mut records = ids.into_iter().filter_map(|id| {
            let removed = self.nodes.remove(&id)?;
            Some(NodeRecord::from_node(id, removed))
        });
        // The root was checked above, so it is always the first record.
        let root = records.next().ok_or(SceneError::NotFound(node))?;
        Ok(RemovedSubtree {
            parent,
            index,
            root,
            descendants: records.collect(),
        })
    }
    /// Put a previously detached subtree back where it came from, keeping its IDs.
    pub(crate) fn restore_subtree(
        &mut self,
        subtree: &RemovedSubtree,
    ) -> Result<NodeID, crate::commands::CommandError> {
        use crate::commands::CommandError;
        if let Some(parent) = subtree.parent {
            match self.get(parent) {
                None => return Err(CommandError::UnknownResource),
                Some(node) if !node.is_group() => return Err(CommandError::MismatchedState),
                Some(_) => (),
            }
        }
        // IDs are never reused, so an ID already present means history and graph disagree.
        if subtree.ids().any(|id| self.contains(id)) || subtree.root.parent != subtree.parent {
            return Err(CommandError::MismatchedState);
        }
        if subtree
            .records()
            .any(|record| !record.children.is_empty() && !record.kind.can_have_children())
        {
            return Err(CommandError::MismatchedState);
        }

        let siblings = self
            .children_of(subtree.parent)
            .map_err(|_| CommandError::UnknownResource)?
            .len();
        if subtree.index > siblings {
            return Err(CommandError::MismatchedState);
        }

        for record in subtree.records() {
            self.ids.reserve(record.id);
            self.nodes.insert(record.id, record.to_node());
        }
        let root = subtree.root.id;
        self.order_mut(subtree.parent)
            .map_err(|_| CommandError::UnknownResource)?
            .insert(subtree.index, root);
        Ok(root)
    }
    /// Set the node's own flag. Returns the previous value.
    pub fn set_flag(&mut self, id: NodeID, flag: Flag, value: bool) -> Result<bool, SceneError> {
        let node = self.node_mut(id)?;
        let previous = node.flag(flag);
        node.flags.set(flag.bits(), value);
        Ok(previous)
    }
    pub fn set_visible(&mut self, id: NodeID, value: bool) -> Result<(), SceneError> {
        self.set_flag(id, Flag::Visible, value).map(|_| ())
    }
    pub fn set_render_enabled(&mut self, id: NodeID, value: bool) -> Result<(), SceneError> {
        self.set_flag(id, Flag::RenderEnabled, value).map(|_| ())
    }
    /// Replace the node's label. Returns the old one.
    pub fn set_label(
        &mut self,
        id: NodeID,
        label: impl Into<String>,
    ) -> Result<String, SceneError> {
        let node = self.node_mut(id)?;
        Ok(std::mem::replace(&mut node.label, label.into()))
    }
}

pub struct Ancestors<'g> {
    graph: &'g SceneGraph,
    next: Option<NodeID>,
}
impl Iterator for Ancestors<'_> {
    type Item = NodeID;
    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.graph.nodes.get(&current).and_then(Node::parent);
        Some(current)
    }
}

/// Pre-order walk yielding `(depth, id)`.
pub struct Descendants<'g> {
    graph: &'g SceneGraph,
    stack: Vec<(usize, NodeID)>,
}
impl Iterator for Descendants<'_> {
    type Item = (usize, NodeID);
    fn next(&mut self) -> Option<Self::Item> {
        let (depth, id) = self.stack.pop()?;
        if let Some(node) = self.graph.nodes.get(&id) {
            self.stack
                .extend(node.children.iter().rev().map(|child| (depth + 1, *child)));
        }
        Some((depth, id))
    }
}
