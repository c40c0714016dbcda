use super::commands::Command;
use super::{Flag, NodeKind, SceneError, SceneGraph};
use crate::commands::CommandWrite;
use crate::id::NodeID;

/// Mutates a [`SceneGraph`], recording every change made as a [`Command`].
///
/// Changes that turn out to change nothing (moving a node to where it already is, setting a flag to its
/// current value) are not recorded.
pub struct SceneWriter<'a, Write: CommandWrite<Command>> {
    writer: Write,
    graph: &'a mut SceneGraph,
}
impl<Write: CommandWrite<Command>> std::ops::Deref for SceneWriter<'_, Write> {
    type Target = SceneGraph;
    fn deref(&self) -> &Self::Target {
        self.graph
    }
}
impl<'a, Write: CommandWrite<Command>> SceneWriter<'a, Write> {
    pub fn new(writer: Write, graph: &'a mut SceneGraph) -> Self {
        Self { writer, graph }
    }
    pub fn create_node(
        &mut self,
        kind: NodeKind,
        label: impl Into<String>,
        parent: Option<NodeID>,
    ) -> Result<NodeID, SceneError> {
        let label = label.into();
        let target = self.graph.create_node(kind, label.clone(), parent)?;
        self.writer.write(Command::Created {
            target,
            kind,
            label,
            parent,
            child_idx: self.graph.index_of(target)?,
        });
        Ok(target)
    }
    /// See [`SceneGraph::move_node`]. Returns whether the node actually went anywhere.
    pub fn move_node(
        &mut self,
        target: NodeID,
        new_parent: Option<NodeID>,
        index: Option<usize>,
    ) -> Result<bool, SceneError> {
        let old_parent = self.graph.parent_of(target)?;
        let old_child_idx = self.graph.index_of(target)?;
        self.graph.move_node(target, new_parent, index)?;
        let new_child_idx = self.graph.index_of(target)?;

        if old_parent == new_parent && old_child_idx == new_child_idx {
            return Ok(false);
        }
        self.writer.write(Command::Moved {
            target,
            old_parent,
            old_child_idx,
            new_parent,
            new_child_idx,
        });
        Ok(true)
    }
    pub fn remove_subtree(
        &mut self,
        target: NodeID,
    ) -> Result<hashbrown::HashSet<NodeID>, SceneError> {
        let subtree = self.graph.detach_subtree(target)?;
        let removed = subtree.ids().collect();
        self.writer.write(Command::Removed(subtree));
        Ok(removed)
    }
    /// Set the node's own flag. Returns the previous value.
    pub fn set_flag(&mut self, target: NodeID, flag: Flag, to: bool) -> Result<bool, SceneError> {
        let from = self.graph.set_flag(target, flag, to)?;
        if from != to {
            self.writer.write(Command::FlagChanged {
                target,
                flag,
                from,
                to,
            });
        }
        Ok(from)
    }
    pub fn rename(&mut self, target: NodeID, label: impl Into<String>) -> Result<(), SceneError> {
        let to = label.into();
        let from = self.graph.set_label(target, to.clone())?;
        if from != to {
            self.writer.write(Command::Renamed { target, from, to });
        }
        Ok(())
    }
}
