use super::{Flag, NodeKind, NodeRecord, RemovedSubtree, SceneGraph};
use crate::commands::{CommandConsumer, CommandError, DoUndo};
use crate::id::NodeID;

#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    Created {
        target: NodeID,
        kind: NodeKind,
        label: String,
        /// Parent, or None if root.
        parent: Option<NodeID>,
        child_idx: usize,
    },
    Moved {
        target: NodeID,
        /// Old parent, or None if root.
        old_parent: Option<NodeID>,
        old_child_idx: usize,
        /// New parent, or None if root.
        new_parent: Option<NodeID>,
        new_child_idx: usize,
    },
    /// A whole subtree was deleted. Holds every removed node so it can be brought back.
    Removed(RemovedSubtree),
    FlagChanged {
        target: NodeID,
        flag: Flag,
        from: bool,
        to: bool,
    },
    Renamed {
        target: NodeID,
        from: String,
        to: String,
    },
}
impl Command {
    /// The node this command is about. For removals, the root of the removed subtree.
    #[must_use]
    pub fn target(&self) -> NodeID {
        match self {
            Self::Created { target, .. }
            | Self::Moved { target, .. }
            | Self::FlagChanged { target, .. }
            | Self::Renamed { target, .. } => *target,
            Self::Removed(subtree) => subtree.root.id,
        }
    }
    /// Does this change who is parented where?
    #[must_use]
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::Created { .. } | Self::Moved { .. } | Self::Removed(..)
        )
    }
}

impl CommandConsumer<Command> for SceneGraph {
    fn apply(&mut self, command: DoUndo<'_, Command>) -> Result<(), CommandError> {
        match command {
            DoUndo::Do(Command::Created {
                target,
                kind,
                label,
                parent,
                child_idx,
            }) => {
                // Only reachable with undo then redo. Bring back the very same node.
                let subtree = RemovedSubtree {
                    parent: *parent,
                    index: *child_idx,
                    root: NodeRecord {
                        id: *target,
                        kind: *kind,
                        label: label.clone(),
                        visible: true,
                        render_enabled: true,
                        parent: *parent,
                        children: Vec::new(),
                    },
                    descendants: Vec::new(),
                };
                self.restore_subtree(&subtree).map(|_| ())
            }
            DoUndo::Undo(Command::Created {
                target,
                parent,
                child_idx,
                ..
            }) => {
                let node = self.get(*target).ok_or(CommandError::UnknownResource)?;
                // Anything created below it since would go with it - that's a history mismatch.
                if node.parent != *parent || !node.children.is_empty() {
                    return Err(CommandError::MismatchedState);
                }
                if self.index_of(*target)? != *child_idx {
                    return Err(CommandError::MismatchedState);
                }
                self.detach_subtree(*target)?;
                Ok(())
            }
            DoUndo::Do(Command::Moved {
                target,
                old_parent,
                old_child_idx,
                new_parent,
                new_child_idx,
            })
            | DoUndo::Undo(Command::Moved {
                target,
                old_parent: new_parent,
                old_child_idx: new_child_idx,
                new_parent: old_parent,
                new_child_idx: old_child_idx,
            }) => {
                // Check it is still where the command thinks it is.
                if self.parent_of(*target)? != *old_parent
                    || self.index_of(*target)? != *old_child_idx
                {
                    return Err(CommandError::MismatchedState);
                }
                self.move_node(*target, *new_parent, Some(*new_child_idx))?;
                Ok(())
            }
            DoUndo::Do(Command::Removed(subtree)) => {
                let root = subtree.root.id;
                if self.parent_of(root)? != subtree.parent || self.index_of(root)? != subtree.index
                {
                    return Err(CommandError::MismatchedState);
                }
                // Don't take away more (or less) than the command describes.
                let expected = subtree.ids();
                let actual = std::iter::once(root).chain(self.descendants(root)?.map(|(_, id)| id));
                if !expected.eq(actual) {
                    return Err(CommandError::MismatchedState);
                }
                self.detach_subtree(root)?;
                Ok(())
            }
            DoUndo::Undo(Command::Removed(subtree)) => self.restore_subtree(subtree).map(|_| ()),
            DoUndo::Do(Command::FlagChanged {
                target,
                flag,
                from,
                to,
            })
            | DoUndo::Undo(Command::FlagChanged {
                target,
                flag,
                from: to,
                to: from,
            }) => {
                let node = self.get(*target).ok_or(CommandError::UnknownResource)?;
                if node.flag(*flag) != *from {
                    return Err(CommandError::MismatchedState);
                }
                self.set_flag(*target, *flag, *to)?;
                Ok(())
            }
            DoUndo::Do(Command::Renamed { target, from, to })
            | DoUndo::Undo(Command::Renamed {
                target,
                from: to,
                to: from,
            }) => {
                let node = self.get(*target).ok_or(CommandError::UnknownResource)?;
                if node.label() != from {
                    return Err(CommandError::MismatchedState);
                }
                self.set_label(*target, to.clone())?;
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::commands;
    use crate::scene::writer::SceneWriter;

    type Commands = smallvec::SmallVec<[commands::Command; 1]>;

    fn write(graph: &mut SceneGraph, f: impl FnOnce(&mut SceneWriter<'_, &mut Commands>)) -> Commands {
        let mut commands = Commands::new();
        f(&mut SceneWriter::new(&mut commands, graph));
        commands
    }
    fn undo_all(graph: &mut SceneGraph, commands: &Commands) {
        for command in commands.iter().rev() {
            graph.apply(DoUndo::Undo(command)).unwrap();
        }
    }
    fn redo_all(graph: &mut SceneGraph, commands: &Commands) {
        for command in commands {
            graph.apply(DoUndo::Do(command)).unwrap();
        }
    }

    #[test]
    fn undo_redo_round_trip() {
        let mut graph = SceneGraph::default();
        let group = graph.create_node(NodeKind::Group, "Group", None).unwrap();
        let before = graph.snapshot();

        let commands = write(&mut graph, |w| {
            let circle = w.create_node(NodeKind::Circle, "Circle", Some(group)).unwrap();
            let line = w.create_node(NodeKind::Line, "Line", None).unwrap();
            w.move_node(line, Some(group), Some(0)).unwrap();
            w.set_flag(circle, Flag::Visible, false).unwrap();
            w.rename(group, "Shapes").unwrap();
        });
        assert_eq!(commands.len(), 5);
        let after = graph.snapshot();

        undo_all(&mut graph, &commands);
        assert_eq!(graph.snapshot(), before);
        redo_all(&mut graph, &commands);
        assert_eq!(graph.snapshot(), after);
    }
    #[test]
    fn undo_removal_restores_subtree() {
        let mut graph = SceneGraph::default();
        let outer = graph.create_node(NodeKind::Group, "Outer", None).unwrap();
        let inner = graph.create_node(NodeKind::Group, "Inner", Some(outer)).unwrap();
        graph.create_node(NodeKind::Point, "P", Some(inner)).unwrap();
        graph.create_node(NodeKind::Point, "Q", None).unwrap();
        let before = graph.snapshot();

        let commands = write(&mut graph, |w| {
            w.remove_subtree(outer).unwrap();
        });
        assert!(!graph.contains(inner));
        undo_all(&mut graph, &commands);
        assert_eq!(graph.snapshot(), before);
    }
    #[test]
    fn mismatched_state_is_untouched() {
        let mut graph = SceneGraph::default();
        let point = graph.create_node(NodeKind::Point, "P", None).unwrap();
        let stale = commands::Command::from(Command::Renamed {
            target: point,
            from: "Something else".to_owned(),
            to: "New".to_owned(),
        });
        let before = graph.snapshot();
        assert_eq!(
            graph.apply(DoUndo::Do(&stale)),
            Err(CommandError::MismatchedState)
        );
        assert_eq!(graph.snapshot(), before);
    }
    #[test]
    fn failing_scope_reverts_earlier_commands() {
        let mut graph = SceneGraph::default();
        let point = graph.create_node(NodeKind::Point, "P", None).unwrap();
        let before = graph.snapshot();
        let scope = commands::Command::Scope(
            vec![
                Command::FlagChanged {
                    target: point,
                    flag: Flag::Visible,
                    from: true,
                    to: false,
                }
                .into(),
                // Doesn't match, fails the whole scope.
                Command::FlagChanged {
                    target: point,
                    flag: Flag::RenderEnabled,
                    from: false,
                    to: true,
                }
                .into(),
            ]
            .into_boxed_slice(),
        );
        assert!(graph.apply(DoUndo::Do(&scope)).is_err());
        assert_eq!(graph.snapshot(), before);
    }
    #[test]
    fn redo_create_at_drifted_index_fails() {
        let mut graph = SceneGraph::default();
        let first = graph.create_node(NodeKind::Point, "First", None).unwrap();
        let drifted = commands::Command::from(Command::Created {
            target: NodeID::from_raw(500).unwrap(),
            kind: NodeKind::Line,
            label: "Line".to_owned(),
            parent: None,
            child_idx: 3,
        });
        let before = graph.snapshot();
        assert_eq!(
            graph.apply(DoUndo::Do(&drifted)),
            Err(CommandError::MismatchedState)
        );
        assert_eq!(graph.snapshot(), before);
        assert_eq!(graph.roots(), &[first]);
    }
    #[test]
    fn writer_skips_noops() {
        let mut graph = SceneGraph::default();
        let point = graph.create_node(NodeKind::Point, "P", None).unwrap();
        let commands = write(&mut graph, |w| {
            assert!(!w.move_node(point, None, None).unwrap());
            w.set_flag(point, Flag::Visible, true).unwrap();
            w.rename(point, "P").unwrap();
        });
        assert!(commands.is_empty());
    }
}
