//! # Change notifications
//!
//! Every committed change to a document, including undo and redo, is described to listeners as a list of
//! [`ChangeEvent`]s, in the order the changes were applied. Events are derived from the recorded commands,
//! so what listeners see is exactly what the history holds.

use crate::commands::{Command, DoUndo, SceneCommand};
use crate::id::NodeID;
use crate::scene::Flag;

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, strum::AsRefStr)]
pub enum ChangeKind {
    Created,
    Moved,
    Removed,
    VisibilityChanged,
    RenderChanged,
    Renamed,
}
impl ChangeKind {
    fn of_flag(flag: Flag) -> Self {
        match flag {
            Flag::Visible => Self::VisibilityChanged,
            Flag::RenderEnabled => Self::RenderChanged,
        }
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum ChangeExtra {
    Created {
        parent: Option<NodeID>,
        index: usize,
    },
    Moved {
        from: Option<NodeID>,
        to: Option<NodeID>,
        index: usize,
    },
    /// Every removed ID in pre-order, the event's node first.
    Removed {
        parent: Option<NodeID>,
        removed: Vec<NodeID>,
    },
    /// The node's new own value.
    Flag { value: bool },
    Renamed { label: String },
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub node: NodeID,
    pub extra: ChangeExtra,
}
impl ChangeEvent {
    /// Does this change who is parented where?
    #[must_use]
    pub fn is_structural(&self) -> bool {
        matches!(
            self.kind,
            ChangeKind::Created | ChangeKind::Moved | ChangeKind::Removed
        )
    }
}

/// Describe the effect of applying `command` in the given direction, appending to `into`.
pub fn events_of(command: DoUndo<'_, Command>, into: &mut Vec<ChangeEvent>) {
    match command {
        DoUndo::Do(Command::Scene(scene)) => scene_events(DoUndo::Do(scene), into),
        DoUndo::Undo(Command::Scene(scene)) => scene_events(DoUndo::Undo(scene), into),
        DoUndo::Do(Command::Scope(commands)) => {
            for command in commands.iter() {
                events_of(DoUndo::Do(command), into);
            }
        }
        DoUndo::Undo(Command::Scope(commands)) => {
            for command in commands.iter().rev() {
                events_of(DoUndo::Undo(command), into);
            }
        }
    }
}

fn scene_events(command: DoUndo<'_, SceneCommand>, into: &mut Vec<ChangeEvent>) {
    match command {
        DoUndo::Do(SceneCommand::Created {
            target,
            parent,
            child_idx,
            ..
        }) => into.push(ChangeEvent {
            kind: ChangeKind::Created,
            node: *target,
            extra: ChangeExtra::Created {
                parent: *parent,
                index: *child_idx,
            },
        }),
        DoUndo::Undo(SceneCommand::Created { target, parent, .. }) => into.push(ChangeEvent {
            kind: ChangeKind::Removed,
            node: *target,
            extra: ChangeExtra::Removed {
                parent: *parent,
                removed: vec![*target],
            },
        }),
        DoUndo::Do(SceneCommand::Moved {
            target,
            old_parent,
            new_parent,
            new_child_idx,
            ..
        })
        | DoUndo::Undo(SceneCommand::Moved {
            target,
            old_parent: new_parent,
            new_parent: old_parent,
            old_child_idx: new_child_idx,
            ..
        }) => into.push(ChangeEvent {
            kind: ChangeKind::Moved,
            node: *target,
            extra: ChangeExtra::Moved {
                from: *old_parent,
                to: *new_parent,
                index: *new_child_idx,
            },
        }),
        DoUndo::Do(SceneCommand::Removed(subtree)) => into.push(ChangeEvent {
            kind: ChangeKind::Removed,
            node: subtree.root.id,
            extra: ChangeExtra::Removed {
                parent: subtree.parent,
                removed: subtree.ids().collect(),
            },
        }),
        DoUndo::Undo(SceneCommand::Removed(subtree)) => {
            // Everything comes back, parents before their children.
            into.push(ChangeEvent {
                kind: ChangeKind::Created,
                node: subtree.root.id,
                extra: ChangeExtra::Created {
                    parent: subtree.parent,
                    index: subtree.index,
                },
            });
            for record in &subtree.descendants {
                let index = subtree
                    .records()
                    .find(|parent| Some(parent.id) == record.parent)
                    .and_then(|parent| parent.children.iter().position(|id| *id == record.id))
                    .unwrap_or_default();
                into.push(ChangeEvent {
                    kind: ChangeKind::Created,
                    node: record.id,
                    extra: ChangeExtra::Created {
                        parent: record.parent,
                        index,
                    },
                });
            }
        }
        DoUndo::Do(SceneCommand::FlagChanged {
            target, flag, to, ..
        })
        | DoUndo::Undo(SceneCommand::FlagChanged {
            target,
            flag,
            from: to,
            ..
        }) => into.push(ChangeEvent {
            kind: ChangeKind::of_flag(*flag),
            node: *target,
            extra: ChangeExtra::Flag { value: *to },
        }),
        DoUndo::Do(SceneCommand::Renamed { target, to, .. })
        | DoUndo::Undo(SceneCommand::Renamed {
            target, from: to, ..
        }) => into.push(ChangeEvent {
            kind: ChangeKind::Renamed,
            node: *target,
            extra: ChangeExtra::Renamed { label: to.clone() },
        }),
    }
}

/// Subscribers to a document's changes.
#[derive(Default)]
pub(crate) struct Listeners {
    senders: Vec<crossbeam::channel::Sender<ChangeEvent>>,
}
impl Listeners {
    pub fn subscribe(&mut self) -> crossbeam::channel::Receiver<ChangeEvent> {
        let (send, recv) = crossbeam::channel::unbounded();
        self.senders.push(send);
        recv
    }
    /// Send every event to every listener, forgetting listeners that hung up.
    pub fn broadcast(&mut self, events: &[ChangeEvent]) {
        if events.is_empty() {
            return;
        }
        self.senders.retain(|sender| {
            events
                .iter()
                .all(|event| sender.send(event.clone()).is_ok())
        });
    }
    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.senders.len()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::scene::{writer::SceneWriter, NodeKind, SceneGraph};

    type Commands = smallvec::SmallVec<[Command; 1]>;

    #[test]
    fn undo_events_mirror_do() {
        let mut graph = SceneGraph::default();
        let group = graph.create_node(NodeKind::Group, "G", None).unwrap();
        let mut commands = Commands::new();
        let point = {
            let mut writer = SceneWriter::new(&mut commands, &mut graph);
            let point = writer.create_node(NodeKind::Point, "P", None).unwrap();
            writer.move_node(point, Some(group), None).unwrap();
            writer.set_flag(point, Flag::Visible, false).unwrap();
            point
        };
        let scope = Command::Scope(commands.into_iter().collect());

        let mut done = Vec::new();
        events_of(DoUndo::Do(&scope), &mut done);
        let kinds: Vec<_> = done.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            [
                ChangeKind::Created,
                ChangeKind::Moved,
                ChangeKind::VisibilityChanged
            ]
        );

        let mut undone = Vec::new();
        events_of(DoUndo::Undo(&scope), &mut undone);
        let kinds: Vec<_> = undone.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            [
                ChangeKind::VisibilityChanged,
                ChangeKind::Moved,
                ChangeKind::Removed
            ]
        );
        assert_eq!(undone[0].extra, ChangeExtra::Flag { value: true });
        assert_eq!(
            undone[1].extra,
            ChangeExtra::Moved {
                from: Some(group),
                to: None,
                index: 1
            }
        );
        assert!(undone.iter().all(|e| e.node == point));
    }
    #[test]
    fn restored_subtree_announces_every_node() {
        let mut graph = SceneGraph::default();
        let outer = graph.create_node(NodeKind::Group, "Outer", None).unwrap();
        let a = graph.create_node(NodeKind::Line, "A", Some(outer)).unwrap();
        let b = graph.create_node(NodeKind::Line, "B", Some(outer)).unwrap();
        let mut commands = Commands::new();
        SceneWriter::new(&mut commands, &mut graph)
            .remove_subtree(outer)
            .unwrap();

        let mut events = Vec::new();
        events_of(DoUndo::Undo(&commands[0]), &mut events);
        let created: Vec<_> = events
            .iter()
            .map(|e| (e.node, e.extra.clone()))
            .collect();
        assert_eq!(
            created,
            vec![
                (
                    outer,
                    ChangeExtra::Created {
                        parent: None,
                        index: 0
                    }
                ),
                (
                    a,
                    ChangeExtra::Created {
                        parent: Some(outer),
                        index: 0
                    }
                ),
                (
                    b,
                    ChangeExtra::Created {
                        parent: Some(outer),
                        index: 1
                    }
                ),
            ]
        );
    }
    #[test]
    fn hung_up_listeners_are_pruned() {
        let mut listeners = Listeners::default();
        let keep = listeners.subscribe();
        drop(listeners.subscribe());
        let event = ChangeEvent {
            kind: ChangeKind::Renamed,
            node: NodeID::from_raw(1).unwrap(),
            extra: ChangeExtra::Renamed {
                label: "x".to_owned(),
            },
        };
        listeners.broadcast(std::slice::from_ref(&event));
        assert_eq!(listeners.len(), 1);
        assert_eq!(keep.try_recv(), Ok(event));
    }
}
