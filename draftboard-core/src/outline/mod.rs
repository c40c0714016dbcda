//! # Outline
//!
//! The [`OutlineController`] is where user intents from the outliner (select, toggle, rename, drag-and-drop,
//! undo) meet the scene. It owns the [`SceneGraph`] and is the only thing that mutates it, so every change
//! goes through the same path: validate, apply through a [`SceneWriter`] that records what happened, then
//! commit. Committing pushes the recorded commands to history, tells subscribers, and invalidates the display
//! cache if the tree's shape changed.
//!
//! A rejected operation is a no-op: nothing is applied, recorded, or announced.

mod display;
mod drag_drop;
mod propagation;

pub use display::{DisplayState, Reconciliation};
pub use propagation::Propagation;

use crate::commands::{Command, CommandConsumer, CommandError, DoUndo};
use crate::config::OutlineConfig;
use crate::events::{self, ChangeEvent, Listeners};
use crate::history::{Entry, History};
use crate::id::NodeID;
use crate::scene::writer::SceneWriter;
use crate::scene::{Flag, NodeKind, SceneError, SceneGraph};

/// Commands written during one transaction. Almost always exactly one.
pub type CommandBuffer = smallvec::SmallVec<[Command; 1]>;

pub struct OutlineController {
    graph: SceneGraph,
    history: History,
    listeners: Listeners,
    display: display::DisplayCache,
    selection: hashbrown::HashSet<NodeID>,
    config: OutlineConfig,
    /// Bumped on every committed change, including undo and redo.
    revision: u64,
}
impl Default for OutlineController {
    fn default() -> Self {
        Self::new(OutlineConfig::default())
    }
}
impl OutlineController {
    #[must_use]
    pub fn new(config: OutlineConfig) -> Self {
        Self::with_graph(SceneGraph::default(), config)
    }
    /// Take over an existing graph, e.g. one rebuilt from a snapshot. History starts empty.
    #[must_use]
    pub fn with_graph(graph: SceneGraph, config: OutlineConfig) -> Self {
        Self {
            graph,
            history: History::new(config.history_depth),
            listeners: Listeners::default(),
            display: display::DisplayCache::default(),
            selection: hashbrown::HashSet::new(),
            config,
            revision: 0,
        }
    }
    #[must_use]
    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }
    #[must_use]
    pub fn config(&self) -> &OutlineConfig {
        &self.config
    }
    /// Changes every time anything is committed. Cheap way to tell if a document was modified.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }
    /// Receive every [`ChangeEvent`] committed from now on, in order.
    pub fn subscribe(&mut self) -> crossbeam::channel::Receiver<ChangeEvent> {
        self.listeners.subscribe()
    }

    /// Run `write` against the scene as one undoable step.
    ///
    /// If `write` fails, whatever it had already changed is reverted and nothing is recorded or announced.
    pub fn transaction<T>(
        &mut self,
        label: impl Into<String>,
        write: impl FnOnce(&mut SceneWriter<'_, &mut CommandBuffer>) -> Result<T, SceneError>,
    ) -> Result<T, SceneError> {
        let mut commands = CommandBuffer::new();
        let result = write(&mut SceneWriter::new(&mut commands, &mut self.graph));
        match result {
            Ok(value) => {
                self.commit(label.into(), commands);
                Ok(value)
            }
            Err(err) => {
                log::debug!("rejected {:?}: {err}", label.into());
                for command in commands.iter().rev() {
                    if let Err(revert) = self.graph.apply(DoUndo::Undo(command)) {
                        log::error!("failed to roll back {command:?}: {revert}");
                    }
                }
                Err(err)
            }
        }
    }
    fn commit(&mut self, label: String, mut commands: CommandBuffer) {
        let command = if commands.len() > 1 {
            Command::Scope(commands.into_iter().collect())
        } else if let Some(command) = commands.pop() {
            command
        } else {
            // Nothing changed.
            return;
        };
        self.announce(DoUndo::Do(&command));
        self.history.push(Entry { label, command });
    }
    /// Tell everyone about a command that was just applied.
    fn announce(&mut self, command: DoUndo<'_, Command>) {
        log::trace!("{command:?}");
        let mut events = Vec::new();
        events::events_of(command, &mut events);
        if events.iter().any(ChangeEvent::is_structural) {
            self.display.invalidate();
            self.selection.retain(|id| self.graph.contains(*id));
        }
        self.listeners.broadcast(&events);
        self.revision += 1;
    }

    pub fn create_node(
        &mut self,
        kind: NodeKind,
        label: impl Into<String>,
        parent: Option<NodeID>,
    ) -> Result<NodeID, SceneError> {
        let label = label.into();
        let id = self.transaction(format!("Create {label}"), |writer| {
            writer.create_node(kind, label, parent)
        })?;
        if self.config.select_created {
            self.selection.clear();
            self.selection.insert(id);
        }
        Ok(id)
    }
    pub fn rename(&mut self, id: NodeID, label: impl Into<String>) -> Result<(), SceneError> {
        self.transaction("Rename", |writer| writer.rename(id, label))
    }
    /// Delete the node and everything below it. Returns every removed ID.
    pub fn remove_subtree(
        &mut self,
        id: NodeID,
    ) -> Result<hashbrown::HashSet<NodeID>, SceneError> {
        let label = format!("Delete {}", self.label_of(id)?);
        self.transaction(label, |writer| writer.remove_subtree(id))
    }
    /// See [`SceneGraph::move_node`].
    pub fn move_node(
        &mut self,
        id: NodeID,
        new_parent: Option<NodeID>,
        index: Option<usize>,
    ) -> Result<(), SceneError> {
        let label = format!("Move {}", self.label_of(id)?);
        self.transaction(label, |writer| writer.move_node(id, new_parent, index))
            .map(|_| ())
    }
    pub fn set_visible(&mut self, id: NodeID, value: bool) -> Result<(), SceneError> {
        self.set_flag(id, Flag::Visible, value).map(|_| ())
    }
    pub fn set_render_enabled(&mut self, id: NodeID, value: bool) -> Result<(), SceneError> {
        self.set_flag(id, Flag::RenderEnabled, value).map(|_| ())
    }
    pub fn toggle_visibility(&mut self, id: NodeID) -> Result<Propagation, SceneError> {
        self.toggle(id, Flag::Visible)
    }
    pub fn toggle_render(&mut self, id: NodeID) -> Result<Propagation, SceneError> {
        self.toggle(id, Flag::RenderEnabled)
    }
    fn toggle(&mut self, id: NodeID, flag: Flag) -> Result<Propagation, SceneError> {
        let own = !self
            .graph
            .get(id)
            .ok_or(SceneError::NotFound(id))?
            .flag(flag);
        self.set_flag(id, flag, own)
    }
    fn set_flag(&mut self, id: NodeID, flag: Flag, value: bool) -> Result<Propagation, SceneError> {
        let before = self.graph.effective(id, flag)?;
        let label = match (flag, value) {
            (Flag::Visible, true) => "Show",
            (Flag::Visible, false) => "Hide",
            (Flag::RenderEnabled, true) => "Enable render",
            (Flag::RenderEnabled, false) => "Disable render",
        };
        self.transaction(label, |writer| writer.set_flag(id, flag, value))?;
        Ok(Propagation {
            root: id,
            flag,
            own: value,
            affected: propagation::affected(&self.graph, id, flag, before)?,
        })
    }
    /// Drop `dragged` into `target` (or the top level), just above what is currently at `position` among
    /// the target's children. Returns every node whose place or children changed: the moved nodes, the groups
    /// they left, and the target.
    ///
    /// All or nothing. If any dragged node can't go there, none of them move.
    pub fn handle_drop(
        &mut self,
        dragged: &[NodeID],
        target: Option<NodeID>,
        position: usize,
    ) -> Result<hashbrown::HashSet<NodeID>, SceneError> {
        let plan = drag_drop::plan(&self.graph, dragged, target, position).inspect_err(|err| {
            log::debug!("rejected drop: {err}");
        })?;
        let label = match plan.moves.as_slice() {
            [one] => format!("Move {}", self.label_of(*one)?),
            many => format!("Move {} items", many.len()),
        };
        self.transaction(label, |writer| {
            let mut changed = hashbrown::HashSet::new();
            for &id in &plan.moves {
                let old_parent = writer.parent_of(id)?;
                let index = plan.index_for(writer, id)?;
                if writer.move_node(id, plan.target, index)? {
                    changed.insert(id);
                    changed.extend(old_parent);
                    changed.extend(plan.target);
                }
            }
            Ok(changed)
        })
    }
    fn label_of(&self, id: NodeID) -> Result<&str, SceneError> {
        self.graph
            .get(id)
            .map(crate::scene::Node::label)
            .ok_or(SceneError::NotFound(id))
    }

    /// Revert the last step. Returns false if there was nothing to undo.
    pub fn undo(&mut self) -> Result<bool, CommandError> {
        Ok(self.undo_n(1)? == 1)
    }
    pub fn redo(&mut self) -> Result<bool, CommandError> {
        Ok(self.redo_n(1)? == 1)
    }
    /// Revert up to `count` steps. Returns how many were actually reverted.
    pub fn undo_n(&mut self, count: usize) -> Result<usize, CommandError> {
        for done in 0..count {
            let Some(entry) = self.history.undo(&mut self.graph)? else {
                return Ok(done);
            };
            let command = entry.command.clone();
            self.announce(DoUndo::Undo(&command));
        }
        Ok(count)
    }
    /// Re-apply up to `count` undone steps. Returns how many were actually re-applied.
    pub fn redo_n(&mut self, count: usize) -> Result<usize, CommandError> {
        for done in 0..count {
            let Some(entry) = self.history.redo(&mut self.graph)? else {
                return Ok(done);
            };
            let command = entry.command.clone();
            self.announce(DoUndo::Do(&command));
        }
        Ok(count)
    }
    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }
    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }
    #[must_use]
    pub fn undo_label(&self) -> Option<&str> {
        self.history.undo_label()
    }
    #[must_use]
    pub fn redo_label(&self) -> Option<&str> {
        self.history.redo_label()
    }

    /// Replace the selection with just `id`.
    pub fn select(&mut self, id: NodeID) -> Result<(), SceneError> {
        if !self.graph.contains(id) {
            return Err(SceneError::NotFound(id));
        }
        self.selection.clear();
        self.selection.insert(id);
        Ok(())
    }
    /// Add `id` to the selection, or take it out if it is already selected.
    pub fn select_extend(&mut self, id: NodeID) -> Result<(), SceneError> {
        if !self.graph.contains(id) {
            return Err(SceneError::NotFound(id));
        }
        if !self.selection.remove(&id) {
            self.selection.insert(id);
        }
        Ok(())
    }
    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }
    /// Selected nodes, in outliner order. Ready to hand to [`Self::handle_drop`].
    #[must_use]
    pub fn selection(&self) -> Vec<NodeID> {
        self.graph
            .iter_display_order()
            .map(|(_, id)| id)
            .filter(|id| self.selection.contains(id))
            .collect()
    }

    /// Compare the handles the presentation holds (`known_live`) against the tree. Afterwards every node of
    /// the tree is considered realized, including those returned in `to_create`.
    pub fn reconcile_display_cache(
        &mut self,
        known_live: &hashbrown::HashSet<NodeID>,
    ) -> Reconciliation {
        let present = self.graph.iter_display_order().map(|(_, id)| id);
        self.display.reconcile(present, known_live)
    }
    /// The presentation built handles for these nodes.
    pub fn realize(&mut self, ids: impl IntoIterator<Item = NodeID>) {
        self.display.realize(ids);
    }
    #[must_use]
    pub fn display_state(&self, id: NodeID) -> DisplayState {
        self.display.state(id)
    }
    /// Has the tree changed shape since the last reconcile?
    #[must_use]
    pub fn needs_reconcile(&self) -> bool {
        self.display.needs_reconcile()
    }
}
