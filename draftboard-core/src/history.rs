//! # History
//!
//! Linear undo/redo. Each entry is one user-visible step, however many commands it took. Making a new change
//! after undoing throws the undone entries away.

use crate::commands::{Command, CommandConsumer, CommandError, DoUndo};

#[derive(Clone, Debug, PartialEq)]
pub struct Entry {
    /// Human readable description, e.g. "Move 3 items".
    pub label: String,
    pub command: Command,
}

#[derive(Debug)]
pub struct History {
    /// Oldest first.
    done: std::collections::VecDeque<Entry>,
    /// Most recently undone last.
    undone: Vec<Entry>,
    depth: usize,
}
impl History {
    /// Keep at most `depth` undoable steps. Zero disables history.
    #[must_use]
    pub fn new(depth: usize) -> Self {
        Self {
            done: std::collections::VecDeque::new(),
            undone: Vec::new(),
            depth,
        }
    }
    pub fn push(&mut self, entry: Entry) {
        self.undone.clear();
        if self.depth == 0 {
            return;
        }
        while self.done.len() >= self.depth {
            self.done.pop_front();
        }
        self.done.push_back(entry);
    }
    /// Revert the most recent step on `consumer`. `Ok(None)` if there was nothing to undo.
    ///
    /// If the consumer rejects it, history is left unchanged.
    pub fn undo(
        &mut self,
        consumer: &mut impl CommandConsumer<Command>,
    ) -> Result<Option<&Entry>, CommandError> {
        let Some(entry) = self.done.pop_back() else {
            return Ok(None);
        };
        if let Err(err) = consumer.apply(DoUndo::Undo(&entry.command)) {
            log::warn!("failed to undo {:?}: {err}", entry.label);
            self.done.push_back(entry);
            return Err(err);
        }
        self.undone.push(entry);
        Ok(self.undone.last())
    }
    /// Re-apply the most recently undone step on `consumer`. `Ok(None)` if there was nothing to redo.
    pub fn redo(
        &mut self,
        consumer: &mut impl CommandConsumer<Command>,
    ) -> Result<Option<&Entry>, CommandError> {
        let Some(entry) = self.undone.pop() else {
            return Ok(None);
        };
        if let Err(err) = consumer.apply(DoUndo::Do(&entry.command)) {
            log::warn!("failed to redo {:?}: {err}", entry.label);
            self.undone.push(entry);
            return Err(err);
        }
        self.done.push_back(entry);
        Ok(self.done.back())
    }
    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.done.is_empty()
    }
    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.undone.is_empty()
    }
    #[must_use]
    pub fn undo_label(&self) -> Option<&str> {
        self.done.back().map(|entry| entry.label.as_str())
    }
    #[must_use]
    pub fn redo_label(&self) -> Option<&str> {
        self.undone.last().map(|entry| entry.label.as_str())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::commands::SceneCommand;
    use crate::id::NodeID;

    /// Just keeps a counter. Commands are all renames "n" -> "n+1".
    struct Counter(u32);
    impl CommandConsumer<Command> for Counter {
        fn apply(&mut self, command: DoUndo<'_, Command>) -> Result<(), CommandError> {
            let Command::Scene(SceneCommand::Renamed { from, to, .. }) = command.inner() else {
                return Err(CommandError::UnknownResource);
            };
            let (from, to) = match command {
                DoUndo::Do(_) => (from, to),
                DoUndo::Undo(_) => (to, from),
            };
            if from.parse::<u32>() != Ok(self.0) {
                return Err(CommandError::MismatchedState);
            }
            self.0 = to.parse().map_err(|_| CommandError::MismatchedState)?;
            Ok(())
        }
    }
    fn step(n: u32) -> Entry {
        Entry {
            label: format!("Step {n}"),
            command: SceneCommand::Renamed {
                target: NodeID::from_raw(1).unwrap(),
                from: n.to_string(),
                to: (n + 1).to_string(),
            }
            .into(),
        }
    }

    #[test]
    fn undo_redo() {
        let mut history = History::new(8);
        let mut counter = Counter(2);
        history.push(step(0));
        history.push(step(1));
        assert_eq!(history.undo_label(), Some("Step 1"));

        assert!(history.undo(&mut counter).unwrap().is_some());
        assert!(history.undo(&mut counter).unwrap().is_some());
        assert_eq!(counter.0, 0);
        assert!(history.undo(&mut counter).unwrap().is_none());
        assert!(!history.can_undo());

        assert_eq!(history.redo(&mut counter).unwrap().map(|e| e.label.as_str()), Some("Step 0"));
        assert_eq!(counter.0, 1);
        assert_eq!(history.redo_label(), Some("Step 1"));
    }
    #[test]
    fn new_edit_drops_redo() {
        let mut history = History::new(8);
        let mut counter = Counter(1);
        history.push(step(0));
        history.undo(&mut counter).unwrap();
        assert!(history.can_redo());
        history.push(step(0));
        assert!(!history.can_redo());
    }
    #[test]
    fn bounded_depth() {
        let mut history = History::new(2);
        for n in 0..5 {
            history.push(step(n));
        }
        let mut counter = Counter(5);
        assert!(history.undo(&mut counter).unwrap().is_some());
        assert!(history.undo(&mut counter).unwrap().is_some());
        assert!(history.undo(&mut counter).unwrap().is_none());
        assert_eq!(counter.0, 3);

        let mut disabled = History::new(0);
        disabled.push(step(0));
        assert!(!disabled.can_undo());
    }
    #[test]
    fn failed_undo_keeps_entry() {
        let mut history = History::new(8);
        history.push(step(0));
        // Out of sync with the entry.
        let mut counter = Counter(7);
        assert_eq!(
            history.undo(&mut counter),
            Err(CommandError::MismatchedState)
        );
        assert!(history.can_undo());
        assert!(!history.can_redo());
        assert_eq!(counter.0, 7);
    }
}
