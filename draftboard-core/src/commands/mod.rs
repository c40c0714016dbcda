//! # Commands
//!
//! Commands are the way the scene is modified. Every change made through a [`crate::scene::writer::SceneWriter`]
//! is recorded as a command, which is enough to both replay and revert it. History, change notifications and
//! transaction rollback are all built from these.

pub use crate::scene::commands::Command as SceneCommand;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("command constructed for a state that does not match the current state")]
    MismatchedState,
    #[error("resource referenced by the command is not found")]
    UnknownResource,
    #[error("command makes no changes")]
    NoOp,
}
impl From<crate::scene::SceneError> for CommandError {
    fn from(value: crate::scene::SceneError) -> Self {
        match value {
            crate::scene::SceneError::NotFound(_) => Self::UnknownResource,
            _ => Self::MismatchedState,
        }
    }
}

pub trait CommandConsumer<C> {
    /// Apply a single command. If this generates an error,
    /// the state of `self` should *not* be observably changed.
    fn apply(&mut self, command: DoUndo<'_, C>) -> Result<(), CommandError>;
}

#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    Scene(SceneCommand),
    /// Many commands written as part of one larger operation, such as dropping several nodes at once.
    /// Treated as a single command as far as the user can tell.
    Scope(Box<[Command]>),
}
impl From<SceneCommand> for Command {
    fn from(value: SceneCommand) -> Self {
        Self::Scene(value)
    }
}
impl Command {
    #[must_use]
    pub fn scene(&self) -> Option<&SceneCommand> {
        match self {
            Self::Scene(c) => Some(c),
            Self::Scope(_) => None,
        }
    }
}

#[derive(PartialEq, Eq, Debug)]
pub enum DoUndo<'c, T> {
    Do(&'c T),
    Undo(&'c T),
}
// Derive would demand T: Copy.
impl<T> Clone for DoUndo<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T> Copy for DoUndo<'_, T> {}
impl<'c, T> DoUndo<'c, T> {
    /// The same command, in the opposite direction.
    #[must_use]
    pub fn reversed(self) -> Self {
        match self {
            Self::Do(c) => Self::Undo(c),
            Self::Undo(c) => Self::Do(c),
        }
    }
    #[must_use]
    pub fn inner(self) -> &'c T {
        match self {
            Self::Do(c) | Self::Undo(c) => c,
        }
    }
}

/// Any type which can sink commands.
pub trait CommandWrite<Command> {
    /// Inserts a command.
    fn write(&mut self, command: Command);
}
impl<Write, Command> CommandWrite<Command> for &mut Write
where
    Write: CommandWrite<Command>,
{
    fn write(&mut self, command: Command) {
        (**self).write(command);
    }
}
// Any subcommand that can be wrapped in Command can be written into any
// smallvec of Command.
impl<Subcommand, Array> CommandWrite<Subcommand> for smallvec::SmallVec<Array>
where
    Subcommand: Into<Command>,
    Array: smallvec::Array<Item = Command>,
{
    fn write(&mut self, command: Subcommand) {
        self.push(command.into());
    }
}

impl CommandConsumer<Command> for crate::scene::SceneGraph {
    fn apply(&mut self, command: DoUndo<'_, Command>) -> Result<(), CommandError> {
        match command {
            DoUndo::Do(Command::Scene(c)) => {
                CommandConsumer::<SceneCommand>::apply(self, DoUndo::Do(c))
            }
            DoUndo::Undo(Command::Scene(c)) => {
                CommandConsumer::<SceneCommand>::apply(self, DoUndo::Undo(c))
            }
            DoUndo::Do(Command::Scope(commands)) => {
                apply_all(self, commands.iter().map(DoUndo::Do))
            }
            DoUndo::Undo(Command::Scope(commands)) => {
                apply_all(self, commands.iter().rev().map(DoUndo::Undo))
            }
        }
    }
}

/// Apply in order. If one fails, the ones already applied are reverted so the
/// consumer is left as it was.
fn apply_all<'c, Consumer>(
    consumer: &mut Consumer,
    commands: impl Iterator<Item = DoUndo<'c, Command>>,
) -> Result<(), CommandError>
where
    Consumer: CommandConsumer<Command>,
{
    let mut applied = Vec::new();
    for command in commands {
        if let Err(err) = consumer.apply(command) {
            for done in applied.into_iter().rev() {
                if let Err(revert_err) = consumer.apply(DoUndo::reversed(done)) {
                    log::error!("failed to revert partially applied scope: {revert_err}");
                }
            }
            return Err(err);
        }
        applied.push(command);
    }
    Ok(())
}
