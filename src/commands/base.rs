//! Base command contract and the composite command.

use std::any::Any;
use std::time::Instant;

use crate::core::Graph;

/// An invertible mutation on a [`Graph`].
///
/// Implementors are plain structs holding whatever state is needed to
/// reverse their own effect; `CommandHistory` never inspects that state
/// directly, only calls `execute`/`undo` and, when merging, `can_merge_with`
/// / `merge`.
pub trait Command: Any + std::fmt::Debug + Send {
    fn execute(&mut self, graph: &mut Graph) -> bool;
    fn undo(&mut self, graph: &mut Graph) -> bool;
    fn description(&self) -> String;
    fn timestamp(&self) -> Instant;

    /// Conservative estimate used by `CommandHistory`'s memory bound.
    fn estimated_memory(&self) -> usize {
        512
    }

    /// Whether `self`, having just been pushed, should replace `previous`
    /// at the top of history rather than sit alongside it.
    fn can_merge_with(&self, _previous: &dyn Command) -> bool {
        false
    }

    /// Fold `previous`'s state into `self` in place. Only called when
    /// `can_merge_with(previous)` returned true.
    fn merge(&mut self, _previous: &dyn Command) {}

    fn as_any(&self) -> &dyn Any;
}

/// Groups a list of sub-commands into a single undo unit.
#[derive(Debug)]
pub struct CompositeCommand {
    description: String,
    timestamp: Instant,
    commands: Vec<Box<dyn Command>>,
    executed: Vec<Box<dyn Command>>,
}

impl CompositeCommand {
    pub fn new(description: impl Into<String>, commands: Vec<Box<dyn Command>>) -> Self {
        Self {
            description: description.into(),
            timestamp: Instant::now(),
            commands,
            executed: Vec::new(),
        }
    }
}

impl Command for CompositeCommand {
    /// Runs every sub-command in order, rolling back whatever already
    /// succeeded the moment one fails.
    fn execute(&mut self, graph: &mut Graph) -> bool {
        self.executed.clear();
        let pending = std::mem::take(&mut self.commands);
        for mut command in pending {
            if command.execute(graph) {
                self.executed.push(command);
            } else {
                for mut done in self.executed.drain(..).rev() {
                    done.undo(graph);
                }
                return false;
            }
        }
        true
    }

    /// Undoes every executed sub-command in reverse order, then moves them
    /// back into `commands` so a following `execute` (a redo) has
    /// sub-commands to run again instead of silently doing nothing. Treats
    /// >=50% sub-command success as overall success so that downstream
    /// undos in the containing history remain possible even if one
    /// sub-command's undo could not fully reverse itself.
    fn undo(&mut self, graph: &mut Graph) -> bool {
        if self.executed.is_empty() {
            return self.commands.is_empty();
        }
        let total = self.executed.len();
        let mut succeeded = 0usize;
        for command in self.executed.iter_mut().rev() {
            if command.undo(graph) {
                succeeded += 1;
            }
        }
        self.commands = std::mem::take(&mut self.executed);
        (succeeded as f64 / total as f64) >= 0.5
    }

    fn description(&self) -> String {
        self.description.clone()
    }

    fn timestamp(&self) -> Instant {
        self.timestamp
    }

    fn estimated_memory(&self) -> usize {
        self.commands.iter().map(|c| c.estimated_memory()).sum::<usize>()
            + self.executed.iter().map(|c| c.estimated_memory()).sum::<usize>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
