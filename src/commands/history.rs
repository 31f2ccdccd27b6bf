//! Bounded undo/redo log.

use std::time::Instant;

use crate::core::Graph;

use super::base::Command;

const PERFORMANCE_WARNING_MS: u128 = 100;

/// Bounds enforced by [`CommandHistory`].
#[derive(Debug, Clone, Copy)]
pub struct HistoryConfig {
    pub max_depth: usize,
    pub max_memory_bytes: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_depth: 50,
            max_memory_bytes: 50 * 1024 * 1024,
        }
    }
}

/// A bounded sequence of executed commands with a cursor, supporting
/// undo/redo and adjacent-command merging.
pub struct CommandHistory {
    config: HistoryConfig,
    commands: Vec<Box<dyn Command>>,
    /// Index of the most recently executed command, or `None` if history is
    /// empty or every command has been undone.
    cursor: Option<usize>,
    memory_usage: usize,
}

impl std::fmt::Debug for CommandHistory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandHistory")
            .field("len", &self.commands.len())
            .field("cursor", &self.cursor)
            .field("memory_usage", &self.memory_usage)
            .finish()
    }
}

impl CommandHistory {
    pub fn new(config: HistoryConfig) -> Self {
        Self {
            config,
            commands: Vec::new(),
            cursor: None,
            memory_usage: 0,
        }
    }

    /// Execute `command` against `graph`, merging it into the current top of
    /// history when both report eligibility, then truncating any redo
    /// branch and enforcing the depth/memory bounds.
    pub fn execute(&mut self, mut command: Box<dyn Command>, graph: &mut Graph) -> bool {
        let start = Instant::now();
        if !command.execute(graph) {
            return false;
        }
        let elapsed = start.elapsed();
        if elapsed.as_millis() > PERFORMANCE_WARNING_MS {
            tracing::warn!(
                command = %command.description(),
                elapsed_ms = elapsed.as_millis() as u64,
                "command exceeded performance target"
            );
        }

        if let Some(cursor) = self.cursor {
            if cursor == self.commands.len() - 1 {
                if command.can_merge_with(self.commands[cursor].as_ref()) {
                    command.merge(self.commands[cursor].as_ref());
                    self.memory_usage -= self.commands[cursor].estimated_memory();
                    self.commands[cursor] = command;
                    self.memory_usage += self.commands[cursor].estimated_memory();
                    return true;
                }
            }
        }

        self.truncate_redo_branch();
        self.memory_usage += command.estimated_memory();
        self.commands.push(command);
        self.cursor = Some(self.commands.len() - 1);
        self.enforce_limits();
        true
    }

    fn truncate_redo_branch(&mut self) {
        let keep = self.cursor.map(|c| c + 1).unwrap_or(0);
        for removed in self.commands.drain(keep..) {
            self.memory_usage -= removed.estimated_memory();
        }
    }

    fn enforce_limits(&mut self) {
        while self.commands.len() > self.config.max_depth {
            let removed = self.commands.remove(0);
            self.memory_usage -= removed.estimated_memory();
            self.cursor = self.cursor.map(|c| c.saturating_sub(1));
        }
        while self.memory_usage > self.config.max_memory_bytes && !self.commands.is_empty() {
            let removed = self.commands.remove(0);
            self.memory_usage -= removed.estimated_memory();
            self.cursor = self.cursor.map(|c| c.saturating_sub(1));
            tracing::warn!(command = %removed.description(), "evicted from history over memory limit");
        }
    }

    pub fn can_undo(&self) -> bool {
        self.cursor.is_some()
    }

    pub fn can_redo(&self) -> bool {
        match self.cursor {
            Some(c) => c + 1 < self.commands.len(),
            None => !self.commands.is_empty(),
        }
    }

    /// Undo the most recently executed command. Returns its description on
    /// success.
    pub fn undo(&mut self, graph: &mut Graph) -> Option<String> {
        let cursor = self.cursor?;
        let description = self.commands[cursor].description();
        if self.commands[cursor].undo(graph) {
            self.cursor = if cursor == 0 { None } else { Some(cursor - 1) };
            Some(description)
        } else {
            None
        }
    }

    /// Re-execute the next undone command. Returns its description on
    /// success.
    pub fn redo(&mut self, graph: &mut Graph) -> Option<String> {
        let next = match self.cursor {
            Some(c) => c + 1,
            None => 0,
        };
        if next >= self.commands.len() {
            return None;
        }
        let description = self.commands[next].description();
        if self.commands[next].execute(graph) {
            self.cursor = Some(next);
            Some(description)
        } else {
            None
        }
    }

    /// Repeatedly undo until the cursor reaches `target` (`None` undoes
    /// everything). Returns the descriptions of every command undone.
    pub fn undo_to(&mut self, target: Option<usize>, graph: &mut Graph) -> Vec<String> {
        let mut undone = Vec::new();
        loop {
            match (self.cursor, target) {
                (Some(c), Some(t)) if c <= t => break,
                (None, _) => break,
                _ => {}
            }
            match self.undo(graph) {
                Some(desc) => undone.push(desc),
                None => break,
            }
        }
        undone
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn memory_usage(&self) -> usize {
        self.memory_usage
    }

    pub fn clear(&mut self) {
        self.commands.clear();
        self.cursor = None;
        self.memory_usage = 0;
    }

    pub fn descriptions(&self) -> Vec<String> {
        self.commands.iter().map(|c| c.description()).collect()
    }
}

impl Default for CommandHistory {
    fn default() -> Self {
        Self::new(HistoryConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Graph;

    #[derive(Debug)]
    struct Noop {
        ts: Instant,
        fail: bool,
    }

    impl Command for Noop {
        fn execute(&mut self, _graph: &mut Graph) -> bool {
            !self.fail
        }
        fn undo(&mut self, _graph: &mut Graph) -> bool {
            !self.fail
        }
        fn description(&self) -> String {
            "noop".to_string()
        }
        fn timestamp(&self) -> Instant {
            self.ts
        }
        fn as_any(&self) -> &dyn std::any::Any {
            self
        }
    }

    #[test]
    fn undo_then_redo_restores_cursor() {
        let mut history = CommandHistory::default();
        let mut graph = Graph::new("g");
        assert!(history.execute(Box::new(Noop { ts: Instant::now(), fail: false }), &mut graph));
        assert!(history.can_undo());
        assert!(!history.can_redo());
        history.undo(&mut graph);
        assert!(!history.can_undo());
        assert!(history.can_redo());
        history.redo(&mut graph);
        assert!(history.can_undo());
    }

    #[test]
    fn failed_execute_does_not_enter_history() {
        let mut history = CommandHistory::default();
        let mut graph = Graph::new("g");
        assert!(!history.execute(Box::new(Noop { ts: Instant::now(), fail: true }), &mut graph));
        assert!(history.is_empty());
    }

    #[test]
    fn depth_limit_evicts_oldest() {
        let mut history = CommandHistory::new(HistoryConfig { max_depth: 2, max_memory_bytes: usize::MAX });
        let mut graph = Graph::new("g");
        for _ in 0..3 {
            history.execute(Box::new(Noop { ts: Instant::now(), fail: false }), &mut graph);
        }
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn new_command_truncates_redo_branch() {
        let mut history = CommandHistory::default();
        let mut graph = Graph::new("g");
        history.execute(Box::new(Noop { ts: Instant::now(), fail: false }), &mut graph);
        history.execute(Box::new(Noop { ts: Instant::now(), fail: false }), &mut graph);
        history.undo(&mut graph);
        assert!(history.can_redo());
        history.execute(Box::new(Noop { ts: Instant::now(), fail: false }), &mut graph);
        assert!(!history.can_redo());
        assert_eq!(history.len(), 2);
    }
}
