//! # Undo/redo command system
//!
//! Every mutation a user makes to a [`crate::core::Graph`] through the UI is
//! wrapped in a [`Command`] so it can be undone and redone. [`CommandHistory`]
//! owns the bounded log; the per-entity command types own their own
//! execute/undo bodies.

pub mod base;
pub mod connection_commands;
pub mod group_commands;
pub mod history;
pub mod node_commands;

pub use base::{Command, CompositeCommand};
pub use history::{CommandHistory, HistoryConfig};
