//! # pyflowgraph
//!
//! Core engine for a visual, node-based Python programming environment.
//! Users assemble a graph of nodes, each wrapping a small Python function,
//! connect typed pins between them, and run the result either as a single
//! batch pass or interactively through a live, trigger-based executor.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  core           │  graph, nodes, pins, connections, groups
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │  parsing        │  derive pins from a node's Python signature
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │  commands       │  undoable mutations over a graph
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │  execution      │  batch run, live run, the embedded interpreter
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │  format         │  Markdown document, JSON alternative
//! └─────────────────┘
//! ```
//!
//! ## Core concepts
//!
//! - **Nodes** wrap a Python function; their pins are derived from its
//!   signature rather than declared separately.
//! - **Reroute nodes** carry no logic of their own; they adopt whatever
//!   type flows through them and exist purely to tidy up long connections.
//! - **Connections** link one node's output pin to another's input pin,
//!   either along the data path or the execution path.
//! - **Groups** cluster nodes visually; they don't affect execution.
//!
//! Every user-facing mutation goes through a [`commands::Command`] so it can
//! be undone and redone via [`commands::CommandHistory`].

pub mod commands;
pub mod core;
pub mod error;
pub mod execution;
pub mod format;
pub mod parallel;
pub mod parsing;

pub use core::{
    Connection, ConnectionId, Graph, GraphNode, GraphRecord, Group, GroupId, Node, NodeId,
    Pin, PinCategory, Position, RerouteNode, Size,
};
pub use error::{PyFlowError, Result};
pub use execution::{BatchExecutor, BatchRunResult, LiveExecutor, NodeInvocation, SingleProcessExecutor, WidgetHandler};
pub use format::{JsonFormat, MarkdownFormat};
