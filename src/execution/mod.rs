//! # Execution
//!
//! The three execution modes the graph supports: a one-shot [`batch`] run,
//! a trigger-based [`live`] run, and the [`single_process`] interpreter
//! both ride on to actually invoke node functions.

pub mod batch;
pub mod live;
pub mod single_process;

pub use batch::{BatchExecutor, BatchRunResult};
pub use live::{LiveExecutor, WidgetHandler};
pub use single_process::{NodeInvocation, SingleProcessExecutor};
