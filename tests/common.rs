//! Shared graph-building helpers used across integration tests.

use pyflowgraph::core::{Graph, Position};
use pyflowgraph::NodeId;

/// Create a function node and set its code in one step, returning its id.
#[allow(dead_code)]
pub fn node(graph: &mut Graph, title: &str, code: &str) -> NodeId {
    let id = graph.create_node(title, Position::zero());
    graph.set_node_code(id, code).unwrap();
    id
}

#[allow(dead_code)]
pub const SOURCE_HELLO: &str = "@node_entry\ndef source() -> str:\n    return \"hello\"\n";

#[allow(dead_code)]
pub const UPPER: &str = "@node_entry\ndef upper(text: str) -> str:\n    return text.upper()\n";
