//! Live (trigger-based) executor: re-runs a sub-graph from a single node in
//! response to a user action, typically a click on an embedded widget
//! button.

use std::collections::{HashMap, HashSet};

use pyo3::{Py, PyAny, Python};

use crate::core::{Graph, GraphNode, Node, NodeId, PinCategory, REROUTE_OUTPUT};
use crate::error::Result;

use super::batch::{bind_outputs, downstream_targets, resolve_inputs_against};
use super::single_process::{self, SingleProcessExecutor};

/// Supplies and receives a node's embedded-widget values. The live executor
/// consults this only when neither a cached pin value nor an explicit input
/// is available.
pub trait WidgetHandler {
    fn get_values(&self, node_id: NodeId) -> Option<serde_json::Value>;
    fn set_values(&mut self, node_id: NodeId, values: serde_json::Value);
}

/// Cross-execution state retained between triggers: cached pin values and a
/// free-form key/value "graph state" map, both cleared only by an explicit
/// [`reset`](LiveExecutor::reset).
#[derive(Default)]
pub struct LiveExecutor {
    pin_values: HashMap<(NodeId, String), Py<PyAny>>,
    graph_state: HashMap<String, serde_json::Value>,
}

impl LiveExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn graph_state(&self) -> &HashMap<String, serde_json::Value> {
        &self.graph_state
    }

    pub fn set_graph_state(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.graph_state.insert(key.into(), value);
    }

    /// Trigger node `trigger`: depth-first forward traversal along execution
    /// and data edges, invoking each node reached and caching its outputs.
    pub fn trigger(
        &mut self,
        graph: &Graph,
        trigger: NodeId,
        interpreter: &mut SingleProcessExecutor,
        widgets: &mut dyn WidgetHandler,
    ) -> Result<Vec<NodeId>> {
        let mut visited = HashSet::new();
        let mut order = Vec::new();
        self.visit(graph, trigger, interpreter, widgets, &mut visited, &mut order)?;
        Ok(order)
    }

    fn visit(
        &mut self,
        graph: &Graph,
        node_id: NodeId,
        interpreter: &mut SingleProcessExecutor,
        widgets: &mut dyn WidgetHandler,
        visited: &mut HashSet<NodeId>,
        order: &mut Vec<NodeId>,
    ) -> Result<()> {
        if !visited.insert(node_id) {
            return Ok(());
        }

        if let Some(GraphNode::Function(node)) = graph.node(node_id) {
            self.invoke(graph, node_id, node, interpreter, widgets)?;
            order.push(node_id);
        }

        let Some(node) = graph.node(node_id) else { return Ok(()) };

        if let GraphNode::Function(node) = node {
            for pin in node.outputs.iter().filter(|p| p.category == PinCategory::Execution) {
                for conn_id in pin.connections.iter() {
                    if let Some(conn) = graph.connections.get(conn_id) {
                        self.visit(graph, conn.dest_node, interpreter, widgets, visited, order)?;
                    }
                }
            }
            for pin in node.outputs.iter().filter(|p| p.category == PinCategory::Data) {
                for (dst_node, _) in downstream_targets(graph, node_id, &pin.name) {
                    self.visit(graph, dst_node, interpreter, widgets, visited, order)?;
                }
            }
        } else if let GraphNode::Reroute(_) = node {
            for (dst_node, _) in downstream_targets(graph, node_id, REROUTE_OUTPUT) {
                self.visit(graph, dst_node, interpreter, widgets, visited, order)?;
            }
        }

        Ok(())
    }

    /// Resolve inputs preferring (a) a cached pin value, then (b) the
    /// node's widget values, then (c) `None`; invoke the function; cache
    /// its outputs and push them into the widget.
    fn invoke(
        &mut self,
        graph: &Graph,
        node_id: NodeId,
        node: &Node,
        interpreter: &mut SingleProcessExecutor,
        widgets: &mut dyn WidgetHandler,
    ) -> Result<()> {
        let mut inputs = resolve_inputs_against(graph, node_id, node, &self.pin_values);
        for pin in node.inputs.iter().filter(|p| p.category == PinCategory::Data) {
            let already_cached = resolve_source_in(graph, node_id, &pin.name, &self.pin_values).is_some();
            if !already_cached {
                if let Some(widget_values) = widgets.get_values(node_id) {
                    if let Some(value) = widget_values.get(&pin.name) {
                        inputs.insert(pin.name.clone(), single_process::literal_to_py(value));
                    }
                }
            }
        }

        let Some(function_name) = node.function_name.clone() else {
            return Ok(());
        };

        let invocation = interpreter.execute(node_id, &node.code, &function_name, &inputs)?;
        bind_outputs(node, node_id, invocation.return_value.clone(), &mut self.pin_values);
        let json_value = Python::with_gil(|py| single_process::value_to_json(py, &invocation.return_value))?;
        widgets.set_values(node_id, json_value);
        Ok(())
    }

    /// Clear both cross-execution stores. Never re-triggers nodes; the
    /// caller re-initiates.
    pub fn reset(&mut self) {
        self.pin_values.clear();
        self.graph_state.clear();
        tracing::info!("live executor reset, graph ready");
    }
}

fn resolve_source_in(
    graph: &Graph,
    node_id: NodeId,
    pin_name: &str,
    pin_values: &HashMap<(NodeId, String), Py<PyAny>>,
) -> Option<Py<PyAny>> {
    let (src_node, src_pin) = super::batch::resolve_source_pin(graph, node_id, pin_name)?;
    pin_values.get(&(src_node, src_pin)).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Position;
    use serde_json::json;

    struct NoWidgets;
    impl WidgetHandler for NoWidgets {
        fn get_values(&self, _node_id: NodeId) -> Option<serde_json::Value> {
            None
        }
        fn set_values(&mut self, _node_id: NodeId, _values: serde_json::Value) {}
    }

    #[derive(Default)]
    struct RecordingWidgets {
        values: HashMap<NodeId, serde_json::Value>,
    }
    impl WidgetHandler for RecordingWidgets {
        fn get_values(&self, node_id: NodeId) -> Option<serde_json::Value> {
            self.values.get(&node_id).cloned()
        }
        fn set_values(&mut self, node_id: NodeId, values: serde_json::Value) {
            self.values.insert(node_id, values);
        }
    }

    #[test]
    fn trigger_walks_downstream_and_caches_outputs() {
        let mut graph = Graph::new("g");
        let a = graph.create_node("A", Position::zero());
        graph.set_node_code(a, "@node_entry\ndef a() -> int:\n    return 4\n").unwrap();
        let b = graph.create_node("B", Position::zero());
        graph.set_node_code(b, "@node_entry\ndef b(x: int) -> int:\n    return x * 2\n").unwrap();
        graph.create_connection(a, "output_1", b, "x").unwrap();

        let mut executor = LiveExecutor::new();
        let mut interpreter = SingleProcessExecutor::new().unwrap();
        let mut widgets = NoWidgets;
        let order = executor.trigger(&graph, a, &mut interpreter, &mut widgets).unwrap();
        assert_eq!(order, vec![a, b]);
        let value = executor.pin_values.get(&(b, "output_1".to_string())).unwrap();
        Python::with_gil(|py| assert_eq!(single_process::value_to_json(py, value).unwrap(), json!(8)));
    }

    #[test]
    fn reset_clears_caches() {
        let mut graph = Graph::new("g");
        let a = graph.create_node("A", Position::zero());
        graph.set_node_code(a, "@node_entry\ndef a() -> int:\n    return 1\n").unwrap();

        let mut executor = LiveExecutor::new();
        let mut interpreter = SingleProcessExecutor::new().unwrap();
        let mut widgets = NoWidgets;
        executor.trigger(&graph, a, &mut interpreter, &mut widgets).unwrap();
        assert!(!executor.pin_values.is_empty());
        executor.reset();
        assert!(executor.pin_values.is_empty());
    }

    #[test]
    fn falls_back_to_widget_values_when_no_cached_pin() {
        let mut graph = Graph::new("g");
        let b = graph.create_node("B", Position::zero());
        graph.set_node_code(b, "@node_entry\ndef b(x: int) -> int:\n    return x + 1\n").unwrap();

        let mut widgets = RecordingWidgets::default();
        widgets.values.insert(b, json!({"x": 10}));

        let mut executor = LiveExecutor::new();
        let mut interpreter = SingleProcessExecutor::new().unwrap();
        executor.trigger(&graph, b, &mut interpreter, &mut widgets).unwrap();
        let value = executor.pin_values.get(&(b, "output_1".to_string())).unwrap();
        Python::with_gil(|py| assert_eq!(single_process::value_to_json(py, value).unwrap(), json!(11)));
    }
}
