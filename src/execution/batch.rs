//! FIFO topological batch executor: walks the whole graph once and exits.

use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Duration;

use pyo3::{Py, PyAny, Python};

use crate::core::{Graph, GraphNode, Node, NodeId, Pin, PinCategory, REROUTE_INPUT, REROUTE_OUTPUT};
use crate::error::{PyFlowError, Result};

use super::single_process::{self, SingleProcessExecutor};

/// Large enough that the sequential dependency-count pre-pass becomes a
/// measurable cost worth handing to the thread pool.
const PARALLEL_THRESHOLD: usize = 256;

/// Outcome of one complete batch run.
#[derive(Debug, Default)]
pub struct BatchRunResult {
    pub pin_values: HashMap<(NodeId, String), serde_json::Value>,
    /// Nodes in the order they were invoked.
    pub node_order: Vec<NodeId>,
    pub durations: HashMap<NodeId, Duration>,
}

pub struct BatchExecutor;

impl BatchExecutor {
    /// Run every node in `graph` to completion, in an order consistent with
    /// a topological sort of data dependencies, ties broken by insertion
    /// order into the ready queue.
    pub fn run(graph: &Graph, interpreter: &mut SingleProcessExecutor) -> Result<BatchRunResult> {
        let node_ids: Vec<NodeId> = graph
            .nodes
            .iter()
            .filter(|(_, n)| !n.is_reroute())
            .map(|(id, _)| *id)
            .collect();

        let mut dep_counts = if node_ids.len() > PARALLEL_THRESHOLD {
            compute_dependency_counts_parallel(graph, &node_ids)
        } else {
            compute_dependency_counts(graph, &node_ids)
        };

        let mut queue: VecDeque<NodeId> = node_ids
            .iter()
            .filter(|id| dep_counts.get(id).copied().unwrap_or(0) == 0)
            .copied()
            .collect();
        let mut queued: HashSet<NodeId> = queue.iter().copied().collect();

        let mut result = BatchRunResult::default();
        let mut object_pin_values: HashMap<(NodeId, String), Py<PyAny>> = HashMap::new();
        let bound = 2 * graph.nodes.len().max(1);
        let mut iterations = 0usize;

        while let Some(node_id) = queue.pop_front() {
            iterations += 1;
            if iterations > bound {
                return Err(PyFlowError::CyclicDependency { iterations });
            }

            let Some(GraphNode::Function(node)) = graph.node(node_id) else {
                continue;
            };

            let inputs = resolve_inputs_against(graph, node_id, node, &object_pin_values);

            if let Some(function_name) = node.function_name.clone() {
                let invocation = interpreter.execute(node_id, &node.code, &function_name, &inputs)?;
                result.durations.insert(node_id, invocation.duration);
                bind_outputs(node, node_id, invocation.return_value, &mut object_pin_values);
                record_json_outputs(node, node_id, &object_pin_values, &mut result.pin_values)?;
            }
            result.node_order.push(node_id);

            for pin in node.outputs.iter().filter(|p| p.category == PinCategory::Data) {
                for (dst_node, _dst_pin) in downstream_targets(graph, node_id, &pin.name) {
                    if let Some(count) = dep_counts.get_mut(&dst_node) {
                        *count = count.saturating_sub(1);
                        if *count == 0 && queued.insert(dst_node) {
                            queue.push_back(dst_node);
                        }
                    }
                }
            }

            for pin in node.outputs.iter().filter(|p| p.category == PinCategory::Execution) {
                for conn_id in pin.connections.iter() {
                    if let Some(conn) = graph.connections.get(conn_id) {
                        if queued.insert(conn.dest_node) {
                            queue.push_back(conn.dest_node);
                        }
                    }
                }
            }
        }

        Ok(result)
    }
}

/// Shared by batch and live execution: resolve every data input pin's value
/// by walking back through any reroute chain to its source pin and reading
/// `object_pin_values`. The returned objects are clones of the handles a
/// producing node returned, not JSON reconstructions, so identity survives
/// the hop; a pin with no upstream connection gets a fresh Python `None`.
pub(super) fn resolve_inputs_against(
    graph: &Graph,
    node_id: NodeId,
    node: &Node,
    object_pin_values: &HashMap<(NodeId, String), Py<PyAny>>,
) -> HashMap<String, Py<PyAny>> {
    let mut inputs = HashMap::new();
    for pin in node.inputs.iter().filter(|p| p.category == PinCategory::Data) {
        let value = resolve_source_pin(graph, node_id, &pin.name)
            .and_then(|(src_node, src_pin)| object_pin_values.get(&(src_node, src_pin)).cloned())
            .unwrap_or_else(single_process::py_none);
        inputs.insert(pin.name.clone(), value);
    }
    inputs
}

/// Follow `node_id.pin_name`'s incoming connection back through any chain
/// of reroute nodes to the non-reroute node actually producing the value.
pub(super) fn resolve_source_pin(graph: &Graph, node_id: NodeId, pin_name: &str) -> Option<(NodeId, String)> {
    let pin = graph.node(node_id)?.pin(pin_name)?;
    let conn_id = pin.connections.first()?;
    let conn = graph.connections.get(conn_id)?;
    match graph.node(conn.source_node)? {
        GraphNode::Reroute(_) => resolve_source_pin(graph, conn.source_node, REROUTE_INPUT),
        GraphNode::Function(_) => Some((conn.source_node, conn.source_pin.clone())),
    }
}

/// Every non-reroute `(node, pin)` reachable from `node_id.pin_name`,
/// forwarding transparently through any reroute nodes in between.
pub(super) fn downstream_targets(graph: &Graph, node_id: NodeId, pin_name: &str) -> Vec<(NodeId, String)> {
    let mut out = Vec::new();
    let Some(pin) = graph.node(node_id).and_then(|n| n.pin(pin_name)) else {
        return out;
    };
    for conn_id in pin.connections.iter() {
        let Some(conn) = graph.connections.get(conn_id) else {
            continue;
        };
        match graph.node(conn.dest_node) {
            Some(GraphNode::Reroute(_)) => out.extend(downstream_targets(graph, conn.dest_node, REROUTE_OUTPUT)),
            Some(GraphNode::Function(_)) => out.push((conn.dest_node, conn.dest_pin.clone())),
            None => {}
        }
    }
    out
}

/// Bind a function's return value onto `node`'s output data pins: a single
/// pin receives the whole value, multiple pins unpack an iterable of
/// matching length (each element kept as its own live object, not
/// re-serialized), else a warning is logged and nothing is bound.
pub(super) fn bind_outputs(
    node: &Node,
    node_id: NodeId,
    value: Py<PyAny>,
    object_pin_values: &mut HashMap<(NodeId, String), Py<PyAny>>,
) {
    let data_outputs: Vec<&Pin> = node.outputs.iter().filter(|p| p.category == PinCategory::Data).collect();
    match data_outputs.len() {
        0 => {}
        1 => {
            object_pin_values.insert((node_id, data_outputs[0].name.clone()), value);
        }
        n => {
            let items = Python::with_gil(|py| -> Option<Vec<Py<PyAny>>> {
                let bound = value.bind(py);
                let mut out = Vec::with_capacity(n);
                for item in bound.try_iter().ok()? {
                    out.push(item.ok()?.unbind());
                }
                Some(out)
            });
            match items {
                Some(items) if items.len() == n => {
                    for (pin, item) in data_outputs.iter().zip(items) {
                        object_pin_values.insert((node_id, pin.name.clone()), item);
                    }
                }
                _ => {
                    tracing::warn!(node = %node_id, expected = n, "return value does not unpack into the node's output pins");
                }
            }
        }
    }
}

/// Convert `node`'s freshly-bound output objects to JSON once, for the
/// externally-visible [`BatchRunResult::pin_values`] summary. This never
/// feeds back into execution, so it costs one conversion per produced value
/// rather than one per downstream consumer.
fn record_json_outputs(
    node: &Node,
    node_id: NodeId,
    object_pin_values: &HashMap<(NodeId, String), Py<PyAny>>,
    pin_values: &mut HashMap<(NodeId, String), serde_json::Value>,
) -> Result<()> {
    Python::with_gil(|py| -> Result<()> {
        for pin in node.outputs.iter().filter(|p| p.category == PinCategory::Data) {
            if let Some(obj) = object_pin_values.get(&(node_id, pin.name.clone())) {
                pin_values.insert((node_id, pin.name.clone()), single_process::value_to_json(py, obj)?);
            }
        }
        Ok(())
    })
}

fn compute_dependency_counts(graph: &Graph, node_ids: &[NodeId]) -> HashMap<NodeId, usize> {
    node_ids.iter().map(|id| (*id, dependency_count(graph, *id))).collect()
}

fn compute_dependency_counts_parallel(graph: &Graph, node_ids: &[NodeId]) -> HashMap<NodeId, usize> {
    use rayon::prelude::*;
    crate::parallel::get_thread_pool().install(|| node_ids.par_iter().map(|id| (*id, dependency_count(graph, *id))).collect())
}

fn dependency_count(graph: &Graph, node_id: NodeId) -> usize {
    match graph.node(node_id) {
        Some(GraphNode::Function(n)) => n
            .inputs
            .iter()
            .filter(|p| p.category == PinCategory::Data && p.is_connected())
            .count(),
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Position;

    fn wire_three_node_chain() -> Graph {
        let mut graph = Graph::new("g");
        let a = graph.create_node("A", Position::zero());
        graph.set_node_code(a, "@node_entry\ndef a() -> int:\n    return 2\n").unwrap();
        let b = graph.create_node("B", Position::zero());
        graph.set_node_code(b, "@node_entry\ndef b(x: int) -> int:\n    return x * 3\n").unwrap();
        let c = graph.create_node("C", Position::zero());
        graph.set_node_code(c, "@node_entry\ndef c(x: int) -> int:\n    return x + 1\n").unwrap();
        graph.create_connection(a, "output_1", b, "x").unwrap();
        graph.create_connection(b, "output_1", c, "x").unwrap();
        graph
    }

    #[test]
    fn runs_a_linear_chain_in_order() {
        let graph = wire_three_node_chain();
        let mut interpreter = SingleProcessExecutor::new().unwrap();
        let result = BatchExecutor::run(&graph, &mut interpreter).unwrap();
        assert_eq!(result.node_order.len(), 3);
        let c_id = result.node_order[2];
        let c_output = result
            .pin_values
            .iter()
            .find(|((node, pin), _)| *node == c_id && pin == "output_1")
            .map(|(_, v)| v.clone());
        assert_eq!(c_output, Some(serde_json::json!(7)));
    }

    #[test]
    fn resolves_through_a_reroute_node() {
        let mut graph = wire_three_node_chain();
        let first_conn = graph.connections.values().next().unwrap().id;
        graph.create_reroute_on_connection(first_conn, Position::zero()).unwrap();

        let mut interpreter = SingleProcessExecutor::new().unwrap();
        let result = BatchExecutor::run(&graph, &mut interpreter).unwrap();
        assert_eq!(result.node_order.len(), 3);
    }

    #[test]
    fn cyclic_dependency_is_detected() {
        let mut graph = Graph::new("g");
        let a = graph.create_node("A", Position::zero());
        graph.set_node_code(a, "@node_entry\ndef a(x: int) -> int:\n    return x\n").unwrap();
        let b = graph.create_node("B", Position::zero());
        graph.set_node_code(b, "@node_entry\ndef b(x: int) -> int:\n    return x\n").unwrap();
        graph.create_connection(a, "output_1", b, "x").unwrap();
        graph.create_connection(b, "output_1", a, "x").unwrap();

        let mut interpreter = SingleProcessExecutor::new().unwrap();
        let err = BatchExecutor::run(&graph, &mut interpreter).unwrap_err();
        assert!(matches!(err, PyFlowError::CyclicDependency { .. }));
    }
}
