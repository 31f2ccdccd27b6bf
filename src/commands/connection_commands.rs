//! Connection-lifecycle commands, addressed by `(node id, pin name)` on
//! both ends rather than pin list index — this keeps an ordinary node's
//! named data/exec pins and a reroute node's single named pin symmetric
//! under the same lookup.

use std::any::Any;
use std::time::Instant;

use crate::core::{ConnectionId, Graph, NodeId, Position};

use super::base::Command;

#[derive(Debug)]
pub struct CreateConnectionCommand {
    timestamp: Instant,
    source_node: NodeId,
    source_pin: String,
    dest_node: NodeId,
    dest_pin: String,
    created_id: Option<ConnectionId>,
    /// The connection `create_connection` bumped off `dest_pin`, if any,
    /// restored on undo.
    replaced: Option<(NodeId, String, NodeId, String)>,
}

impl CreateConnectionCommand {
    pub fn new(
        source_node: NodeId,
        source_pin: impl Into<String>,
        dest_node: NodeId,
        dest_pin: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Instant::now(),
            source_node,
            source_pin: source_pin.into(),
            dest_node,
            dest_pin: dest_pin.into(),
            created_id: None,
            replaced: None,
        }
    }
}

impl Command for CreateConnectionCommand {
    fn execute(&mut self, graph: &mut Graph) -> bool {
        self.replaced = graph
            .node(self.dest_node)
            .and_then(|n| n.pin(&self.dest_pin))
            .and_then(|p| p.connections.first().copied())
            .and_then(|id| graph.connections.get(&id))
            .map(|c| (c.source_node, c.source_pin.clone(), c.dest_node, c.dest_pin.clone()));

        match graph.create_connection(self.source_node, &self.source_pin, self.dest_node, &self.dest_pin) {
            Ok(id) => {
                self.created_id = Some(id);
                true
            }
            Err(_) => false,
        }
    }

    fn undo(&mut self, graph: &mut Graph) -> bool {
        let Some(id) = self.created_id.take() else {
            return false;
        };
        graph.remove_connection(id);
        if let Some((src_node, src_pin, dst_node, dst_pin)) = self.replaced.take() {
            let _ = graph.create_connection(src_node, &src_pin, dst_node, &dst_pin);
        }
        true
    }

    fn description(&self) -> String {
        format!("Connect {}.{} to {}.{}", self.source_node, self.source_pin, self.dest_node, self.dest_pin)
    }

    fn timestamp(&self) -> Instant {
        self.timestamp
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug)]
pub struct DeleteConnectionCommand {
    timestamp: Instant,
    connection_id: ConnectionId,
    snapshot: Option<(NodeId, String, NodeId, String)>,
}

impl DeleteConnectionCommand {
    pub fn new(connection_id: ConnectionId) -> Self {
        Self {
            timestamp: Instant::now(),
            connection_id,
            snapshot: None,
        }
    }
}

impl Command for DeleteConnectionCommand {
    fn execute(&mut self, graph: &mut Graph) -> bool {
        let Some(conn) = graph.connections.get(&self.connection_id) else {
            // Already gone, e.g. removed by a node deletion. Not an error.
            return true;
        };
        self.snapshot = Some((conn.source_node, conn.source_pin.clone(), conn.dest_node, conn.dest_pin.clone()));
        graph.remove_connection(self.connection_id);
        true
    }

    fn undo(&mut self, graph: &mut Graph) -> bool {
        let Some((src_node, src_pin, dst_node, dst_pin)) = self.snapshot.take() else {
            return false;
        };
        graph.create_connection(src_node, &src_pin, dst_node, &dst_pin).is_ok()
    }

    fn description(&self) -> String {
        "Disconnect".to_string()
    }

    fn timestamp(&self) -> Instant {
        self.timestamp
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Splits an existing connection into source->reroute and reroute->dest,
/// placing a fresh reroute node at `position`.
#[derive(Debug)]
pub struct CreateRerouteNodeCommand {
    timestamp: Instant,
    original: (NodeId, String, NodeId, String),
    position: Position,
    reroute_id: Option<NodeId>,
}

impl CreateRerouteNodeCommand {
    pub fn new(source_node: NodeId, source_pin: impl Into<String>, dest_node: NodeId, dest_pin: impl Into<String>, position: Position) -> Self {
        Self {
            timestamp: Instant::now(),
            original: (source_node, source_pin.into(), dest_node, dest_pin.into()),
            position,
            reroute_id: None,
        }
    }
}

impl Command for CreateRerouteNodeCommand {
    fn execute(&mut self, graph: &mut Graph) -> bool {
        let (src_node, src_pin, dst_node, dst_pin) = self.original.clone();
        let connection_id = graph
            .connections
            .values()
            .find(|c| c.source_node == src_node && c.source_pin == src_pin && c.dest_node == dst_node && c.dest_pin == dst_pin)
            .map(|c| c.id);
        let Some(connection_id) = connection_id else {
            return false;
        };
        match graph.create_reroute_on_connection(connection_id, self.position) {
            Ok(id) => {
                self.reroute_id = Some(id);
                true
            }
            Err(_) => false,
        }
    }

    fn undo(&mut self, graph: &mut Graph) -> bool {
        let Some(reroute_id) = self.reroute_id.take() else {
            return false;
        };
        graph.remove_node(reroute_id);
        let (src_node, src_pin, dst_node, dst_pin) = self.original.clone();
        graph.create_connection(src_node, &src_pin, dst_node, &dst_pin).is_ok()
    }

    fn description(&self) -> String {
        "Create reroute node".to_string()
    }

    fn timestamp(&self) -> Instant {
        self.timestamp
    }

    fn estimated_memory(&self) -> usize {
        1024
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
