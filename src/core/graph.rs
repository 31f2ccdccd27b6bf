//! # Graph
//!
//! The scene: the node set, the connection set, the group set. Mutations
//! here bypass the undo system entirely — `Graph` is the model that the
//! embedding application's command layer mutates on execute/undo, not a
//! command-aware actor itself.

use std::collections::HashMap;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{PyFlowError, Result};

use super::connection::{Connection, ConnectionRecord};
use super::group::{Group, GroupRecord};
use super::node::{Node, NodeRecord};
use super::pin::Pin;
use super::reroute::{RerouteNode, RerouteRecord, REROUTE_INPUT, REROUTE_OUTPUT};
use super::types::{ConnectionId, GroupId, NodeId, Position, Size};

/// Either a function node or a reroute node, the two things that live in
/// the graph's node set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum GraphNode {
    Function(Node),
    Reroute(RerouteNode),
}

impl GraphNode {
    pub fn id(&self) -> NodeId {
        match self {
            GraphNode::Function(n) => n.id,
            GraphNode::Reroute(r) => r.id,
        }
    }

    pub fn position(&self) -> Position {
        match self {
            GraphNode::Function(n) => n.position,
            GraphNode::Reroute(r) => r.position,
        }
    }

    pub fn set_position(&mut self, position: Position) {
        match self {
            GraphNode::Function(n) => n.position = position,
            GraphNode::Reroute(r) => r.position = position,
        }
    }

    pub fn is_reroute(&self) -> bool {
        matches!(self, GraphNode::Reroute(_))
    }

    pub fn pin(&self, name: &str) -> Option<&Pin> {
        match self {
            GraphNode::Function(n) => n.pin(name),
            GraphNode::Reroute(r) => r.pin(name),
        }
    }

    pub fn pin_mut(&mut self, name: &str) -> Option<&mut Pin> {
        match self {
            GraphNode::Function(n) => n.pin_mut(name),
            GraphNode::Reroute(r) => r.pin_mut(name),
        }
    }
}

/// The scene of nodes, connections, and groups.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Graph {
    pub title: String,
    pub description: String,
    pub nodes: FxHashMap<NodeId, GraphNode>,
    pub connections: FxHashMap<ConnectionId, Connection>,
    pub groups: FxHashMap<GroupId, Group>,
}

impl Graph {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            nodes: FxHashMap::default(),
            connections: FxHashMap::default(),
            groups: FxHashMap::default(),
        }
    }

    // ===== Nodes =====

    pub fn create_node(&mut self, title: impl Into<String>, position: Position) -> NodeId {
        let node = Node::new(title, position);
        let id = node.id;
        self.nodes.insert(id, GraphNode::Function(node));
        tracing::debug!(node = %id, "node created");
        id
    }

    pub fn create_reroute_node(&mut self, position: Position) -> NodeId {
        let reroute = RerouteNode::new(position);
        let id = reroute.id;
        self.nodes.insert(id, GraphNode::Reroute(reroute));
        id
    }

    /// Remove a node, first removing every connection incident to its pins.
    pub fn remove_node(&mut self, node_id: NodeId) -> Option<GraphNode> {
        let incident: Vec<ConnectionId> = self
            .connections
            .values()
            .filter(|c| c.source_node == node_id || c.dest_node == node_id)
            .map(|c| c.id)
            .collect();
        for conn_id in incident {
            self.remove_connection(conn_id);
        }
        let removed = self.nodes.remove(&node_id);
        if removed.is_some() {
            tracing::debug!(node = %node_id, "node removed");
        }
        removed
    }

    pub fn node(&self, id: NodeId) -> Option<&GraphNode> {
        self.nodes.get(&id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut GraphNode> {
        self.nodes.get_mut(&id)
    }

    /// Re-parse a function node's code, dropping connections to any pin
    /// that the reparse removed.
    pub fn set_node_code(&mut self, node_id: NodeId, code: impl Into<String>) -> Result<()> {
        let removed_pins = match self.nodes.get_mut(&node_id) {
            Some(GraphNode::Function(n)) => n.apply_code(code),
            Some(GraphNode::Reroute(_)) => {
                return Err(PyFlowError::Custom("reroute nodes have no code".into()))
            }
            None => return Err(PyFlowError::NodeNotFound(node_id.to_string())),
        };
        let dangling: Vec<ConnectionId> = self
            .connections
            .values()
            .filter(|c| {
                (c.source_node == node_id && removed_pins.contains(&c.source_pin))
                    || (c.dest_node == node_id && removed_pins.contains(&c.dest_pin))
            })
            .map(|c| c.id)
            .collect();
        for id in dangling {
            self.remove_connection(id);
        }
        Ok(())
    }

    // ===== Connections =====

    /// Rejects incompatible pin pairs; if `dest_pin` already holds a
    /// connection, removes the existing one first (inputs admit at most one).
    pub fn create_connection(
        &mut self,
        source_node: NodeId,
        source_pin: &str,
        dest_node: NodeId,
        dest_pin: &str,
    ) -> Result<ConnectionId> {
        if source_node == dest_node {
            return Err(PyFlowError::IncompatiblePins {
                reason: "a node cannot connect to itself".into(),
            });
        }

        let src = self
            .nodes
            .get(&source_node)
            .and_then(|n| n.pin(source_pin))
            .cloned()
            .ok_or_else(|| PyFlowError::PinNotFound {
                node: source_node.to_string(),
                pin: source_pin.to_string(),
            })?;
        let dst = self
            .nodes
            .get(&dest_node)
            .and_then(|n| n.pin(dest_pin))
            .cloned()
            .ok_or_else(|| PyFlowError::PinNotFound {
                node: dest_node.to_string(),
                pin: dest_pin.to_string(),
            })?;

        if !src.can_connect_to(&dst) {
            return Err(PyFlowError::IncompatiblePins {
                reason: format!("{} is not compatible with {}", src.type_name, dst.type_name),
            });
        }

        if let Some(existing) = dst.connections.first().copied() {
            self.remove_connection(existing);
        }

        let connection = Connection::new(source_node, source_pin, dest_node, dest_pin);
        let id = connection.id;
        if let Some(node) = self.nodes.get_mut(&source_node) {
            if let Some(pin) = node.pin_mut(source_pin) {
                pin.add_connection(id);
            }
        }
        if let Some(node) = self.nodes.get_mut(&dest_node) {
            if let Some(pin) = node.pin_mut(dest_pin) {
                pin.add_connection(id);
            }
        }
        self.connections.insert(id, connection);
        self.refresh_reroute_chain(dest_node);
        Ok(id)
    }

    pub fn remove_connection(&mut self, connection_id: ConnectionId) {
        let Some(connection) = self.connections.remove(&connection_id) else {
            return;
        };
        if let Some(node) = self.nodes.get_mut(&connection.source_node) {
            if let Some(pin) = node.pin_mut(&connection.source_pin) {
                pin.remove_connection(connection_id);
            }
        }
        if let Some(node) = self.nodes.get_mut(&connection.dest_node) {
            if let Some(pin) = node.pin_mut(&connection.dest_pin) {
                pin.remove_connection(connection_id);
            }
        }
        self.refresh_reroute_chain(connection.dest_node);
    }

    /// If `node_id` is a reroute node, re-derive its output type/color from
    /// whatever currently feeds its input, and propagate to anything
    /// downstream that is itself a reroute.
    fn refresh_reroute_chain(&mut self, node_id: NodeId) {
        let is_reroute = matches!(self.nodes.get(&node_id), Some(GraphNode::Reroute(_)));
        if !is_reroute {
            return;
        }
        let source_pin = self
            .nodes
            .get(&node_id)
            .and_then(|n| n.pin(REROUTE_INPUT))
            .and_then(|p| p.connections.first().copied())
            .and_then(|conn_id| self.connections.get(&conn_id))
            .and_then(|conn| self.nodes.get(&conn.source_node).and_then(|n| n.pin(&conn.source_pin)))
            .cloned();

        if let Some(GraphNode::Reroute(r)) = self.nodes.get_mut(&node_id) {
            r.adopt_type(source_pin.as_ref());
        }

        let downstream: Vec<ConnectionId> = self
            .nodes
            .get(&node_id)
            .and_then(|n| n.pin(REROUTE_OUTPUT))
            .map(|p| p.connections.to_vec())
            .unwrap_or_default();
        for conn_id in downstream {
            if let Some(conn) = self.connections.get(&conn_id).cloned() {
                self.refresh_reroute_chain(conn.dest_node);
            }
        }
    }

    /// Split `connection_id` into source->reroute and reroute->dest, with a
    /// new reroute node placed at `position`.
    pub fn create_reroute_on_connection(&mut self, connection_id: ConnectionId, position: Position) -> Result<NodeId> {
        let connection = self
            .connections
            .get(&connection_id)
            .cloned()
            .ok_or_else(|| PyFlowError::Custom("connection not found".into()))?;
        self.remove_connection(connection_id);
        let reroute_id = self.create_reroute_node(position);
        self.create_connection(connection.source_node, &connection.source_pin, reroute_id, REROUTE_INPUT)?;
        self.create_connection(reroute_id, REROUTE_OUTPUT, connection.dest_node, &connection.dest_pin)?;
        Ok(reroute_id)
    }

    // ===== Groups =====

    pub fn create_group(&mut self, name: impl Into<String>, member_node_ids: Vec<NodeId>) -> GroupId {
        let group = Group::new(name, member_node_ids);
        let id = group.id;
        self.groups.insert(id, group);
        id
    }

    pub fn delete_group(&mut self, group_id: GroupId) -> Option<Group> {
        self.groups.remove(&group_id)
    }

    pub fn resize_group(&mut self, group_id: GroupId, position: Position, size: Size) -> Result<()> {
        let group = self
            .groups
            .get_mut(&group_id)
            .ok_or_else(|| PyFlowError::GroupNotFound(group_id.to_string()))?;
        group.position = position;
        group.size = size;
        Ok(())
    }

    /// Recompute every group's bounds from current member positions/sizes.
    pub fn recalculate_group_bounds(&mut self) {
        let positions: Vec<(NodeId, Position, Size)> = self
            .nodes
            .iter()
            .map(|(id, n)| {
                let size = match n {
                    GraphNode::Function(node) => node.size,
                    GraphNode::Reroute(_) => Size::new(20.0, 20.0),
                };
                (*id, n.position(), size)
            })
            .collect();
        for group in self.groups.values_mut() {
            group.recalculate_bounds(&positions);
        }
    }

    // ===== Whole-graph operations =====

    pub fn clear(&mut self) {
        self.connections.clear();
        self.nodes.clear();
        self.groups.clear();
    }

    pub fn serialize(&self) -> GraphRecord {
        let mut node_records = Vec::new();
        let mut reroute_records = Vec::new();
        for node in self.nodes.values() {
            match node {
                GraphNode::Function(n) => node_records.push(NodeRecord::from(n)),
                GraphNode::Reroute(r) => reroute_records.push(RerouteRecord::from(r)),
            }
        }
        GraphRecord {
            graph_title: self.title.clone(),
            graph_description: self.description.clone(),
            nodes: node_records,
            reroutes: reroute_records,
            connections: self.connections.values().map(ConnectionRecord::from).collect(),
            groups: self.groups.values().map(GroupRecord::from).collect(),
        }
    }

    /// Replace the entire graph with `record`'s contents.
    pub fn deserialize(record: GraphRecord) -> Self {
        let mut graph = Graph::new(record.graph_title);
        graph.description = record.graph_description;
        for node in record.nodes {
            let node = node.into_node();
            graph.nodes.insert(node.id, GraphNode::Function(node));
        }
        for reroute in record.reroutes {
            let reroute = reroute.into_reroute();
            graph.nodes.insert(reroute.id, GraphNode::Reroute(reroute));
        }
        for group in record.groups {
            let group = group.into_group();
            graph.groups.insert(group.id, group);
        }
        for conn in record.connections {
            let conn = conn.into_connection();
            if let Some(node) = graph.nodes.get_mut(&conn.source_node) {
                if let Some(pin) = node.pin_mut(&conn.source_pin) {
                    pin.add_connection(conn.id);
                }
            }
            if let Some(node) = graph.nodes.get_mut(&conn.dest_node) {
                if let Some(pin) = node.pin_mut(&conn.dest_pin) {
                    pin.add_connection(conn.id);
                }
            }
            graph.connections.insert(conn.id, conn);
        }
        graph
    }

    /// Serialize the given subset of nodes plus the connections whose
    /// endpoints are both inside the selection.
    pub fn copy_subset(&self, node_ids: &[NodeId]) -> GraphRecord {
        let selected: std::collections::HashSet<NodeId> = node_ids.iter().copied().collect();
        let mut node_records = Vec::new();
        let mut reroute_records = Vec::new();
        for id in node_ids {
            match self.nodes.get(id) {
                Some(GraphNode::Function(n)) => node_records.push(NodeRecord::from(n)),
                Some(GraphNode::Reroute(r)) => reroute_records.push(RerouteRecord::from(r)),
                None => {}
            }
        }
        let connections = self
            .connections
            .values()
            .filter(|c| selected.contains(&c.source_node) && selected.contains(&c.dest_node))
            .map(ConnectionRecord::from)
            .collect();
        GraphRecord {
            graph_title: String::new(),
            graph_description: String::new(),
            nodes: node_records,
            reroutes: reroute_records,
            connections,
            groups: Vec::new(),
        }
    }

    /// Paste `record` into this graph, generating fresh ids for every
    /// incoming node and re-pointing its internal connections. Returns the
    /// set of freshly created node ids.
    pub fn paste(&mut self, record: GraphRecord, offset: Position) -> Vec<NodeId> {
        let mut id_map: HashMap<NodeId, NodeId> = HashMap::new();
        let mut created = Vec::new();

        for mut node_record in record.nodes {
            let old_id = node_record.uuid;
            let new_id = uuid::Uuid::new_v4();
            node_record.uuid = new_id;
            node_record.pos.0 += offset.x;
            node_record.pos.1 += offset.y;
            let node = node_record.into_node();
            self.nodes.insert(new_id, GraphNode::Function(node));
            id_map.insert(old_id, new_id);
            created.push(new_id);
        }
        for mut reroute_record in record.reroutes {
            let old_id = reroute_record.uuid;
            let new_id = uuid::Uuid::new_v4();
            reroute_record.uuid = new_id;
            reroute_record.pos.0 += offset.x;
            reroute_record.pos.1 += offset.y;
            let reroute = reroute_record.into_reroute();
            self.nodes.insert(new_id, GraphNode::Reroute(reroute));
            id_map.insert(old_id, new_id);
            created.push(new_id);
        }

        for conn_record in record.connections {
            let (Some(&src), Some(&dst)) = (
                id_map.get(&conn_record.start_node_uuid),
                id_map.get(&conn_record.end_node_uuid),
            ) else {
                continue;
            };
            let _ = self.create_connection(src, &conn_record.start_pin_name, dst, &conn_record.end_pin_name);
        }

        created
    }
}

/// On-disk/clipboard shape for a whole graph (§6 of the spec). Groups ride
/// along in the JSON shape but are not part of the canonical Markdown
/// document (see `crate::format::markdown`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphRecord {
    #[serde(default)]
    pub graph_title: String,
    #[serde(default)]
    pub graph_description: String,
    #[serde(default)]
    pub nodes: Vec<NodeRecord>,
    #[serde(default)]
    pub reroutes: Vec<RerouteRecord>,
    #[serde(default)]
    pub connections: Vec<ConnectionRecord>,
    #[serde(default)]
    pub groups: Vec<GroupRecord>,
}
