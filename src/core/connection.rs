//! # Connection
//!
//! A directed wire from an output pin to an input pin, addressed by
//! (node id, pin name) on each end rather than by direct reference, so a
//! connection can be serialized, compared, and looked up without borrowing
//! the graph.

use serde::{Deserialize, Serialize};

use super::types::{ConnectionId, NodeId};

/// A directed edge between two pins on different nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub id: ConnectionId,
    pub source_node: NodeId,
    pub source_pin: String,
    pub dest_node: NodeId,
    pub dest_pin: String,
}

impl Connection {
    pub fn new(
        source_node: NodeId,
        source_pin: impl Into<String>,
        dest_node: NodeId,
        dest_pin: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            source_node,
            source_pin: source_pin.into(),
            dest_node,
            dest_pin: dest_pin.into(),
        }
    }
}

/// On-disk shape for a connection record (§6 of the spec).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionRecord {
    pub start_node_uuid: NodeId,
    pub start_pin_name: String,
    pub end_node_uuid: NodeId,
    pub end_pin_name: String,
}

impl From<&Connection> for ConnectionRecord {
    fn from(c: &Connection) -> Self {
        Self {
            start_node_uuid: c.source_node,
            start_pin_name: c.source_pin.clone(),
            end_node_uuid: c.dest_node,
            end_pin_name: c.dest_pin.clone(),
        }
    }
}

impl ConnectionRecord {
    pub fn into_connection(self) -> Connection {
        Connection {
            id: uuid::Uuid::new_v4(),
            source_node: self.start_node_uuid,
            source_pin: self.start_pin_name,
            dest_node: self.end_node_uuid,
            dest_pin: self.end_pin_name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_round_trip() {
        let a = uuid::Uuid::new_v4();
        let b = uuid::Uuid::new_v4();
        let conn = Connection::new(a, "result", b, "value");
        let record: ConnectionRecord = (&conn).into();
        let back = record.into_connection();
        assert_eq!(back.source_node, a);
        assert_eq!(back.source_pin, "result");
        assert_eq!(back.dest_node, b);
        assert_eq!(back.dest_pin, "value");
    }
}
