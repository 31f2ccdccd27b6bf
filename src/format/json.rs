//! JSON alternative top-level format, kept for backward compatibility with
//! graphs saved before the Markdown document became canonical.

use serde::{Deserialize, Serialize};

use crate::core::{ConnectionRecord, GraphRecord};
use crate::error::Result;

use super::{flatten, split, FlatNodeRecord};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct JsonDocument {
    #[serde(default)]
    graph_title: String,
    #[serde(default)]
    graph_description: String,
    #[serde(default)]
    nodes: Vec<FlatNodeRecord>,
    #[serde(default)]
    connections: Vec<ConnectionRecord>,
    #[serde(default)]
    requirements: Vec<String>,
}

pub struct JsonFormat;

impl JsonFormat {
    /// Serialize `record` to the JSON document shape. `requirements` rides
    /// along as a sibling list, not part of `GraphRecord` itself.
    pub fn to_string(record: &GraphRecord, requirements: &[String]) -> Result<String> {
        let document = JsonDocument {
            graph_title: record.graph_title.clone(),
            graph_description: record.graph_description.clone(),
            nodes: flatten(record),
            connections: record.connections.clone(),
            requirements: requirements.to_vec(),
        };
        Ok(serde_json::to_string_pretty(&document)?)
    }

    /// Parse a JSON document, returning the graph record and its sibling
    /// requirements list.
    pub fn parse(content: &str) -> Result<(GraphRecord, Vec<String>)> {
        let document: JsonDocument = serde_json::from_str(content)?;
        let (nodes, reroutes) = split(document.nodes);
        let record = GraphRecord {
            graph_title: document.graph_title,
            graph_description: document.graph_description,
            nodes,
            reroutes,
            connections: document.connections,
            groups: Vec::new(),
        };
        Ok((record, document.requirements))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Graph, Position};

    #[test]
    fn round_trips_nodes_and_connections() {
        let mut graph = Graph::new("demo");
        let a = graph.create_node("A", Position::zero());
        graph.set_node_code(a, "@node_entry\ndef a() -> int:\n    return 1\n").unwrap();
        let b = graph.create_node("B", Position::zero());
        graph.set_node_code(b, "@node_entry\ndef b(x: int) -> int:\n    return x\n").unwrap();
        graph.create_connection(a, "output_1", b, "x").unwrap();

        let record = graph.serialize();
        let json = JsonFormat::to_string(&record, &["requests".to_string()]).unwrap();
        let (parsed, requirements) = JsonFormat::parse(&json).unwrap();

        assert_eq!(parsed.nodes.len(), 2);
        assert_eq!(parsed.connections.len(), 1);
        assert_eq!(requirements, vec!["requests".to_string()]);
    }

    #[test]
    fn reroute_entries_round_trip_with_is_reroute_flag() {
        let mut graph = Graph::new("demo");
        let a = graph.create_node("A", Position::zero());
        graph.set_node_code(a, "@node_entry\ndef a() -> int:\n    return 1\n").unwrap();
        let b = graph.create_node("B", Position::zero());
        graph.set_node_code(b, "@node_entry\ndef b(x: int) -> int:\n    return x\n").unwrap();
        let conn = graph.create_connection(a, "output_1", b, "x").unwrap();
        graph.create_reroute_on_connection(conn, Position::zero()).unwrap();

        let record = graph.serialize();
        let json = JsonFormat::to_string(&record, &[]).unwrap();
        let (parsed, _) = JsonFormat::parse(&json).unwrap();
        assert_eq!(parsed.reroutes.len(), 1);
        assert_eq!(parsed.nodes.len(), 2);
    }
}
