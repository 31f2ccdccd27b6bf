//! Round trips through the two on-disk formats via the public API.

mod common;

use pyflowgraph::core::Graph;
use pyflowgraph::{JsonFormat, MarkdownFormat};

#[test]
fn markdown_round_trip_preserves_nodes_and_connections() {
    let mut graph = Graph::new("demo");
    let a = common::node(&mut graph, "Greeter", common::SOURCE_HELLO);
    let b = common::node(&mut graph, "Shout", common::UPPER);
    graph.create_connection(a, "output_1", b, "text").unwrap();

    let record = graph.serialize();
    let markdown = MarkdownFormat::to_markdown(&record);
    let parsed = MarkdownFormat::from_markdown(&markdown).unwrap();

    assert_eq!(parsed.nodes.len(), record.nodes.len());
    assert_eq!(parsed.connections.len(), record.connections.len());
    let restored = Graph::deserialize(parsed);
    assert_eq!(restored.nodes.len(), graph.nodes.len());
}

#[test]
fn json_round_trip_carries_requirements_alongside_the_graph() {
    let mut graph = Graph::new("demo");
    common::node(&mut graph, "A", common::SOURCE_HELLO);

    let record = graph.serialize();
    let json = JsonFormat::to_string(&record, &["numpy".to_string()]).unwrap();
    let (parsed, requirements) = JsonFormat::parse(&json).unwrap();

    assert_eq!(parsed.nodes.len(), 1);
    assert_eq!(requirements, vec!["numpy".to_string()]);
}
