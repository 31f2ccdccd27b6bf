//! Integration tests exercising real command types through `CommandHistory`.

mod common;

use pyflowgraph::commands::{
    base::{Command, CompositeCommand},
    connection_commands::DeleteConnectionCommand,
    history::{CommandHistory, HistoryConfig},
    node_commands::{DeleteNodeCommand, MoveNodeCommand},
};
use pyflowgraph::core::{Graph, Position};

// ===========================================================================
// Scenario: undo-redo of a composite delete preserves connections
// ===========================================================================

#[test]
fn undo_of_composite_node_delete_restores_connections() {
    let mut graph = Graph::new("g");
    let a = common::node(&mut graph, "A", common::SOURCE_HELLO);
    let b = common::node(&mut graph, "B", common::UPPER);
    let c = common::node(&mut graph, "C", common::UPPER);
    let conn_ab = graph.create_connection(a, "output_1", b, "text").unwrap();
    let conn_bc = graph.create_connection(b, "output_1", c, "text").unwrap();

    let before = graph.serialize();

    let mut history = CommandHistory::default();
    let composite: Box<dyn Command> = Box::new(CompositeCommand::new(
        "Delete node",
        vec![
            Box::new(DeleteConnectionCommand::new(conn_ab)),
            Box::new(DeleteConnectionCommand::new(conn_bc)),
            Box::new(DeleteNodeCommand::new(b)),
        ],
    ));
    assert!(history.execute(composite, &mut graph));
    assert!(graph.node(b).is_none());
    assert!(graph.connections.is_empty());

    history.undo(&mut graph);
    let after = graph.serialize();

    assert_eq!(after.nodes.len(), before.nodes.len());
    assert_eq!(after.connections.len(), before.connections.len());
    assert!(graph.node(b).is_some());
}

#[test]
fn redo_after_undo_of_a_composite_delete_runs_its_sub_commands_again() {
    let mut graph = Graph::new("g");
    let a = common::node(&mut graph, "A", common::SOURCE_HELLO);
    let b = common::node(&mut graph, "B", common::UPPER);
    let c = common::node(&mut graph, "C", common::UPPER);
    let conn_ab = graph.create_connection(a, "output_1", b, "text").unwrap();
    let conn_bc = graph.create_connection(b, "output_1", c, "text").unwrap();

    let mut history = CommandHistory::default();
    let composite: Box<dyn Command> = Box::new(CompositeCommand::new(
        "Delete node",
        vec![
            Box::new(DeleteConnectionCommand::new(conn_ab)),
            Box::new(DeleteConnectionCommand::new(conn_bc)),
            Box::new(DeleteNodeCommand::new(b)),
        ],
    ));
    assert!(history.execute(composite, &mut graph));
    history.undo(&mut graph);
    assert!(graph.node(b).is_some());

    assert!(history.redo(&mut graph).is_some());
    assert!(graph.node(b).is_none());
    assert!(graph.connections.is_empty());
}

// ===========================================================================
// Scenario: move merge
// ===========================================================================

#[test]
fn rapid_moves_merge_into_a_single_history_entry() {
    let mut graph = Graph::new("g");
    let a = graph.create_node("A", Position::zero());

    let mut history = CommandHistory::default();
    history.execute(
        Box::new(MoveNodeCommand::new(a, Position::zero(), Position::new(10.0, 0.0))),
        &mut graph,
    );
    history.execute(
        Box::new(MoveNodeCommand::new(a, Position::new(10.0, 0.0), Position::new(20.0, 0.0))),
        &mut graph,
    );

    assert_eq!(history.len(), 1);
    history.undo(&mut graph);
    assert_eq!(graph.node(a).unwrap().position(), Position::zero());
}

// ===========================================================================
// Scenario: depth bound eviction with real commands
// ===========================================================================

#[test]
fn depth_limit_evicts_oldest_real_commands() {
    let mut graph = Graph::new("g");
    let mut history = CommandHistory::new(HistoryConfig { max_depth: 3, max_memory_bytes: usize::MAX });

    let mut last = None;
    for i in 0..5 {
        let id = graph.create_node(format!("N{i}"), Position::zero());
        last = Some(id);
        history.execute(
            Box::new(MoveNodeCommand::new(id, Position::zero(), Position::new(1.0, 0.0))),
            &mut graph,
        );
    }

    assert_eq!(history.len(), 3);
    // The most recent command is still undoable.
    assert!(history.can_undo());
    history.undo(&mut graph);
    assert_ne!(graph.node(last.unwrap()).unwrap().position(), Position::new(1.0, 0.0));
}
