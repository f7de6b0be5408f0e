//! # Graph Test Suite
//!
//! Covers node, edge, initializer, public port and group management, the
//! cascade performed by node removal and the transaction bracketing of
//! change events.

use crate::graph::{Graph, GraphError, GraphEvent, Metadata};
use serde_json::json;
use std::cell::RefCell;
use std::rc::Rc;

fn meta(value: serde_json::Value) -> Metadata {
  value.as_object().cloned().unwrap_or_default()
}

/// Records the names of every event a graph emits.
fn record(graph: &Graph) -> Rc<RefCell<Vec<String>>> {
  let events = Rc::new(RefCell::new(Vec::new()));
  let sink = events.clone();
  graph.subscribe(move |event: &GraphEvent| sink.borrow_mut().push(event.name().to_string()));
  events
}

fn two_nodes() -> Graph {
  let graph = Graph::new("test");
  graph.add_node("A", "Repeat", None).unwrap();
  graph.add_node("B", "Repeat", None).unwrap();
  graph
}

// ============================================================================
// Nodes
// ============================================================================

#[test]
fn test_add_node_emits_inside_implicit_transaction() {
  let graph = Graph::new("test");
  let events = record(&graph);
  let node = graph.add_node("A", "Repeat", Some(meta(json!({"x": 1})))).unwrap();

  assert_eq!(node.id, "A");
  assert_eq!(node.metadata["x"], json!(1));
  assert_eq!(
    *events.borrow(),
    vec!["startTransaction", "addNode", "endTransaction"]
  );
  assert!(graph.transaction().id.is_none());
}

#[test]
fn test_add_node_is_idempotent_for_same_component() {
  let graph = Graph::new("test");
  graph.add_node("A", "Repeat", None).unwrap();
  let events = record(&graph);

  assert!(graph.add_node("A", "Repeat", None).is_ok());
  assert!(events.borrow().is_empty());
  assert_eq!(graph.nodes().len(), 1);
}

#[test]
fn test_add_node_rejects_other_component_under_same_id() {
  let graph = Graph::new("test");
  graph.add_node("A", "Repeat", None).unwrap();
  let events = record(&graph);

  assert_eq!(
    graph.add_node("A", "Other", None),
    Err(GraphError::DuplicateNode("A".to_string()))
  );
  assert!(events.borrow().is_empty());
  assert_eq!(graph.get_node("A").unwrap().component, "Repeat");
}

#[test]
fn test_rename_node_rewrites_references() {
  let graph = two_nodes();
  graph.add_edge("A", "out", "B", "in", None).unwrap();
  graph.add_initial(json!("hi"), "A", "in", None).unwrap();
  graph.add_inport("start", "A", "in", None).unwrap();
  graph.add_outport("result", "B", "out", None).unwrap();
  graph.add_group("g", vec!["A".into(), "B".into()], None).unwrap();

  graph.rename_node("A", "C").unwrap();

  assert!(graph.get_node("A").is_none());
  assert!(graph.get_node("C").is_some());
  assert_eq!(graph.edges()[0].from.node, "C");
  assert_eq!(graph.initializers()[0].to.node, "C");
  assert_eq!(graph.inports()["start"].process, "C");
  assert_eq!(graph.groups()[0].nodes, vec!["C".to_string(), "B".to_string()]);
}

#[test]
fn test_rename_node_to_existing_id_is_rejected() {
  let graph = two_nodes();
  assert_eq!(
    graph.rename_node("A", "B"),
    Err(GraphError::DuplicateNode("B".to_string()))
  );
  assert!(graph.get_node("A").is_some());
}

#[test]
fn test_remove_node_cascades_before_node_event() {
  let graph = two_nodes();
  graph.add_edge("A", "out", "B", "in", None).unwrap();
  graph.add_initial(json!(1), "A", "in", None).unwrap();
  graph.add_export("legacy", "A", "in", None).unwrap();
  graph.add_inport("start", "A", "in", None).unwrap();
  graph.add_outport("result", "A", "out", None).unwrap();
  graph.add_group("g", vec!["A".into()], None).unwrap();
  let events = record(&graph);

  graph.remove_node("A").unwrap();

  assert_eq!(
    *events.borrow(),
    vec![
      "startTransaction",
      "removeEdge",
      "removeInitial",
      "removeExport",
      "removeInport",
      "removeOutport",
      "removeGroupMember",
      "removeNode",
      "endTransaction",
    ]
  );
  assert!(graph.edges().is_empty());
  assert!(graph.initializers().is_empty());
  assert!(graph.exports().is_empty());
  assert!(graph.inports().is_empty());
  assert!(graph.outports().is_empty());
  assert!(graph.groups()[0].nodes.is_empty());
}

#[test]
fn test_remove_unknown_node_has_no_effect() {
  let graph = two_nodes();
  let events = record(&graph);
  assert!(matches!(graph.remove_node("Z"), Err(GraphError::NodeNotFound(_))));
  assert!(events.borrow().is_empty());
}

#[test]
fn test_set_node_metadata_null_removes_key() {
  let graph = Graph::new("test");
  graph
    .add_node("A", "Repeat", Some(meta(json!({"x": 1, "y": 2}))))
    .unwrap();
  graph
    .set_node_metadata("A", &meta(json!({"x": null, "z": 3})))
    .unwrap();

  let node = graph.get_node("A").unwrap();
  assert_eq!(node.metadata, meta(json!({"y": 2, "z": 3})));
}

// ============================================================================
// Edges and initializers
// ============================================================================

#[test]
fn test_add_edge_lowercases_ports() {
  let graph = two_nodes();
  let edge = graph.add_edge("A", "OUT", "B", "In", None).unwrap();
  assert_eq!(edge.from.port, "out");
  assert_eq!(edge.to.port, "in");
  assert!(graph.get_edge("A", "Out", "B", "IN").is_some());
}

#[test]
fn test_add_edge_to_missing_node_is_rejected() {
  let graph = two_nodes();
  let events = record(&graph);
  assert!(matches!(
    graph.add_edge("A", "out", "Z", "in", None),
    Err(GraphError::NodeNotFound(_))
  ));
  assert!(graph.edges().is_empty());
  assert!(events.borrow().is_empty());
}

#[test]
fn test_duplicate_edge_is_noop() {
  let graph = two_nodes();
  graph.add_edge("A", "out", "B", "in", None).unwrap();
  let events = record(&graph);
  graph.add_edge("A", "out", "B", "in", None).unwrap();
  assert_eq!(graph.edges().len(), 1);
  assert!(events.borrow().is_empty());
}

#[test]
fn test_add_edge_index_keeps_indices() {
  let graph = two_nodes();
  let edge = graph
    .add_edge_index("A", "out", Some(0), "B", "in", Some(2), None)
    .unwrap();
  assert_eq!(edge.from.index, Some(0));
  assert_eq!(edge.to.index, Some(2));
}

#[test]
fn test_remove_edge_without_target_removes_all_touching() {
  let graph = two_nodes();
  graph.add_node("C", "Repeat", None).unwrap();
  graph.add_edge("A", "out", "B", "in", None).unwrap();
  graph.add_edge("A", "out", "C", "in", None).unwrap();
  graph.remove_edge("A", "out", None, None).unwrap();
  assert!(graph.edges().is_empty());
}

#[test]
fn test_remove_edge_index_keeps_siblings() {
  let graph = two_nodes();
  graph
    .add_edge_index("A", "out", None, "B", "in", Some(0), None)
    .unwrap();
  graph
    .add_edge_index("A", "out", None, "B", "in", Some(1), None)
    .unwrap();
  let events = record(&graph);

  graph
    .remove_edge_index("A", "OUT", None, "B", "in", Some(1))
    .unwrap();
  assert_eq!(graph.edges().len(), 1);
  assert_eq!(graph.edges()[0].to.index, Some(0));
  assert_eq!(
    *events.borrow(),
    vec!["startTransaction", "removeEdge", "endTransaction"]
  );
  assert!(matches!(
    graph.remove_edge_index("A", "out", None, "B", "in", Some(1)),
    Err(GraphError::EdgeNotFound { .. })
  ));
}

#[test]
fn test_remove_missing_edge_is_rejected() {
  let graph = two_nodes();
  assert!(matches!(
    graph.remove_edge("A", "out", Some("B"), Some("in")),
    Err(GraphError::EdgeNotFound { .. })
  ));
}

#[test]
fn test_set_edge_metadata() {
  let graph = two_nodes();
  graph.add_edge("A", "out", "B", "in", None).unwrap();
  graph
    .set_edge_metadata("A", "out", "B", "in", &meta(json!({"route": 4})))
    .unwrap();
  assert_eq!(graph.edges()[0].metadata["route"], json!(4));
}

#[test]
fn test_initializers_add_and_remove() {
  let graph = two_nodes();
  graph.add_initial(json!("a"), "B", "in", None).unwrap();
  graph.add_initial(json!("a"), "B", "in", None).unwrap();
  graph.add_initial(json!("b"), "B", "IN", None).unwrap();
  assert_eq!(graph.initializers().len(), 2);

  graph.remove_initial("B", "in").unwrap();
  assert!(graph.initializers().is_empty());
  assert!(matches!(
    graph.remove_initial("B", "in"),
    Err(GraphError::InitialNotFound(_))
  ));
}

#[test]
fn test_remove_initial_index_matches_index_and_data() {
  let graph = two_nodes();
  graph.add_initial_index(json!(1), "B", "in", Some(0), None).unwrap();
  graph.add_initial_index(json!(2), "B", "in", Some(0), None).unwrap();
  graph.add_initial_index(json!(3), "B", "in", Some(1), None).unwrap();

  graph
    .remove_initial_index("B", "in", Some(0), Some(&json!(2)))
    .unwrap();
  let data: Vec<serde_json::Value> = graph.initializers().into_iter().map(|i| i.data).collect();
  assert_eq!(data, vec![json!(1), json!(3)]);

  graph.remove_initial_index("B", "in", Some(0), None).unwrap();
  assert_eq!(graph.initializers().len(), 1);
  assert!(matches!(
    graph.remove_initial_index("B", "in", Some(0), None),
    Err(GraphError::InitialNotFound(_))
  ));
}

#[test]
fn test_graph_initial_resolves_public_port() {
  let graph = two_nodes();
  graph.add_inport("start", "B", "in", None).unwrap();
  let iip = graph.add_graph_initial(json!(42), "START", None).unwrap();
  assert_eq!(iip.to.node, "B");
  assert_eq!(iip.to.port, "in");

  graph.remove_graph_initial("start").unwrap();
  assert!(graph.initializers().is_empty());
  assert!(matches!(
    graph.add_graph_initial(json!(1), "missing", None),
    Err(GraphError::PublicPortNotFound(_))
  ));
}

// ============================================================================
// Public ports and exports
// ============================================================================

#[test]
fn test_public_port_lifecycle() {
  let graph = two_nodes();
  graph.add_inport("Start", "A", "IN", None).unwrap();
  assert_eq!(graph.inports()["start"].port, "in");

  graph.rename_inport("start", "begin").unwrap();
  assert!(graph.inports().contains_key("begin"));
  assert!(!graph.inports().contains_key("start"));

  graph
    .set_inport_metadata("begin", &meta(json!({"label": "go"})))
    .unwrap();
  assert_eq!(graph.inports()["begin"].metadata["label"], json!("go"));

  graph.remove_inport("begin").unwrap();
  assert!(graph.inports().is_empty());
  assert!(matches!(
    graph.remove_inport("begin"),
    Err(GraphError::PublicPortNotFound(_))
  ));
}

#[test]
fn test_outport_rename_emits_event() {
  let graph = two_nodes();
  graph.add_outport("result", "B", "out", None).unwrap();
  let events = record(&graph);
  graph.rename_outport("result", "output").unwrap();
  assert_eq!(
    *events.borrow(),
    vec!["startTransaction", "renameOutport", "endTransaction"]
  );
}

#[test]
fn test_exports_add_and_remove() {
  let graph = two_nodes();
  graph.add_export("In", "A", "IN", None).unwrap();
  assert_eq!(graph.exports()[0].public, "in");
  graph.remove_export("in").unwrap();
  assert!(graph.exports().is_empty());
}

// ============================================================================
// Groups
// ============================================================================

#[test]
fn test_group_lifecycle() {
  let graph = two_nodes();
  graph.add_group("g", vec!["A".into()], None).unwrap();
  graph.add_group_member("g", "B", Some(0)).unwrap();
  assert_eq!(graph.groups()[0].nodes, vec!["B".to_string(), "A".to_string()]);

  graph.remove_group_member("g", "B").unwrap();
  assert_eq!(graph.groups()[0].nodes, vec!["A".to_string()]);

  graph.rename_group("g", "h").unwrap();
  graph
    .set_group_metadata("h", &meta(json!({"description": "d"})))
    .unwrap();
  assert_eq!(graph.groups()[0].name, "h");
  assert_eq!(graph.groups()[0].metadata["description"], json!("d"));

  graph.remove_group("h").unwrap();
  assert!(graph.groups().is_empty());
  assert!(matches!(
    graph.remove_group("h"),
    Err(GraphError::GroupNotFound(_))
  ));
}

// ============================================================================
// Transactions
// ============================================================================

#[test]
fn test_explicit_transaction_brackets_many_changes() {
  let graph = Graph::new("test");
  let events = record(&graph);
  graph.start_transaction("batch", None).unwrap();
  graph.add_node("A", "Repeat", None).unwrap();
  graph.add_node("B", "Repeat", None).unwrap();
  graph.end_transaction("batch", None).unwrap();

  assert_eq!(
    *events.borrow(),
    vec!["startTransaction", "addNode", "addNode", "endTransaction"]
  );
}

#[test]
fn test_nested_explicit_transaction_is_rejected() {
  let graph = Graph::new("test");
  graph.start_transaction("outer", None).unwrap();
  assert_eq!(
    graph.start_transaction("inner", None),
    Err(GraphError::NestedTransaction {
      open: "outer".to_string(),
      requested: "inner".to_string(),
    })
  );
  assert_eq!(graph.transaction().id.as_deref(), Some("outer"));
}

#[test]
fn test_end_without_transaction_is_rejected() {
  let graph = Graph::new("test");
  assert!(matches!(
    graph.end_transaction("none", None),
    Err(GraphError::NoTransaction(_))
  ));
}

#[test]
fn test_listener_can_read_graph_during_notification() {
  let graph = Rc::new(Graph::new("test"));
  let seen = Rc::new(RefCell::new(Vec::new()));
  let (reader, sink) = (Rc::downgrade(&graph), seen.clone());
  graph.subscribe(move |event| {
    if let (GraphEvent::AddNode(_), Some(graph)) = (event, reader.upgrade()) {
      sink.borrow_mut().push(graph.nodes().len());
    }
  });
  graph.add_node("A", "Repeat", None).unwrap();
  graph.add_node("B", "Repeat", None).unwrap();
  assert_eq!(*seen.borrow(), vec![1, 2]);
}

#[test]
fn test_to_dot_lists_nodes_and_edges() {
  let graph = two_nodes();
  graph.add_edge("A", "out", "B", "in", None).unwrap();
  graph.add_initial(json!("x"), "A", "in", None).unwrap();
  let dot = graph.to_dot();
  assert!(dot.starts_with("digraph {"));
  assert!(dot.contains("\"A\" -> \"B\""));
  assert!(dot.contains("data0 -> \"A\""));
}

#[test]
fn test_events_serialise_under_their_name() {
  let graph = Graph::new("test");
  let seen = Rc::new(RefCell::new(Vec::new()));
  let sink = seen.clone();
  graph.subscribe(move |event: &GraphEvent| sink.borrow_mut().push(event.clone()));
  graph.add_node("A", "Repeat", None).unwrap();

  let add = seen.borrow()[1].clone();
  let json = serde_json::to_value(&add).unwrap();
  assert_eq!(json["event"], json!(add.name()));
  assert_eq!(json["payload"]["id"], json!("A"));
  let back: GraphEvent = serde_json::from_value(json).unwrap();
  assert_eq!(back, add);
}
