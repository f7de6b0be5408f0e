//! # Journal Test Suite
//!
//! Baseline recording, revision bookkeeping, undo/redo and persistence.

use crate::graph::{Graph, GraphJson, Metadata};
use crate::journal::{Journal, JournalError, JournalStore, MemoryJournalStore};
use serde_json::json;
use std::rc::Rc;

fn meta(value: serde_json::Value) -> Metadata {
  value.as_object().cloned().unwrap()
}

fn snapshot(graph: &Graph) -> GraphJson {
  graph.to_json()
}

fn journaled() -> (Rc<Graph>, Rc<Journal>) {
  let graph = Rc::new(Graph::new("journaled"));
  let journal = Journal::new(graph.clone(), None, MemoryJournalStore::new());
  (graph, journal)
}

// ============================================================================
// Recording
// ============================================================================

#[test]
fn test_baseline_records_existing_entities() {
  let graph = Rc::new(Graph::new("existing"));
  graph.add_node("Foo", "Comp", None).unwrap();
  graph.add_node("Bar", "Comp", None).unwrap();
  graph.add_edge("Foo", "out", "Bar", "in", None).unwrap();
  graph.add_initial(json!("hello"), "Bar", "in2", None).unwrap();
  graph.add_inport("input", "Foo", "in", None).unwrap();

  let journal = Journal::new(graph.clone(), None, MemoryJournalStore::new());
  assert_eq!(journal.current_revision(), 0);
  assert_eq!(journal.last_revision(), 0);
  assert!(!journal.can_undo());
  assert!(!journal.can_redo());
  assert_eq!(
    journal.to_json(0, None),
    vec![
      ">>> 0: initial",
      "Foo(Comp)",
      "Bar(Comp)",
      "Foo OUT -> IN Bar",
      "'hello' -> IN2 Bar",
      "INPORT input",
      "<<< 0: initial",
    ]
  );
}

#[test]
fn test_each_implicit_transaction_is_one_revision() {
  let (graph, journal) = journaled();
  graph.add_node("A", "Comp", None).unwrap();
  graph.add_node("B", "Comp", None).unwrap();
  graph.add_edge("A", "out", "B", "in", None).unwrap();
  assert_eq!(journal.current_revision(), 3);
  assert_eq!(
    journal.to_json(3, Some(3)),
    vec![">>> 3: implicit", "A OUT -> IN B", "<<< 3: implicit"]
  );
}

#[test]
fn test_explicit_transaction_is_one_revision() {
  let (graph, journal) = journaled();
  graph.start_transaction("build", None).unwrap();
  graph.add_node("A", "Comp", None).unwrap();
  graph.add_node("B", "Comp", None).unwrap();
  graph.add_edge("A", "out", "B", "in", None).unwrap();
  graph.end_transaction("build", None).unwrap();

  assert_eq!(journal.current_revision(), 1);
  journal.undo().unwrap();
  assert!(graph.nodes().is_empty());
  journal.redo().unwrap();
  assert_eq!(graph.edges().len(), 1);
}

// ============================================================================
// Undo / redo
// ============================================================================

#[test]
fn test_undo_then_redo_restores_the_same_graph() {
  let (graph, journal) = journaled();
  graph.add_node("A", "Comp", None).unwrap();
  graph.add_node("B", "Comp", None).unwrap();
  graph.add_edge("A", "out", "B", "in", None).unwrap();
  graph.add_initial(json!(5), "A", "in", None).unwrap();
  graph.add_group("pair", vec!["A".into(), "B".into()], None).unwrap();
  graph.set_node_metadata("A", &meta(json!({ "x": 10 }))).unwrap();
  graph.rename_node("B", "C").unwrap();

  let last = journal.current_revision();
  let at_last = snapshot(&graph);
  for _ in 0..last {
    let before = snapshot(&graph);
    journal.undo().unwrap();
    journal.redo().unwrap();
    assert_eq!(snapshot(&graph), before);
    journal.undo().unwrap();
  }
  assert_eq!(journal.current_revision(), 0);
  assert!(graph.nodes().is_empty());

  journal.move_to_revision(last).unwrap();
  assert_eq!(snapshot(&graph), at_last);
}

#[test]
fn test_undoing_a_node_removal_restores_its_connections() {
  let (graph, journal) = journaled();
  graph.add_node("A", "Comp", None).unwrap();
  graph.add_node("B", "Comp", None).unwrap();
  graph.add_edge("A", "out", "B", "in", None).unwrap();
  graph.add_initial(json!(1), "B", "opt", None).unwrap();
  graph.add_outport("result", "B", "out", None).unwrap();
  graph.add_group("g", vec!["A".into(), "B".into()], None).unwrap();
  let before = snapshot(&graph);

  graph.remove_node("B").unwrap();
  assert!(graph.edges().is_empty());

  journal.undo().unwrap();
  assert_eq!(snapshot(&graph), before);
  journal.redo().unwrap();
  assert!(graph.get_node("B").is_none());
  assert!(graph.initializers().is_empty());
  assert_eq!(graph.groups()[0].nodes, vec!["A".to_string()]);
}

#[test]
fn test_undo_keeps_indexed_sibling_initials() {
  let (graph, journal) = journaled();
  graph.add_node("A", "Comp", None).unwrap();
  graph.add_initial_index(json!(1), "A", "in", Some(0), None).unwrap();
  graph.add_initial_index(json!(2), "A", "in", Some(1), None).unwrap();
  let at_last = snapshot(&graph);

  journal.undo().unwrap();
  let remaining = graph.initializers();
  assert_eq!(remaining.len(), 1);
  assert_eq!(remaining[0].data, json!(1));
  assert_eq!(remaining[0].to.index, Some(0));

  journal.redo().unwrap();
  assert_eq!(graph.initializers().len(), 2);
  assert_eq!(snapshot(&graph), at_last);
}

#[test]
fn test_undo_keeps_indexed_sibling_edges() {
  let (graph, journal) = journaled();
  graph.add_node("A", "Comp", None).unwrap();
  graph.add_node("B", "Comp", None).unwrap();
  graph
    .add_edge_index("A", "out", None, "B", "in", Some(0), None)
    .unwrap();
  graph
    .add_edge_index("A", "out", None, "B", "in", Some(1), None)
    .unwrap();
  let at_last = snapshot(&graph);

  journal.undo().unwrap();
  let remaining = graph.edges();
  assert_eq!(remaining.len(), 1);
  assert_eq!(remaining[0].to.index, Some(0));

  journal.redo().unwrap();
  assert_eq!(graph.edges().len(), 2);
  assert_eq!(snapshot(&graph), at_last);
}

#[test]
fn test_metadata_changes_are_reverted_to_their_snapshot() {
  let (graph, journal) = journaled();
  graph
    .add_node("A", "Comp", Some(meta(json!({ "x": 1 }))))
    .unwrap();
  graph
    .set_node_metadata("A", &meta(json!({ "x": null, "label": "a" })))
    .unwrap();
  graph.set_properties(&meta(json!({ "environment": "test" })));

  journal.undo().unwrap();
  assert!(graph.properties().get("environment").is_none());
  journal.undo().unwrap();
  assert_eq!(graph.get_node("A").unwrap().metadata, meta(json!({ "x": 1 })));
  journal.redo().unwrap();
  assert_eq!(
    graph.get_node("A").unwrap().metadata,
    meta(json!({ "label": "a" }))
  );
}

#[test]
fn test_replay_is_not_recorded() {
  let (graph, journal) = journaled();
  graph.add_node("A", "Comp", None).unwrap();
  graph.add_node("B", "Comp", None).unwrap();
  journal.undo().unwrap();
  journal.undo().unwrap();
  assert_eq!(journal.last_revision(), 2);
  assert!(journal.can_redo());
  journal.redo().unwrap();
  assert_eq!(journal.current_revision(), 1);
  assert_eq!(journal.last_revision(), 2);
}

#[test]
fn test_new_change_after_undo_discards_redo_branch() {
  let (graph, journal) = journaled();
  graph.add_node("A", "Comp", None).unwrap();
  graph.add_node("B", "Comp", None).unwrap();
  journal.undo().unwrap();

  graph.add_node("C", "Comp", None).unwrap();
  assert_eq!(journal.current_revision(), 2);
  assert_eq!(journal.last_revision(), 2);
  assert!(!journal.can_redo());
  assert_eq!(journal.to_json(2, Some(2))[1], "C(Comp)");

  journal.undo().unwrap();
  let ids: Vec<String> = graph.nodes().into_iter().map(|n| n.id).collect();
  assert_eq!(ids, vec!["A"]);
}

#[test]
fn test_out_of_range_revision_is_rejected() {
  let (graph, journal) = journaled();
  graph.add_node("A", "Comp", None).unwrap();
  assert!(matches!(
    journal.move_to_revision(7),
    Err(JournalError::RevisionOutOfRange { requested: 7, last: 1 })
  ));
  assert_eq!(journal.current_revision(), 1);
  journal.redo().unwrap();
  assert_eq!(journal.current_revision(), 1);
}

#[test]
fn test_existing_store_continues_at_its_last_revision() {
  let graph = Rc::new(Graph::new("resumed"));
  graph.add_node("A", "Comp", None).unwrap();
  let mut store = MemoryJournalStore::new();
  store.put_transaction(0, Vec::new());
  store.put_transaction(1, Vec::new());

  let journal = Journal::new(graph.clone(), None, store);
  assert_eq!(journal.current_revision(), 1);
  assert!(journal.can_undo());
  assert!(journal.to_json(0, None).is_empty());

  graph.add_node("B", "Comp", None).unwrap();
  assert_eq!(journal.current_revision(), 2);
}

#[test]
fn test_redo_of_port_wide_removal_tolerates_siblings() {
  let (graph, journal) = journaled();
  graph.add_node("A", "Comp", None).unwrap();
  graph.add_initial(json!(1), "A", "in", None).unwrap();
  graph.add_initial(json!(2), "A", "in", None).unwrap();
  graph.remove_initial("A", "in").unwrap();

  journal.undo().unwrap();
  let mut restored: Vec<serde_json::Value> =
    graph.initializers().into_iter().map(|i| i.data).collect();
  restored.sort_by_key(|v| v.as_i64());
  assert_eq!(restored, vec![json!(1), json!(2)]);

  journal.redo().unwrap();
  assert!(graph.initializers().is_empty());
}

// ============================================================================
// Output
// ============================================================================

#[test]
fn test_pretty_string_lists_commands_in_order() {
  let (graph, journal) = journaled();
  graph.add_node("A", "Comp", None).unwrap();
  graph.add_node("B", "Comp", None).unwrap();
  graph.add_edge("A", "out", "B", "in", None).unwrap();
  graph.remove_edge("A", "out", Some("B"), Some("in")).unwrap();
  graph.add_initial(json!({ "n": 1 }), "B", "in", None).unwrap();

  assert_eq!(
    journal.to_pretty_string(4, None),
    [
      ">>> 4: implicit",
      "A OUT -X> IN B",
      "<<< 4: implicit",
      ">>> 5: implicit",
      "'{\"n\":1}' -> IN B",
      "<<< 5: implicit",
    ]
    .join("\n")
  );
}

#[test]
fn test_save_writes_command_strings_as_json() {
  let (graph, journal) = journaled();
  graph.add_node("A", "Comp", None).unwrap();
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("journal.json");
  journal.save(&path).unwrap();

  let written: Vec<String> =
    serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
  assert_eq!(written, journal.to_json(0, None));
  assert!(written.contains(&"A(Comp)".to_string()));
}
