//! # FBP Parser Test Suite

use crate::fbp::{parse, FbpParseError};
use crate::graph::{EndpointJson, Graph};
use serde_json::json;

fn endpoint(process: &str, port: &str, index: Option<usize>) -> EndpointJson {
  EndpointJson {
    process: process.to_string(),
    port: port.to_string(),
    index,
  }
}

#[test]
fn test_chain_with_declarations_and_initial() {
  let definition = parse(
    "
    # A small pipeline
    'package.json' -> IN Read(ReadFile)
    Read OUT -> IN Split(SplitLines) OUT -> IN Display(Output)
    ",
  )
  .unwrap();

  let components: Vec<(&str, &str)> = definition
    .processes
    .iter()
    .map(|(id, p)| (id.as_str(), p.component.as_str()))
    .collect();
  assert_eq!(
    components,
    vec![("Read", "ReadFile"), ("Split", "SplitLines"), ("Display", "Output")]
  );

  let connections = &definition.connections;
  assert_eq!(connections.len(), 3);
  assert_eq!(connections[0].src, None);
  assert_eq!(connections[0].data, Some(json!("package.json")));
  assert_eq!(connections[0].tgt, endpoint("Read", "in", None));
  assert_eq!(connections[1].src, Some(endpoint("Read", "out", None)));
  assert_eq!(connections[1].tgt, endpoint("Split", "in", None));
  assert_eq!(connections[2].src, Some(endpoint("Split", "out", None)));
  assert_eq!(connections[2].tgt, endpoint("Display", "in", None));
}

#[test]
fn test_commas_separate_statements() {
  let definition = parse("A(Comp), B(Comp), A OUT -> IN B").unwrap();
  assert_eq!(definition.processes.len(), 2);
  assert_eq!(definition.connections.len(), 1);
}

#[test]
fn test_array_port_indices() {
  let definition = parse("A(Split) OUT[0] -> IN[2] B(Merge)").unwrap();
  let edge = &definition.connections[0];
  assert_eq!(edge.src, Some(endpoint("A", "out", Some(0))));
  assert_eq!(edge.tgt, endpoint("B", "in", Some(2)));
}

#[test]
fn test_component_metadata() {
  let definition = parse("Count(Counter:unit=lines,verbose)").unwrap();
  let process = definition.processes.get("Count").unwrap();
  assert_eq!(process.component, "Counter");
  assert_eq!(process.metadata.get("unit"), Some(&json!("lines")));
  assert_eq!(process.metadata.get("verbose"), Some(&json!(true)));
}

#[test]
fn test_public_ports_and_exports() {
  let definition = parse(
    "INPORT=Read.IN:FILENAME
     OUTPORT=Read.OUT:Contents
     EXPORT=Read.ERROR:ERRORS
     Read(ReadFile)",
  )
  .unwrap();
  let inport = definition.inports.get("filename").unwrap();
  assert_eq!((inport.process.as_str(), inport.port.as_str()), ("Read", "in"));
  assert!(definition.outports.contains_key("contents"));
  assert_eq!(definition.exports[0].private.as_deref(), Some("Read.error"));
  assert_eq!(definition.exports[0].public, "errors");
}

#[test]
fn test_annotations_become_properties() {
  let definition = parse("# @runtime flowweave\n# @name Clock\nT(core/Repeat)").unwrap();
  assert_eq!(definition.properties.get("runtime"), Some(&json!("flowweave")));
  assert_eq!(definition.properties.get("name"), Some(&json!("Clock")));
}

#[test]
fn test_missing_arrow_is_reported_with_position() {
  assert_eq!(
    parse("A(Comp) OUT IN B(Comp)"),
    Err(FbpParseError::Unexpected {
      line: 1,
      column: 13,
      expected: "'->'".into(),
      found: "'IN'".into(),
    })
  );
}

#[test]
fn test_chain_cannot_end_on_an_arrow() {
  assert!(matches!(
    parse("A(Comp) OUT ->"),
    Err(FbpParseError::Unexpected { ref found, .. }) if found == "end of statement"
  ));
}

#[test]
fn test_undeclared_node_is_rejected() {
  assert_eq!(
    parse("A(Comp) OUT -> IN B"),
    Err(FbpParseError::UndeclaredNode {
      line: 1,
      node: "B".into()
    })
  );
}

#[test]
fn test_conflicting_declarations_are_rejected() {
  assert!(matches!(
    parse("A(One)\nA(Two)"),
    Err(FbpParseError::ConflictingComponent { line: 2, .. })
  ));
}

#[test]
fn test_graph_from_fbp() {
  let graph = Graph::from_fbp(
    "INPORT=R.IN:IN
     'x' -> IN R(core/Repeat) OUT -> IN S(core/Repeat)",
  )
  .unwrap();
  assert_eq!(graph.nodes().len(), 2);
  assert_eq!(graph.edges().len(), 1);
  assert_eq!(graph.initializers()[0].data, json!("x"));
  assert!(graph.inports().contains_key("in"));
}
