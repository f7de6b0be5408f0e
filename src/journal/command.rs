//! # Journal Commands
//!
//! A journal records the [`GraphEvent`]s a graph emits. Each recorded event
//! doubles as a replayable command: [`JournalCommand::apply`] performs the
//! mutation the event describes on a graph, and [`JournalCommand::inverse`]
//! yields the command that undoes it.
//!
//! Transaction markers replay as no-ops. `Change*` commands carry the full
//! metadata snapshot before and after the change; applying one rewrites the
//! current metadata into the target snapshot.

use crate::graph::{Graph, GraphError, GraphEvent, Metadata};
use serde_json::Value;

/// A replayable graph mutation.
pub type JournalCommand = GraphEvent;

impl GraphEvent {
  /// The command undoing this one.
  pub fn inverse(&self) -> JournalCommand {
    use GraphEvent::*;
    match self.clone() {
      StartTransaction { id, metadata } => StartTransaction { id, metadata },
      EndTransaction { id, metadata } => EndTransaction { id, metadata },
      ChangeProperties { properties, before } => ChangeProperties {
        properties: before,
        before: properties,
      },
      AddNode(node) => RemoveNode(node),
      RemoveNode(node) => AddNode(node),
      RenameNode { old_id, new_id } => RenameNode {
        old_id: new_id,
        new_id: old_id,
      },
      ChangeNode { mut node, before } => {
        let after = std::mem::replace(&mut node.metadata, before);
        ChangeNode { node, before: after }
      }
      AddEdge(edge) => RemoveEdge(edge),
      RemoveEdge(edge) => AddEdge(edge),
      ChangeEdge { mut edge, before } => {
        let after = std::mem::replace(&mut edge.metadata, before);
        ChangeEdge { edge, before: after }
      }
      AddInitial(initializer) => RemoveInitial(initializer),
      RemoveInitial(initializer) => AddInitial(initializer),
      AddExport(export) => RemoveExport(export),
      RemoveExport(export) => AddExport(export),
      AddInport { name, port } => RemoveInport { name, port },
      RemoveInport { name, port } => AddInport { name, port },
      RenameInport { old_name, new_name } => RenameInport {
        old_name: new_name,
        new_name: old_name,
      },
      ChangeInport {
        name,
        mut port,
        before,
      } => {
        let after = std::mem::replace(&mut port.metadata, before);
        ChangeInport {
          name,
          port,
          before: after,
        }
      }
      AddOutport { name, port } => RemoveOutport { name, port },
      RemoveOutport { name, port } => AddOutport { name, port },
      RenameOutport { old_name, new_name } => RenameOutport {
        old_name: new_name,
        new_name: old_name,
      },
      ChangeOutport {
        name,
        mut port,
        before,
      } => {
        let after = std::mem::replace(&mut port.metadata, before);
        ChangeOutport {
          name,
          port,
          before: after,
        }
      }
      AddGroup(group) => RemoveGroup(group),
      RemoveGroup(group) => AddGroup(group),
      RenameGroup { old_name, new_name } => RenameGroup {
        old_name: new_name,
        new_name: old_name,
      },
      ChangeGroup { mut group, before } => {
        let after = std::mem::replace(&mut group.metadata, before);
        ChangeGroup { group, before: after }
      }
      AddGroupMember { group, node, index } => RemoveGroupMember { group, node, index },
      RemoveGroupMember { group, node, index } => AddGroupMember { group, node, index },
    }
  }

  /// Performs the mutation this command describes on `graph`.
  pub fn apply(&self, graph: &Graph) -> Result<(), GraphError> {
    use GraphEvent::*;
    match self {
      StartTransaction { .. } | EndTransaction { .. } => Ok(()),
      ChangeProperties { properties, .. } => {
        graph.set_properties(&metadata_delta(&graph.properties(), properties));
        Ok(())
      }
      AddNode(node) => graph
        .add_node(&node.id, &node.component, Some(node.metadata.clone()))
        .map(drop),
      RemoveNode(node) => graph.remove_node(&node.id),
      RenameNode { old_id, new_id } => graph.rename_node(old_id, new_id),
      ChangeNode { node, .. } => {
        let current = graph
          .get_node(&node.id)
          .ok_or_else(|| GraphError::NodeNotFound(node.id.clone()))?;
        graph.set_node_metadata(&node.id, &metadata_delta(&current.metadata, &node.metadata))
      }
      AddEdge(edge) => graph
        .add_edge_index(
          &edge.from.node,
          &edge.from.port,
          edge.from.index,
          &edge.to.node,
          &edge.to.port,
          edge.to.index,
          Some(edge.metadata.clone()),
        )
        .map(drop),
      RemoveEdge(edge) => graph.remove_edge_index(
        &edge.from.node,
        &edge.from.port,
        edge.from.index,
        &edge.to.node,
        &edge.to.port,
        edge.to.index,
      ),
      ChangeEdge { edge, .. } => {
        let current = graph
          .get_edge(&edge.from.node, &edge.from.port, &edge.to.node, &edge.to.port)
          .map(|e| e.metadata)
          .unwrap_or_default();
        graph.set_edge_metadata(
          &edge.from.node,
          &edge.from.port,
          &edge.to.node,
          &edge.to.port,
          &metadata_delta(&current, &edge.metadata),
        )
      }
      AddInitial(initializer) => graph
        .add_initial_index(
          initializer.data.clone(),
          &initializer.to.node,
          &initializer.to.port,
          initializer.to.index,
          Some(initializer.metadata.clone()),
        )
        .map(drop),
      RemoveInitial(initializer) => graph.remove_initial_index(
        &initializer.to.node,
        &initializer.to.port,
        initializer.to.index,
        Some(&initializer.data),
      ),
      AddExport(export) => graph
        .add_export(
          &export.public,
          &export.process,
          &export.port,
          Some(export.metadata.clone()),
        )
        .map(drop),
      RemoveExport(export) => graph.remove_export(&export.public),
      AddInport { name, port } => graph
        .add_inport(name, &port.process, &port.port, Some(port.metadata.clone()))
        .map(drop),
      RemoveInport { name, .. } => graph.remove_inport(name),
      RenameInport { old_name, new_name } => graph.rename_inport(old_name, new_name),
      ChangeInport { name, port, .. } => {
        let current = graph
          .inports()
          .get(name)
          .map(|p| p.metadata.clone())
          .unwrap_or_default();
        graph.set_inport_metadata(name, &metadata_delta(&current, &port.metadata))
      }
      AddOutport { name, port } => graph
        .add_outport(name, &port.process, &port.port, Some(port.metadata.clone()))
        .map(drop),
      RemoveOutport { name, .. } => graph.remove_outport(name),
      RenameOutport { old_name, new_name } => graph.rename_outport(old_name, new_name),
      ChangeOutport { name, port, .. } => {
        let current = graph
          .outports()
          .get(name)
          .map(|p| p.metadata.clone())
          .unwrap_or_default();
        graph.set_outport_metadata(name, &metadata_delta(&current, &port.metadata))
      }
      AddGroup(group) => graph
        .add_group(&group.name, group.nodes.clone(), Some(group.metadata.clone()))
        .map(drop),
      RemoveGroup(group) => {
        if !graph.groups().iter().any(|g| g.name == group.name) {
          return Ok(());
        }
        graph.remove_group(&group.name)
      }
      RenameGroup { old_name, new_name } => graph.rename_group(old_name, new_name),
      ChangeGroup { group, .. } => {
        let current = graph
          .groups()
          .into_iter()
          .find(|g| g.name == group.name)
          .map(|g| g.metadata)
          .unwrap_or_default();
        graph.set_group_metadata(&group.name, &metadata_delta(&current, &group.metadata))
      }
      AddGroupMember { group, node, index } => graph.add_group_member(group, node, Some(*index)),
      RemoveGroupMember { group, node, .. } => graph.remove_group_member(group, node),
    }
  }

  /// One-line human readable form. `rev` labels transaction markers.
  pub fn describe(&self, rev: usize) -> String {
    use GraphEvent::*;
    match self {
      StartTransaction { id, .. } => format!(">>> {rev}: {id}"),
      EndTransaction { id, .. } => format!("<<< {rev}: {id}"),
      ChangeProperties { .. } => "PROPERTIES".to_string(),
      AddNode(node) => format!("{}({})", node.id, node.component),
      RemoveNode(node) => format!("DEL {}({})", node.id, node.component),
      RenameNode { old_id, new_id } => format!("RENAME {old_id} {new_id}"),
      ChangeNode { node, .. } => format!("META {}", node.id),
      AddEdge(edge) => format!(
        "{} {} -> {} {}",
        edge.from.node,
        edge.from.port.to_uppercase(),
        edge.to.port.to_uppercase(),
        edge.to.node
      ),
      RemoveEdge(edge) => format!(
        "{} {} -X> {} {}",
        edge.from.node,
        edge.from.port.to_uppercase(),
        edge.to.port.to_uppercase(),
        edge.to.node
      ),
      ChangeEdge { edge, .. } => format!(
        "META {} {} -> {} {}",
        edge.from.node,
        edge.from.port.to_uppercase(),
        edge.to.port.to_uppercase(),
        edge.to.node
      ),
      AddInitial(initializer) => format!(
        "'{}' -> {} {}",
        packet_text(&initializer.data),
        initializer.to.port.to_uppercase(),
        initializer.to.node
      ),
      RemoveInitial(initializer) => format!(
        "'{}' -X> {} {}",
        packet_text(&initializer.data),
        initializer.to.port.to_uppercase(),
        initializer.to.node
      ),
      AddExport(export) => format!("EXPORT {} {}.{}", export.public, export.process, export.port),
      RemoveExport(export) => format!("DEL EXPORT {}", export.public),
      AddInport { name, .. } => format!("INPORT {name}"),
      RemoveInport { name, .. } => format!("DEL INPORT {name}"),
      RenameInport { old_name, new_name } => format!("RENAME INPORT {old_name} {new_name}"),
      ChangeInport { name, .. } => format!("META INPORT {name}"),
      AddOutport { name, .. } => format!("OUTPORT {name}"),
      RemoveOutport { name, .. } => format!("DEL OUTPORT {name}"),
      RenameOutport { old_name, new_name } => format!("RENAME OUTPORT {old_name} {new_name}"),
      ChangeOutport { name, .. } => format!("META OUTPORT {name}"),
      AddGroup(group) => format!("GROUP {}", group.name),
      RemoveGroup(group) => format!("DEL GROUP {}", group.name),
      RenameGroup { old_name, new_name } => format!("RENAME GROUP {old_name} {new_name}"),
      ChangeGroup { group, .. } => format!("META GROUP {}", group.name),
      AddGroupMember { group, node, .. } => format!("MEMBER {group} {node}"),
      RemoveGroupMember { group, node, .. } => format!("DEL MEMBER {group} {node}"),
    }
  }
}

fn packet_text(data: &Value) -> String {
  match data {
    Value::String(text) => text.clone(),
    other => other.to_string(),
  }
}

/// Delta turning `current` into `target` under null-deletes merge semantics.
fn metadata_delta(current: &Metadata, target: &Metadata) -> Metadata {
  let mut delta: Metadata = current
    .keys()
    .filter(|key| !target.contains_key(*key))
    .map(|key| (key.clone(), Value::Null))
    .collect();
  delta.extend(target.iter().map(|(k, v)| (k.clone(), v.clone())));
  delta
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_metadata_delta_clears_missing_keys() {
    let current: Metadata = json!({ "x": 1, "y": 2 }).as_object().cloned().unwrap();
    let target: Metadata = json!({ "y": 3 }).as_object().cloned().unwrap();
    let delta = metadata_delta(&current, &target);
    assert_eq!(Value::Object(delta), json!({ "x": null, "y": 3 }));
  }

  #[test]
  fn test_inverse_swaps_change_snapshots() {
    let graph = Graph::new("g");
    graph.add_node("A", "Comp", None).unwrap();
    let events = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
    let sink = events.clone();
    graph.subscribe(move |event| sink.borrow_mut().push(event.clone()));
    let meta: Metadata = json!({ "x": 1 }).as_object().cloned().unwrap();
    graph.set_node_metadata("A", &meta).unwrap();

    let change = events
      .borrow()
      .iter()
      .find(|e| matches!(e, GraphEvent::ChangeNode { .. }))
      .cloned()
      .unwrap();
    change.inverse().apply(&graph).unwrap();
    assert!(graph.get_node("A").unwrap().metadata.is_empty());
    change.apply(&graph).unwrap();
    assert_eq!(graph.get_node("A").unwrap().metadata, meta);
  }
}
