//! Change notifications emitted by a [`Graph`](crate::graph::Graph).
//!
//! Every applied mutation emits exactly one [`GraphEvent`]. `Change*` variants
//! carry the metadata snapshot taken before the change so that observers such
//! as the [`Journal`](crate::journal::Journal) can reconstruct the delta.

use crate::graph::types::{Edge, Export, Group, Initializer, Metadata, Node, PublicPort};
use serde::{Deserialize, Serialize};

/// A single graph change.
///
/// Serialises as `{"event": "addNode", "payload": ...}`, tagged with
/// [`name`](Self::name).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "camelCase")]
pub enum GraphEvent {
  /// A transaction was opened.
  StartTransaction {
    /// Transaction id (`"implicit"` for automatic wrapping).
    id: String,
    /// Optional caller metadata.
    metadata: Option<Metadata>,
  },
  /// A transaction was closed.
  EndTransaction {
    /// Transaction id.
    id: String,
    /// Optional caller metadata.
    metadata: Option<Metadata>,
  },
  /// Graph properties changed.
  ChangeProperties {
    /// Properties after the change.
    properties: Metadata,
    /// Properties before the change.
    before: Metadata,
  },
  /// A node was added.
  AddNode(Node),
  /// A node was removed (after its cascade).
  RemoveNode(Node),
  /// A node id changed.
  RenameNode {
    /// Previous id.
    old_id: String,
    /// New id.
    new_id: String,
  },
  /// Node metadata changed.
  ChangeNode {
    /// Node after the change.
    node: Node,
    /// Metadata before the change.
    before: Metadata,
  },
  /// An edge was added.
  AddEdge(Edge),
  /// An edge was removed.
  RemoveEdge(Edge),
  /// Edge metadata changed.
  ChangeEdge {
    /// Edge after the change.
    edge: Edge,
    /// Metadata before the change.
    before: Metadata,
  },
  /// An initializer was added.
  AddInitial(Initializer),
  /// An initializer was removed.
  RemoveInitial(Initializer),
  /// A legacy export was added.
  AddExport(Export),
  /// A legacy export was removed.
  RemoveExport(Export),
  /// A public inport was bound.
  AddInport {
    /// Public name.
    name: String,
    /// Binding.
    port: PublicPort,
  },
  /// A public inport was unbound.
  RemoveInport {
    /// Public name.
    name: String,
    /// Binding that was removed.
    port: PublicPort,
  },
  /// A public inport was renamed.
  RenameInport {
    /// Previous name.
    old_name: String,
    /// New name.
    new_name: String,
  },
  /// Public inport metadata changed.
  ChangeInport {
    /// Public name.
    name: String,
    /// Binding after the change.
    port: PublicPort,
    /// Metadata before the change.
    before: Metadata,
  },
  /// A public outport was bound.
  AddOutport {
    /// Public name.
    name: String,
    /// Binding.
    port: PublicPort,
  },
  /// A public outport was unbound.
  RemoveOutport {
    /// Public name.
    name: String,
    /// Binding that was removed.
    port: PublicPort,
  },
  /// A public outport was renamed.
  RenameOutport {
    /// Previous name.
    old_name: String,
    /// New name.
    new_name: String,
  },
  /// Public outport metadata changed.
  ChangeOutport {
    /// Public name.
    name: String,
    /// Binding after the change.
    port: PublicPort,
    /// Metadata before the change.
    before: Metadata,
  },
  /// A group was added.
  AddGroup(Group),
  /// A group was removed.
  RemoveGroup(Group),
  /// A group was renamed.
  RenameGroup {
    /// Previous name.
    old_name: String,
    /// New name.
    new_name: String,
  },
  /// A node joined a group.
  AddGroupMember {
    /// Group name.
    group: String,
    /// Node id.
    node: String,
    /// Position of the node in the member list.
    index: usize,
  },
  /// A node left a group.
  RemoveGroupMember {
    /// Group name.
    group: String,
    /// Node id.
    node: String,
    /// Position the node occupied in the member list.
    index: usize,
  },
  /// Group metadata changed.
  ChangeGroup {
    /// Group after the change.
    group: Group,
    /// Metadata before the change.
    before: Metadata,
  },
}

impl GraphEvent {
  /// Short event name, matching the historical event names of the notation.
  pub fn name(&self) -> &'static str {
    match self {
      GraphEvent::StartTransaction { .. } => "startTransaction",
      GraphEvent::EndTransaction { .. } => "endTransaction",
      GraphEvent::ChangeProperties { .. } => "changeProperties",
      GraphEvent::AddNode(_) => "addNode",
      GraphEvent::RemoveNode(_) => "removeNode",
      GraphEvent::RenameNode { .. } => "renameNode",
      GraphEvent::ChangeNode { .. } => "changeNode",
      GraphEvent::AddEdge(_) => "addEdge",
      GraphEvent::RemoveEdge(_) => "removeEdge",
      GraphEvent::ChangeEdge { .. } => "changeEdge",
      GraphEvent::AddInitial(_) => "addInitial",
      GraphEvent::RemoveInitial(_) => "removeInitial",
      GraphEvent::AddExport(_) => "addExport",
      GraphEvent::RemoveExport(_) => "removeExport",
      GraphEvent::AddInport { .. } => "addInport",
      GraphEvent::RemoveInport { .. } => "removeInport",
      GraphEvent::RenameInport { .. } => "renameInport",
      GraphEvent::ChangeInport { .. } => "changeInport",
      GraphEvent::AddOutport { .. } => "addOutport",
      GraphEvent::RemoveOutport { .. } => "removeOutport",
      GraphEvent::RenameOutport { .. } => "renameOutport",
      GraphEvent::ChangeOutport { .. } => "changeOutport",
      GraphEvent::AddGroup(_) => "addGroup",
      GraphEvent::RemoveGroup(_) => "removeGroup",
      GraphEvent::RenameGroup { .. } => "renameGroup",
      GraphEvent::AddGroupMember { .. } => "addGroupMember",
      GraphEvent::RemoveGroupMember { .. } => "removeGroupMember",
      GraphEvent::ChangeGroup { .. } => "changeGroup",
    }
  }
}
