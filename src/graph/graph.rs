//! # Graph
//!
//! The mutable, event-emitting model of a flow-based program: nodes, edges,
//! initial information packets (IIPs), public ports, legacy exports and
//! groups.
//!
//! ## Mutation Contract
//!
//! Every mutator:
//!
//! 1. Validates the nodes it references. A rejected call returns a
//!    [`GraphError`] without touching the graph or emitting anything.
//! 2. Wraps itself in an implicit transaction unless an explicit one is open.
//! 3. Emits exactly one [`GraphEvent`] describing the change.
//!
//! Port names are lowercased at the API edge. Re-applying a mutation that
//! already holds (same edge, same node) is a no-op returning the existing
//! entity.
//!
//! ## Interior Mutability
//!
//! A graph is shared as `Rc<Graph>` between the application, a
//! [`Network`](crate::network::Network) and a [`Journal`](crate::journal::Journal).
//! All methods take `&self`; no internal borrow is held while listeners run,
//! so listeners may read the graph (or mutate it) from inside a notification.
//!
//! # Example
//!
//! ```rust
//! use flowweave::graph::Graph;
//! use serde_json::json;
//!
//! let graph = Graph::new("example");
//! graph.add_node("Read", "ReadFile", None).unwrap();
//! graph.add_node("Split", "SplitLines", None).unwrap();
//! graph.add_edge("Read", "OUT", "Split", "IN", None).unwrap();
//! graph.add_initial(json!("README.md"), "Read", "IN", None).unwrap();
//!
//! assert_eq!(graph.edges()[0].from.port, "out");
//! ```

use crate::graph::error::GraphError;
use crate::graph::events::GraphEvent;
use crate::graph::types::{
  merge_metadata, Edge, Endpoint, Export, Group, Initializer, Metadata, Node, PublicPort,
  Transaction,
};
use crate::observable::{Emitter, ListenerId};
use serde_json::Value;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use tracing::trace;

const IMPLICIT: &str = "implicit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
  In,
  Out,
}

#[derive(Debug, Default)]
struct GraphState {
  properties: Metadata,
  nodes: Vec<Node>,
  edges: Vec<Edge>,
  initializers: Vec<Initializer>,
  exports: Vec<Export>,
  inports: BTreeMap<String, PublicPort>,
  outports: BTreeMap<String, PublicPort>,
  groups: Vec<Group>,
  transaction: Transaction,
}

impl GraphState {
  fn has_node(&self, id: &str) -> bool {
    self.nodes.iter().any(|n| n.id == id)
  }

  fn public_ports(&self, direction: Direction) -> &BTreeMap<String, PublicPort> {
    match direction {
      Direction::In => &self.inports,
      Direction::Out => &self.outports,
    }
  }

  fn public_ports_mut(&mut self, direction: Direction) -> &mut BTreeMap<String, PublicPort> {
    match direction {
      Direction::In => &mut self.inports,
      Direction::Out => &mut self.outports,
    }
  }
}

/// A flow-based program definition.
///
/// See the [module documentation](self) for the mutation contract.
#[derive(Debug)]
pub struct Graph {
  name: RefCell<String>,
  state: RefCell<GraphState>,
  events: Emitter<GraphEvent>,
}

impl Graph {
  /// Creates an empty graph.
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: RefCell::new(name.into()),
      state: RefCell::new(GraphState::default()),
      events: Emitter::new(),
    }
  }

  /// Returns the graph name.
  pub fn name(&self) -> String {
    self.name.borrow().clone()
  }

  /// Sets the graph name. Names are not part of the change history.
  pub fn set_name(&self, name: impl Into<String>) {
    *self.name.borrow_mut() = name.into();
  }

  // ------------------------------------------------------------------------
  // Observation
  // ------------------------------------------------------------------------

  /// Subscribes to every future change.
  pub fn subscribe(&self, listener: impl Fn(&GraphEvent) + 'static) -> ListenerId {
    self.events.on(listener)
  }

  /// Cancels a subscription made with [`subscribe`](Self::subscribe).
  pub fn unsubscribe(&self, id: ListenerId) {
    self.events.off(id);
  }

  /// Number of current subscribers.
  pub fn listener_count(&self) -> usize {
    self.events.listener_count()
  }

  fn emit(&self, event: GraphEvent) {
    trace!(event = event.name(), graph = %self.name.borrow(), "graph change");
    self.events.emit(&event);
  }

  // ------------------------------------------------------------------------
  // Queries
  // ------------------------------------------------------------------------

  /// Graph properties, excluding the name.
  pub fn properties(&self) -> Metadata {
    self.state.borrow().properties.clone()
  }

  /// Nodes in declaration order.
  pub fn nodes(&self) -> Vec<Node> {
    self.state.borrow().nodes.clone()
  }

  /// Edges in declaration order.
  pub fn edges(&self) -> Vec<Edge> {
    self.state.borrow().edges.clone()
  }

  /// Initializers in declaration order.
  pub fn initializers(&self) -> Vec<Initializer> {
    self.state.borrow().initializers.clone()
  }

  /// Legacy exports.
  pub fn exports(&self) -> Vec<Export> {
    self.state.borrow().exports.clone()
  }

  /// Public inports by name.
  pub fn inports(&self) -> BTreeMap<String, PublicPort> {
    self.state.borrow().inports.clone()
  }

  /// Public outports by name.
  pub fn outports(&self) -> BTreeMap<String, PublicPort> {
    self.state.borrow().outports.clone()
  }

  /// Groups in declaration order.
  pub fn groups(&self) -> Vec<Group> {
    self.state.borrow().groups.clone()
  }

  /// The current transaction marker.
  pub fn transaction(&self) -> Transaction {
    self.state.borrow().transaction.clone()
  }

  /// Looks up a node by id.
  pub fn get_node(&self, id: &str) -> Option<Node> {
    self.state.borrow().nodes.iter().find(|n| n.id == id).cloned()
  }

  /// Looks up an edge by its endpoints, ignoring indices.
  pub fn get_edge(&self, node: &str, port: &str, node2: &str, port2: &str) -> Option<Edge> {
    let (port, port2) = (port.to_lowercase(), port2.to_lowercase());
    self
      .state
      .borrow()
      .edges
      .iter()
      .find(|e| e.from.is(node, &port) && e.to.is(node2, &port2))
      .cloned()
  }

  // ------------------------------------------------------------------------
  // Transactions
  // ------------------------------------------------------------------------

  /// Opens an explicit transaction.
  ///
  /// # Errors
  ///
  /// Returns [`GraphError::NestedTransaction`] when a transaction is already open.
  pub fn start_transaction(&self, id: &str, metadata: Option<Metadata>) -> Result<(), GraphError> {
    {
      let mut state = self.state.borrow_mut();
      if let Some(open) = &state.transaction.id {
        return Err(GraphError::NestedTransaction {
          open: open.clone(),
          requested: id.to_string(),
        });
      }
      state.transaction = Transaction {
        id: Some(id.to_string()),
        depth: 1,
      };
    }
    self.emit(GraphEvent::StartTransaction {
      id: id.to_string(),
      metadata,
    });
    Ok(())
  }

  /// Closes the open transaction.
  ///
  /// # Errors
  ///
  /// Returns [`GraphError::NoTransaction`] when no transaction is open.
  pub fn end_transaction(&self, id: &str, metadata: Option<Metadata>) -> Result<(), GraphError> {
    {
      let mut state = self.state.borrow_mut();
      if state.transaction.id.is_none() {
        return Err(GraphError::NoTransaction(id.to_string()));
      }
      state.transaction = Transaction::default();
    }
    self.emit(GraphEvent::EndTransaction {
      id: id.to_string(),
      metadata,
    });
    Ok(())
  }

  fn check_transaction_start(&self) {
    let needs_start = {
      let mut state = self.state.borrow_mut();
      let implicit_open = state.transaction.id.as_deref() == Some(IMPLICIT);
      if implicit_open {
        state.transaction.depth += 1;
      }
      state.transaction.id.is_none()
    };
    if needs_start {
      // Cannot fail: no transaction is open.
      let _ = self.start_transaction(IMPLICIT, None);
    }
  }

  fn check_transaction_end(&self) {
    let needs_end = {
      let mut state = self.state.borrow_mut();
      if state.transaction.id.as_deref() == Some(IMPLICIT) {
        state.transaction.depth = state.transaction.depth.saturating_sub(1);
        state.transaction.depth == 0
      } else {
        false
      }
    };
    if needs_end {
      let _ = self.end_transaction(IMPLICIT, None);
    }
  }

  /// Runs `f` inside an implicit transaction.
  fn transact<T>(&self, f: impl FnOnce() -> T) -> T {
    self.check_transaction_start();
    let result = f();
    self.check_transaction_end();
    result
  }

  fn require_node(&self, id: &str) -> Result<(), GraphError> {
    if self.state.borrow().has_node(id) {
      Ok(())
    } else {
      Err(GraphError::NodeNotFound(id.to_string()))
    }
  }

  // ------------------------------------------------------------------------
  // Properties
  // ------------------------------------------------------------------------

  /// Merges `properties` into the graph properties; `null` values remove keys.
  pub fn set_properties(&self, properties: &Metadata) {
    self.transact(|| {
      let (after, before) = {
        let mut state = self.state.borrow_mut();
        let before = state.properties.clone();
        merge_metadata(&mut state.properties, properties);
        (state.properties.clone(), before)
      };
      self.emit(GraphEvent::ChangeProperties {
        properties: after,
        before,
      });
    });
  }

  // ------------------------------------------------------------------------
  // Nodes
  // ------------------------------------------------------------------------

  /// Adds a node.
  ///
  /// Adding a node whose id and component already exist returns the existing
  /// node without emitting anything.
  ///
  /// # Errors
  ///
  /// [`GraphError::DuplicateNode`] when the id is taken by another component.
  pub fn add_node(
    &self,
    id: &str,
    component: &str,
    metadata: Option<Metadata>,
  ) -> Result<Node, GraphError> {
    if let Some(existing) = self.get_node(id) {
      if existing.component == component {
        return Ok(existing);
      }
      return Err(GraphError::DuplicateNode(id.to_string()));
    }
    let node = Node {
      id: id.to_string(),
      component: component.to_string(),
      metadata: metadata.unwrap_or_default(),
    };
    self.transact(|| {
      self.state.borrow_mut().nodes.push(node.clone());
      self.emit(GraphEvent::AddNode(node.clone()));
    });
    Ok(node)
  }

  /// Removes a node together with everything that references it.
  ///
  /// Edges, initializers, exports, public port bindings and group memberships
  /// are removed first, each emitting its own event, then the node itself.
  pub fn remove_node(&self, id: &str) -> Result<(), GraphError> {
    let node = self
      .get_node(id)
      .ok_or_else(|| GraphError::NodeNotFound(id.to_string()))?;
    self.transact(|| {
      let (edges, initials, exports, inports, outports, memberships) = {
        let state = self.state.borrow();
        let edges: Vec<Edge> = state
          .edges
          .iter()
          .filter(|e| e.from.node == id || e.to.node == id)
          .cloned()
          .collect();
        let initials: Vec<String> = state
          .initializers
          .iter()
          .filter(|i| i.to.node == id)
          .map(|i| i.to.port.clone())
          .collect();
        let exports: Vec<String> = state
          .exports
          .iter()
          .filter(|e| e.process == id)
          .map(|e| e.public.clone())
          .collect();
        let inports: Vec<String> = state
          .inports
          .iter()
          .filter(|(_, p)| p.process == id)
          .map(|(name, _)| name.clone())
          .collect();
        let outports: Vec<String> = state
          .outports
          .iter()
          .filter(|(_, p)| p.process == id)
          .map(|(name, _)| name.clone())
          .collect();
        let memberships: Vec<String> = state
          .groups
          .iter()
          .filter(|g| g.nodes.iter().any(|n| n == id))
          .map(|g| g.name.clone())
          .collect();
        (edges, initials, exports, inports, outports, memberships)
      };

      for edge in edges {
        let _ = self.remove_edge(
          &edge.from.node,
          &edge.from.port,
          Some(&edge.to.node),
          Some(&edge.to.port),
        );
      }
      for port in initials {
        let _ = self.remove_initial(id, &port);
      }
      for public in exports {
        let _ = self.remove_export(&public);
      }
      for name in inports {
        let _ = self.remove_inport(&name);
      }
      for name in outports {
        let _ = self.remove_outport(&name);
      }
      for group in memberships {
        let _ = self.remove_group_member(&group, id);
      }

      self.state.borrow_mut().nodes.retain(|n| n.id != id);
      self.emit(GraphEvent::RemoveNode(node));
    });
    Ok(())
  }

  /// Renames a node, rewriting every reference to it in place.
  ///
  /// # Errors
  ///
  /// [`GraphError::NodeNotFound`] for an unknown `old_id`,
  /// [`GraphError::DuplicateNode`] when `new_id` is taken.
  pub fn rename_node(&self, old_id: &str, new_id: &str) -> Result<(), GraphError> {
    self.require_node(old_id)?;
    if old_id == new_id {
      return Ok(());
    }
    if self.state.borrow().has_node(new_id) {
      return Err(GraphError::DuplicateNode(new_id.to_string()));
    }
    self.transact(|| {
      {
        let mut state = self.state.borrow_mut();
        for node in state.nodes.iter_mut().filter(|n| n.id == old_id) {
          node.id = new_id.to_string();
        }
        for edge in state.edges.iter_mut() {
          if edge.from.node == old_id {
            edge.from.node = new_id.to_string();
          }
          if edge.to.node == old_id {
            edge.to.node = new_id.to_string();
          }
        }
        for iip in state.initializers.iter_mut().filter(|i| i.to.node == old_id) {
          iip.to.node = new_id.to_string();
        }
        let state = &mut *state;
        for port in state.inports.values_mut().chain(state.outports.values_mut()) {
          if port.process == old_id {
            port.process = new_id.to_string();
          }
        }
        for export in state.exports.iter_mut().filter(|e| e.process == old_id) {
          export.process = new_id.to_string();
        }
        for group in state.groups.iter_mut() {
          for member in group.nodes.iter_mut().filter(|m| *m == old_id) {
            *member = new_id.to_string();
          }
        }
      }
      self.emit(GraphEvent::RenameNode {
        old_id: old_id.to_string(),
        new_id: new_id.to_string(),
      });
    });
    Ok(())
  }

  /// Merges `metadata` into a node's metadata; `null` values remove keys.
  pub fn set_node_metadata(&self, id: &str, metadata: &Metadata) -> Result<(), GraphError> {
    self.require_node(id)?;
    self.transact(|| {
      let change = self
        .state
        .borrow_mut()
        .nodes
        .iter_mut()
        .find(|n| n.id == id)
        .map(|node| {
          let before = node.metadata.clone();
          merge_metadata(&mut node.metadata, metadata);
          (node.clone(), before)
        });
      if let Some((node, before)) = change {
        self.emit(GraphEvent::ChangeNode { node, before });
      }
    });
    Ok(())
  }

  // ------------------------------------------------------------------------
  // Edges
  // ------------------------------------------------------------------------

  /// Connects `out_node.out_port` to `in_node.in_port`.
  pub fn add_edge(
    &self,
    out_node: &str,
    out_port: &str,
    in_node: &str,
    in_port: &str,
    metadata: Option<Metadata>,
  ) -> Result<Edge, GraphError> {
    self.add_edge_index(out_node, out_port, None, in_node, in_port, None, metadata)
  }

  /// Connects two ports, optionally addressing array-port indices.
  #[allow(clippy::too_many_arguments)]
  pub fn add_edge_index(
    &self,
    out_node: &str,
    out_port: &str,
    out_index: Option<usize>,
    in_node: &str,
    in_port: &str,
    in_index: Option<usize>,
    metadata: Option<Metadata>,
  ) -> Result<Edge, GraphError> {
    let from = Endpoint::new(out_node, out_port, out_index);
    let to = Endpoint::new(in_node, in_port, in_index);
    if let Some(existing) = self
      .state
      .borrow()
      .edges
      .iter()
      .find(|e| e.from == from && e.to == to)
    {
      return Ok(existing.clone());
    }
    self.require_node(out_node)?;
    self.require_node(in_node)?;
    let edge = Edge {
      from,
      to,
      metadata: metadata.unwrap_or_default(),
    };
    self.transact(|| {
      self.state.borrow_mut().edges.push(edge.clone());
      self.emit(GraphEvent::AddEdge(edge.clone()));
    });
    Ok(edge)
  }

  /// Removes edges.
  ///
  /// With a target (`node2`, `port2`) only edges between the two ports are
  /// removed; without one every edge touching `node.port` on either side is.
  pub fn remove_edge(
    &self,
    node: &str,
    port: &str,
    node2: Option<&str>,
    port2: Option<&str>,
  ) -> Result<(), GraphError> {
    let port = port.to_lowercase();
    let port2 = port2.map(str::to_lowercase);
    let matches = |edge: &Edge| match (node2, port2.as_deref()) {
      (Some(node2), Some(port2)) => edge.from.is(node, &port) && edge.to.is(node2, port2),
      _ => edge.from.is(node, &port) || edge.to.is(node, &port),
    };
    let removed: Vec<Edge> = self
      .state
      .borrow()
      .edges
      .iter()
      .filter(|e| matches(e))
      .cloned()
      .collect();
    if removed.is_empty() {
      return Err(GraphError::EdgeNotFound {
        from: format!("{}.{}", node, port),
        to: match (node2, port2.as_deref()) {
          (Some(n), Some(p)) => format!("{}.{}", n, p),
          _ => "*".to_string(),
        },
      });
    }
    self.transact(|| {
      self.state.borrow_mut().edges.retain(|e| !matches(e));
      for edge in removed {
        self.emit(GraphEvent::RemoveEdge(edge));
      }
    });
    Ok(())
  }

  /// Removes the single edge between two exact endpoints, indices included.
  ///
  /// Sibling edges on other indices of the same ports are kept.
  pub fn remove_edge_index(
    &self,
    out_node: &str,
    out_port: &str,
    out_index: Option<usize>,
    in_node: &str,
    in_port: &str,
    in_index: Option<usize>,
  ) -> Result<(), GraphError> {
    let from = Endpoint::new(out_node, out_port, out_index);
    let to = Endpoint::new(in_node, in_port, in_index);
    let removed = self
      .state
      .borrow()
      .edges
      .iter()
      .find(|e| e.from == from && e.to == to)
      .cloned()
      .ok_or_else(|| GraphError::EdgeNotFound {
        from: from.to_string(),
        to: to.to_string(),
      })?;
    self.transact(|| {
      self
        .state
        .borrow_mut()
        .edges
        .retain(|e| !(e.from == from && e.to == to));
      self.emit(GraphEvent::RemoveEdge(removed));
    });
    Ok(())
  }

  /// Merges `metadata` into an edge's metadata.
  pub fn set_edge_metadata(
    &self,
    node: &str,
    port: &str,
    node2: &str,
    port2: &str,
    metadata: &Metadata,
  ) -> Result<(), GraphError> {
    let (port, port2) = (port.to_lowercase(), port2.to_lowercase());
    if self.get_edge(node, &port, node2, &port2).is_none() {
      return Err(GraphError::EdgeNotFound {
        from: format!("{}.{}", node, port),
        to: format!("{}.{}", node2, port2),
      });
    }
    self.transact(|| {
      let change = self
        .state
        .borrow_mut()
        .edges
        .iter_mut()
        .find(|e| e.from.is(node, &port) && e.to.is(node2, &port2))
        .map(|edge| {
          let before = edge.metadata.clone();
          merge_metadata(&mut edge.metadata, metadata);
          (edge.clone(), before)
        });
      if let Some((edge, before)) = change {
        self.emit(GraphEvent::ChangeEdge { edge, before });
      }
    });
    Ok(())
  }

  // ------------------------------------------------------------------------
  // Initializers
  // ------------------------------------------------------------------------

  /// Adds an IIP targeting `node.port`.
  pub fn add_initial(
    &self,
    data: Value,
    node: &str,
    port: &str,
    metadata: Option<Metadata>,
  ) -> Result<Initializer, GraphError> {
    self.add_initial_index(data, node, port, None, metadata)
  }

  /// Adds an IIP targeting an index of an addressable port.
  pub fn add_initial_index(
    &self,
    data: Value,
    node: &str,
    port: &str,
    index: Option<usize>,
    metadata: Option<Metadata>,
  ) -> Result<Initializer, GraphError> {
    self.require_node(node)?;
    let to = Endpoint::new(node, port, index);
    if let Some(existing) = self
      .state
      .borrow()
      .initializers
      .iter()
      .find(|i| i.to == to && i.data == data)
    {
      return Ok(existing.clone());
    }
    let initializer = Initializer {
      data,
      to,
      metadata: metadata.unwrap_or_default(),
    };
    self.transact(|| {
      self.state.borrow_mut().initializers.push(initializer.clone());
      self.emit(GraphEvent::AddInitial(initializer.clone()));
    });
    Ok(initializer)
  }

  /// Adds an IIP targeting a public inport of this graph.
  pub fn add_graph_initial(
    &self,
    data: Value,
    public_port: &str,
    metadata: Option<Metadata>,
  ) -> Result<Initializer, GraphError> {
    self.add_graph_initial_index(data, public_port, None, metadata)
  }

  /// Adds an IIP targeting an index of a public inport.
  pub fn add_graph_initial_index(
    &self,
    data: Value,
    public_port: &str,
    index: Option<usize>,
    metadata: Option<Metadata>,
  ) -> Result<Initializer, GraphError> {
    let port = self.public_port(Direction::In, public_port)?;
    self.add_initial_index(data, &port.process, &port.port, index, metadata)
  }

  /// Removes every IIP targeting `node.port`.
  pub fn remove_initial(&self, node: &str, port: &str) -> Result<(), GraphError> {
    let port = port.to_lowercase();
    let removed: Vec<Initializer> = self
      .state
      .borrow()
      .initializers
      .iter()
      .filter(|i| i.to.is(node, &port))
      .cloned()
      .collect();
    if removed.is_empty() {
      return Err(GraphError::InitialNotFound(format!("{}.{}", node, port)));
    }
    self.transact(|| {
      self
        .state
        .borrow_mut()
        .initializers
        .retain(|i| !i.to.is(node, &port));
      for initializer in removed {
        self.emit(GraphEvent::RemoveInitial(initializer));
      }
    });
    Ok(())
  }

  /// Removes the IIPs targeting exactly `node.port[index]`.
  ///
  /// With `data` only the IIP carrying that value is removed.
  pub fn remove_initial_index(
    &self,
    node: &str,
    port: &str,
    index: Option<usize>,
    data: Option<&Value>,
  ) -> Result<(), GraphError> {
    let to = Endpoint::new(node, port, index);
    let matches = |i: &Initializer| i.to == to && data.is_none_or(|d| *d == i.data);
    let removed: Vec<Initializer> = self
      .state
      .borrow()
      .initializers
      .iter()
      .filter(|i| matches(i))
      .cloned()
      .collect();
    if removed.is_empty() {
      return Err(GraphError::InitialNotFound(to.to_string()));
    }
    self.transact(|| {
      self.state.borrow_mut().initializers.retain(|i| !matches(i));
      for initializer in removed {
        self.emit(GraphEvent::RemoveInitial(initializer));
      }
    });
    Ok(())
  }

  /// Removes every IIP targeting a public inport.
  pub fn remove_graph_initial(&self, public_port: &str) -> Result<(), GraphError> {
    let port = self.public_port(Direction::In, public_port)?;
    self.remove_initial(&port.process, &port.port)
  }

  // ------------------------------------------------------------------------
  // Legacy exports
  // ------------------------------------------------------------------------

  /// Adds a legacy flat export of `node.port` under `public`.
  pub fn add_export(
    &self,
    public: &str,
    node: &str,
    port: &str,
    metadata: Option<Metadata>,
  ) -> Result<Export, GraphError> {
    self.require_node(node)?;
    let export = Export {
      public: public.to_lowercase(),
      process: node.to_string(),
      port: port.to_lowercase(),
      metadata: metadata.unwrap_or_default(),
    };
    if let Some(existing) = self
      .state
      .borrow()
      .exports
      .iter()
      .find(|e| e.public == export.public && e.process == export.process && e.port == export.port)
    {
      return Ok(existing.clone());
    }
    self.transact(|| {
      self.state.borrow_mut().exports.push(export.clone());
      self.emit(GraphEvent::AddExport(export.clone()));
    });
    Ok(export)
  }

  /// Removes a legacy export by public name.
  pub fn remove_export(&self, public: &str) -> Result<(), GraphError> {
    let public = public.to_lowercase();
    let found = self
      .state
      .borrow()
      .exports
      .iter()
      .find(|e| e.public == public)
      .cloned()
      .ok_or_else(|| GraphError::PublicPortNotFound(public.clone()))?;
    self.transact(|| {
      {
        let mut state = self.state.borrow_mut();
        if let Some(pos) = state.exports.iter().position(|e| *e == found) {
          state.exports.remove(pos);
        }
      }
      self.emit(GraphEvent::RemoveExport(found));
    });
    Ok(())
  }

  // ------------------------------------------------------------------------
  // Public ports
  // ------------------------------------------------------------------------

  fn public_port(&self, direction: Direction, name: &str) -> Result<PublicPort, GraphError> {
    let name = name.to_lowercase();
    self
      .state
      .borrow()
      .public_ports(direction)
      .get(&name)
      .cloned()
      .ok_or(GraphError::PublicPortNotFound(name))
  }

  fn add_public_port(
    &self,
    direction: Direction,
    public: &str,
    node: &str,
    port: &str,
    metadata: Option<Metadata>,
  ) -> Result<PublicPort, GraphError> {
    self.require_node(node)?;
    let name = public.to_lowercase();
    let binding = PublicPort {
      process: node.to_string(),
      port: port.to_lowercase(),
      metadata: metadata.unwrap_or_default(),
    };
    if self.state.borrow().public_ports(direction).get(&name) == Some(&binding) {
      return Ok(binding);
    }
    self.transact(|| {
      self
        .state
        .borrow_mut()
        .public_ports_mut(direction)
        .insert(name.clone(), binding.clone());
      let port = binding.clone();
      self.emit(match direction {
        Direction::In => GraphEvent::AddInport { name, port },
        Direction::Out => GraphEvent::AddOutport { name, port },
      });
    });
    Ok(binding)
  }

  fn remove_public_port(&self, direction: Direction, public: &str) -> Result<(), GraphError> {
    let name = public.to_lowercase();
    let port = self.public_port(direction, &name)?;
    self.transact(|| {
      self
        .state
        .borrow_mut()
        .public_ports_mut(direction)
        .remove(&name);
      self.emit(match direction {
        Direction::In => GraphEvent::RemoveInport { name, port },
        Direction::Out => GraphEvent::RemoveOutport { name, port },
      });
    });
    Ok(())
  }

  fn rename_public_port(
    &self,
    direction: Direction,
    old_name: &str,
    new_name: &str,
  ) -> Result<(), GraphError> {
    let old_name = old_name.to_lowercase();
    let new_name = new_name.to_lowercase();
    self.public_port(direction, &old_name)?;
    if old_name == new_name {
      return Ok(());
    }
    self.transact(|| {
      {
        let mut state = self.state.borrow_mut();
        let ports = state.public_ports_mut(direction);
        if let Some(binding) = ports.remove(&old_name) {
          ports.insert(new_name.clone(), binding);
        }
      }
      self.emit(match direction {
        Direction::In => GraphEvent::RenameInport { old_name, new_name },
        Direction::Out => GraphEvent::RenameOutport { old_name, new_name },
      });
    });
    Ok(())
  }

  fn set_public_port_metadata(
    &self,
    direction: Direction,
    public: &str,
    metadata: &Metadata,
  ) -> Result<(), GraphError> {
    let name = public.to_lowercase();
    self.public_port(direction, &name)?;
    self.transact(|| {
      let change = self
        .state
        .borrow_mut()
        .public_ports_mut(direction)
        .get_mut(&name)
        .map(|port| {
          let before = port.metadata.clone();
          merge_metadata(&mut port.metadata, metadata);
          (port.clone(), before)
        });
      if let Some((port, before)) = change {
        self.emit(match direction {
          Direction::In => GraphEvent::ChangeInport { name, port, before },
          Direction::Out => GraphEvent::ChangeOutport { name, port, before },
        });
      }
    });
    Ok(())
  }

  /// Binds public inport `public` to `node.port`.
  pub fn add_inport(
    &self,
    public: &str,
    node: &str,
    port: &str,
    metadata: Option<Metadata>,
  ) -> Result<PublicPort, GraphError> {
    self.add_public_port(Direction::In, public, node, port, metadata)
  }

  /// Unbinds a public inport.
  pub fn remove_inport(&self, public: &str) -> Result<(), GraphError> {
    self.remove_public_port(Direction::In, public)
  }

  /// Renames a public inport.
  pub fn rename_inport(&self, old_name: &str, new_name: &str) -> Result<(), GraphError> {
    self.rename_public_port(Direction::In, old_name, new_name)
  }

  /// Merges metadata into a public inport binding.
  pub fn set_inport_metadata(&self, public: &str, metadata: &Metadata) -> Result<(), GraphError> {
    self.set_public_port_metadata(Direction::In, public, metadata)
  }

  /// Binds public outport `public` to `node.port`.
  pub fn add_outport(
    &self,
    public: &str,
    node: &str,
    port: &str,
    metadata: Option<Metadata>,
  ) -> Result<PublicPort, GraphError> {
    self.add_public_port(Direction::Out, public, node, port, metadata)
  }

  /// Unbinds a public outport.
  pub fn remove_outport(&self, public: &str) -> Result<(), GraphError> {
    self.remove_public_port(Direction::Out, public)
  }

  /// Renames a public outport.
  pub fn rename_outport(&self, old_name: &str, new_name: &str) -> Result<(), GraphError> {
    self.rename_public_port(Direction::Out, old_name, new_name)
  }

  /// Merges metadata into a public outport binding.
  pub fn set_outport_metadata(&self, public: &str, metadata: &Metadata) -> Result<(), GraphError> {
    self.set_public_port_metadata(Direction::Out, public, metadata)
  }

  // ------------------------------------------------------------------------
  // Groups
  // ------------------------------------------------------------------------

  /// Adds a named group of nodes.
  pub fn add_group(
    &self,
    name: &str,
    nodes: Vec<String>,
    metadata: Option<Metadata>,
  ) -> Result<Group, GraphError> {
    let group = Group {
      name: name.to_string(),
      nodes,
      metadata: metadata.unwrap_or_default(),
    };
    if self.state.borrow().groups.iter().any(|g| *g == group) {
      return Ok(group);
    }
    self.transact(|| {
      self.state.borrow_mut().groups.push(group.clone());
      self.emit(GraphEvent::AddGroup(group.clone()));
    });
    Ok(group)
  }

  fn require_group(&self, name: &str) -> Result<(), GraphError> {
    if self.state.borrow().groups.iter().any(|g| g.name == name) {
      Ok(())
    } else {
      Err(GraphError::GroupNotFound(name.to_string()))
    }
  }

  /// Renames every group called `old_name`.
  pub fn rename_group(&self, old_name: &str, new_name: &str) -> Result<(), GraphError> {
    self.require_group(old_name)?;
    self.transact(|| {
      for group in self
        .state
        .borrow_mut()
        .groups
        .iter_mut()
        .filter(|g| g.name == old_name)
      {
        group.name = new_name.to_string();
      }
      self.emit(GraphEvent::RenameGroup {
        old_name: old_name.to_string(),
        new_name: new_name.to_string(),
      });
    });
    Ok(())
  }

  /// Removes every group called `name`.
  pub fn remove_group(&self, name: &str) -> Result<(), GraphError> {
    self.require_group(name)?;
    self.transact(|| {
      let removed: Vec<Group> = {
        let mut state = self.state.borrow_mut();
        let (removed, kept) = std::mem::take(&mut state.groups)
          .into_iter()
          .partition(|g| g.name == name);
        state.groups = kept;
        removed
      };
      for group in removed {
        self.emit(GraphEvent::RemoveGroup(group));
      }
    });
    Ok(())
  }

  /// Merges metadata into every group called `name`.
  pub fn set_group_metadata(&self, name: &str, metadata: &Metadata) -> Result<(), GraphError> {
    self.require_group(name)?;
    self.transact(|| {
      let changes: Vec<(Group, Metadata)> = {
        let mut state = self.state.borrow_mut();
        state
          .groups
          .iter_mut()
          .filter(|g| g.name == name)
          .map(|group| {
            let before = group.metadata.clone();
            merge_metadata(&mut group.metadata, metadata);
            (group.clone(), before)
          })
          .collect()
      };
      for (group, before) in changes {
        self.emit(GraphEvent::ChangeGroup { group, before });
      }
    });
    Ok(())
  }

  /// Inserts `node` into group `group` at `index` (appends when `None` or out of range).
  pub fn add_group_member(
    &self,
    group: &str,
    node: &str,
    index: Option<usize>,
  ) -> Result<(), GraphError> {
    self.require_group(group)?;
    self.require_node(node)?;
    let already_member = self
      .state
      .borrow()
      .groups
      .iter()
      .any(|g| g.name == group && g.nodes.iter().any(|n| n == node));
    if already_member {
      return Ok(());
    }
    self.transact(|| {
      let index = {
        let mut state = self.state.borrow_mut();
        let mut position = 0;
        if let Some(g) = state.groups.iter_mut().find(|g| g.name == group) {
          position = index.filter(|i| *i <= g.nodes.len()).unwrap_or(g.nodes.len());
          g.nodes.insert(position, node.to_string());
        }
        position
      };
      self.emit(GraphEvent::AddGroupMember {
        group: group.to_string(),
        node: node.to_string(),
        index,
      });
    });
    Ok(())
  }

  /// Removes `node` from group `group`.
  pub fn remove_group_member(&self, group: &str, node: &str) -> Result<(), GraphError> {
    let index = self
      .state
      .borrow()
      .groups
      .iter()
      .find(|g| g.name == group)
      .ok_or_else(|| GraphError::GroupNotFound(group.to_string()))?
      .nodes
      .iter()
      .position(|n| n == node)
      .ok_or_else(|| GraphError::NodeNotFound(node.to_string()))?;
    self.transact(|| {
      if let Some(g) = self
        .state
        .borrow_mut()
        .groups
        .iter_mut()
        .find(|g| g.name == group)
      {
        g.nodes.remove(index);
      }
      self.emit(GraphEvent::RemoveGroupMember {
        group: group.to_string(),
        node: node.to_string(),
        index,
      });
    });
    Ok(())
  }

  // ------------------------------------------------------------------------
  // Debug output
  // ------------------------------------------------------------------------

  /// Renders the graph in Graphviz DOT notation.
  pub fn to_dot(&self) -> String {
    let state = self.state.borrow();
    let mut dot = String::from("digraph {\n");
    for node in &state.nodes {
      let _ = writeln!(
        dot,
        "    \"{}\" [label=\"{}\" shape=box]",
        node.id, node.id
      );
    }
    for (i, iip) in state.initializers.iter().enumerate() {
      let data = match &iip.data {
        Value::String(s) => s.clone(),
        other => other.to_string(),
      };
      let _ = writeln!(
        dot,
        "    data{} [label=\"'{}'\" shape=plaintext]",
        i,
        data.replace('"', "\\\"")
      );
      let _ = writeln!(
        dot,
        "    data{} -> \"{}\" [headlabel=\"{}\" labelfontcolor=blue labelfontsize=8.0]",
        i, iip.to.node, iip.to.port
      );
    }
    for edge in &state.edges {
      let _ = writeln!(
        dot,
        "    \"{}\" -> \"{}\" [taillabel=\"{}\" headlabel=\"{}\" labelfontcolor=blue labelfontsize=8.0]",
        edge.from.node, edge.to.node, edge.from.port, edge.to.port
      );
    }
    dot.push_str("}\n");
    dot
  }
}
