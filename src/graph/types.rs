//! Entities owned by a [`Graph`](crate::graph::Graph).

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Free-form metadata attached to graph entities (UI coordinates, labels, ...).
pub type Metadata = serde_json::Map<String, Value>;

/// A named process slot bound to a component type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
  /// Unique key within the graph.
  pub id: String,
  /// Component type name used by the loader.
  pub component: String,
  /// Free-form metadata.
  #[serde(default)]
  pub metadata: Metadata,
}

/// One side of an edge or the target of an initializer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
  /// Node id.
  pub node: String,
  /// Port name, always lowercase.
  pub port: String,
  /// Index on an addressable port.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub index: Option<usize>,
}

impl Endpoint {
  /// Creates an endpoint, lowercasing the port name.
  pub fn new(node: impl Into<String>, port: &str, index: Option<usize>) -> Self {
    Self {
      node: node.into(),
      port: port.to_lowercase(),
      index,
    }
  }

  /// Whether this endpoint refers to `node`.`port`, ignoring the index.
  pub fn is(&self, node: &str, port: &str) -> bool {
    self.node == node && self.port == port
  }
}

impl fmt::Display for Endpoint {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}.{}", self.node, self.port)?;
    if let Some(index) = self.index {
      write!(f, "[{index}]")?;
    }
    Ok(())
  }
}

/// A directed connection between two node ports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
  /// Source (outport) side.
  pub from: Endpoint,
  /// Target (inport) side.
  pub to: Endpoint,
  /// Free-form metadata.
  #[serde(default)]
  pub metadata: Metadata,
}

/// A literal value pre-wired to an inport (IIP).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Initializer {
  /// The packet delivered when the network starts.
  pub data: Value,
  /// Receiving port.
  pub to: Endpoint,
  /// Free-form metadata.
  #[serde(default)]
  pub metadata: Metadata,
}

/// Binding of a public graph port to a node port.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicPort {
  /// Node id.
  pub process: String,
  /// Port name on that node.
  pub port: String,
  /// Free-form metadata.
  #[serde(default)]
  pub metadata: Metadata,
}

/// Legacy flat export of a node port under a public name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Export {
  /// Public name, lowercase.
  pub public: String,
  /// Node id.
  pub process: String,
  /// Port name, lowercase.
  pub port: String,
  /// Free-form metadata.
  #[serde(default)]
  pub metadata: Metadata,
}

/// Named set of nodes, used by editors for visual grouping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
  /// Group name.
  pub name: String,
  /// Member node ids.
  pub nodes: Vec<String>,
  /// Free-form metadata.
  #[serde(default)]
  pub metadata: Metadata,
}

/// State of the currently open transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transaction {
  /// Identifier of the open transaction, `None` when closed.
  pub id: Option<String>,
  /// Nesting depth of implicit transactions.
  pub depth: usize,
}

/// Applies a metadata delta: `null` values delete keys, others overwrite.
pub(crate) fn merge_metadata(target: &mut Metadata, delta: &Metadata) {
  for (key, value) in delta {
    if value.is_null() {
      target.remove(key);
    } else {
      target.insert(key.clone(), value.clone());
    }
  }
}
