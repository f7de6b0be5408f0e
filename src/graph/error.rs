//! Errors raised by graph mutations and JSON loading.

use thiserror::Error;

/// Reasons a graph mutation was rejected.
///
/// A rejected mutation leaves the graph untouched and emits no event. Callers
/// that do not care why an edit was refused may simply ignore the result.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
  /// A referenced node does not exist.
  #[error("node '{0}' not found")]
  NodeNotFound(String),
  /// A node with this id already exists with a different component.
  #[error("node '{0}' already exists")]
  DuplicateNode(String),
  /// No edge matches the given endpoints.
  #[error("no edge from {from} to {to}")]
  EdgeNotFound {
    /// Source as `node.port`.
    from: String,
    /// Target as `node.port`.
    to: String,
  },
  /// No initializer targets the given port.
  #[error("no initializer targets {0}")]
  InitialNotFound(String),
  /// No public inport/outport or export with this name.
  #[error("public port '{0}' not found")]
  PublicPortNotFound(String),
  /// No group with this name.
  #[error("group '{0}' not found")]
  GroupNotFound(String),
  /// An explicit transaction was started while another one is open.
  #[error("nested transactions not supported (open: '{open}', requested: '{requested}')")]
  NestedTransaction {
    /// Id of the transaction already open.
    open: String,
    /// Id that was requested.
    requested: String,
  },
  /// `end_transaction` without an open transaction.
  #[error("attempted to end non-existing transaction '{0}'")]
  NoTransaction(String),
  /// The graph definition could not be parsed.
  #[error("invalid graph definition: {0}")]
  InvalidDefinition(String),
}

impl From<serde_json::Error> for GraphError {
  fn from(err: serde_json::Error) -> Self {
    GraphError::InvalidDefinition(err.to_string())
  }
}
