//! Errors raised while wiring or running a network.

use crate::component::LoaderError;
use crate::graph::GraphError;
use crate::port::PortError;
use thiserror::Error;

/// Failures wiring or running a network.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NetworkError {
  /// A referenced node has no running process.
  #[error("no process defined for node '{0}'")]
  NoProcess(String),
  /// The target process lacks the inport.
  #[error("no inport '{port}' defined in process {process} ({socket})")]
  NoInPort {
    /// Port name.
    port: String,
    /// Node id.
    process: String,
    /// Socket id.
    socket: String,
  },
  /// The source process lacks the outport.
  #[error("no outport '{port}' defined in process {process} ({socket})")]
  NoOutPort {
    /// Port name.
    port: String,
    /// Node id.
    process: String,
    /// Socket id.
    socket: String,
  },
  /// The component could not be loaded.
  #[error(transparent)]
  Loader(#[from] LoaderError),
  /// The graph rejected an operation.
  #[error(transparent)]
  Graph(#[from] GraphError),
  /// A port operation failed.
  #[error(transparent)]
  Port(#[from] PortError),
  /// The component did not become ready.
  #[error("process '{0}' never became ready")]
  NotReady(String),
}
