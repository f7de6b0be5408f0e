//! Port errors.

use thiserror::Error;

/// Failures raised by port operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PortError {
  /// An addressable port was used without a socket index.
  #[error("{port}: socket index required for addressable port")]
  IndexRequired {
    /// Port description, `node.port` when the owner is known.
    port: String,
  },
  /// A required port has no attached socket.
  #[error("{port}: no connections available")]
  NotAttached {
    /// Port description, `node.port` when the owner is known.
    port: String,
  },
}
