//! Journal errors.

use crate::graph::GraphError;
use thiserror::Error;

/// Failures replaying or persisting a journal.
#[derive(Error, Debug)]
pub enum JournalError {
  /// The requested revision is beyond the last stored one.
  #[error("revision {requested} is out of range (last revision {last})")]
  RevisionOutOfRange {
    /// Requested revision.
    requested: usize,
    /// Last stored revision.
    last: usize,
  },
  /// The store has no transaction for a revision it should hold.
  #[error("no transaction stored for revision {0}")]
  MissingTransaction(usize),
  /// Replaying a command was rejected by the graph.
  #[error("failed to replay command: {0}")]
  Graph(#[from] GraphError),
  /// Writing the journal file failed.
  #[error("failed to write journal: {0}")]
  Io(#[from] std::io::Error),
  /// Encoding the journal failed.
  #[error("failed to encode journal: {0}")]
  Json(#[from] serde_json::Error),
}
