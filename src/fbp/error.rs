//! Parse errors with line and column positions.

use crate::graph::GraphError;
use thiserror::Error;

/// Failures reading FBP notation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FbpParseError {
  /// A character that cannot start any token.
  #[error("line {line}, column {column}: unexpected character '{found}'")]
  UnexpectedChar {
    /// 1-based line.
    line: usize,
    /// 1-based column.
    column: usize,
    /// The character.
    found: char,
  },
  /// A token out of place.
  #[error("line {line}, column {column}: expected {expected}, found {found}")]
  Unexpected {
    /// 1-based line.
    line: usize,
    /// 1-based column.
    column: usize,
    /// What the grammar allows here.
    expected: String,
    /// What was read.
    found: String,
  },
  /// A quote, parenthesis or bracket that is never closed.
  #[error("line {line}, column {column}: unterminated {what}")]
  Unterminated {
    /// 1-based line.
    line: usize,
    /// 1-based column of the opening character.
    column: usize,
    /// Construct name.
    what: &'static str,
  },
  /// A node declared with two different components.
  #[error("line {line}: node '{node}' declared as {component}, previously {previous}")]
  ConflictingComponent {
    /// 1-based line.
    line: usize,
    /// Node id.
    node: String,
    /// Component of this declaration.
    component: String,
    /// Component of the earlier declaration.
    previous: String,
  },
  /// A node used in a connection but never given a component.
  #[error("line {line}: node '{node}' has no component")]
  UndeclaredNode {
    /// 1-based line of the first use.
    line: usize,
    /// Node id.
    node: String,
  },
  /// The parsed definition was rejected by the graph.
  #[error(transparent)]
  Graph(#[from] GraphError),
}
