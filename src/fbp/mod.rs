//! # FBP Notation
//!
//! Text notation for graphs, compiled to the same [`GraphJson`](crate::graph::GraphJson)
//! structure as the JSON wire format.
//!
//! ```text
//! # @runtime flowweave
//! INPORT=Read.IN:FILENAME
//! Read(ReadFile) OUT -> IN Split(SplitLines)
//! Split OUT -> IN Count(Counter:unit=lines), Count OUT -> IN Display(Output)
//! 'package.json' -> IN Read
//! ```
//!
//! * Statements end at a newline or a comma outside parentheses.
//! * `#` starts a comment; `# @key value` sets a graph property.
//! * `Node(Component)` declares a node, optionally with `:key=value` metadata.
//! * Connections chain: `A OUT -> IN B OUT -> IN C`. `OUT[2]` addresses an
//!   index of an array port.
//! * `'text' -> PORT Node` is an initial packet.
//! * `INPORT=`, `OUTPORT=` and legacy `EXPORT=` publish `Node.PORT` under a
//!   public name.
//!
//! Port and public names are lowercased.

pub mod error;
pub mod lexer;
pub mod parser;

pub use error::*;
pub use parser::parse;

#[cfg(test)]
mod parser_test;
