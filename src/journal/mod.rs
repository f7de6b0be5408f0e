//! Undo/redo history for graphs.

pub mod command;
pub mod error;
#[allow(clippy::module_inception)]
pub mod journal;
pub mod store;

pub use command::*;
pub use error::*;
pub use journal::*;
pub use store::*;

#[cfg(test)]
mod journal_test;
