//! Graph model for flow-based programs.
//!
//! This module provides the editable, observable description of a program:
//! which components run as which nodes and how their ports are wired. A
//! [`Graph`] is pure data; running it is the job of
//! [`Network`](crate::network::Network).

pub mod error;
pub mod events;
#[allow(clippy::module_inception)]
pub mod graph;
pub mod json;
pub mod types;

pub use error::*;
pub use events::*;
pub use graph::*;
pub use json::*;
pub use types::*;

#[cfg(test)]
mod graph_test;
