//! Component contract, asynchronous adapter, loader and subgraphs.

pub mod async_component;
#[allow(clippy::module_inception)]
pub mod component;
pub mod error;
pub mod loader;
pub mod subgraph;

pub use async_component::*;
pub use component::*;
pub use error::*;
pub use loader::*;
pub use subgraph::*;

#[cfg(test)]
mod async_component_test;
