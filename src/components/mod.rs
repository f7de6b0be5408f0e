//! Core components available from every
//! [`ComponentRegistry::with_core_components`](crate::component::ComponentRegistry::with_core_components).

pub mod repeat;
pub mod repeat_async;

pub use repeat::*;
pub use repeat_async::*;
