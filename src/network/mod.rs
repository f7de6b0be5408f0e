//! Running graphs: component instances wired by sockets.

pub mod config;
pub mod error;
pub mod events;
#[allow(clippy::module_inception)]
pub mod network;

pub use config::*;
pub use error::*;
pub use events::*;
pub use network::*;
