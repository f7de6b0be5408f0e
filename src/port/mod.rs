//! Ports and sockets: the runtime wiring between component instances.
//!
//! An [`OutPort`] fans IP events out over [`InternalSocket`]s to the
//! [`InPort`]s on the other end. Both port types implement [`Port`], the
//! capability the network uses to attach and inspect sockets.

pub mod error;
pub mod in_port;
pub mod options;
pub mod out_port;
#[allow(clippy::module_inception)]
pub mod port;
pub mod ports;
pub mod socket;

pub use error::*;
pub use in_port::*;
pub use options::*;
pub use out_port::*;
pub use port::Port;
pub use ports::*;
pub use socket::*;

#[cfg(test)]
mod socket_test;
