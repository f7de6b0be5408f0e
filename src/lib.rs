//! # FlowWeave
//!
//! A flow-based programming runtime in pure Rust.
//!
//! FlowWeave separates the *description* of a program from its *execution*.
//! A [`Graph`](graph::Graph) records which components run as which nodes and
//! how their ports are wired. A [`Network`](network::Network) instantiates
//! the components through a [`ComponentLoader`](component::ComponentLoader),
//! connects their ports with sockets and keeps mirroring later graph edits
//! while it runs. A [`Journal`](journal::Journal) records every edit as an
//! undoable transaction.
//!
//! ## Key Features
//!
//! - **Observable graphs**: every mutation is announced as a [`GraphEvent`](graph::GraphEvent)
//! - **Live editing**: running networks follow the graph they were built from
//! - **Subgraphs**: a graph can be loaded as a component of another graph
//! - **FBP notation**: parse the textual `A OUT -> IN B` language with [`fbp::parse`]
//! - **Undo/redo**: replay the journal backwards and forwards
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use flowweave::component::ComponentRegistry;
//! use flowweave::graph::Graph;
//! use flowweave::network::{Network, NetworkConfig};
//! use std::rc::Rc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let graph = Rc::new(Graph::from_fbp("'hello' -> IN Echo(core/Repeat)")?);
//! let network = Network::new(graph, ComponentRegistry::with_core_components(), NetworkConfig::default());
//! network.connect().await?;
//! network.start().await?;
//! # Ok(())
//! # }
//! ```
//!
//! The runtime is single-threaded: networks and components are driven from a
//! [`tokio::task::LocalSet`].

// Documentation enforcement - treat missing docs as errors
#![deny(missing_docs)]

/// Editable graph model, its events and JSON form.
pub mod graph;
/// Listener registry shared by graphs, ports and networks.
pub mod observable;
/// Ports, sockets and IP events.
pub mod port;
/// Component contract, loader and subgraphs.
pub mod component;
/// Built-in components.
pub mod components;
/// Graph execution.
pub mod network;
/// Undo/redo journal of graph edits.
pub mod journal;
/// FBP text notation.
pub mod fbp;

pub use component::{ComponentError, LoaderError};
pub use fbp::FbpParseError;
pub use graph::GraphError;
pub use journal::JournalError;
pub use network::NetworkError;
pub use port::PortError;
