//! A graph running as a component inside another network.

use crate::component::component::{Component, ComponentCore};
use crate::component::loader::ComponentLoader;
use crate::graph::Graph;
use crate::network::{Network, NetworkConfig};
use serde_json::Value;
use std::cell::Cell;
use std::rc::Rc;
use tracing::{debug, error, warn};

/// Component wrapping an inner [`Network`].
///
/// The inner network connects in the background; the component becomes
/// ready once that finishes, at which point the graph's public ports are
/// exposed as this component's ports. Exposed ports are the inner nodes'
/// own port objects, so outer sockets attach directly to inner nodes.
pub struct Subgraph {
  core: ComponentCore,
  network: Rc<Network>,
  ready: Cell<bool>,
}

impl Subgraph {
  /// Creates the component and starts wiring the inner network.
  ///
  /// Must be called from within a `tokio::task::LocalSet`.
  pub fn new(graph: Rc<Graph>, loader: Rc<dyn ComponentLoader>, config: NetworkConfig) -> Rc<Self> {
    let description = graph
      .properties()
      .get("description")
      .and_then(Value::as_str)
      .unwrap_or_default()
      .to_string();
    let subgraph = Rc::new(Self {
      core: ComponentCore::new().with_description(description),
      network: Network::new(graph, loader, config),
      ready: Cell::new(false),
    });
    let weak = Rc::downgrade(&subgraph);
    tokio::task::spawn_local(async move {
      let Some(subgraph) = weak.upgrade() else {
        return;
      };
      if let Err(err) = subgraph.network.connect().await {
        error!(graph = %subgraph.network.graph().name(), error = %err, "subgraph failed to connect");
      }
      subgraph.expose_ports();
      subgraph.ready.set(true);
      subgraph.core.emit_ready();
    });
    subgraph
  }

  fn expose_ports(&self) {
    let graph = self.network.graph();
    for (name, public) in graph.inports() {
      let port = self
        .network
        .get_node(&public.process)
        .and_then(|process| process.component.in_ports().get(&public.port));
      match port {
        Some(port) => self.core.in_ports().insert(&name, port),
        None => warn!(port = %name, process = %public.process, "subgraph inport target missing"),
      }
    }
    for (name, public) in graph.outports() {
      let port = self
        .network
        .get_node(&public.process)
        .and_then(|process| process.component.out_ports().get(&public.port));
      match port {
        Some(port) => self.core.out_ports().insert(&name, port),
        None => warn!(port = %name, process = %public.process, "subgraph outport target missing"),
      }
    }
    debug!(
      graph = %graph.name(),
      inports = ?self.core.in_ports().names(),
      outports = ?self.core.out_ports().names(),
      "subgraph ports exposed"
    );
  }
}

impl Component for Subgraph {
  fn core(&self) -> &ComponentCore {
    &self.core
  }

  fn is_ready(&self) -> bool {
    self.ready.get()
  }

  fn network(&self) -> Option<Rc<Network>> {
    Some(Rc::clone(&self.network))
  }

  fn start(&self) {
    let network = Rc::clone(&self.network);
    tokio::task::spawn_local(async move {
      if let Err(err) = network.start().await {
        error!(graph = %network.graph().name(), error = %err, "subgraph failed to start");
      }
    });
  }

  fn shutdown(&self) {
    self.network.stop();
  }
}
