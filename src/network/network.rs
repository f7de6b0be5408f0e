//! # Network
//!
//! The running instance of a [`Graph`]: one component instance per node, one
//! socket per edge or initializer, and a live mirror of later graph edits.
//!
//! ## Lifecycle
//!
//! 1. [`Network::connect`] loads every node through the injected
//!    [`ComponentLoader`], wires edges and initializers in declaration order,
//!    then subscribes to graph changes.
//! 2. [`Network::start`] starts the components, sends queued initializers
//!    and delivers inport defaults.
//! 3. [`Network::stop`] closes open connections and shuts every component
//!    down. A stopped network may be started again and resends its
//!    initializers.
//!
//! ## Activity
//!
//! The network counts open connections across its sockets. The first
//! connection of a run emits [`NetworkEvent::Start`]; once the count stays at
//! zero for [`NetworkConfig::end_debounce`], [`NetworkEvent::End`] follows.
//! Traffic and accounting of subgraphs are folded into the parent.
//!
//! ## Execution Model
//!
//! Everything runs on one thread. Deferred work (debounce timers, the graph
//! change worker, subgraph wiring) is spawned with
//! `tokio::task::spawn_local`, so a network must be driven from inside a
//! [`tokio::task::LocalSet`].
//!
//! # Example
//!
//! ```rust
//! use flowweave::component::ComponentRegistry;
//! use flowweave::graph::Graph;
//! use flowweave::network::{Network, NetworkConfig};
//! use serde_json::json;
//! use std::rc::Rc;
//!
//! # let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
//! # let local = tokio::task::LocalSet::new();
//! # local.block_on(&runtime, async {
//! let graph = Rc::new(Graph::new("example"));
//! graph.add_node("Repeat", "core/Repeat", None).unwrap();
//! graph.add_initial(json!("hello"), "Repeat", "in", None).unwrap();
//!
//! let network = Network::new(graph, ComponentRegistry::with_core_components(), NetworkConfig::default());
//! network.connect().await.unwrap();
//! network.start().await.unwrap();
//! assert!(network.is_started());
//! # });
//! ```

use crate::component::{Component, ComponentLoader};
use crate::graph::{Edge, Endpoint, Graph, GraphEvent, Initializer, Node};
use crate::network::config::NetworkConfig;
use crate::network::error::NetworkError;
use crate::network::events::{IpActivity, NetworkEvent};
use crate::observable::{Emitter, ListenerId};
use crate::port::{InPort, InternalSocket, IpEvent, Port, SocketEndpoint, SocketRef};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, trace, warn};

/// A node's running component, as seen from outside the network.
#[derive(Clone)]
pub struct NetworkProcess {
  /// Node id.
  pub id: String,
  /// Component name the instance was loaded from.
  pub component_name: String,
  /// The instance.
  pub component: Rc<dyn Component>,
}

impl fmt::Debug for NetworkProcess {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("NetworkProcess")
      .field("id", &self.id)
      .field("component_name", &self.component_name)
      .field("is_subgraph", &self.component.is_subgraph())
      .finish()
  }
}

/// Listeners registered on behalf of one process.
struct ProcessEntry {
  id: Rc<RefCell<String>>,
  component_name: String,
  component: Rc<dyn Component>,
  icon_listener: ListenerId,
  error_listeners: Vec<(Rc<InPort>, ListenerId)>,
  subgraph_listener: Option<(Rc<Network>, ListenerId)>,
}

impl ProcessEntry {
  fn process(&self) -> NetworkProcess {
    NetworkProcess {
      id: self.id.borrow().clone(),
      component_name: self.component_name.clone(),
      component: Rc::clone(&self.component),
    }
  }

  fn release(&self) {
    self.component.core().off_icon(self.icon_listener);
    for (port, listener) in &self.error_listeners {
      port.off_error(*listener);
    }
    if let Some((network, listener)) = &self.subgraph_listener {
      network.off(*listener);
    }
  }
}

struct Connection {
  socket: SocketRef,
  listener: ListenerId,
}

/// Running instance of a graph.
pub struct Network {
  me: Weak<Network>,
  graph: Rc<Graph>,
  loader: Rc<dyn ComponentLoader>,
  config: NetworkConfig,
  processes: RefCell<Vec<ProcessEntry>>,
  connections: RefCell<Vec<Connection>>,
  initials: RefCell<Vec<(SocketRef, Value)>>,
  next_initials: RefCell<Vec<(SocketRef, Value)>>,
  connection_count: Cell<usize>,
  running: Cell<bool>,
  started: Cell<bool>,
  start_time: Cell<Option<DateTime<Utc>>>,
  end_timer: RefCell<Option<JoinHandle<()>>>,
  graph_listener: Cell<Option<ListenerId>>,
  events: Emitter<NetworkEvent>,
}

impl fmt::Debug for Network {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Network")
      .field("graph", &self.graph.name())
      .field("processes", &self.processes.borrow().len())
      .field("connections", &self.connections.borrow().len())
      .field("started", &self.started.get())
      .field("running", &self.running.get())
      .finish()
  }
}

impl Network {
  /// Creates an unconnected network for `graph`.
  pub fn new(graph: Rc<Graph>, loader: Rc<dyn ComponentLoader>, config: NetworkConfig) -> Rc<Self> {
    Rc::new_cyclic(|me| Self {
      me: me.clone(),
      graph,
      loader,
      config,
      processes: RefCell::new(Vec::new()),
      connections: RefCell::new(Vec::new()),
      initials: RefCell::new(Vec::new()),
      next_initials: RefCell::new(Vec::new()),
      connection_count: Cell::new(0),
      running: Cell::new(false),
      started: Cell::new(false),
      start_time: Cell::new(None),
      end_timer: RefCell::new(None),
      graph_listener: Cell::new(None),
      events: Emitter::new(),
    })
  }

  /// The graph this network runs.
  pub fn graph(&self) -> Rc<Graph> {
    Rc::clone(&self.graph)
  }

  /// Active configuration.
  pub fn config(&self) -> &NetworkConfig {
    &self.config
  }

  /// Subscribes to network notifications.
  pub fn on(&self, listener: impl Fn(&NetworkEvent) + 'static) -> ListenerId {
    self.events.on(listener)
  }

  /// Cancels a subscription.
  pub fn off(&self, id: ListenerId) {
    self.events.off(id);
  }

  fn emit(&self, event: NetworkEvent) {
    self.events.emit(&event);
  }

  // ------------------------------------------------------------------------
  // Queries
  // ------------------------------------------------------------------------

  /// Processes in load order.
  pub fn processes(&self) -> Vec<NetworkProcess> {
    self.processes.borrow().iter().map(ProcessEntry::process).collect()
  }

  /// Looks up the process of a node.
  pub fn get_node(&self, id: &str) -> Option<NetworkProcess> {
    self
      .processes
      .borrow()
      .iter()
      .find(|p| *p.id.borrow() == id)
      .map(ProcessEntry::process)
  }

  /// Sockets of every wired edge and initializer.
  pub fn connections(&self) -> Vec<SocketRef> {
    self
      .connections
      .borrow()
      .iter()
      .map(|c| Rc::clone(&c.socket))
      .collect()
  }

  /// Number of currently open connections.
  pub fn connection_count(&self) -> usize {
    self.connection_count.get()
  }

  /// Whether [`start`](Self::start) ran and [`stop`](Self::stop) did not.
  pub fn is_started(&self) -> bool {
    self.started.get()
  }

  /// Whether a run is in progress (between `Start` and `End`).
  pub fn is_running(&self) -> bool {
    self.running.get()
  }

  /// Time since the current run started.
  pub fn uptime(&self) -> Option<chrono::Duration> {
    self.start_time.get().map(|start| Utc::now() - start)
  }

  // ------------------------------------------------------------------------
  // Processes
  // ------------------------------------------------------------------------

  /// Loads the component for `node` and registers it as a process.
  ///
  /// Resolves once the instance is ready. Adding a node that already has a
  /// process returns the existing one.
  pub async fn add_node(&self, node: &Node) -> Result<NetworkProcess, NetworkError> {
    if let Some(existing) = self.get_node(&node.id) {
      return Ok(existing);
    }
    let component = self.loader.load(&node.component, &node.metadata).await?;
    wait_ready(&node.id, &component).await?;

    if !component.is_subgraph() {
      component.in_ports().set_owner(&node.id);
      component.out_ports().set_owner(&node.id);
    }

    let id = Rc::new(RefCell::new(node.id.clone()));
    let icon_listener = {
      let (me, id) = (self.me.clone(), Rc::clone(&id));
      component.core().on_icon(move |icon| {
        if let Some(network) = me.upgrade() {
          network.emit(NetworkEvent::Icon {
            id: id.borrow().clone(),
            icon: icon.clone(),
          });
        }
      })
    };
    let error_listeners = component
      .in_ports()
      .ports()
      .into_iter()
      .map(|port| {
        let (me, id, name) = (self.me.clone(), Rc::clone(&id), port.name().to_string());
        let listener = port.on_error(move |err| {
          if let Some(network) = me.upgrade() {
            network.emit(NetworkEvent::ProcessError {
              id: id.borrow().clone(),
              port: name.clone(),
              error: err.to_string(),
              subgraph: Vec::new(),
            });
          }
        });
        (port, listener)
      })
      .collect();
    let subgraph_listener = component.network().map(|inner| {
      let (me, id) = (self.me.clone(), Rc::clone(&id));
      let listener = inner.on(move |event| {
        if let Some(network) = me.upgrade() {
          network.relay_subgraph(&id.borrow(), event);
        }
      });
      (inner, listener)
    });

    let entry = ProcessEntry {
      id,
      component_name: node.component.clone(),
      component,
      icon_listener,
      error_listeners,
      subgraph_listener,
    };
    let process = entry.process();
    self.processes.borrow_mut().push(entry);
    debug!(node = %node.id, component = %node.component, "process added");
    Ok(process)
  }

  /// Shuts down and forgets the process of a node.
  pub fn remove_node(&self, id: &str) -> Result<(), NetworkError> {
    let entry = {
      let mut processes = self.processes.borrow_mut();
      let position = processes
        .iter()
        .position(|p| *p.id.borrow() == id)
        .ok_or_else(|| NetworkError::NoProcess(id.to_string()))?;
      processes.remove(position)
    };
    entry.release();
    entry.component.shutdown();
    debug!(node = %id, "process removed");
    Ok(())
  }

  /// Moves a process to a new node id.
  pub fn rename_node(&self, old_id: &str, new_id: &str) -> Result<(), NetworkError> {
    let component = {
      let processes = self.processes.borrow();
      let entry = processes
        .iter()
        .find(|p| *p.id.borrow() == old_id)
        .ok_or_else(|| NetworkError::NoProcess(old_id.to_string()))?;
      *entry.id.borrow_mut() = new_id.to_string();
      Rc::clone(&entry.component)
    };
    if !component.is_subgraph() {
      component.in_ports().set_owner(new_id);
      component.out_ports().set_owner(new_id);
    }
    for socket in self.connections() {
      if let Some(from) = socket.from().filter(|f| f.process == old_id) {
        socket.set_from(SocketEndpoint::new(new_id, from.port, from.index));
      }
      if let Some(to) = socket.to().filter(|t| t.process == old_id) {
        socket.set_to(SocketEndpoint::new(new_id, to.port, to.index));
      }
    }
    debug!(from = %old_id, to = %new_id, "process renamed");
    Ok(())
  }

  // ------------------------------------------------------------------------
  // Wiring
  // ------------------------------------------------------------------------

  fn process_of(&self, id: &str) -> Result<NetworkProcess, NetworkError> {
    self
      .get_node(id)
      .ok_or_else(|| NetworkError::NoProcess(id.to_string()))
  }

  fn connect_inport(
    &self,
    socket: &SocketRef,
    process: &NetworkProcess,
    port: &str,
    index: Option<usize>,
  ) -> Result<(), NetworkError> {
    let target = process
      .component
      .in_ports()
      .get(port)
      .ok_or_else(|| NetworkError::NoInPort {
        port: port.to_string(),
        process: process.id.clone(),
        socket: socket.id(),
      })?;
    target.attach(Rc::clone(socket), index);
    Ok(())
  }

  fn connect_outport(
    &self,
    socket: &SocketRef,
    process: &NetworkProcess,
    port: &str,
    index: Option<usize>,
  ) -> Result<(), NetworkError> {
    let source = process
      .component
      .out_ports()
      .get(port)
      .ok_or_else(|| NetworkError::NoOutPort {
        port: port.to_string(),
        process: process.id.clone(),
        socket: socket.id(),
      })?;
    source.attach(Rc::clone(socket), index);
    Ok(())
  }

  /// Wires an edge between two processes.
  pub async fn add_edge(&self, edge: &Edge) -> Result<SocketRef, NetworkError> {
    let from = self.process_of(&edge.from.node)?;
    let to = self.process_of(&edge.to.node)?;
    wait_ready(&from.id, &from.component).await?;
    wait_ready(&to.id, &to.component).await?;

    let socket = InternalSocket::new();
    socket.set_from(SocketEndpoint::new(&edge.from.node, &edge.from.port, edge.from.index));
    socket.set_to(SocketEndpoint::new(&edge.to.node, &edge.to.port, edge.to.index));
    let listener = self.subscribe_socket(&socket, Vec::new());

    self
      .connect_inport(&socket, &to, &edge.to.port, edge.to.index)
      .and_then(|()| self.connect_outport(&socket, &from, &edge.from.port, edge.from.index))
      .map_err(|err| {
        self.detach_socket(&socket);
        socket.off(listener);
        err
      })?;

    self.connections.borrow_mut().push(Connection {
      socket: Rc::clone(&socket),
      listener,
    });
    trace!(socket = %socket.id(), "edge wired");
    Ok(socket)
  }

  /// Unwires the socket of an edge, indices included.
  pub fn remove_edge(&self, edge: &Edge) -> Result<(), NetworkError> {
    let matches = |socket: &SocketRef| {
      socket.from().is_some_and(|f| same_endpoint(&f, &edge.from))
        && socket.to().is_some_and(|t| same_endpoint(&t, &edge.to))
    };
    let removed = self.take_connections(matches);
    if removed.is_empty() {
      debug!(from = %edge.from.node, to = %edge.to.node, "no socket for removed edge");
    }
    Ok(())
  }

  /// Wires an initializer and queues its packet.
  ///
  /// The packet is sent on the next [`start`](Self::start), or immediately
  /// when the network is already started.
  pub async fn add_initial(&self, initializer: &Initializer) -> Result<SocketRef, NetworkError> {
    let to = self.process_of(&initializer.to.node)?;
    wait_ready(&to.id, &to.component).await?;

    let socket = InternalSocket::new();
    socket.set_to(SocketEndpoint::new(
      &initializer.to.node,
      &initializer.to.port,
      initializer.to.index,
    ));
    let listener = self.subscribe_socket(&socket, Vec::new());
    if let Err(err) = self.connect_inport(&socket, &to, &initializer.to.port, initializer.to.index) {
      socket.off(listener);
      return Err(err);
    }

    self.connections.borrow_mut().push(Connection {
      socket: Rc::clone(&socket),
      listener,
    });
    let queued = (Rc::clone(&socket), initializer.data.clone());
    self.initials.borrow_mut().push(queued.clone());
    self.next_initials.borrow_mut().push(queued);
    if self.is_started() {
      self.send_initials();
    }
    Ok(socket)
  }

  /// Unwires the socket of an initializer with the same target and packet.
  pub fn remove_initial(&self, initializer: &Initializer) -> Result<(), NetworkError> {
    let carriers: Vec<SocketRef> = self
      .next_initials
      .borrow()
      .iter()
      .filter(|(_, data)| *data == initializer.data)
      .map(|(socket, _)| Rc::clone(socket))
      .collect();
    let matches = |socket: &SocketRef| {
      socket.from().is_none()
        && socket.to().is_some_and(|t| same_endpoint(&t, &initializer.to))
        && carriers.iter().any(|carrier| Rc::ptr_eq(carrier, socket))
    };
    let removed = self.take_connections(matches);
    for socket in &removed {
      self
        .initials
        .borrow_mut()
        .retain(|(s, _)| !Rc::ptr_eq(s, socket));
      self
        .next_initials
        .borrow_mut()
        .retain(|(s, _)| !Rc::ptr_eq(s, socket));
    }
    Ok(())
  }

  fn take_connections(&self, matches: impl Fn(&SocketRef) -> bool) -> Vec<SocketRef> {
    let removed: Vec<Connection> = {
      let mut connections = self.connections.borrow_mut();
      let (removed, kept) = std::mem::take(&mut *connections)
        .into_iter()
        .partition(|c| matches(&c.socket));
      *connections = kept;
      removed
    };
    removed
      .into_iter()
      .map(|connection| {
        self.detach_socket(&connection.socket);
        connection.socket.off(connection.listener);
        connection.socket
      })
      .collect()
  }

  /// Detaches a socket from the ports its endpoints name.
  fn detach_socket(&self, socket: &SocketRef) {
    if let Some(to) = socket.to() {
      if let Some(port) = self
        .get_node(&to.process)
        .and_then(|p| p.component.in_ports().get(&to.port))
      {
        port.detach(socket);
      }
    }
    if let Some(from) = socket.from() {
      if let Some(port) = self
        .get_node(&from.process)
        .and_then(|p| p.component.out_ports().get(&from.port))
      {
        port.detach(socket);
      }
    }
  }

  /// Counts connections on `socket` and reports its traffic.
  fn subscribe_socket(&self, socket: &SocketRef, subgraph: Vec<String>) -> ListenerId {
    let me = self.me.clone();
    let weak_socket = Rc::downgrade(socket);
    let open = Cell::new(false);
    socket.on(move |ip| {
      let (Some(network), Some(socket)) = (me.upgrade(), weak_socket.upgrade()) else {
        return;
      };
      if matches!(ip, IpEvent::Connect) && !open.replace(true) {
        network.increase_connections();
      }
      network.emit(NetworkEvent::Ip(IpActivity {
        socket_id: socket.id(),
        from: socket.from(),
        to: socket.to(),
        subgraph: subgraph.clone(),
        ip: ip.clone(),
      }));
      if matches!(ip, IpEvent::Disconnect) && open.replace(false) {
        network.decrease_connections();
      }
    })
  }

  // ------------------------------------------------------------------------
  // Connection accounting
  // ------------------------------------------------------------------------

  fn increase_connections(&self) {
    if self.connection_count.get() == 0 {
      self.abort_end_timer();
      if !self.running.get() {
        let start = Utc::now();
        self.running.set(true);
        self.start_time.set(Some(start));
        debug!(graph = %self.graph.name(), "network run started");
        self.emit(NetworkEvent::Start { start });
      }
    }
    self.connection_count.set(self.connection_count.get() + 1);
  }

  fn decrease_connections(&self) {
    let count = self.connection_count.get();
    if count == 0 {
      return;
    }
    self.connection_count.set(count - 1);
    if count > 1 {
      return;
    }
    self.abort_end_timer();
    let me = self.me.clone();
    let debounce = self.config.end_debounce;
    let timer = tokio::task::spawn_local(async move {
      tokio::time::sleep(debounce).await;
      if let Some(network) = me.upgrade() {
        if network.connection_count() == 0 {
          network.finish_run();
        }
      }
    });
    *self.end_timer.borrow_mut() = Some(timer);
  }

  fn abort_end_timer(&self) {
    if let Some(timer) = self.end_timer.borrow_mut().take() {
      timer.abort();
    }
  }

  fn finish_run(&self) {
    if !self.running.replace(false) {
      return;
    }
    let end = Utc::now();
    let start = self.start_time.take().unwrap_or(end);
    debug!(graph = %self.graph.name(), "network run ended");
    self.emit(NetworkEvent::End {
      start,
      end,
      uptime: end - start,
    });
  }

  fn relay_subgraph(&self, node: &str, event: &NetworkEvent) {
    match event {
      NetworkEvent::Start { .. } => self.increase_connections(),
      NetworkEvent::End { .. } => self.decrease_connections(),
      NetworkEvent::Ip(activity) => {
        let mut activity = activity.clone();
        activity.subgraph.insert(0, node.to_string());
        self.emit(NetworkEvent::Ip(activity));
      }
      NetworkEvent::ProcessError {
        id,
        port,
        error,
        subgraph,
      } => {
        let mut path = subgraph.clone();
        path.insert(0, node.to_string());
        self.emit(NetworkEvent::ProcessError {
          id: id.clone(),
          port: port.clone(),
          error: error.clone(),
          subgraph: path,
        });
      }
      NetworkEvent::Icon { .. } => {}
    }
  }

  // ------------------------------------------------------------------------
  // Lifecycle
  // ------------------------------------------------------------------------

  /// Instantiates and wires the whole graph, then follows its changes.
  pub async fn connect(&self) -> Result<(), NetworkError> {
    let batch = self.config.batch_size.max(1);
    let mut operations = 0usize;
    for node in self.graph.nodes() {
      self.add_node(&node).await?;
      tick(&mut operations, batch).await;
    }
    for edge in self.graph.edges() {
      self.add_edge(&edge).await?;
      tick(&mut operations, batch).await;
    }
    for initializer in self.graph.initializers() {
      self.add_initial(&initializer).await?;
      tick(&mut operations, batch).await;
    }
    self.subscribe_graph();
    debug!(
      graph = %self.graph.name(),
      processes = self.processes.borrow().len(),
      connections = self.connections.borrow().len(),
      "network connected"
    );
    Ok(())
  }

  /// Mirrors later graph edits onto the network, one at a time in order.
  pub fn subscribe_graph(&self) {
    if self.graph_listener.get().is_some() {
      return;
    }
    let (sender, mut receiver) = mpsc::unbounded_channel::<GraphEvent>();
    let listener = self.graph.subscribe(move |event| {
      let _ = sender.send(event.clone());
    });
    self.graph_listener.set(Some(listener));

    let me = self.me.clone();
    tokio::task::spawn_local(async move {
      while let Some(event) = receiver.recv().await {
        let Some(network) = me.upgrade() else {
          break;
        };
        if let Err(err) = network.apply_graph_event(&event).await {
          error!(event = event.name(), error = %err, "failed to apply graph change");
        }
      }
    });
  }

  /// Stops mirroring graph edits.
  pub fn unsubscribe_graph(&self) {
    if let Some(listener) = self.graph_listener.take() {
      self.graph.unsubscribe(listener);
    }
  }

  async fn apply_graph_event(&self, event: &GraphEvent) -> Result<(), NetworkError> {
    match event {
      GraphEvent::AddNode(node) => self.add_node(node).await.map(drop),
      GraphEvent::RemoveNode(node) => self.remove_node(&node.id),
      GraphEvent::RenameNode { old_id, new_id } => self.rename_node(old_id, new_id),
      GraphEvent::AddEdge(edge) => self.add_edge(edge).await.map(drop),
      GraphEvent::RemoveEdge(edge) => self.remove_edge(edge),
      GraphEvent::AddInitial(initializer) => self.add_initial(initializer).await.map(drop),
      GraphEvent::RemoveInitial(initializer) => self.remove_initial(initializer),
      _ => Ok(()),
    }
  }

  /// Starts the components, sends initializers and delivers defaults.
  ///
  /// Starting a started network restarts it.
  pub async fn start(&self) -> Result<(), NetworkError> {
    if self.is_started() {
      self.stop();
    }
    tokio::task::yield_now().await;
    self.started.set(true);
    for process in self.processes() {
      process.component.start();
    }
    self.send_initials();
    if self.config.send_defaults {
      self.send_defaults();
    }
    debug!(graph = %self.graph.name(), "network started");
    Ok(())
  }

  /// Sends every queued initializer as `connect`, `data`, `disconnect`.
  pub fn send_initials(&self) {
    let pending = std::mem::take(&mut *self.initials.borrow_mut());
    for (socket, data) in pending {
      socket.connect();
      socket.send(data);
      socket.disconnect();
    }
  }

  /// Delivers the default packet of every inport that has one and has not
  /// received data yet.
  pub fn send_defaults(&self) {
    for process in self.processes() {
      for port in process.component.in_ports().ports() {
        if port.default_value().is_none() || port.has_received_data() {
          continue;
        }
        let socket = InternalSocket::new();
        socket.set_to(SocketEndpoint::new(&process.id, port.name(), None));
        let listener = self.subscribe_socket(&socket, Vec::new());
        port.deliver_default_on(Rc::clone(&socket));
        socket.off(listener);
      }
    }
  }

  /// Closes open connections and shuts every component down.
  pub fn stop(&self) {
    if !self.is_started() && !self.is_running() {
      warn!(graph = %self.graph.name(), "stop called on a network that is not started");
    }
    for socket in self.connections() {
      if socket.is_connected() {
        socket.disconnect();
      }
    }
    for process in self.processes() {
      process.component.shutdown();
    }
    self.abort_end_timer();
    *self.initials.borrow_mut() = self.next_initials.borrow().clone();
    self.connection_count.set(0);
    self.started.set(false);
    self.finish_run();
    debug!(graph = %self.graph.name(), "network stopped");
  }
}

impl Drop for Network {
  fn drop(&mut self) {
    self.unsubscribe_graph();
  }
}

fn same_endpoint(socket: &SocketEndpoint, endpoint: &Endpoint) -> bool {
  socket.process == endpoint.node && socket.port == endpoint.port && socket.index == endpoint.index
}

async fn tick(operations: &mut usize, batch: usize) {
  *operations += 1;
  if *operations % batch == 0 {
    tokio::task::yield_now().await;
  }
}

/// Resolves once `component` reports ready.
async fn wait_ready(id: &str, component: &Rc<dyn Component>) -> Result<(), NetworkError> {
  if component.is_ready() {
    return Ok(());
  }
  let (sender, receiver) = oneshot::channel();
  component.on_ready(Box::new(move || {
    let _ = sender.send(());
  }));
  receiver
    .await
    .map_err(|_| NetworkError::NotReady(id.to_string()))
}
