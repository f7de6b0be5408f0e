//! Named port collections owned by a component.

use crate::port::in_port::InPort;
use crate::port::options::PortOptions;
use crate::port::out_port::OutPort;
use crate::port::port::Port;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// Ports keyed by lowercase name.
pub struct PortMap<P> {
  ports: RefCell<BTreeMap<String, Rc<P>>>,
}

/// Inports of a component.
pub type InPorts = PortMap<InPort>;
/// Outports of a component.
pub type OutPorts = PortMap<OutPort>;

impl<P> Default for PortMap<P> {
  fn default() -> Self {
    Self {
      ports: RefCell::new(BTreeMap::new()),
    }
  }
}

impl<P> fmt::Debug for PortMap<P> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_list().entries(self.ports.borrow().keys()).finish()
  }
}

impl<P: Port> PortMap<P> {
  /// Creates an empty collection.
  pub fn new() -> Self {
    Self::default()
  }

  /// Looks up a port, ignoring case.
  pub fn get(&self, name: &str) -> Option<Rc<P>> {
    self.ports.borrow().get(&name.to_lowercase()).cloned()
  }

  /// Whether a port exists, ignoring case.
  pub fn contains(&self, name: &str) -> bool {
    self.ports.borrow().contains_key(&name.to_lowercase())
  }

  /// Port names in order.
  pub fn names(&self) -> Vec<String> {
    self.ports.borrow().keys().cloned().collect()
  }

  /// Snapshot of every port.
  pub fn ports(&self) -> Vec<Rc<P>> {
    self.ports.borrow().values().cloned().collect()
  }

  /// Removes a port.
  pub fn remove(&self, name: &str) -> Option<Rc<P>> {
    self.ports.borrow_mut().remove(&name.to_lowercase())
  }

  /// Registers an existing port under `name`, sharing it with its other owner.
  pub fn insert(&self, name: &str, port: Rc<P>) {
    self.ports.borrow_mut().insert(name.to_lowercase(), port);
  }

  /// Records the owning node on every port.
  pub fn set_owner(&self, node: &str) {
    for port in self.ports() {
      port.set_owner(node);
    }
  }
}

impl PortMap<InPort> {
  /// Creates and registers an inport.
  pub fn add(&self, name: &str, options: PortOptions) -> Rc<InPort> {
    let port = InPort::new(name, options);
    self.insert(name, Rc::clone(&port));
    port
  }
}

impl PortMap<OutPort> {
  /// Creates and registers an outport.
  pub fn add(&self, name: &str, options: PortOptions) -> Rc<OutPort> {
    let port = OutPort::new(name, options);
    self.insert(name, Rc::clone(&port));
    port
  }
}
