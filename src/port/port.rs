//! # Port Capability
//!
//! [`Port`] is the capability shared by [`InPort`](crate::port::InPort) and
//! [`OutPort`](crate::port::OutPort): a named, configured holder of attached
//! sockets. The wiring layer only needs this trait to attach and inspect
//! sockets; direction-specific behaviour lives on the concrete types.
//!
//! ## Slots
//!
//! Sockets occupy slots. Addressable ports place a socket at the index the
//! wiring layer supplies and keep holes after a detach. Non-addressable ports
//! (and addressable ports wired without an index) take the first free slot.
//! Attaching at an occupied index detaches the previous occupant.

use crate::observable::ListenerId;
use crate::port::options::PortOptions;
use crate::port::socket::SocketRef;
use std::cell::RefCell;
use std::rc::Rc;

/// Capability implemented by every port type.
pub trait Port {
  /// Port name, lowercase.
  fn name(&self) -> &str;

  /// Declared options.
  fn options(&self) -> &PortOptions;

  /// Whether sockets are addressed by index.
  fn is_addressable(&self) -> bool {
    self.options().addressable
  }

  /// Whether fan-out requires an attached socket.
  fn is_required(&self) -> bool {
    self.options().required
  }

  /// Whether another socket may be attached. Always true: a non-addressable
  /// port accepts several sockets and fans out across them.
  fn can_attach(&self) -> bool {
    true
  }

  /// Attaches a socket, returning the slot it occupies.
  fn attach(&self, socket: SocketRef, index: Option<usize>) -> usize;

  /// Detaches a socket. Unknown sockets are ignored.
  fn detach(&self, socket: &SocketRef);

  /// With an index on an addressable port, whether that slot holds a
  /// socket; otherwise whether any socket is attached.
  fn is_attached(&self, index: Option<usize>) -> bool;

  /// Like [`is_attached`](Self::is_attached) but requires the socket(s) to
  /// be connected.
  fn is_connected(&self, index: Option<usize>) -> bool;

  /// Occupied slot indices in ascending order.
  fn list_attached(&self) -> Vec<usize>;

  /// Records the id of the node owning this port.
  fn set_owner(&self, node: &str);

  /// Id of the owning node, once wired into a network.
  fn owner(&self) -> Option<String>;
}

pub(crate) struct Slot {
  pub(crate) socket: SocketRef,
  pub(crate) listener: Option<ListenerId>,
}

/// State shared by both port directions.
pub(crate) struct PortBase {
  pub(crate) name: String,
  pub(crate) options: PortOptions,
  owner: RefCell<Option<String>>,
  slots: RefCell<Vec<Option<Slot>>>,
}

impl PortBase {
  pub(crate) fn new(name: &str, options: PortOptions) -> Self {
    Self {
      name: name.to_lowercase(),
      options,
      owner: RefCell::new(None),
      slots: RefCell::new(Vec::new()),
    }
  }

  /// `node.port` when owned, else the bare port name.
  pub(crate) fn label(&self) -> String {
    match self.owner.borrow().as_deref() {
      Some(owner) => format!("{}.{}", owner, self.name),
      None => self.name.clone(),
    }
  }

  pub(crate) fn set_owner(&self, node: &str) {
    *self.owner.borrow_mut() = Some(node.to_string());
  }

  pub(crate) fn owner(&self) -> Option<String> {
    self.owner.borrow().clone()
  }

  /// Slot a new socket would occupy.
  pub(crate) fn next_slot(&self, index: Option<usize>) -> usize {
    let slots = self.slots.borrow();
    match index.filter(|_| self.options.addressable) {
      Some(index) => index,
      None => slots
        .iter()
        .position(Option::is_none)
        .unwrap_or(slots.len()),
    }
  }

  /// Places a socket in `slot`, returning the socket it displaced.
  pub(crate) fn insert(
    &self,
    slot: usize,
    socket: SocketRef,
    listener: Option<ListenerId>,
  ) -> Option<Slot> {
    let mut slots = self.slots.borrow_mut();
    if slots.len() <= slot {
      slots.resize_with(slot + 1, || None);
    }
    slots[slot].replace(Slot { socket, listener })
  }

  pub(crate) fn remove(&self, socket: &SocketRef) -> Option<Slot> {
    let mut slots = self.slots.borrow_mut();
    let position = slots
      .iter()
      .position(|s| s.as_ref().is_some_and(|s| Rc::ptr_eq(&s.socket, socket)))?;
    let removed = slots[position].take();
    while matches!(slots.last(), Some(None)) {
      slots.pop();
    }
    removed
  }

  pub(crate) fn socket_at(&self, slot: usize) -> Option<SocketRef> {
    self
      .slots
      .borrow()
      .get(slot)
      .and_then(|s| s.as_ref().map(|s| Rc::clone(&s.socket)))
  }

  /// Attached sockets in slot order.
  pub(crate) fn sockets(&self) -> Vec<SocketRef> {
    self
      .slots
      .borrow()
      .iter()
      .flatten()
      .map(|s| Rc::clone(&s.socket))
      .collect()
  }

  pub(crate) fn is_attached(&self, index: Option<usize>) -> bool {
    match index.filter(|_| self.options.addressable) {
      Some(index) => self.socket_at(index).is_some(),
      None => self.slots.borrow().iter().any(Option::is_some),
    }
  }

  pub(crate) fn is_connected(&self, index: Option<usize>) -> bool {
    match index.filter(|_| self.options.addressable) {
      Some(index) => self.socket_at(index).is_some_and(|s| s.is_connected()),
      None => self.sockets().iter().any(|s| s.is_connected()),
    }
  }

  pub(crate) fn list_attached(&self) -> Vec<usize> {
    self
      .slots
      .borrow()
      .iter()
      .enumerate()
      .filter(|(_, s)| s.is_some())
      .map(|(i, _)| i)
      .collect()
  }
}
