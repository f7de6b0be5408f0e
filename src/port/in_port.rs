//! # InPort
//!
//! Receiving side of a component. For every event arriving on any attached
//! socket an inport:
//!
//! 1. queues it when the port is `buffered` (pulled later with
//!    [`receive`](InPort::receive)), otherwise
//! 2. invokes the process callback registered with
//!    [`on_process`](InPort::on_process), and in both cases
//! 3. notifies listeners registered with [`on`](InPort::on).
//!
//! A failing process callback does not interrupt delivery: the error is
//! logged and handed to [`on_error`](InPort::on_error) listeners.

use crate::component::ComponentError;
use crate::observable::{Emitter, ListenerId};
use crate::port::options::PortOptions;
use crate::port::port::{Port, PortBase};
use crate::port::socket::{InternalSocket, IpEvent, SocketRef};
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};
use tracing::{error, trace};

/// An event as seen by the receiving component.
#[derive(Debug, Clone, PartialEq)]
pub struct PortEvent {
  /// The IP event.
  pub ip: IpEvent,
  /// Slot the event arrived on, for addressable ports.
  pub index: Option<usize>,
  /// Owning node id.
  pub node: Option<String>,
}

type ProcessFn = Rc<dyn Fn(&PortEvent) -> Result<(), ComponentError>>;

/// Receiving port.
pub struct InPort {
  base: PortBase,
  me: Weak<InPort>,
  process: RefCell<Option<ProcessFn>>,
  buffer: RefCell<VecDeque<PortEvent>>,
  events: Emitter<PortEvent>,
  errors: Emitter<ComponentError>,
  received_data: Cell<bool>,
}

impl fmt::Debug for InPort {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("InPort")
      .field("name", &self.base.name)
      .field("options", &self.base.options)
      .field("attached", &self.base.list_attached())
      .finish()
  }
}

impl InPort {
  /// Creates an unattached inport.
  pub fn new(name: &str, options: PortOptions) -> Rc<Self> {
    Rc::new_cyclic(|me| Self {
      base: PortBase::new(name, options),
      me: me.clone(),
      process: RefCell::new(None),
      buffer: RefCell::new(VecDeque::new()),
      events: Emitter::new(),
      errors: Emitter::new(),
      received_data: Cell::new(false),
    })
  }

  /// Registers the process callback, replacing any previous one.
  pub fn on_process(&self, callback: impl Fn(&PortEvent) -> Result<(), ComponentError> + 'static) {
    *self.process.borrow_mut() = Some(Rc::new(callback));
  }

  /// Whether a process callback is registered.
  pub fn has_process(&self) -> bool {
    self.process.borrow().is_some()
  }

  /// Subscribes to every event received by the port.
  pub fn on(&self, listener: impl Fn(&PortEvent) + 'static) -> ListenerId {
    self.events.on(listener)
  }

  /// Cancels an [`on`](Self::on) subscription.
  pub fn off(&self, id: ListenerId) {
    self.events.off(id);
  }

  /// Subscribes to failures of the process callback.
  pub fn on_error(&self, listener: impl Fn(&ComponentError) + 'static) -> ListenerId {
    self.errors.on(listener)
  }

  /// Cancels an [`on_error`](Self::on_error) subscription.
  pub fn off_error(&self, id: ListenerId) {
    self.errors.off(id);
  }

  /// Pops the oldest buffered event.
  pub fn receive(&self) -> Option<PortEvent> {
    self.buffer.borrow_mut().pop_front()
  }

  /// Number of buffered events.
  pub fn contains(&self) -> usize {
    self.buffer.borrow().len()
  }

  /// The configured default packet.
  pub fn default_value(&self) -> Option<&Value> {
    self.base.options.default.as_ref()
  }

  /// Whether any data packet has arrived.
  pub fn has_received_data(&self) -> bool {
    self.received_data.get()
  }

  /// Delivers `connect`, the default packet and `disconnect` through a
  /// transient socket, unless data already arrived or no default is set.
  ///
  /// Returns whether the default was delivered.
  pub fn deliver_default(&self) -> bool {
    self.deliver_default_on(InternalSocket::new())
  }

  /// Like [`deliver_default`](Self::deliver_default) through a caller-provided
  /// socket, letting the caller observe the traffic.
  pub fn deliver_default_on(&self, socket: SocketRef) -> bool {
    let Some(value) = self.default_value().cloned() else {
      return false;
    };
    if self.has_received_data() {
      return false;
    }
    self.attach(Rc::clone(&socket), None);
    socket.connect();
    socket.send(value);
    socket.disconnect();
    self.detach(&socket);
    true
  }

  /// Dispatches one event arriving on slot `slot`.
  pub(crate) fn handle(&self, ip: IpEvent, slot: usize) {
    if matches!(ip, IpEvent::Data(_)) {
      self.received_data.set(true);
    }
    let event = PortEvent {
      ip,
      index: self.base.options.addressable.then_some(slot),
      node: self.base.owner(),
    };
    if self.base.options.buffered {
      self.buffer.borrow_mut().push_back(event.clone());
    } else {
      let process = self.process.borrow().clone();
      if let Some(process) = process {
        if let Err(err) = process(&event) {
          error!(port = %self.base.label(), event = event.ip.name(), error = %err, "process callback failed");
          self.errors.emit(&err);
        }
      }
    }
    self.events.emit(&event);
  }
}

impl Port for InPort {
  fn name(&self) -> &str {
    &self.base.name
  }

  fn options(&self) -> &PortOptions {
    &self.base.options
  }

  fn attach(&self, socket: SocketRef, index: Option<usize>) -> usize {
    let slot = self.base.next_slot(index);
    let me = self.me.clone();
    let listener = socket.on(move |ip| {
      if let Some(port) = me.upgrade() {
        port.handle(ip.clone(), slot);
      }
    });
    if let Some(previous) = self.base.insert(slot, socket, Some(listener)) {
      trace!(port = %self.base.label(), slot, socket = %previous.socket.id(), "replaced socket");
      if let Some(listener) = previous.listener {
        previous.socket.off(listener);
      }
    }
    slot
  }

  fn detach(&self, socket: &SocketRef) {
    if let Some(slot) = self.base.remove(socket) {
      if let Some(listener) = slot.listener {
        slot.socket.off(listener);
      }
    }
  }

  fn is_attached(&self, index: Option<usize>) -> bool {
    self.base.is_attached(index)
  }

  fn is_connected(&self, index: Option<usize>) -> bool {
    self.base.is_connected(index)
  }

  fn list_attached(&self) -> Vec<usize> {
    self.base.list_attached()
  }

  fn set_owner(&self, node: &str) {
    self.base.set_owner(node);
  }

  fn owner(&self) -> Option<String> {
    self.base.owner()
  }
}
