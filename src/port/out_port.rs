//! # OutPort
//!
//! Sending side of a component. Every operation fans out to all attached
//! sockets in slot order or, on addressable ports, to the socket at the given
//! index.

use crate::port::error::PortError;
use crate::port::options::PortOptions;
use crate::port::port::{Port, PortBase};
use crate::port::socket::SocketRef;
use serde_json::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use tracing::trace;

/// Sending port.
pub struct OutPort {
  base: PortBase,
  cache: RefCell<HashMap<Option<usize>, Value>>,
}

impl fmt::Debug for OutPort {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("OutPort")
      .field("name", &self.base.name)
      .field("options", &self.base.options)
      .field("attached", &self.base.list_attached())
      .finish()
  }
}

impl OutPort {
  /// Creates an unattached outport.
  pub fn new(name: &str, options: PortOptions) -> Rc<Self> {
    Rc::new(Self {
      base: PortBase::new(name, options),
      cache: RefCell::new(HashMap::new()),
    })
  }

  fn targets(&self, index: Option<usize>) -> Result<Vec<SocketRef>, PortError> {
    if self.base.options.required && !self.base.is_attached(None) {
      return Err(PortError::NotAttached {
        port: self.base.label(),
      });
    }
    if !self.base.options.addressable {
      return Ok(self.base.sockets());
    }
    let index = index.ok_or_else(|| PortError::IndexRequired {
      port: self.base.label(),
    })?;
    Ok(self.base.socket_at(index).into_iter().collect())
  }

  fn cache_key(&self, index: Option<usize>) -> Option<usize> {
    index.filter(|_| self.base.options.addressable)
  }

  /// Opens the stream on the target sockets.
  pub fn connect(&self, index: Option<usize>) -> Result<(), PortError> {
    for socket in self.targets(index)? {
      socket.connect();
    }
    Ok(())
  }

  /// Opens a bracket on the target sockets.
  pub fn begin_group(&self, group: &str, index: Option<usize>) -> Result<(), PortError> {
    for socket in self.targets(index)? {
      socket.begin_group(group);
    }
    Ok(())
  }

  /// Sends a packet to the target sockets.
  pub fn send(&self, data: Value, index: Option<usize>) -> Result<(), PortError> {
    let targets = self.targets(index)?;
    if self.base.options.caching {
      self
        .cache
        .borrow_mut()
        .insert(self.cache_key(index), data.clone());
    }
    for socket in targets {
      socket.send(data.clone());
    }
    Ok(())
  }

  /// Closes the innermost bracket on the target sockets.
  pub fn end_group(&self, index: Option<usize>) -> Result<(), PortError> {
    for socket in self.targets(index)? {
      socket.end_group();
    }
    Ok(())
  }

  /// Closes the stream on the target sockets.
  pub fn disconnect(&self, index: Option<usize>) -> Result<(), PortError> {
    for socket in self.targets(index)? {
      socket.disconnect();
    }
    Ok(())
  }

  /// Value most recently sent to `index`, when caching.
  pub fn cached(&self, index: Option<usize>) -> Option<Value> {
    self.cache.borrow().get(&self.cache_key(index)).cloned()
  }
}

impl Port for OutPort {
  fn name(&self) -> &str {
    &self.base.name
  }

  fn options(&self) -> &PortOptions {
    &self.base.options
  }

  fn attach(&self, socket: SocketRef, index: Option<usize>) -> usize {
    let slot = self.base.next_slot(index);
    if let Some(previous) = self.base.insert(slot, Rc::clone(&socket), None) {
      trace!(port = %self.base.label(), slot, socket = %previous.socket.id(), "replaced socket");
    }
    if self.base.options.caching {
      let key = self.cache_key(Some(slot));
      let cached = self.cache.borrow().get(&key).cloned();
      if let Some(value) = cached {
        socket.send(value);
      }
    }
    slot
  }

  fn detach(&self, socket: &SocketRef) {
    self.base.remove(socket);
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
