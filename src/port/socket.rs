//! # Internal Socket
//!
//! The wire between an outport and an inport. A socket carries the IP event
//! protocol:
//!
//! ```text
//! connect (begin_group* data* end_group*)* disconnect
//! ```
//!
//! The grammar is not enforced. `send` on a disconnected socket connects it
//! first, `connect` on a connected socket is a no-op and `disconnect` always
//! notifies listeners.

use crate::observable::{Emitter, ListenerId};
use serde_json::Value;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// One event of the IP protocol.
#[derive(Debug, Clone, PartialEq)]
pub enum IpEvent {
  /// A stream opens.
  Connect,
  /// A bracket with the given label opens.
  BeginGroup(String),
  /// A packet.
  Data(Value),
  /// The bracket with the given label closes.
  EndGroup(String),
  /// The stream closes.
  Disconnect,
}

impl IpEvent {
  /// Protocol name of the event.
  pub fn name(&self) -> &'static str {
    match self {
      IpEvent::Connect => "connect",
      IpEvent::BeginGroup(_) => "begingroup",
      IpEvent::Data(_) => "data",
      IpEvent::EndGroup(_) => "endgroup",
      IpEvent::Disconnect => "disconnect",
    }
  }
}

/// A wired end of a socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocketEndpoint {
  /// Node id.
  pub process: String,
  /// Port name.
  pub port: String,
  /// Index on an addressable port.
  pub index: Option<usize>,
}

impl SocketEndpoint {
  /// Creates an endpoint.
  pub fn new(process: impl Into<String>, port: impl Into<String>, index: Option<usize>) -> Self {
    Self {
      process: process.into(),
      port: port.into(),
      index,
    }
  }
}

#[derive(Default)]
struct SocketState {
  connected: bool,
  groups: Vec<String>,
  from: Option<SocketEndpoint>,
  to: Option<SocketEndpoint>,
}

/// Shared handle to a socket.
pub type SocketRef = Rc<InternalSocket>;

/// A point-to-point channel carrying [`IpEvent`]s.
pub struct InternalSocket {
  state: RefCell<SocketState>,
  events: Emitter<IpEvent>,
}

impl fmt::Debug for InternalSocket {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("InternalSocket")
      .field("id", &self.id())
      .field("connected", &self.is_connected())
      .finish()
  }
}

impl InternalSocket {
  /// Creates an unwired, disconnected socket.
  pub fn new() -> SocketRef {
    Rc::new(Self {
      state: RefCell::new(SocketState::default()),
      events: Emitter::new(),
    })
  }

  /// Subscribes to every event passing through the socket.
  pub fn on(&self, listener: impl Fn(&IpEvent) + 'static) -> ListenerId {
    self.events.on(listener)
  }

  /// Cancels a subscription.
  pub fn off(&self, id: ListenerId) {
    self.events.off(id);
  }

  /// Opens the stream. No-op when already connected.
  pub fn connect(&self) {
    {
      let mut state = self.state.borrow_mut();
      if state.connected {
        return;
      }
      state.connected = true;
    }
    self.events.emit(&IpEvent::Connect);
  }

  /// Sends a packet, connecting first if needed.
  pub fn send(&self, data: Value) {
    if !self.is_connected() {
      self.connect();
    }
    self.events.emit(&IpEvent::Data(data));
  }

  /// Opens a bracket.
  pub fn begin_group(&self, group: impl Into<String>) {
    let group = group.into();
    self.state.borrow_mut().groups.push(group.clone());
    self.events.emit(&IpEvent::BeginGroup(group));
  }

  /// Closes the innermost bracket. No-op when no bracket is open.
  pub fn end_group(&self) {
    let popped = self.state.borrow_mut().groups.pop();
    if let Some(group) = popped {
      self.events.emit(&IpEvent::EndGroup(group));
    }
  }

  /// Closes the stream.
  pub fn disconnect(&self) {
    self.state.borrow_mut().connected = false;
    self.events.emit(&IpEvent::Disconnect);
  }

  /// Whether the stream is open.
  pub fn is_connected(&self) -> bool {
    self.state.borrow().connected
  }

  /// Currently open brackets, outermost first.
  pub fn groups(&self) -> Vec<String> {
    self.state.borrow().groups.clone()
  }

  /// Source endpoint, `None` for initializer sockets.
  pub fn from(&self) -> Option<SocketEndpoint> {
    self.state.borrow().from.clone()
  }

  /// Target endpoint.
  pub fn to(&self) -> Option<SocketEndpoint> {
    self.state.borrow().to.clone()
  }

  /// Records the source endpoint.
  pub fn set_from(&self, endpoint: SocketEndpoint) {
    self.state.borrow_mut().from = Some(endpoint);
  }

  /// Records the target endpoint.
  pub fn set_to(&self, endpoint: SocketEndpoint) {
    self.state.borrow_mut().to = Some(endpoint);
  }

  /// Human readable id, `A OUT -> IN B` or `DATA -> IN B`.
  pub fn id(&self) -> String {
    let state = self.state.borrow();
    let from = |e: &SocketEndpoint| format!("{} {}", e.process, e.port.to_uppercase());
    let to = |e: &SocketEndpoint| format!("{} {}", e.port.to_uppercase(), e.process);
    match (&state.from, &state.to) {
      (Some(f), Some(t)) => format!("{} -> {}", from(f), to(t)),
      (None, Some(t)) => format!("DATA -> {}", to(t)),
      (Some(f), None) => format!("{} -> ANON", from(f)),
      (None, None) => "UNDEFINED".to_string(),
    }
  }
}
