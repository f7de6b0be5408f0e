//! # Component Contract
//!
//! A component instance is the process behind a graph node. Every instance
//! owns a [`ComponentCore`] holding its ports and presentation state, and
//! implements [`Component`] to describe its lifecycle to the
//! [`Network`](crate::network::Network).
//!
//! Components react to packets by registering process callbacks on their
//! inports (see [`InPort::on_process`](crate::port::InPort::on_process)) and
//! write results through their outports.
//!
//! # Example
//!
//! ```rust
//! use flowweave::component::{Component, ComponentCore};
//! use flowweave::port::{IpEvent, PortOptions};
//! use std::rc::Rc;
//!
//! struct Upper {
//!   core: ComponentCore,
//! }
//!
//! impl Component for Upper {
//!   fn core(&self) -> &ComponentCore {
//!     &self.core
//!   }
//! }
//!
//! let core = ComponentCore::new().with_description("Uppercases strings");
//! let input = core.in_ports().add("in", PortOptions::default());
//! let output = core.out_ports().add("out", PortOptions::default());
//! input.on_process(move |event| {
//!   if let IpEvent::Data(value) = &event.ip {
//!     let text = value.as_str().unwrap_or_default().to_uppercase();
//!     output.send(text.into(), None)?;
//!   }
//!   Ok(())
//! });
//! let component: Rc<dyn Component> = Rc::new(Upper { core });
//! assert!(component.is_ready());
//! ```

use crate::component::error::ComponentError;
use crate::network::Network;
use crate::observable::{Emitter, ListenerId};
use crate::port::{InPorts, OutPorts, Port};
use serde_json::Value;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Ports and presentation state shared by every component.
#[derive(Default)]
pub struct ComponentCore {
  in_ports: InPorts,
  out_ports: OutPorts,
  description: String,
  icon: RefCell<Option<String>>,
  icon_events: Emitter<String>,
  ready_events: Emitter<()>,
}

impl fmt::Debug for ComponentCore {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ComponentCore")
      .field("description", &self.description)
      .field("in_ports", &self.in_ports)
      .field("out_ports", &self.out_ports)
      .finish()
  }
}

impl ComponentCore {
  /// Creates a core without ports.
  pub fn new() -> Self {
    Self::default()
  }

  /// Sets the description.
  #[must_use]
  pub fn with_description(mut self, description: impl Into<String>) -> Self {
    self.description = description.into();
    self
  }

  /// Sets the initial icon without notifying anyone.
  #[must_use]
  pub fn with_icon(self, icon: impl Into<String>) -> Self {
    *self.icon.borrow_mut() = Some(icon.into());
    self
  }

  /// Inports.
  pub fn in_ports(&self) -> &InPorts {
    &self.in_ports
  }

  /// Outports.
  pub fn out_ports(&self) -> &OutPorts {
    &self.out_ports
  }

  /// Description.
  pub fn description(&self) -> &str {
    &self.description
  }

  /// Current icon.
  pub fn icon(&self) -> Option<String> {
    self.icon.borrow().clone()
  }

  /// Changes the icon and notifies icon listeners.
  pub fn set_icon(&self, icon: impl Into<String>) {
    let icon = icon.into();
    *self.icon.borrow_mut() = Some(icon.clone());
    self.icon_events.emit(&icon);
  }

  /// Subscribes to icon changes.
  pub fn on_icon(&self, listener: impl Fn(&String) + 'static) -> ListenerId {
    self.icon_events.on(listener)
  }

  /// Cancels an icon subscription.
  pub fn off_icon(&self, id: ListenerId) {
    self.icon_events.off(id);
  }

  /// Notifies callbacks waiting in [`Component::on_ready`].
  pub fn emit_ready(&self) {
    self.ready_events.emit(&());
  }

  fn once_ready(&self, listener: impl Fn(&()) + 'static) -> ListenerId {
    self.ready_events.once(listener)
  }
}

/// A running process behind a graph node.
pub trait Component {
  /// Shared core.
  fn core(&self) -> &ComponentCore;

  /// Inports.
  fn in_ports(&self) -> &InPorts {
    self.core().in_ports()
  }

  /// Outports.
  fn out_ports(&self) -> &OutPorts {
    self.core().out_ports()
  }

  /// Whether the instance is fully wired. Subgraphs are not ready until
  /// their inner network has connected.
  fn is_ready(&self) -> bool {
    true
  }

  /// Runs `callback` once the instance is ready, immediately if it already is.
  fn on_ready(&self, callback: Box<dyn FnOnce()>) {
    if self.is_ready() {
      callback();
      return;
    }
    let pending = RefCell::new(Some(callback));
    self.core().once_ready(move |_| {
      if let Some(callback) = pending.borrow_mut().take() {
        callback();
      }
    });
  }

  /// The inner network of a subgraph.
  fn network(&self) -> Option<Rc<Network>> {
    None
  }

  /// Whether this instance runs an inner network.
  fn is_subgraph(&self) -> bool {
    self.network().is_some()
  }

  /// Called when the owning network starts.
  fn start(&self) {}

  /// Releases timers, tasks and listeners.
  fn shutdown(&self) {}

  /// Routes `err` to the outport `port`, bracketed by `groups`.
  ///
  /// # Errors
  ///
  /// Returns `err` itself when the port does not exist, or is required but
  /// unattached.
  fn error(&self, err: ComponentError, groups: &[String], port: &str) -> Result<(), ComponentError> {
    let Some(out) = self.out_ports().get(port) else {
      return Err(err);
    };
    if !out.is_attached(None) && out.is_required() {
      return Err(err);
    }
    for group in groups {
      out.begin_group(group, None)?;
    }
    out.send(Value::String(err.to_string()), None)?;
    for _ in groups {
      out.end_group(None)?;
    }
    out.disconnect(None)?;
    Ok(())
  }
}
