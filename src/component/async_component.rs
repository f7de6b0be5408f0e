//! # Async Component
//!
//! [`AsyncComponent`] adapts an [`AsyncHandler`] (one packet in, asynchronous
//! work, results out) to the port protocol.
//!
//! ## Ordering
//!
//! At most one data task runs at a time. Every event arriving while a task is
//! in flight, or while earlier events are still queued, is appended to a FIFO
//! queue. When a task completes the queue is drained in arrival order: group
//! brackets and disconnects are forwarded until the next data packet, which
//! starts the next task. Output therefore preserves input order regardless of
//! how long individual tasks take.
//!
//! ## Errors
//!
//! A failing task is routed through [`Component::error`] to the error port,
//! bracketed by the groups open on the input at the time. Only then is the
//! load counter decremented.
//!
//! ## Load
//!
//! The number of tasks in flight is published on the optional `load`
//! outport whenever it changes; the port is disconnected when the load
//! returns to zero.

use crate::component::component::{Component, ComponentCore};
use crate::component::error::ComponentError;
use crate::port::{InPort, IpEvent, OutPort, Port, PortEvent, PortOptions};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::{Rc, Weak};
use tracing::error;

/// Asynchronous per-packet work.
#[async_trait(?Send)]
pub trait AsyncHandler: 'static {
  /// Processes one packet, writing results to `output`.
  async fn do_async(&self, data: Value, output: &OutPort) -> Result<(), ComponentError>;
}

/// An input event waiting for the in-flight task to finish.
#[derive(Debug, Clone, PartialEq)]
pub enum QueuedIp {
  /// Bracket open.
  BeginGroup(String),
  /// Packet to process.
  Data(Value),
  /// Bracket close.
  EndGroup,
  /// Stream close.
  Disconnect,
}

#[derive(Default)]
struct AsyncState {
  load: usize,
  queue: VecDeque<QueuedIp>,
  error_groups: Vec<String>,
}

/// Port names used by an [`AsyncComponent`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsyncPorts {
  /// Data inport.
  pub input: String,
  /// Result outport.
  pub output: String,
  /// Error outport.
  pub error: String,
}

impl Default for AsyncPorts {
  fn default() -> Self {
    Self {
      input: "in".to_string(),
      output: "out".to_string(),
      error: "error".to_string(),
    }
  }
}

/// Component running an [`AsyncHandler`] with ordered, one-at-a-time tasks.
pub struct AsyncComponent<H: AsyncHandler> {
  core: ComponentCore,
  handler: H,
  me: Weak<AsyncComponent<H>>,
  state: RefCell<AsyncState>,
  output: Rc<OutPort>,
  load_port: Rc<OutPort>,
  error_port: String,
}

impl<H: AsyncHandler> AsyncComponent<H> {
  /// Wraps `handler` with ports `in`, `out`, `error` and `load`.
  pub fn new(handler: H, description: &str) -> Rc<Self> {
    Self::with_ports(handler, description, AsyncPorts::default())
  }

  /// Wraps `handler` with custom port names.
  pub fn with_ports(handler: H, description: &str, ports: AsyncPorts) -> Rc<Self> {
    let core = ComponentCore::new().with_description(description);
    let input = core.in_ports().add(&ports.input, PortOptions::default());
    let output = core.out_ports().add(&ports.output, PortOptions::default());
    core.out_ports().add(&ports.error, PortOptions::default());
    let load_port = core.out_ports().add("load", PortOptions::default());

    Rc::new_cyclic(|me: &Weak<Self>| {
      let weak = me.clone();
      input.on_process(move |event| match weak.upgrade() {
        Some(component) => component.receive(event),
        None => Ok(()),
      });
      Self {
        core,
        handler,
        me: me.clone(),
        state: RefCell::new(AsyncState::default()),
        output,
        load_port,
        error_port: ports.error.to_lowercase(),
      }
    })
  }

  /// Tasks currently in flight.
  pub fn load(&self) -> usize {
    self.state.borrow().load
  }

  /// Events waiting behind the in-flight task.
  pub fn queued(&self) -> Vec<QueuedIp> {
    self.state.borrow().queue.iter().cloned().collect()
  }

  /// The wrapped handler.
  pub fn handler(&self) -> &H {
    &self.handler
  }

  fn label(&self) -> String {
    self
      .core
      .in_ports()
      .ports()
      .first()
      .and_then(|p| p.owner())
      .unwrap_or_else(|| "async component".to_string())
  }

  fn busy(&self) -> bool {
    let state = self.state.borrow();
    state.load > 0 || !state.queue.is_empty()
  }

  fn enqueue(&self, ip: QueuedIp) {
    self.state.borrow_mut().queue.push_back(ip);
  }

  fn receive(&self, event: &PortEvent) -> Result<(), ComponentError> {
    match &event.ip {
      IpEvent::Connect => Ok(()),
      IpEvent::BeginGroup(group) => {
        if self.busy() {
          self.enqueue(QueuedIp::BeginGroup(group.clone()));
          return Ok(());
        }
        self.state.borrow_mut().error_groups.push(group.clone());
        Ok(self.output.begin_group(group, None)?)
      }
      IpEvent::EndGroup(_) => {
        if self.busy() {
          self.enqueue(QueuedIp::EndGroup);
          return Ok(());
        }
        self.state.borrow_mut().error_groups.pop();
        Ok(self.output.end_group(None)?)
      }
      IpEvent::Disconnect => {
        if self.busy() {
          self.enqueue(QueuedIp::Disconnect);
          return Ok(());
        }
        self.state.borrow_mut().error_groups.clear();
        Ok(self.output.disconnect(None)?)
      }
      IpEvent::Data(data) => {
        if self.busy() {
          self.enqueue(QueuedIp::Data(data.clone()));
        } else {
          self.process_data(data.clone());
        }
        Ok(())
      }
    }
  }

  fn process_data(&self, data: Value) {
    let Some(me) = self.me.upgrade() else {
      return;
    };
    if let Err(err) = self.increment_load() {
      error!(error = %err, "async component load accounting failed");
    }
    tokio::task::spawn_local(async move {
      if let Err(err) = me.handler.do_async(data, &me.output).await {
        let groups = me.state.borrow().error_groups.clone();
        if let Err(err) = me.error(err, &groups, &me.error_port) {
          error!(component = %me.label(), error = %err, "unhandled async component error");
        }
      }
      if let Err(err) = me.decrement_load() {
        error!(error = %err, "async component load accounting failed");
      }
      tokio::task::yield_now().await;
      me.process_queue();
    });
  }

  fn increment_load(&self) -> Result<(), ComponentError> {
    let load = {
      let mut state = self.state.borrow_mut();
      state.load += 1;
      state.load
    };
    if self.load_port.is_attached(None) {
      self.load_port.send(json!(load), None)?;
    }
    Ok(())
  }

  fn decrement_load(&self) -> Result<(), ComponentError> {
    let load = {
      let mut state = self.state.borrow_mut();
      if state.load == 0 {
        return Err(ComponentError::NegativeLoad(self.label()));
      }
      state.load -= 1;
      state.load
    };
    if self.load_port.is_attached(None) {
      self.load_port.send(json!(load), None)?;
      if load == 0 {
        self.load_port.disconnect(None)?;
      }
    }
    Ok(())
  }

  fn process_queue(&self) {
    loop {
      if self.load() > 0 {
        return;
      }
      let next = self.state.borrow_mut().queue.pop_front();
      let result = match next {
        None => return,
        Some(QueuedIp::BeginGroup(group)) => {
          self.state.borrow_mut().error_groups.push(group.clone());
          self.output.begin_group(&group, None)
        }
        Some(QueuedIp::EndGroup) => {
          self.state.borrow_mut().error_groups.pop();
          self.output.end_group(None)
        }
        Some(QueuedIp::Disconnect) => {
          self.state.borrow_mut().error_groups.clear();
          self.output.disconnect(None)
        }
        Some(QueuedIp::Data(data)) => {
          self.process_data(data);
          return;
        }
      };
      if let Err(err) = result {
        error!(component = %self.label(), error = %err, "failed to forward queued event");
      }
    }
  }
}

impl<H: AsyncHandler> Component for AsyncComponent<H> {
  fn core(&self) -> &ComponentCore {
    &self.core
  }

  fn shutdown(&self) {
    let mut state = self.state.borrow_mut();
    state.queue.clear();
    state.error_groups.clear();
  }
}
