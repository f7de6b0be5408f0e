//! # Repeat Component
//!
//! Forwards every event from `in` to `out` unchanged, brackets included.

use crate::component::{Component, ComponentCore};
use crate::port::{IpEvent, PortOptions};
use std::rc::Rc;

/// Synchronous pass-through component.
pub struct Repeat {
  core: ComponentCore,
}

impl Repeat {
  /// Creates an instance with ports `in` and `out`.
  pub fn new() -> Rc<Self> {
    let core = ComponentCore::new()
      .with_description("Forwards packets and brackets unchanged")
      .with_icon("forward");
    let input = core.in_ports().add(
      "in",
      PortOptions::default().with_description("Packet to forward"),
    );
    let output = core.out_ports().add(
      "out",
      PortOptions::default().with_description("Forwarded packet"),
    );
    input.on_process(move |event| {
      match &event.ip {
        IpEvent::Connect => output.connect(None)?,
        IpEvent::BeginGroup(group) => output.begin_group(group, None)?,
        IpEvent::Data(data) => output.send(data.clone(), None)?,
        IpEvent::EndGroup(_) => output.end_group(None)?,
        IpEvent::Disconnect => output.disconnect(None)?,
      }
      Ok(())
    });
    Rc::new(Self { core })
  }
}

impl Component for Repeat {
  fn core(&self) -> &ComponentCore {
    &self.core
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::port::{InPort, InternalSocket, Port};
  use serde_json::json;
  use std::cell::RefCell;

  #[test]
  fn test_repeat_forwards_brackets_and_data() {
    let repeat = Repeat::new();
    let (upstream, downstream) = (InternalSocket::new(), InternalSocket::new());
    repeat.in_ports().get("in").unwrap().attach(upstream.clone(), None);
    repeat.out_ports().get("out").unwrap().attach(downstream.clone(), None);

    let sink = InPort::new("sink", PortOptions::default());
    sink.attach(downstream, None);
    let seen = Rc::new(RefCell::new(Vec::new()));
    let recorder = seen.clone();
    sink.on(move |event| recorder.borrow_mut().push(event.ip.clone()));

    upstream.begin_group("g");
    upstream.send(json!(1));
    upstream.end_group();
    upstream.disconnect();

    assert_eq!(
      *seen.borrow(),
      vec![
        IpEvent::BeginGroup("g".into()),
        IpEvent::Connect,
        IpEvent::Data(json!(1)),
        IpEvent::EndGroup("g".into()),
        IpEvent::Disconnect,
      ]
    );
  }
}
