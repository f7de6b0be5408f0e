//! # Async Component Test Suite
//!
//! Ordering under varying task durations, error routing and load reporting.

use crate::component::{AsyncComponent, AsyncHandler, Component, ComponentError, QueuedIp};
use crate::components::RepeatAsync;
use crate::port::{InPort, InternalSocket, IpEvent, OutPort, Port, PortOptions, SocketRef};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;
use tokio::task::LocalSet;

/// Sleeps longer for earlier letters; fails on `"boom"`.
struct Staggered;

#[async_trait(?Send)]
impl AsyncHandler for Staggered {
  async fn do_async(&self, data: Value, output: &OutPort) -> Result<(), ComponentError> {
    let delay = match data.as_str() {
      Some("A") => 30,
      Some("B") => 10,
      Some("boom") => return Err(ComponentError::process("boom")),
      _ => 0,
    };
    tokio::time::sleep(Duration::from_millis(delay)).await;
    output.send(data, None)?;
    Ok(())
  }
}

struct Rig {
  input: SocketRef,
  _receivers: Vec<Rc<InPort>>,
  out: Rc<RefCell<Vec<IpEvent>>>,
  error: Rc<RefCell<Vec<IpEvent>>>,
  load: Rc<RefCell<Vec<IpEvent>>>,
}

fn sink(component: &dyn Component, port: &str) -> (Rc<InPort>, Rc<RefCell<Vec<IpEvent>>>) {
  let socket = InternalSocket::new();
  component.out_ports().get(port).unwrap().attach(socket.clone(), None);
  let receiver = InPort::new("sink", PortOptions::default());
  receiver.attach(socket, None);
  let events = Rc::new(RefCell::new(Vec::new()));
  let recorder = events.clone();
  receiver.on(move |event| recorder.borrow_mut().push(event.ip.clone()));
  (receiver, events)
}

fn rig(component: &dyn Component) -> Rig {
  let input = InternalSocket::new();
  component.in_ports().get("in").unwrap().attach(input.clone(), None);
  let (out_receiver, out) = sink(component, "out");
  let (error_receiver, error) = sink(component, "error");
  let (load_receiver, load) = sink(component, "load");
  Rig {
    input,
    _receivers: vec![out_receiver, error_receiver, load_receiver],
    out,
    error,
    load,
  }
}

fn data(events: &RefCell<Vec<IpEvent>>) -> Vec<Value> {
  events
    .borrow()
    .iter()
    .filter_map(|ip| match ip {
      IpEvent::Data(value) => Some(value.clone()),
      _ => None,
    })
    .collect()
}

async fn settle() {
  tokio::time::sleep(Duration::from_millis(80)).await;
}

#[tokio::test]
async fn test_output_order_follows_input_order() {
  LocalSet::new()
    .run_until(async {
      let component = AsyncComponent::new(Staggered, "staggered");
      let rig = rig(component.as_ref());

      rig.input.begin_group("batch");
      rig.input.send(json!("A"));
      rig.input.send(json!("B"));
      rig.input.send(json!("C"));
      rig.input.end_group();
      rig.input.disconnect();

      assert_eq!(component.load(), 1);
      assert_eq!(
        component.queued(),
        vec![
          QueuedIp::Data(json!("B")),
          QueuedIp::Data(json!("C")),
          QueuedIp::EndGroup,
          QueuedIp::Disconnect,
        ]
      );

      settle().await;
      assert_eq!(component.load(), 0);
      assert!(component.queued().is_empty());
      assert_eq!(
        *rig.out.borrow(),
        vec![
          IpEvent::BeginGroup("batch".into()),
          IpEvent::Connect,
          IpEvent::Data(json!("A")),
          IpEvent::Data(json!("B")),
          IpEvent::Data(json!("C")),
          IpEvent::EndGroup("batch".into()),
          IpEvent::Disconnect,
        ]
      );
    })
    .await;
}

#[tokio::test]
async fn test_failures_go_to_error_port_inside_open_groups() {
  LocalSet::new()
    .run_until(async {
      let component = AsyncComponent::new(Staggered, "staggered");
      let rig = rig(component.as_ref());

      rig.input.begin_group("request-1");
      rig.input.send(json!("boom"));
      rig.input.send(json!("C"));
      settle().await;

      assert_eq!(
        *rig.error.borrow(),
        vec![
          IpEvent::BeginGroup("request-1".into()),
          IpEvent::Connect,
          IpEvent::Data(json!("boom")),
          IpEvent::EndGroup("request-1".into()),
          IpEvent::Disconnect,
        ]
      );
      assert_eq!(data(&rig.out), vec![json!("C")]);
      assert_eq!(component.load(), 0);
    })
    .await;
}

#[tokio::test]
async fn test_load_port_reports_tasks_in_flight() {
  LocalSet::new()
    .run_until(async {
      let component = RepeatAsync::create(Some(Duration::from_millis(5)));
      let rig = rig(component.as_ref());

      rig.input.send(json!(1));
      rig.input.send(json!(2));
      settle().await;

      assert_eq!(data(&rig.out), vec![json!(1), json!(2)]);
      assert_eq!(data(&rig.load), vec![json!(1), json!(0), json!(1), json!(0)]);
      assert_eq!(rig.load.borrow().last(), Some(&IpEvent::Disconnect));
    })
    .await;
}

#[tokio::test]
async fn test_shutdown_drops_queued_events() {
  LocalSet::new()
    .run_until(async {
      let component = AsyncComponent::new(Staggered, "staggered");
      let rig = rig(component.as_ref());

      rig.input.send(json!("A"));
      rig.input.send(json!("B"));
      component.shutdown();
      assert!(component.queued().is_empty());

      settle().await;
      assert_eq!(data(&rig.out), vec![json!("A")]);
    })
    .await;
}
