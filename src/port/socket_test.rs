use crate::port::{InternalSocket, IpEvent, SocketEndpoint};
use serde_json::json;
use std::cell::RefCell;
use std::rc::Rc;

fn recorded(socket: &InternalSocket) -> Rc<RefCell<Vec<IpEvent>>> {
  let events = Rc::new(RefCell::new(Vec::new()));
  let sink = events.clone();
  socket.on(move |ip| sink.borrow_mut().push(ip.clone()));
  events
}

#[test]
fn test_send_connects_first() {
  let socket = InternalSocket::new();
  let events = recorded(&socket);
  socket.send(json!(1));
  socket.send(json!(2));
  assert_eq!(
    *events.borrow(),
    vec![IpEvent::Connect, IpEvent::Data(json!(1)), IpEvent::Data(json!(2))]
  );
  assert!(socket.is_connected());
}

#[test]
fn test_connect_is_idempotent() {
  let socket = InternalSocket::new();
  let events = recorded(&socket);
  socket.connect();
  socket.connect();
  assert_eq!(*events.borrow(), vec![IpEvent::Connect]);
}

#[test]
fn test_disconnect_always_emits() {
  let socket = InternalSocket::new();
  let events = recorded(&socket);
  socket.disconnect();
  socket.disconnect();
  assert_eq!(*events.borrow(), vec![IpEvent::Disconnect, IpEvent::Disconnect]);
  assert!(!socket.is_connected());
}

#[test]
fn test_groups_nest_and_end_group_pops_label() {
  let socket = InternalSocket::new();
  let events = recorded(&socket);
  socket.begin_group("a");
  socket.begin_group("b");
  assert_eq!(socket.groups(), vec!["a".to_string(), "b".to_string()]);
  socket.end_group();
  socket.end_group();
  socket.end_group();
  assert_eq!(
    *events.borrow(),
    vec![
      IpEvent::BeginGroup("a".into()),
      IpEvent::BeginGroup("b".into()),
      IpEvent::EndGroup("b".into()),
      IpEvent::EndGroup("a".into()),
    ]
  );
}

#[test]
fn test_off_stops_delivery() {
  let socket = InternalSocket::new();
  let count = Rc::new(RefCell::new(0));
  let sink = count.clone();
  let id = socket.on(move |_| *sink.borrow_mut() += 1);
  socket.connect();
  socket.off(id);
  socket.disconnect();
  assert_eq!(*count.borrow(), 1);
}

#[test]
fn test_id_formats() {
  let socket = InternalSocket::new();
  assert_eq!(socket.id(), "UNDEFINED");
  socket.set_to(SocketEndpoint::new("B", "in", None));
  assert_eq!(socket.id(), "DATA -> IN B");
  socket.set_from(SocketEndpoint::new("A", "out", None));
  assert_eq!(socket.id(), "A OUT -> IN B");
}
