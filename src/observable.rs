//! # Observable
//!
//! A small publish/subscribe building block owned by every runtime entity that
//! reports changes: graphs, sockets, ports, components and networks.
//!
//! Entities *own* an [`Emitter`] instead of inheriting event behaviour, and
//! expose typed `on`/`off` helpers on top of it.
//!
//! ## Re-entrancy
//!
//! Listeners are invoked on a snapshot of the listener list, with no internal
//! borrow held. A listener may therefore subscribe, unsubscribe or emit on the
//! same emitter while it runs. Listeners added during an emission are not
//! called for that emission.
//!
//! # Example
//!
//! ```rust
//! use flowweave::observable::Emitter;
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! let emitter: Emitter<u32> = Emitter::new();
//! let seen = Rc::new(Cell::new(0));
//! let seen_in_listener = Rc::clone(&seen);
//! emitter.on(move |value| seen_in_listener.set(seen_in_listener.get() + *value));
//!
//! emitter.emit(&2);
//! emitter.emit(&3);
//! assert_eq!(seen.get(), 5);
//! ```

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

/// Handle identifying one subscription on an [`Emitter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

type Callback<E> = Rc<dyn Fn(&E)>;

struct Listener<E> {
  id: ListenerId,
  once: bool,
  callback: Callback<E>,
}

/// Owned publish/subscribe channel for events of type `E`.
pub struct Emitter<E> {
  listeners: RefCell<Vec<Listener<E>>>,
  next_id: Cell<u64>,
}

impl<E> Default for Emitter<E> {
  fn default() -> Self {
    Self::new()
  }
}

impl<E> fmt::Debug for Emitter<E> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Emitter")
      .field("listeners", &self.listener_count())
      .finish()
  }
}

impl<E> Emitter<E> {
  /// Creates an emitter with no listeners.
  pub fn new() -> Self {
    Self {
      listeners: RefCell::new(Vec::new()),
      next_id: Cell::new(0),
    }
  }

  /// Subscribes `callback` to every future event.
  pub fn on(&self, callback: impl Fn(&E) + 'static) -> ListenerId {
    self.register(false, Rc::new(callback))
  }

  /// Subscribes `callback` to the next event only.
  pub fn once(&self, callback: impl Fn(&E) + 'static) -> ListenerId {
    self.register(true, Rc::new(callback))
  }

  /// Removes a subscription. Unknown ids are ignored.
  pub fn off(&self, id: ListenerId) {
    self.listeners.borrow_mut().retain(|l| l.id != id);
  }

  /// Removes every subscription.
  pub fn clear(&self) {
    self.listeners.borrow_mut().clear();
  }

  /// Number of live subscriptions.
  pub fn listener_count(&self) -> usize {
    self.listeners.borrow().len()
  }

  /// Delivers `event` to every listener in subscription order.
  pub fn emit(&self, event: &E) {
    let snapshot: Vec<Callback<E>> = {
      let mut listeners = self.listeners.borrow_mut();
      let snapshot = listeners.iter().map(|l| Rc::clone(&l.callback)).collect();
      listeners.retain(|l| !l.once);
      snapshot
    };
    for callback in snapshot {
      callback(event);
    }
  }

  fn register(&self, once: bool, callback: Callback<E>) -> ListenerId {
    let id = ListenerId(self.next_id.get());
    self.next_id.set(id.0 + 1);
    self.listeners.borrow_mut().push(Listener { id, once, callback });
    id
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_once_listener_fires_a_single_time() {
    let emitter: Emitter<()> = Emitter::new();
    let count = Rc::new(Cell::new(0));
    let c = Rc::clone(&count);
    emitter.once(move |_| c.set(c.get() + 1));
    emitter.emit(&());
    emitter.emit(&());
    assert_eq!(count.get(), 1);
    assert_eq!(emitter.listener_count(), 0);
  }

  #[test]
  fn test_listener_can_unsubscribe_itself_while_emitting() {
    let emitter: Rc<Emitter<()>> = Rc::new(Emitter::new());
    let count = Rc::new(Cell::new(0));
    let id_slot = Rc::new(Cell::new(None));
    let (e, c, slot) = (Rc::clone(&emitter), Rc::clone(&count), Rc::clone(&id_slot));
    let id = emitter.on(move |_| {
      c.set(c.get() + 1);
      if let Some(id) = slot.get() {
        e.off(id);
      }
    });
    id_slot.set(Some(id));
    emitter.emit(&());
    emitter.emit(&());
    assert_eq!(count.get(), 1);
  }

  #[test]
  fn test_off_with_unknown_id_is_ignored() {
    let emitter: Emitter<u8> = Emitter::new();
    let id = emitter.on(|_| {});
    emitter.off(ListenerId(99));
    assert_eq!(emitter.listener_count(), 1);
    emitter.off(id);
    assert_eq!(emitter.listener_count(), 0);
  }
}
