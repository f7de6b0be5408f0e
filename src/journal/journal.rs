//! # Journal
//!
//! Undo/redo history of a [`Graph`], built from the events it emits.
//!
//! ## Recording
//!
//! Against an empty store the journal first records a baseline transaction
//! (revision 0) adding every entity already in the graph. Afterwards each
//! graph transaction becomes one revision: commands are buffered between
//! `StartTransaction` and `EndTransaction` and flushed to the store together.
//! Recording a new revision after an undo discards the revisions that could
//! have been redone.
//!
//! ## Replay
//!
//! [`Journal::move_to_revision`] replays transactions forward with each
//! command, or backward with each command's inverse in reverse order. Events
//! the graph emits while replaying are not recorded.
//!
//! # Example
//!
//! ```rust
//! use flowweave::graph::Graph;
//! use flowweave::journal::{Journal, MemoryJournalStore};
//! use std::rc::Rc;
//!
//! let graph = Rc::new(Graph::new("edited"));
//! let journal = Journal::new(graph.clone(), None, MemoryJournalStore::new());
//! graph.add_node("A", "core/Repeat", None).unwrap();
//! assert_eq!(journal.current_revision(), 1);
//!
//! journal.undo().unwrap();
//! assert!(graph.nodes().is_empty());
//! journal.redo().unwrap();
//! assert_eq!(graph.nodes().len(), 1);
//! ```

use crate::graph::{Graph, GraphEvent, Metadata};
use crate::journal::command::JournalCommand;
use crate::journal::error::JournalError;
use crate::journal::store::{JournalEntry, JournalStore, MemoryJournalStore};
use crate::observable::ListenerId;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::path::Path;
use std::rc::{Rc, Weak};
use tracing::{debug, trace};

const BASELINE: &str = "initial";
const IMPLICIT: &str = "implicit";

/// Revision history of one graph.
pub struct Journal<S: JournalStore = MemoryJournalStore> {
  graph: Rc<Graph>,
  store: RefCell<S>,
  entries: RefCell<Vec<JournalEntry>>,
  current_revision: Cell<usize>,
  open: Cell<bool>,
  replaying: Cell<bool>,
  listener: Cell<Option<ListenerId>>,
}

impl<S: JournalStore> fmt::Debug for Journal<S> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Journal")
      .field("graph", &self.graph.name())
      .field("current_revision", &self.current_revision.get())
      .field("last_revision", &self.store.borrow().last_revision())
      .finish()
  }
}

impl<S: JournalStore + 'static> Journal<S> {
  /// Attaches a journal to `graph`.
  ///
  /// `metadata` is stored on the baseline transaction markers.
  pub fn new(graph: Rc<Graph>, metadata: Option<Metadata>, store: S) -> Rc<Self> {
    let journal = Rc::new(Self {
      graph,
      store: RefCell::new(store),
      entries: RefCell::new(Vec::new()),
      current_revision: Cell::new(0),
      open: Cell::new(false),
      replaying: Cell::new(false),
      listener: Cell::new(None),
    });

    if journal.store.borrow().count_transactions() == 0 {
      journal.record_baseline(metadata);
    } else {
      let last = journal.store.borrow().last_revision();
      journal.current_revision.set(last);
    }

    let weak: Weak<Self> = Rc::downgrade(&journal);
    let listener = journal.graph.subscribe(move |event| {
      if let Some(journal) = weak.upgrade() {
        journal.record(event);
      }
    });
    journal.listener.set(Some(listener));
    journal
  }

  fn record_baseline(&self, metadata: Option<Metadata>) {
    let graph = &self.graph;
    let mut commands = vec![GraphEvent::StartTransaction {
      id: BASELINE.to_string(),
      metadata: metadata.clone(),
    }];
    commands.extend(graph.nodes().into_iter().map(GraphEvent::AddNode));
    commands.extend(graph.edges().into_iter().map(GraphEvent::AddEdge));
    commands.extend(graph.initializers().into_iter().map(GraphEvent::AddInitial));
    commands.extend(graph.exports().into_iter().map(GraphEvent::AddExport));
    commands.extend(
      graph
        .inports()
        .into_iter()
        .map(|(name, port)| GraphEvent::AddInport { name, port }),
    );
    commands.extend(
      graph
        .outports()
        .into_iter()
        .map(|(name, port)| GraphEvent::AddOutport { name, port }),
    );
    commands.extend(graph.groups().into_iter().map(GraphEvent::AddGroup));
    commands.push(GraphEvent::EndTransaction {
      id: BASELINE.to_string(),
      metadata,
    });

    let entries = commands
      .into_iter()
      .map(|command| JournalEntry { command, rev: 0 })
      .collect::<Vec<_>>();
    debug!(graph = %graph.name(), entries = entries.len(), "journal baseline recorded");
    self.store.borrow_mut().put_transaction(0, entries);
    self.current_revision.set(0);
  }

  fn begin(&self) {
    let current = self.current_revision.get();
    if current < self.last_revision() {
      debug!(after = current, "discarding redo history");
      self.store.borrow_mut().truncate(current);
    }
    self.entries.borrow_mut().clear();
    self.current_revision.set(current + 1);
    self.open.set(true);
  }

  fn push(&self, command: JournalCommand) {
    self.entries.borrow_mut().push(JournalEntry {
      command,
      rev: self.current_revision.get(),
    });
  }

  fn flush(&self) {
    let entries = std::mem::take(&mut *self.entries.borrow_mut());
    let rev = self.current_revision.get();
    trace!(rev, entries = entries.len(), "journal transaction stored");
    self.store.borrow_mut().put_transaction(rev, entries);
    self.open.set(false);
  }

  fn record(&self, event: &GraphEvent) {
    if self.replaying.get() {
      return;
    }
    match event {
      GraphEvent::StartTransaction { .. } => {
        if self.open.get() {
          self.flush();
        }
        self.begin();
        self.push(event.clone());
      }
      GraphEvent::EndTransaction { .. } => {
        if !self.open.get() {
          debug!("ignoring transaction end without a recorded start");
          return;
        }
        self.push(event.clone());
        self.flush();
      }
      _ => {
        if !self.open.get() {
          self.begin();
          self.push(GraphEvent::StartTransaction {
            id: IMPLICIT.to_string(),
            metadata: None,
          });
        }
        self.push(event.clone());
      }
    }
  }

  /// The journaled graph.
  pub fn graph(&self) -> Rc<Graph> {
    Rc::clone(&self.graph)
  }

  /// Revision the graph currently reflects.
  pub fn current_revision(&self) -> usize {
    self.current_revision.get()
  }

  /// Highest stored revision.
  pub fn last_revision(&self) -> usize {
    self.store.borrow().last_revision()
  }

  /// Whether [`undo`](Self::undo) would change the graph.
  pub fn can_undo(&self) -> bool {
    self.current_revision.get() > 0
  }

  /// Whether [`redo`](Self::redo) would change the graph.
  pub fn can_redo(&self) -> bool {
    self.current_revision.get() < self.last_revision()
  }

  /// Steps back one revision. No-op at the baseline.
  pub fn undo(&self) -> Result<(), JournalError> {
    if !self.can_undo() {
      return Ok(());
    }
    self.move_to_revision(self.current_revision.get() - 1)
  }

  /// Steps forward one revision. No-op at the last revision.
  pub fn redo(&self) -> Result<(), JournalError> {
    if !self.can_redo() {
      return Ok(());
    }
    self.move_to_revision(self.current_revision.get() + 1)
  }

  /// Replays the graph to revision `rev`.
  ///
  /// # Errors
  ///
  /// [`JournalError::RevisionOutOfRange`] beyond the last revision,
  /// [`JournalError::MissingTransaction`] for gaps in the store and
  /// [`JournalError::Graph`] when the graph rejects a replayed command. On
  /// failure the journal stays at the last fully replayed revision.
  pub fn move_to_revision(&self, rev: usize) -> Result<(), JournalError> {
    let last = self.last_revision();
    if rev > last {
      return Err(JournalError::RevisionOutOfRange {
        requested: rev,
        last,
      });
    }
    if rev == self.current_revision.get() {
      return Ok(());
    }
    self.replaying.set(true);
    let result = self.replay_to(rev);
    self.replaying.set(false);
    debug!(
      target_rev = rev,
      current = self.current_revision.get(),
      "journal moved"
    );
    result
  }

  fn replay_to(&self, rev: usize) -> Result<(), JournalError> {
    let current = self.current_revision.get();
    if rev > current {
      for r in current + 1..=rev {
        for entry in self.fetch(r)? {
          entry.command.apply(&self.graph)?;
        }
        self.current_revision.set(r);
      }
    } else {
      for r in (rev + 1..=current).rev() {
        for entry in self.fetch(r)?.iter().rev() {
          entry.command.inverse().apply(&self.graph)?;
        }
        self.current_revision.set(r - 1);
      }
    }
    Ok(())
  }

  fn fetch(&self, rev: usize) -> Result<Vec<JournalEntry>, JournalError> {
    self
      .store
      .borrow()
      .fetch_transaction(rev)
      .ok_or(JournalError::MissingTransaction(rev))
  }

  fn lines(&self, start: usize, end: Option<usize>) -> Vec<String> {
    let end = end.unwrap_or_else(|| self.last_revision());
    let store = self.store.borrow();
    (start..=end)
      .filter_map(|rev| store.fetch_transaction(rev))
      .flatten()
      .map(|entry| entry.to_string())
      .collect()
  }

  /// Human readable log of revisions `start..=end` (default: through the last).
  pub fn to_pretty_string(&self, start: usize, end: Option<usize>) -> String {
    self.lines(start, end).join("\n")
  }

  /// The log of revisions `start..=end` as a list of command strings.
  pub fn to_json(&self, start: usize, end: Option<usize>) -> Vec<String> {
    self.lines(start, end)
  }

  /// Writes the whole log to `path` as pretty-printed JSON.
  pub fn save(&self, path: impl AsRef<Path>) -> Result<(), JournalError> {
    let json = serde_json::to_string_pretty(&self.to_json(0, None))?;
    std::fs::write(path.as_ref(), json)?;
    debug!(path = %path.as_ref().display(), "journal saved");
    Ok(())
  }
}

impl<S: JournalStore> Drop for Journal<S> {
  fn drop(&mut self) {
    if let Some(listener) = self.listener.take() {
      self.graph.unsubscribe(listener);
    }
  }
}
