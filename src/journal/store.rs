//! Transaction storage behind a [`Journal`](crate::journal::Journal).

use crate::journal::command::JournalCommand;
use std::collections::BTreeMap;
use std::fmt;

/// One recorded command and the revision it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct JournalEntry {
  /// The command.
  pub command: JournalCommand,
  /// Revision of the enclosing transaction.
  pub rev: usize,
}

impl fmt::Display for JournalEntry {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.command.describe(self.rev))
  }
}

/// Revision-keyed transaction storage.
///
/// Revisions start at 0 (the baseline) and grow by one per transaction.
pub trait JournalStore {
  /// Highest stored revision, 0 when empty.
  fn last_revision(&self) -> usize;

  /// Stores the entries of revision `rev`, replacing any previous ones.
  fn put_transaction(&mut self, rev: usize, entries: Vec<JournalEntry>);

  /// Entries of revision `rev`.
  fn fetch_transaction(&self, rev: usize) -> Option<Vec<JournalEntry>>;

  /// Number of stored transactions.
  fn count_transactions(&self) -> usize;

  /// Drops every revision after `rev`.
  fn truncate(&mut self, rev: usize);
}

/// In-memory [`JournalStore`].
#[derive(Debug, Clone, Default)]
pub struct MemoryJournalStore {
  transactions: BTreeMap<usize, Vec<JournalEntry>>,
}

impl MemoryJournalStore {
  /// Creates an empty store.
  pub fn new() -> Self {
    Self::default()
  }
}

impl JournalStore for MemoryJournalStore {
  fn last_revision(&self) -> usize {
    self.transactions.keys().next_back().copied().unwrap_or(0)
  }

  fn put_transaction(&mut self, rev: usize, entries: Vec<JournalEntry>) {
    self.transactions.insert(rev, entries);
  }

  fn fetch_transaction(&self, rev: usize) -> Option<Vec<JournalEntry>> {
    self.transactions.get(&rev).cloned()
  }

  fn count_transactions(&self) -> usize {
    self.transactions.len()
  }

  fn truncate(&mut self, rev: usize) {
    self.transactions.retain(|r, _| *r <= rev);
  }
}
