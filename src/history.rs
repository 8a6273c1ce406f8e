//! Undo/redo history
//!
//! A linear stack of opaque tree snapshots with a cursor. The entry under the
//! cursor always describes the current tree; pushing discards everything
//! after the cursor.

use tracing::trace;

use crate::elements::{Elements, Owner};
use crate::errors::EditError;

/// Serialized shape of a top-level element sequence.
///
/// Self-describing JSON; restoring it rebuilds every nested container in
/// order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot(String);

impl Snapshot {
    pub fn capture(elements: &Elements) -> Result<Self, EditError> {
        Ok(Self(serde_json::to_string(elements)?))
    }

    /// Wrap externally produced snapshot text. Validated on restore.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Build a fresh tree owned by `owner`
    pub fn restore(&self, owner: Owner) -> Result<Elements, EditError> {
        let mut elements: Elements = serde_json::from_str(&self.0)?;
        if let Some(id) = elements.duplicate_id() {
            return Err(EditError::Deserialization(format!(
                "snapshot contains element id {} more than once",
                id
            )));
        }
        if let Some(bad) = elements.walk().find(|e| !e.is_statement()) {
            return Err(EditError::Deserialization(format!(
                "snapshot contains a '{}' element, which is not a statement",
                bad.kind.name()
            )));
        }
        elements.relink(owner);
        Ok(elements)
    }
}

/// Bounded linear history
#[derive(Debug, Clone)]
pub struct History {
    entries: Vec<Snapshot>,
    cursor: usize,
    max_entries: usize,
}

impl History {
    /// Empty history keeping at most `max_entries` snapshots (minimum 1)
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Vec::new(),
            cursor: 0,
            max_entries: max_entries.max(1),
        }
    }

    /// Drop all entries and start over from `baseline`
    pub fn reset(&mut self, baseline: Snapshot) {
        self.entries.clear();
        self.entries.push(baseline);
        self.cursor = 0;
    }

    /// Record a new current state, discarding any redo entries
    pub fn push(&mut self, snapshot: Snapshot) {
        if !self.entries.is_empty() {
            self.entries.truncate(self.cursor + 1);
        }
        self.entries.push(snapshot);
        if self.entries.len() > self.max_entries {
            let excess = self.entries.len() - self.max_entries;
            self.entries.drain(..excess);
        }
        self.cursor = self.entries.len() - 1;
        trace!(entries = self.entries.len(), "snapshot pushed");
    }

    /// Step back and return the snapshot now under the cursor
    pub fn undo(&mut self) -> Option<Snapshot> {
        if !self.can_undo() {
            return None;
        }
        self.cursor -= 1;
        Some(self.entries[self.cursor].clone())
    }

    /// Step forward and return the snapshot now under the cursor
    pub fn redo(&mut self) -> Option<Snapshot> {
        if !self.can_redo() {
            return None;
        }
        self.cursor += 1;
        Some(self.entries[self.cursor].clone())
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.entries.len()
    }

    /// Change the capacity, dropping the oldest entries (then redo entries)
    /// that no longer fit
    pub fn set_max_entries(&mut self, max_entries: usize) {
        self.max_entries = max_entries.max(1);
        while self.entries.len() > self.max_entries {
            if self.cursor > 0 {
                self.entries.remove(0);
                self.cursor -= 1;
            } else {
                self.entries.pop();
            }
        }
    }

    pub(crate) fn cursor(&self) -> usize {
        self.cursor
    }

    /// Move the cursor back to a position previously read with `cursor`
    pub(crate) fn set_cursor(&mut self, cursor: usize) {
        self.cursor = cursor.min(self.entries.len().saturating_sub(1));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
