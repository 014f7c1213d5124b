//! # History Manager
//!
//! Snapshot-based undo/redo. Every committed mutation pushes the *previous*
//! tree onto the undo stack; undo swaps the current tree against the most
//! recent snapshot, redo is the symmetric inverse. Any new commit clears the
//! redo stack — linear history, not branching.
//!
//! The stacks own whole `Tree` values. Trees are immutable snapshots, so a
//! restored entry is exactly the document as it was, no inverse-operation
//! bookkeeping required.

use crate::node::Tree;
use chrono::{DateTime, Utc};

/// One recorded document state.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub tree: Tree,
    pub timestamp: DateTime<Utc>,

    /// Human-readable name of the command that produced the *next* state,
    /// e.g. `"moveNode"`. Surfaced for "Undo move" style UI.
    pub label: String,
}

/// Undo/redo stacks for one document.
#[derive(Debug)]
pub struct History {
    undo_stack: Vec<HistoryEntry>,
    redo_stack: Vec<HistoryEntry>,

    /// Maximum number of undo levels (0 = unlimited).
    max_levels: usize,
}

impl History {
    /// Default maximum of 100 undo levels.
    pub fn new() -> Self {
        Self::with_max_levels(100)
    }

    pub fn with_max_levels(max_levels: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_levels,
        }
    }

    /// Record the state a committed mutation replaced. Clears redo.
    pub fn commit(&mut self, previous: Tree, label: impl Into<String>) {
        self.undo_stack.push(HistoryEntry {
            tree: previous,
            timestamp: Utc::now(),
            label: label.into(),
        });

        if self.max_levels > 0 && self.undo_stack.len() > self.max_levels {
            self.undo_stack.remove(0);
        }

        self.redo_stack.clear();
    }

    /// Restore the most recent snapshot, parking `current` on the redo
    /// stack. `None` when there is nothing to undo.
    pub fn undo(&mut self, current: Tree) -> Option<Tree> {
        let entry = self.undo_stack.pop()?;
        self.redo_stack.push(HistoryEntry {
            tree: current,
            timestamp: Utc::now(),
            label: entry.label.clone(),
        });
        Some(entry.tree)
    }

    /// Inverse of [`History::undo`].
    pub fn redo(&mut self, current: Tree) -> Option<Tree> {
        let entry = self.redo_stack.pop()?;
        self.undo_stack.push(HistoryEntry {
            tree: current,
            timestamp: Utc::now(),
            label: entry.label.clone(),
        });
        Some(entry.tree)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_levels(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_levels(&self) -> usize {
        self.redo_stack.len()
    }

    /// Label of the command the next undo would revert.
    pub fn undo_label(&self) -> Option<&str> {
        self.undo_stack.last().map(|entry| entry.label.as_str())
    }

    /// Drop all recorded history (document load boundary).
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    /// Read-only view of the undo stack, oldest first. Test hook.
    pub fn undo_entries(&self) -> &[HistoryEntry] {
        &self.undo_stack
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}
