//! # Undo/Redo Stack
//!
//! Tracks linear-mode history as full block snapshots.
//!
//! ## Design
//!
//! - Each discrete action records the state from before it was applied
//! - Undo hands back the previous state and moves the current one to redo
//! - Redo is the inverse
//! - New actions clear the redo stack
//! - Continuous input on one field is coalesced into a single entry, recorded
//!   when the field edit ends and only if something changed
//! - Depth is bounded; the oldest entry is evicted first
//!
//! ## Example
//!
//! ```rust,ignore
//! let mut stack = UndoStack::new();
//!
//! stack.record(blocks.clone(), "add hero");
//! blocks.push(hero);
//!
//! if let Some(previous) = stack.undo(blocks.clone()) {
//!     blocks = previous;
//! }
//! ```

use invitation_model::Block;
use std::collections::VecDeque;

/// One undo level: the blocks as they were before an action
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub blocks: Vec<Block>,

    /// Optional description of the action
    pub description: Option<String>,
}

impl HistoryEntry {
    pub fn new(blocks: Vec<Block>) -> Self {
        Self {
            blocks,
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Open field edit: the state from before its first keystroke
#[derive(Debug, Clone)]
struct Coalescing {
    key: String,
    before: HistoryEntry,
}

/// Undo/redo stack for linear documents
#[derive(Debug)]
pub struct UndoStack {
    /// Most recent last; front is evicted when full
    undo_stack: VecDeque<HistoryEntry>,

    /// Most recent last
    redo_stack: Vec<HistoryEntry>,

    /// Maximum number of undo levels (0 = unlimited)
    max_levels: usize,

    coalescing: Option<Coalescing>,
}

impl UndoStack {
    /// Create a new undo stack with the default depth (50)
    pub fn new() -> Self {
        Self::with_max_levels(50)
    }

    pub fn with_max_levels(max_levels: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
            max_levels,
            coalescing: None,
        }
    }

    /// Record the state from before an action
    pub fn record(&mut self, before: Vec<Block>, description: impl Into<String>) {
        self.push(HistoryEntry::new(before).with_description(description));
    }

    /// Start grouping edits under `key`. A second call with the same key keeps
    /// the original starting point.
    pub fn begin_coalesce(&mut self, key: impl Into<String>, before: Vec<Block>) {
        let key = key.into();
        if self.coalescing.as_ref().is_some_and(|c| c.key == key) {
            return;
        }
        self.coalescing = Some(Coalescing {
            before: HistoryEntry::new(before).with_description(format!("edit {}", key)),
            key,
        });
    }

    /// Close the open group, recording it if `current` differs from where it
    /// started. Returns whether an entry was recorded.
    pub fn end_coalesce(&mut self, current: &[Block]) -> bool {
        match self.coalescing.take() {
            Some(group) if group.before.blocks != current => {
                self.push(group.before);
                true
            }
            _ => false,
        }
    }

    pub fn coalescing_key(&self) -> Option<&str> {
        self.coalescing.as_ref().map(|c| c.key.as_str())
    }

    fn push(&mut self, entry: HistoryEntry) {
        self.undo_stack.push_back(entry);

        if self.max_levels > 0 && self.undo_stack.len() > self.max_levels {
            self.undo_stack.pop_front();
        }

        // New action invalidates the future
        self.redo_stack.clear();
    }

    /// Step back: returns the state to restore, `None` if there is nothing
    /// to undo
    pub fn undo(&mut self, current: Vec<Block>) -> Option<Vec<Block>> {
        let entry = self.undo_stack.pop_back()?;
        self.redo_stack.push(HistoryEntry {
            blocks: current,
            description: entry.description.clone(),
        });
        Some(entry.blocks)
    }

    /// Step forward: returns the state to restore, `None` if there is nothing
    /// to redo
    pub fn redo(&mut self, current: Vec<Block>) -> Option<Vec<Block>> {
        let entry = self.redo_stack.pop()?;
        self.undo_stack.push_back(HistoryEntry {
            blocks: current,
            description: entry.description.clone(),
        });
        Some(entry.blocks)
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

    /// Clear all undo/redo history, including an open field edit
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.coalescing = None;
    }

    pub fn undo_description(&self) -> Option<&str> {
        self.undo_stack
            .back()
            .and_then(|entry| entry.description.as_deref())
    }

    pub fn redo_description(&self) -> Option<&str> {
        self.redo_stack
            .last()
            .and_then(|entry| entry.description.as_deref())
    }
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::new()
    }
}
