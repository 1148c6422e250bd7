//! Bounded undo/redo history of frame snapshots.

use lumen_core::config::UNDO_STEPS_RANGE;
use lumen_core::Frame;
use std::collections::VecDeque;

/// Frame state of a store at one point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreSnapshot {
    pub(crate) frames: Vec<Frame>,
    pub(crate) current: usize,
    pub(crate) dirty: bool,
}

impl StoreSnapshot {
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn memory_size(&self) -> usize {
        self.frames.iter().map(Frame::memory_size).sum()
    }
}

/// A snapshot taken before an edit, with the edit's label.
#[derive(Debug, Clone)]
pub struct UndoEntry {
    pub description: String,
    pub snapshot: StoreSnapshot,
}

/// Fixed-capacity undo stack plus a redo stack.
#[derive(Debug)]
pub struct UndoStack {
    /// Oldest first.
    undo: VecDeque<UndoEntry>,
    /// Most recently undone last.
    redo: Vec<UndoEntry>,
    max_depth: usize,
}

impl UndoStack {
    /// Create a stack holding at most `max_depth` entries, clamped to the
    /// supported range.
    pub fn new(max_depth: usize) -> Self {
        Self {
            undo: VecDeque::new(),
            redo: Vec::new(),
            max_depth: max_depth.clamp(*UNDO_STEPS_RANGE.start(), *UNDO_STEPS_RANGE.end()),
        }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Record state before a new edit. Clears the redo history and drops
    /// the oldest entry when full.
    pub fn push(&mut self, snapshot: StoreSnapshot, description: impl Into<String>) {
        self.redo.clear();
        self.push_entry(UndoEntry {
            description: description.into(),
            snapshot,
        });
    }

    /// Take the most recent entry.
    pub fn pop(&mut self) -> Option<UndoEntry> {
        self.undo.pop_back()
    }

    /// Remember the state an undo replaced.
    pub fn push_redo(&mut self, entry: UndoEntry) {
        self.redo.push(entry);
    }

    /// Take the most recently undone entry.
    pub fn pop_redo(&mut self) -> Option<UndoEntry> {
        self.redo.pop()
    }

    /// Put back the state a redo replaced, keeping the redo history.
    pub fn push_undone(&mut self, entry: UndoEntry) {
        self.push_entry(entry);
    }

    fn push_entry(&mut self, entry: UndoEntry) {
        self.undo.push_back(entry);
        while self.undo.len() > self.max_depth {
            self.undo.pop_front();
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Label of the edit the next undo reverts.
    pub fn undo_description(&self) -> Option<&str> {
        self.undo.back().map(|e| e.description.as_str())
    }

    /// Label of the edit the next redo reapplies.
    pub fn redo_description(&self) -> Option<&str> {
        self.redo.last().map(|e| e.description.as_str())
    }

    pub fn len(&self) -> usize {
        self.undo.len()
    }

    pub fn is_empty(&self) -> bool {
        self.undo.is_empty()
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }

    /// Bytes held by every snapshot on both stacks.
    pub fn memory_size(&self) -> usize {
        self.undo
            .iter()
            .chain(self.redo.iter())
            .map(|e| e.snapshot.memory_size())
            .sum()
    }
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::new(8)
    }
}

// ── Tests ───────────────────────────────────────────────────────
