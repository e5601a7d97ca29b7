//! In-memory host editor.
//!
//! [`MemoryHost`] is a complete [`HostEditor`] backed by a [`ropey::Rope`]. It is what the
//! test-suite drives the engine with, and it is usable as-is by headless embedders that keep
//! their document in memory.
//!
//! Undo follows the usual editor model: writes made while an undo group is open are recorded
//! into that group; writes outside a group form a group of their own. Nested groups fold into
//! the outermost one, and an empty group is never recorded.

use crate::host::{HostEditor, HostError, MarkKind, SubscriptionHandle};
use ropey::Rope;
use std::ops::Range;
use tracing::debug;

/// An indicator placed by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mark {
    /// Indicator kind.
    pub kind: MarkKind,
    /// Start byte offset.
    pub start: usize,
    /// Length in bytes.
    pub len: usize,
}

#[derive(Debug, Clone)]
struct TextEdit {
    start: usize,
    deleted_text: String,
    inserted_text: String,
}

#[derive(Debug)]
struct UndoHistory {
    undo_stack: Vec<Vec<TextEdit>>,
    open_group: Option<Vec<TextEdit>>,
    depth: usize,
    max_undo: usize,
}

impl UndoHistory {
    fn new(max_undo: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            open_group: None,
            depth: 0,
            max_undo,
        }
    }

    fn begin_group(&mut self) {
        self.depth += 1;
        if self.depth == 1 {
            self.open_group = Some(Vec::new());
        }
    }

    fn end_group(&mut self) {
        if self.depth == 0 {
            return;
        }
        self.depth -= 1;
        if self.depth == 0
            && let Some(group) = self.open_group.take()
        {
            self.push_group(group);
        }
    }

    fn record(&mut self, edit: TextEdit) {
        match self.open_group.as_mut() {
            Some(group) => group.push(edit),
            None => self.push_group(vec![edit]),
        }
    }

    fn push_group(&mut self, group: Vec<TextEdit>) {
        if group.is_empty() {
            return;
        }
        if self.undo_stack.len() >= self.max_undo {
            self.undo_stack.remove(0);
        }
        self.undo_stack.push(group);
    }

    fn pop_group(&mut self) -> Option<Vec<TextEdit>> {
        self.undo_stack.pop()
    }
}

/// A rope-backed [`HostEditor`].
#[derive(Debug)]
pub struct MemoryHost {
    rope: Rope,
    cursor: usize,
    selection: Option<Range<usize>>,
    read_only: bool,
    history: UndoHistory,
    marks: Vec<Mark>,
    next_handle: u64,
    subscriptions: Vec<SubscriptionHandle>,
}

impl MemoryHost {
    /// Create a host holding `text`, caret at offset 0.
    pub fn new(text: &str) -> Self {
        Self {
            rope: Rope::from_str(text),
            cursor: 0,
            selection: None,
            read_only: false,
            history: UndoHistory::new(1000),
            marks: Vec::new(),
            next_handle: 1,
            subscriptions: Vec::new(),
        }
    }

    /// Full document text.
    pub fn text(&self) -> String {
        self.rope.to_string()
    }

    /// Indicators currently placed.
    pub fn marks(&self) -> &[Mark] {
        &self.marks
    }

    /// Indicators of one kind, in placement order.
    pub fn marks_of(&self, kind: MarkKind) -> Vec<Mark> {
        self.marks.iter().filter(|m| m.kind == kind).copied().collect()
    }

    /// Whether user edits are currently blocked.
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Number of recorded undo groups.
    pub fn undo_depth(&self) -> usize {
        self.history.undo_stack.len()
    }

    /// Whether an undo group is currently open.
    pub fn in_undo_group(&self) -> bool {
        self.history.depth > 0
    }

    /// Subscriptions that have not been released.
    pub fn active_subscriptions(&self) -> &[SubscriptionHandle] {
        &self.subscriptions
    }

    fn check_range(&self, start: usize, end: usize) -> Result<(), HostError> {
        let len = self.rope.len_bytes();
        if start > end || end > len {
            return Err(HostError::OutOfBounds { start, end, len });
        }
        for offset in [start, end] {
            let char_idx = self.rope.byte_to_char(offset);
            if self.rope.char_to_byte(char_idx) != offset {
                return Err(HostError::NotCharBoundary(offset));
            }
        }
        Ok(())
    }

    fn splice(&mut self, start: usize, end: usize, text: &str) -> String {
        let start_char = self.rope.byte_to_char(start);
        let end_char = self.rope.byte_to_char(end);
        let deleted = self.rope.slice(start_char..end_char).to_string();
        if end_char > start_char {
            self.rope.remove(start_char..end_char);
        }
        if !text.is_empty() {
            self.rope.insert(start_char, text);
        }
        deleted
    }

    fn shift_caret(&mut self, start: usize, end: usize, inserted: usize) {
        let shift = |pos: usize| {
            if pos >= end {
                pos - (end - start) + inserted
            } else if pos > start {
                start + inserted.min(pos - start)
            } else {
                pos
            }
        };
        self.cursor = shift(self.cursor);
        self.selection = None;
    }
}

impl HostEditor for MemoryHost {
    fn document_len(&self) -> usize {
        self.rope.len_bytes()
    }

    fn read_range(&self, start: usize, end: usize) -> Result<String, HostError> {
        self.check_range(start, end)?;
        let start_char = self.rope.byte_to_char(start);
        let end_char = self.rope.byte_to_char(end);
        Ok(self.rope.slice(start_char..end_char).to_string())
    }

    fn write_range(&mut self, start: usize, end: usize, text: &str) -> Result<(), HostError> {
        if self.read_only {
            return Err(HostError::ReadOnly);
        }
        self.check_range(start, end)?;
        let deleted_text = self.splice(start, end, text);
        self.shift_caret(start, end, text.len());
        self.history.record(TextEdit {
            start,
            deleted_text,
            inserted_text: text.to_string(),
        });
        Ok(())
    }

    fn get_cursor(&self) -> usize {
        self.cursor
    }

    fn set_cursor(&mut self, pos: usize) {
        self.cursor = pos.min(self.rope.len_bytes());
        self.selection = None;
    }

    fn get_selection(&self) -> Option<Range<usize>> {
        self.selection.clone()
    }

    fn set_selection(&mut self, anchor: usize, caret: usize) {
        let len = self.rope.len_bytes();
        let (anchor, caret) = (anchor.min(len), caret.min(len));
        self.cursor = caret;
        self.selection = if anchor == caret {
            None
        } else {
            Some(anchor.min(caret)..anchor.max(caret))
        };
    }

    fn line_of(&self, pos: usize) -> usize {
        self.rope.byte_to_line(pos.min(self.rope.len_bytes()))
    }

    fn pos_of_line(&self, line: usize) -> usize {
        if line >= self.rope.len_lines() {
            return self.rope.len_bytes();
        }
        self.rope.line_to_byte(line)
    }

    fn line_length(&self, line: usize) -> usize {
        if line >= self.rope.len_lines() {
            return 0;
        }
        let slice = self.rope.line(line);
        let mut len = slice.len_bytes();
        let mut chars = slice.chars_at(slice.len_chars());
        if let Some(last) = chars.prev()
            && matches!(
                last,
                '\n' | '\r' | '\u{0B}' | '\u{0C}' | '\u{85}' | '\u{2028}' | '\u{2029}'
            )
        {
            len -= last.len_utf8();
            if last == '\n' && chars.prev() == Some('\r') {
                len -= 1;
            }
        }
        len
    }

    fn line_count(&self) -> usize {
        self.rope.len_lines()
    }

    fn begin_undo_group(&mut self) {
        self.history.begin_group();
    }

    fn end_undo_group(&mut self) {
        self.history.end_group();
    }

    fn undo(&mut self) {
        if self.read_only {
            debug!(target: "memory_host", "undo ignored while read-only");
            return;
        }
        let Some(group) = self.history.pop_group() else {
            return;
        };
        for edit in group.iter().rev() {
            let end = edit.start + edit.inserted_text.len();
            self.splice(edit.start, end, &edit.deleted_text);
            self.shift_caret(edit.start, end, edit.deleted_text.len());
        }
    }

    fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    fn mark_range(&mut self, kind: MarkKind, start: usize, len: usize) {
        self.marks.push(Mark { kind, start, len });
    }

    fn clear_mark(&mut self, kind: MarkKind, start: usize, len: usize) {
        if let Some(idx) = self
            .marks
            .iter()
            .position(|m| m.kind == kind && m.start == start && m.len == len)
        {
            self.marks.remove(idx);
        }
    }

    fn subscribe_keys(&mut self) -> SubscriptionHandle {
        let handle = SubscriptionHandle(self.next_handle);
        self.next_handle += 1;
        self.subscriptions.push(handle);
        handle
    }

    fn subscribe_pointer(&mut self) -> SubscriptionHandle {
        self.subscribe_keys()
    }

    fn unsubscribe(&mut self, handle: SubscriptionHandle) {
        self.subscriptions.retain(|h| *h != handle);
    }
}
