//! Host editor contract.
//!
//! The engine never owns the document. Everything it reads or writes goes through a
//! [`HostEditor`], which a plugin shim implements on top of the real editor widget (or
//! [`MemoryHost`](crate::MemoryHost) in headless use and tests).
//!
//! All positions are **byte offsets** into the UTF-8 document. Lines are zero based.
//!
//! Event routing is inverted compared to a callback API: `subscribe_keys` / `subscribe_pointer`
//! ask the host to start forwarding events to the engine (through
//! [`Dispatcher::on_key`](crate::Dispatcher::on_key) and
//! [`Dispatcher::on_pointer`](crate::Dispatcher::on_pointer)) and return a handle that is given
//! back on teardown.

use std::ops::Range;
use thiserror::Error;

/// Visual indicator kinds the engine places on the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkKind {
    /// A rendered shortcut tag.
    Tag,
    /// A filtered match or an edited region.
    Highlight,
    /// The active match.
    TextColor,
    /// A member of the multi-point selection set.
    MulticursorGhost,
}

/// Opaque handle for a key or pointer event subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(pub u64);

/// Host level notifications that force a live session to end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// The document is about to be written to disk.
    BeforeSave,
    /// The document was closed.
    DocumentClosed,
    /// The document was reloaded from disk.
    DocumentReloaded,
    /// The application is shutting down.
    AppQuitting,
}

/// Errors reported by a host.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    /// The document (or the range) is read-only.
    #[error("document is read-only")]
    ReadOnly,
    /// The range does not fit inside the document.
    #[error("range {start}..{end} is outside the document (length {len})")]
    OutOfBounds {
        /// Requested start byte offset.
        start: usize,
        /// Requested end byte offset.
        end: usize,
        /// Current document length in bytes.
        len: usize,
    },
    /// The offset splits a UTF-8 sequence.
    #[error("offset {0} is not on a character boundary")]
    NotCharBoundary(usize),
}

/// Capabilities the engine consumes from the editor it runs in.
pub trait HostEditor {
    /// Document length in bytes.
    fn document_len(&self) -> usize;

    /// Read `[start, end)`.
    fn read_range(&self, start: usize, end: usize) -> Result<String, HostError>;

    /// Replace `[start, end)` with `text` as one step.
    fn write_range(&mut self, start: usize, end: usize, text: &str) -> Result<(), HostError>;

    /// Delete `len` bytes at `start`.
    fn delete_range(&mut self, start: usize, len: usize) -> Result<(), HostError> {
        self.write_range(start, start.saturating_add(len), "")
    }

    /// Insert `text` at `pos`.
    fn insert_text(&mut self, pos: usize, text: &str) -> Result<(), HostError> {
        self.write_range(pos, pos, text)
    }

    /// Caret position.
    fn get_cursor(&self) -> usize;

    /// Move the caret, collapsing any selection.
    fn set_cursor(&mut self, pos: usize);

    /// Current selection, if any (`start <= end`).
    fn get_selection(&self) -> Option<Range<usize>>;

    /// Select from `anchor` to `caret`; the caret ends at `caret`.
    fn set_selection(&mut self, anchor: usize, caret: usize);

    /// Line containing `pos`.
    fn line_of(&self, pos: usize) -> usize;

    /// Byte offset of the first character of `line`.
    fn pos_of_line(&self, line: usize) -> usize;

    /// Length of `line` in bytes, excluding its line ending.
    fn line_length(&self, line: usize) -> usize;

    /// Number of lines in the document.
    fn line_count(&self) -> usize;

    /// Open an undo group; nested groups fold into the outermost one.
    fn begin_undo_group(&mut self);

    /// Close the innermost undo group.
    fn end_undo_group(&mut self);

    /// Undo the most recent undo group.
    fn undo(&mut self);

    /// Toggle user-edit protection for the document.
    fn set_read_only(&mut self, read_only: bool);

    /// Place an indicator of `kind` over `[start, start + len)`.
    fn mark_range(&mut self, kind: MarkKind, start: usize, len: usize);

    /// Remove an indicator previously placed with [`HostEditor::mark_range`].
    fn clear_mark(&mut self, kind: MarkKind, start: usize, len: usize);

    /// Start forwarding key presses to the engine.
    fn subscribe_keys(&mut self) -> SubscriptionHandle;

    /// Start forwarding pointer events to the engine.
    fn subscribe_pointer(&mut self) -> SubscriptionHandle;

    /// Stop forwarding the events behind `handle`.
    fn unsubscribe(&mut self, handle: SubscriptionHandle);
}
