//! Transaction engine: simultaneous edits at many spans inside one buffer.
//!
//! A [`TransactionBuffer`] mirrors a contiguous document range. It keeps the original
//! snapshot and an edit log; replaying the log over the snapshot must reproduce the live
//! buffer ([`TransactionBuffer::verify`]).
//!
//! [`Transaction`] applies each keystroke to every selected span in ascending order. Every
//! edit shifts the spans after it, so a running accumulator is added to each span's
//! `replace_offset` before it is edited.

use crate::error::JumpError;
use crate::span::CandidateSpan;
use jump_core_config::ReplaceAction;
use unicode_segmentation::UnicodeSegmentation;

/// One splice applied to the buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditRecord {
    /// Buffer offset of the splice.
    pub offset: usize,
    /// Text that was removed.
    pub removed: String,
    /// Text that was inserted.
    pub inserted: String,
}

/// Live text for a document range, plus its snapshot and edit log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionBuffer {
    origin: usize,
    original: String,
    buffer: String,
    log: Vec<EditRecord>,
    chars_inserted: usize,
    chars_removed: usize,
}

impl TransactionBuffer {
    /// Start a buffer for the document range that begins at `origin` and holds `original`.
    pub fn new(origin: usize, original: impl Into<String>) -> Self {
        let original = original.into();
        Self {
            origin,
            buffer: original.clone(),
            original,
            log: Vec::new(),
            chars_inserted: 0,
            chars_removed: 0,
        }
    }

    /// Document offset of the buffer's first byte.
    pub fn origin(&self) -> usize {
        self.origin
    }

    /// Snapshot taken when the transaction began.
    pub fn original(&self) -> &str {
        &self.original
    }

    /// Live text.
    pub fn text(&self) -> &str {
        &self.buffer
    }

    /// Edits applied so far.
    pub fn log(&self) -> &[EditRecord] {
        &self.log
    }

    /// Characters inserted so far.
    pub fn chars_inserted(&self) -> usize {
        self.chars_inserted
    }

    /// Characters removed so far.
    pub fn chars_removed(&self) -> usize {
        self.chars_removed
    }

    /// Whether any edit was applied.
    pub fn has_edits(&self) -> bool {
        !self.log.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn text_mut(&mut self) -> &mut String {
        &mut self.buffer
    }

    /// Replace `[start, end)` of the buffer with `text`.
    pub fn splice(&mut self, start: usize, end: usize, text: &str) -> Result<(), JumpError> {
        let invalid = JumpError::InvalidRange {
            start: self.origin + start,
            end: self.origin + end,
        };
        if start > end || end > self.buffer.len() {
            return Err(invalid);
        }
        if !self.buffer.is_char_boundary(start) || !self.buffer.is_char_boundary(end) {
            return Err(invalid);
        }
        if start == end && text.is_empty() {
            return Ok(());
        }

        let removed = self.buffer[start..end].to_string();
        self.buffer.replace_range(start..end, text);
        self.chars_removed += removed.chars().count();
        self.chars_inserted += text.chars().count();
        self.log.push(EditRecord {
            offset: start,
            removed,
            inserted: text.to_string(),
        });
        Ok(())
    }

    /// Replay the log over the snapshot.
    pub fn rederive(&self) -> Option<String> {
        let mut text = self.original.clone();
        for edit in &self.log {
            let end = edit.offset + edit.removed.len();
            if text.get(edit.offset..end)? != edit.removed {
                return None;
            }
            text.replace_range(edit.offset..end, &edit.inserted);
        }
        Some(text)
    }

    /// Check that the log reproduces the live buffer.
    pub fn verify(&self) -> Result<(), JumpError> {
        match self.rederive() {
            Some(text) if text == self.buffer => Ok(()),
            other => Err(JumpError::TransactionIntegrityViolation {
                expected: other.map_or(0, |t| t.len()),
                actual: self.buffer.len(),
            }),
        }
    }
}

/// Result of a Backspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackspaceOutcome {
    /// One character was removed from every span that had one.
    Applied,
    /// No span had anything left to remove.
    Exhausted,
}

/// An in-flight multi-point edit.
#[derive(Debug, Clone)]
pub struct Transaction {
    buffer: TransactionBuffer,
    action: ReplaceAction,
    saved_cursor: usize,
    cursor: usize,
    cleared: bool,
}

impl Transaction {
    /// Start editing `spans` (those with `matches_filter`) inside `buffer`.
    ///
    /// `saved_cursor` is restored on rollback and shifted by edits before it.
    pub fn begin(
        buffer: TransactionBuffer,
        spans: &mut [CandidateSpan],
        action: ReplaceAction,
        saved_cursor: usize,
    ) -> Self {
        for span in spans.iter_mut() {
            span.replace_offset = span.doc_start.saturating_sub(buffer.origin());
            span.replace_len = 0;
        }
        Self {
            buffer,
            action,
            saved_cursor,
            cursor: saved_cursor,
            cleared: false,
        }
    }

    /// The underlying buffer.
    pub fn buffer(&self) -> &TransactionBuffer {
        &self.buffer
    }

    /// Cursor position before the transaction began.
    pub fn saved_cursor(&self) -> usize {
        self.saved_cursor
    }

    /// Saved cursor shifted by the edits made so far.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Configured replace action.
    pub fn action(&self) -> ReplaceAction {
        self.action
    }

    /// Whether any edit was applied.
    pub fn has_edits(&self) -> bool {
        self.buffer.has_edits()
    }

    fn lead(&self, span: &CandidateSpan) -> usize {
        match self.action {
            ReplaceAction::InsertEnd => span.doc_len,
            ReplaceAction::Replace | ReplaceAction::InsertStart => 0,
        }
    }

    /// Splice the buffer and keep the cursor in step.
    pub(crate) fn splice(&mut self, start: usize, end: usize, text: &str) -> Result<(), JumpError> {
        self.buffer.splice(start, end, text)?;
        let at = self.buffer.origin() + start;
        if at < self.cursor {
            let removed = (end - start).min(self.cursor - at);
            self.cursor = self.cursor - removed + text.len();
        }
        Ok(())
    }

    /// `Replace` removes the span text on the first edit.
    fn ensure_cleared(&mut self, spans: &mut [CandidateSpan]) -> Result<(), JumpError> {
        if self.cleared || self.action != ReplaceAction::Replace {
            return Ok(());
        }
        let mut removed = 0;
        for span in spans.iter_mut().filter(|s| s.matches_filter) {
            span.replace_offset -= removed;
            let start = span.replace_offset;
            self.splice(start, start + span.doc_len, "")?;
            removed += span.doc_len;
        }
        self.cleared = true;
        Ok(())
    }

    /// Insert one character at every selected span.
    pub fn insert_char(&mut self, ch: char, spans: &mut [CandidateSpan]) -> Result<(), JumpError> {
        let mut utf8 = [0u8; 4];
        self.insert_str(ch.encode_utf8(&mut utf8), spans)
    }

    /// Insert `text` at every selected span.
    ///
    /// Before anything is typed this is a whole-span replacement (`Replace`) or a plain
    /// insertion before/after the span (`InsertStart`/`InsertEnd`).
    pub fn insert_str(&mut self, text: &str, spans: &mut [CandidateSpan]) -> Result<(), JumpError> {
        if text.is_empty() {
            return Ok(());
        }
        self.ensure_cleared(spans)?;
        let mut shift = 0;
        for span in spans.iter_mut().filter(|s| s.matches_filter) {
            span.replace_offset += shift;
            let at = span.replace_offset + self.lead(span) + span.replace_len;
            self.splice(at, at, text)?;
            span.replace_len += text.len();
            shift += text.len();
        }
        Ok(())
    }

    /// Remove the last typed character (grapheme) at every selected span.
    pub fn backspace(&mut self, spans: &mut [CandidateSpan]) -> Result<BackspaceOutcome, JumpError> {
        if spans
            .iter()
            .filter(|s| s.matches_filter)
            .all(|s| s.replace_len == 0)
        {
            return Ok(BackspaceOutcome::Exhausted);
        }

        let mut removed = 0;
        for span in spans.iter_mut().filter(|s| s.matches_filter) {
            span.replace_offset -= removed;
            if span.replace_len == 0 {
                continue;
            }
            let end = span.replace_offset + self.lead(span) + span.replace_len;
            let typed = self
                .buffer
                .text()
                .get(end - span.replace_len..end)
                .ok_or(JumpError::InvalidRange {
                    start: self.buffer.origin() + end - span.replace_len,
                    end: self.buffer.origin() + end,
                })?;
            let width = typed.graphemes(true).next_back().map_or(0, str::len);
            self.splice(end - width, end, "")?;
            span.replace_len -= width;
            removed += width;
        }
        Ok(BackspaceOutcome::Applied)
    }

    /// Text typed so far for `span`.
    pub fn inserted_text<'a>(&'a self, span: &CandidateSpan) -> &'a str {
        let start = span.replace_offset + self.lead(span);
        self.buffer
            .text()
            .get(start..start + span.replace_len)
            .unwrap_or_default()
    }

    /// Buffer range the span currently occupies (its text, unless cleared, plus typed text).
    pub fn edit_region(&self, span: &CandidateSpan) -> std::ops::Range<usize> {
        let kept = if self.cleared { 0 } else { span.doc_len };
        span.replace_offset..span.replace_offset + kept + span.replace_len
    }

    /// Check the edit log against the live buffer.
    pub fn verify(&self) -> Result<(), JumpError> {
        self.buffer.verify()
    }

    /// Give up the buffer.
    pub fn into_buffer(self) -> TransactionBuffer {
        self.buffer
    }

    #[cfg(test)]
    pub(crate) fn buffer_mut(&mut self) -> &mut TransactionBuffer {
        &mut self.buffer
    }
}
