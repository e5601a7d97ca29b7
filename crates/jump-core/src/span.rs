//! Candidate spans: the unit every component works on.

use std::ops::Range;

/// What kind of unit the Match Index enumerates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Granularity {
    /// Runs of word characters (alphanumeric or `_`).
    Word,
    /// Every occurrence of one character (compared with the session's case rule).
    Char(char),
    /// Non-empty lines.
    Line,
    /// Non-overlapping occurrences of a query string.
    Substring(String),
}

/// One matchable unit of text.
///
/// `doc_start`/`doc_len` are fixed for the lifetime of a session; the other positions are
/// views of the same unit in derived buffers (overlay, transaction).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateSpan {
    /// Span text.
    pub text: String,
    /// Start byte offset in the document.
    pub doc_start: usize,
    /// Length in bytes.
    pub doc_len: usize,
    /// Start byte offset in the overlay buffer.
    pub overlay_start: usize,
    /// Shortcut label; empty when the span carries none.
    pub tag: String,
    /// The span shares its tag row with a preceding tag and renders no tag of its own.
    pub is_masked_neighbor: bool,
    /// Result of the last filter pass.
    pub matches_filter: bool,
    /// The currently highlighted match.
    pub is_active_match: bool,
    /// Start of the span inside the transaction buffer.
    pub replace_offset: usize,
    /// Bytes of replacement text typed so far for this span.
    pub replace_len: usize,
}

impl CandidateSpan {
    /// Create a span for `text` starting at document offset `doc_start`.
    pub fn new(text: impl Into<String>, doc_start: usize) -> Self {
        let text = text.into();
        Self {
            doc_len: text.len(),
            overlay_start: doc_start,
            text,
            doc_start,
            ..Self::default()
        }
    }

    /// Exclusive end offset in the document.
    pub fn doc_end(&self) -> usize {
        self.doc_start + self.doc_len
    }

    /// Document range covered by the span.
    pub fn range(&self) -> Range<usize> {
        self.doc_start..self.doc_end()
    }

    /// Whether the span carries a tag that is actually drawn.
    pub fn has_visible_tag(&self) -> bool {
        !self.tag.is_empty() && !self.is_masked_neighbor
    }

    /// Whether two spans share any position.
    ///
    /// A zero-length span (a caret point) overlaps a range that starts at or contains it,
    /// and another point at the same offset.
    pub fn overlaps(&self, other: &CandidateSpan) -> bool {
        match (self.doc_len, other.doc_len) {
            (0, 0) => self.doc_start == other.doc_start,
            (0, _) => other.doc_start <= self.doc_start && self.doc_start < other.doc_end(),
            (_, 0) => self.doc_start <= other.doc_start && other.doc_start < self.doc_end(),
            _ => self.doc_start < other.doc_end() && other.doc_start < self.doc_end(),
        }
    }
}
