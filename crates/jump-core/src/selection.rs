//! Multi-point selection set.
//!
//! Points (zero-length spans) and ranges collected during a multicursor session. The set is
//! kept sorted by `doc_start` and pairwise non-overlapping:
//!
//! - adding a span identical to a member removes that member (toggle-off);
//! - adding a span that overlaps members invalidates them and inserts the new one.

use crate::span::CandidateSpan;
use std::ops::Range;

/// What [`MultiPointSet::add`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// The span was inserted.
    Added,
    /// An identical member was removed.
    ToggledOff,
    /// The span was inserted after removing the overlapping members.
    Replaced {
        /// Number of members removed.
        invalidated: usize,
    },
}

/// Deduplicated, ordered, non-overlapping spans.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultiPointSet {
    spans: Vec<CandidateSpan>,
}

impl MultiPointSet {
    /// Empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `span`, honoring toggle-off and overlap invalidation.
    pub fn add(&mut self, span: CandidateSpan) -> AddOutcome {
        if let Some(idx) = self
            .spans
            .iter()
            .position(|s| s.doc_start == span.doc_start && s.doc_len == span.doc_len)
        {
            self.spans.remove(idx);
            return AddOutcome::ToggledOff;
        }

        let before = self.spans.len();
        self.spans.retain(|s| !s.overlaps(&span));
        let invalidated = before - self.spans.len();

        let at = self.spans.partition_point(|s| s.doc_start < span.doc_start);
        self.spans.insert(at, span);

        if invalidated == 0 {
            AddOutcome::Added
        } else {
            AddOutcome::Replaced { invalidated }
        }
    }

    /// Smallest member start.
    pub fn first_pos(&self) -> Option<usize> {
        self.spans.first().map(|s| s.doc_start)
    }

    /// Largest member end.
    pub fn last_pos(&self) -> Option<usize> {
        self.spans.iter().map(CandidateSpan::doc_end).max()
    }

    /// Document range covering every member.
    pub fn covering_range(&self) -> Option<Range<usize>> {
        Some(self.first_pos()?..self.last_pos()?)
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.spans.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Members in document order.
    pub fn iter(&self) -> impl Iterator<Item = &CandidateSpan> {
        self.spans.iter()
    }

    /// Drop every member.
    pub fn clear(&mut self) {
        self.spans.clear();
    }

    /// Take the members, leaving the set empty.
    pub fn take_spans(&mut self) -> Vec<CandidateSpan> {
        std::mem::take(&mut self.spans)
    }
}
