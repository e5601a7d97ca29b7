//! The live session and its teardown.
//!
//! A [`Session`] owns everything a mode acquires from the host: the key and pointer
//! subscriptions, the marks it placed, the read-only hold taken while an overlay is shown,
//! and the undo group wrapping its writes. [`Session::close`] consumes the session and
//! releases all of it on every path (commit, cancel, forced flush, integrity failure).

use crate::error::JumpError;
use crate::filter::FilterState;
use crate::host::{HostEditor, MarkKind, SubscriptionHandle};
use crate::overlay::OverlayBuffer;
use crate::selection::MultiPointSet;
use crate::span::CandidateSpan;
use crate::transaction::Transaction;
use std::ops::Range;
use tracing::{info, warn};

/// What an incremental search looks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchKind {
    /// Words filtered by the query.
    Word,
    /// Occurrences of the query.
    Substring,
}

/// What a replace session edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplaceKind {
    /// Words filtered by the query.
    Word,
    /// Occurrences of the query.
    Substring,
    /// Occurrences of one picked character.
    Char,
    /// Occurrences of the host's current selection.
    Multi,
}

/// Engine mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// No session.
    Idle,
    /// Shortcut tags on words.
    TaggingWord,
    /// Shortcut tags on one character (picked first).
    TaggingChar,
    /// Shortcut tags on lines.
    TaggingLine,
    /// Incremental search.
    Searching(SearchKind),
    /// Selecting, then editing, many matches at once.
    Replacing(ReplaceKind),
    /// Collecting multicursor points and ranges.
    MulticursorAccepting,
    /// Typing at every multicursor member.
    MulticursorReplacing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Outcome {
    Commit,
    Cancel,
}

#[derive(Debug, Default)]
pub(crate) struct Closed {
    /// Text typed at the first edited span, when a transaction was committed.
    pub replacement: Option<String>,
}

#[derive(Debug)]
pub(crate) struct Session {
    pub mode: Mode,
    pub range: Range<usize>,
    pub spans: Vec<CandidateSpan>,
    pub overlay: Option<OverlayBuffer>,
    pub transaction: Option<Transaction>,
    pub filter: Option<FilterState>,
    pub tag_query: String,
    pub cursor_restore: usize,
    pub multipoint: MultiPointSet,
    pub awaiting_char: bool,
    pub resume_multicursor: bool,
    marks: Vec<(MarkKind, usize, usize)>,
    subscriptions: Vec<SubscriptionHandle>,
    read_only_held: bool,
    group_open: bool,
    recorded: bool,
}

impl Session {
    pub fn open<H: HostEditor + ?Sized>(host: &mut H, mode: Mode, range: Range<usize>) -> Self {
        let subscriptions = vec![host.subscribe_keys(), host.subscribe_pointer()];
        info!(target: "session", mode = ?mode, start = range.start, end = range.end, "session_opened");
        Self {
            mode,
            range,
            spans: Vec::new(),
            overlay: None,
            transaction: None,
            filter: None,
            tag_query: String::new(),
            cursor_restore: host.get_cursor(),
            multipoint: MultiPointSet::new(),
            awaiting_char: false,
            resume_multicursor: false,
            marks: Vec::new(),
            subscriptions,
            read_only_held: false,
            group_open: false,
            recorded: false,
        }
    }

    /// Whether a transaction exists (the editing phase of replace modes).
    pub fn is_editing(&self) -> bool {
        self.transaction.is_some()
    }

    fn begin_group<H: HostEditor + ?Sized>(&mut self, host: &mut H) {
        if !self.group_open {
            host.begin_undo_group();
            self.group_open = true;
            self.recorded = false;
        }
    }

    fn end_group<H: HostEditor + ?Sized>(&mut self, host: &mut H) {
        if self.group_open {
            host.end_undo_group();
            self.group_open = false;
        }
    }

    /// Replace every mark placed so far with `marks`.
    pub fn set_marks<H: HostEditor + ?Sized>(
        &mut self,
        host: &mut H,
        marks: Vec<(MarkKind, usize, usize)>,
    ) {
        self.clear_marks(host);
        for &(kind, start, len) in &marks {
            host.mark_range(kind, start, len);
        }
        self.marks = marks;
    }

    fn clear_marks<H: HostEditor + ?Sized>(&mut self, host: &mut H) {
        for (kind, start, len) in self.marks.drain(..) {
            host.clear_mark(kind, start, len);
        }
    }

    /// Highlight filtered matches, color the active one.
    pub fn mark_filter<H: HostEditor + ?Sized>(&mut self, host: &mut H) {
        let mut marks = Vec::new();
        for span in self.spans.iter().filter(|s| s.matches_filter) {
            marks.push((MarkKind::Highlight, span.doc_start, span.doc_len));
            if span.is_active_match {
                marks.push((MarkKind::TextColor, span.doc_start, span.doc_len));
            }
        }
        self.set_marks(host, marks);
    }

    /// Mark the visible tags of the overlay.
    pub fn mark_tags<H: HostEditor + ?Sized>(&mut self, host: &mut H) {
        let marks = self
            .overlay
            .as_ref()
            .map(|overlay| {
                overlay
                    .placements()
                    .iter()
                    .map(|p| (MarkKind::Tag, p.overlay_pos, p.len))
                    .collect()
            })
            .unwrap_or_default();
        self.set_marks(host, marks);
    }

    /// Highlight the edited region of every transaction target.
    pub fn mark_edits<H: HostEditor + ?Sized>(&mut self, host: &mut H) {
        let marks = match &self.transaction {
            Some(tx) => {
                let origin = tx.buffer().origin();
                self.spans
                    .iter()
                    .filter(|s| s.matches_filter)
                    .map(|s| {
                        let region = tx.edit_region(s);
                        (MarkKind::Highlight, origin + region.start, region.len())
                    })
                    .collect()
            }
            None => Vec::new(),
        };
        self.set_marks(host, marks);
    }

    /// Ghost-mark every multicursor member.
    pub fn mark_members<H: HostEditor + ?Sized>(&mut self, host: &mut H) {
        let marks = self
            .multipoint
            .iter()
            .map(|s| (MarkKind::MulticursorGhost, s.doc_start, s.doc_len))
            .collect();
        self.set_marks(host, marks);
    }

    /// Swap the document range for `overlay` and lock it against user edits.
    pub fn show_overlay<H: HostEditor + ?Sized>(
        &mut self,
        host: &mut H,
        overlay: OverlayBuffer,
    ) -> Result<(), JumpError> {
        let range = overlay.original_range();
        self.begin_group(host);
        if let Err(err) = host.write_range(range.start, range.end, overlay.text()) {
            self.end_group(host);
            warn!(target: "overlay", error = %err, "overlay_rejected");
            return Err(err.into());
        }
        self.recorded = true;
        host.set_read_only(true);
        self.read_only_held = true;
        self.overlay = Some(overlay);
        self.tag_query.clear();
        self.mark_tags(host);
        Ok(())
    }

    /// Put the original text back and drop the overlay.
    pub fn take_down_overlay<H: HostEditor + ?Sized>(
        &mut self,
        host: &mut H,
    ) -> Result<(), JumpError> {
        let Some(overlay) = self.overlay.take() else {
            return Ok(());
        };
        self.clear_marks(host);
        self.tag_query.clear();
        if self.read_only_held {
            host.set_read_only(false);
            self.read_only_held = false;
        }
        self.end_group(host);
        if self.recorded {
            host.undo();
            self.recorded = false;
        }

        let range = overlay.original_range();
        if host.read_range(range.start, range.end).ok().as_deref() == Some(overlay.original()) {
            return Ok(());
        }
        warn!(target: "overlay", start = range.start, "overlay_restore_fallback");
        let shown = overlay.overlay_range();
        host.write_range(shown.start, shown.end, overlay.original())?;
        Ok(())
    }

    /// Enter the editing phase with `tx`.
    ///
    /// The original range is written back onto itself so the undo group is never empty and
    /// rollback always has exactly this session's group to undo.
    pub fn begin_edit<H: HostEditor + ?Sized>(&mut self, host: &mut H, tx: Transaction) {
        self.begin_group(host);
        let origin = tx.buffer().origin();
        let end = origin + tx.buffer().original().len();
        match host.write_range(origin, end, tx.buffer().original()) {
            Ok(()) => self.recorded = true,
            Err(err) => warn!(target: "transaction", error = %err, "anchor_write_rejected"),
        }
        info!(
            target: "transaction",
            targets = self.spans.iter().filter(|s| s.matches_filter).count(),
            origin,
            "transaction_started"
        );
        self.transaction = Some(tx);
        self.mark_edits(host);
    }

    /// Apply `edit` to a copy of the transaction and its spans, write the result through and
    /// keep it. On any failure the session is left exactly as it was.
    pub fn apply_edit<H, T>(
        &mut self,
        host: &mut H,
        edit: impl FnOnce(&mut Transaction, &mut Vec<CandidateSpan>) -> Result<T, JumpError>,
    ) -> Result<T, JumpError>
    where
        H: HostEditor + ?Sized,
    {
        let Some(current) = self.transaction.as_ref() else {
            return Err(JumpError::NoSession);
        };
        let mut tx = current.clone();
        let mut spans = self.spans.clone();
        let value = edit(&mut tx, &mut spans)?;
        tx.verify()?;

        let origin = tx.buffer().origin();
        let live_end = origin + current.buffer().text().len();
        if let Err(err) = host.write_range(origin, live_end, tx.buffer().text()) {
            warn!(target: "transaction", error = %err, "edit_rejected");
            return Err(err.into());
        }
        self.recorded = true;
        host.set_cursor(tx.cursor());
        self.transaction = Some(tx);
        self.spans = spans;
        self.mark_edits(host);
        Ok(value)
    }

    /// Drop the editing phase of a multicursor session and collect `members` again.
    pub fn resume_collecting<H: HostEditor + ?Sized>(
        &mut self,
        host: &mut H,
        members: MultiPointSet,
        range: Range<usize>,
    ) {
        if let Some(tx) = self.transaction.take() {
            self.roll_back(host, &tx);
            host.set_cursor(tx.saved_cursor());
        }
        self.mode = Mode::MulticursorAccepting;
        self.range = range;
        self.spans.clear();
        self.multipoint = members;
        self.mark_members(host);
        info!(target: "session", members = self.multipoint.len(), "collecting_resumed");
    }

    fn roll_back<H: HostEditor + ?Sized>(&mut self, host: &mut H, tx: &Transaction) {
        self.end_group(host);
        if self.recorded {
            host.undo();
            self.recorded = false;
        }

        let buffer = tx.buffer();
        let origin = buffer.origin();
        let restored = host
            .read_range(origin, origin + buffer.original().len())
            .ok();
        if restored.as_deref() == Some(buffer.original()) {
            return;
        }
        let live_end = origin + buffer.text().len();
        if host.read_range(origin, live_end).ok().as_deref() == Some(buffer.text()) {
            warn!(target: "transaction", origin, "rollback_rewrite");
            if let Err(err) = host.write_range(origin, live_end, buffer.original()) {
                warn!(target: "transaction", error = %err, "rollback_rewrite_failed");
            }
        }
    }

    /// Tear the session down, committing or cancelling whatever it holds.
    pub fn close<H: HostEditor + ?Sized>(
        mut self,
        host: &mut H,
        outcome: Outcome,
    ) -> Result<Closed, JumpError> {
        let mut first_error = self.take_down_overlay(host).err();
        let mut closed = Closed::default();

        match self.transaction.take() {
            Some(tx) => {
                let verified = tx.verify();
                if outcome == Outcome::Commit && verified.is_ok() {
                    self.end_group(host);
                    closed.replacement = self
                        .spans
                        .iter()
                        .find(|s| s.matches_filter)
                        .map(|s| tx.inserted_text(s).to_string())
                        .filter(|text| !text.is_empty());
                    host.set_cursor(tx.cursor());
                    info!(
                        target: "transaction",
                        mode = ?self.mode,
                        inserted = tx.buffer().chars_inserted(),
                        removed = tx.buffer().chars_removed(),
                        "transaction_committed"
                    );
                } else {
                    if let Err(err) = verified {
                        warn!(target: "transaction", error = %err, "integrity_violation");
                        first_error.get_or_insert(err);
                    }
                    self.roll_back(host, &tx);
                    host.set_cursor(tx.saved_cursor());
                    info!(target: "transaction", mode = ?self.mode, "transaction_rolled_back");
                }
            }
            None if outcome == Outcome::Cancel => host.set_cursor(self.cursor_restore),
            None => {}
        }

        self.end_group(host);
        if self.read_only_held {
            host.set_read_only(false);
            self.read_only_held = false;
        }
        self.clear_marks(host);
        for handle in self.subscriptions.drain(..) {
            host.unsubscribe(handle);
        }
        info!(target: "session", mode = ?self.mode, outcome = ?outcome, "session_closed");

        match first_error {
            Some(err) => Err(err),
            None => Ok(closed),
        }
    }
}
