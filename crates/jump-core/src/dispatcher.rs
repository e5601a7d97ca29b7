//! Entry points and event routing.
//!
//! [`Dispatcher`] is the single owner of the live [`Session`]. Every command checks the mode
//! first: when a session is already live the command is refused with
//! [`JumpError::SessionAlreadyActive`], which is never shown to the user. Key, pointer and
//! lifecycle events are routed by mode through one `match` per event kind.
//!
//! Failures that reach the user are kept as a status message ([`Dispatcher::status_message`])
//! and logged; no command panics.

use crate::error::JumpError;
use crate::filter::{CaseRule, FilterOutcome, FilterState};
use crate::host::{HostEditor, LifecycleEvent};
use crate::index::{ScanOptions, check_range, scan_range};
use crate::multicursor;
use crate::overlay::{OverlayBuffer, OverlayOptions, layout_tags, render};
use crate::selection::{AddOutcome, MultiPointSet};
use crate::session::{Mode, Outcome, ReplaceKind, SearchKind, Session};
use crate::span::{CandidateSpan, Granularity};
use crate::tags::{TagInputOutcome, TagScheme, exact_tag, narrow_tags};
use crate::transaction::{BackspaceOutcome, Transaction, TransactionBuffer};
use jump_core_config::{AfterJump, Settings};
use std::ops::Range;
use tracing::{debug, info, warn};

/// Document range a command works on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// An explicit `[first, last)` byte range.
    Range(Range<usize>),
    /// The line holding the caret.
    CurrentLine,
}

/// A key press forwarded by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// A printable character.
    Char(char),
    /// Enter / Return.
    Enter,
    /// Backspace.
    Backspace,
    /// Escape.
    Escape,
    /// Left arrow.
    Left,
    /// Right arrow.
    Right,
    /// Anything else (modifiers, function keys, ...).
    Other,
}

/// A pointer event forwarded by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PointerEvent {
    /// A click at a document offset.
    Click(usize),
    /// A drag selecting a range.
    Drag(Range<usize>),
    /// The view scrolled.
    Scroll,
}

/// Whether the engine consumed an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyResponse {
    /// The engine handled the event; the host must not process it.
    Handled,
    /// The host should process the event normally.
    Ignored,
}

enum FilterInput {
    Push(char),
    Pop,
}

/// Command and event entry point of the engine.
#[derive(Debug, Default)]
pub struct Dispatcher {
    settings: Settings,
    session: Option<Session>,
    last_replacement: Option<String>,
    jump_origin: Option<usize>,
    status: Option<String>,
}

fn resolve_scope<H: HostEditor + ?Sized>(host: &H, scope: &Scope) -> Result<Range<usize>, JumpError> {
    let range = match scope {
        Scope::Range(range) => range.clone(),
        Scope::CurrentLine => {
            let line = host.line_of(host.get_cursor());
            let start = host.pos_of_line(line);
            start..start + host.line_length(line)
        }
    };
    check_range(host, &range)?;
    Ok(range)
}

/// Lines holding every member of `set`, without the last line ending.
fn member_lines<H: HostEditor + ?Sized>(host: &H, set: &MultiPointSet) -> Option<Range<usize>> {
    let covering = set.covering_range()?;
    let first = host.line_of(covering.start);
    let last = host.line_of(covering.end);
    Some(host.pos_of_line(first)..host.pos_of_line(last) + host.line_length(last))
}

fn discard<H: HostEditor + ?Sized>(host: &mut H, session: Session) {
    if let Err(err) = session.close(host, Outcome::Cancel) {
        warn!(target: "dispatcher", error = %err, "teardown_failed");
    }
}

impl Dispatcher {
    /// Create a dispatcher using `settings`.
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    /// Settings in effect.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Current mode.
    pub fn mode(&self) -> Mode {
        self.session.as_ref().map_or(Mode::Idle, |s| s.mode)
    }

    /// Whether a session is live.
    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// Last user-visible message.
    pub fn status_message(&self) -> Option<&str> {
        self.status.as_deref()
    }

    /// Text of the last committed replacement.
    pub fn last_replacement(&self) -> Option<&str> {
        self.last_replacement.as_deref()
    }

    /// Candidate spans of the live session.
    pub fn spans(&self) -> &[CandidateSpan] {
        self.session.as_ref().map_or(&[], |s| s.spans.as_slice())
    }

    /// Overlay currently shown.
    pub fn overlay(&self) -> Option<&OverlayBuffer> {
        self.session.as_ref().and_then(|s| s.overlay.as_ref())
    }

    /// Multicursor members collected so far.
    pub fn members(&self) -> Option<&MultiPointSet> {
        self.session.as_ref().map(|s| &s.multipoint)
    }

    /// Live transaction, in the editing phase of a replace or multicursor session.
    pub fn transaction(&self) -> Option<&Transaction> {
        self.session.as_ref().and_then(|s| s.transaction.as_ref())
    }

    /// Text typed so far: the filter query or the partial tag.
    pub fn query(&self) -> Option<&str> {
        let session = self.session.as_ref()?;
        match &session.filter {
            Some(filter) => Some(filter.query()),
            None if session.overlay.is_some() => Some(session.tag_query.as_str()),
            None => None,
        }
    }

    fn report<T>(&mut self, result: Result<T, JumpError>) -> Result<T, JumpError> {
        if let Err(err) = &result {
            if err.is_reported() {
                warn!(target: "dispatcher", error = %err, "command_failed");
                self.status = Some(err.to_string());
            } else {
                debug!(target: "dispatcher", error = %err, "command_refused");
            }
        }
        result
    }

    fn admit(&self) -> Result<(), JumpError> {
        if self.session.is_some() {
            return Err(JumpError::SessionAlreadyActive);
        }
        Ok(())
    }

    fn scheme(&self) -> TagScheme {
        TagScheme::from_settings(&self.settings.tags)
    }

    fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            limit: self.scheme().capacity(),
            case_rule: CaseRule::from_settings(&self.settings.search),
        }
    }

    fn candidates<H: HostEditor + ?Sized>(
        &self,
        host: &H,
        range: &Range<usize>,
        granularity: &Granularity,
    ) -> Result<Vec<CandidateSpan>, JumpError> {
        let spans = scan_range(host, range.clone(), granularity, &self.scan_options())?;
        if spans.is_empty() {
            return Err(JumpError::NoCandidates);
        }
        Ok(spans)
    }

    /// Run `f` on the taken session; keep it on success, tear it down on failure.
    fn with_session<H, T>(
        &mut self,
        host: &mut H,
        f: impl FnOnce(&Self, &mut H, &mut Session) -> Result<T, JumpError>,
    ) -> Result<T, JumpError>
    where
        H: HostEditor + ?Sized,
    {
        let Some(mut session) = self.session.take() else {
            return Err(JumpError::NoSession);
        };
        match f(self, host, &mut session) {
            Ok(value) => {
                self.session = Some(session);
                Ok(value)
            }
            Err(err) => {
                discard(host, session);
                Err(err)
            }
        }
    }

    fn finish<H: HostEditor + ?Sized>(
        &mut self,
        host: &mut H,
        outcome: Outcome,
    ) -> Result<(), JumpError> {
        let Some(session) = self.session.take() else {
            return Ok(());
        };
        let closed = session.close(host, outcome)?;
        if let Some(text) = closed.replacement {
            self.last_replacement = Some(text);
        }
        Ok(())
    }

    /// Leave the current mode. A tag pick started from multicursor returns to collecting.
    fn abort<H: HostEditor + ?Sized>(&mut self, host: &mut H) -> Result<(), JumpError> {
        let Some(session) = self.session.as_mut() else {
            return Ok(());
        };
        if session.resume_multicursor {
            let restored = session.take_down_overlay(host);
            session.mode = Mode::MulticursorAccepting;
            session.resume_multicursor = false;
            session.spans.clear();
            session.mark_members(host);
            return restored;
        }
        self.finish(host, Outcome::Cancel)
    }

    fn render_into<H: HostEditor + ?Sized>(
        &self,
        host: &mut H,
        session: &mut Session,
        mut spans: Vec<CandidateSpan>,
    ) -> Result<(), JumpError> {
        let range = session.range.clone();
        let original = host.read_range(range.start, range.end)?;
        let options = OverlayOptions::from_settings(&self.settings.tags);
        let tagged = layout_tags(&original, range.start, &mut spans, &self.scheme(), options.center);
        let overlay = render(&original, range.start, &mut spans, options);
        let filler = overlay.ledger().total();
        session.spans = spans;
        session.show_overlay(host, overlay)?;
        info!(
            target: "session",
            mode = ?session.mode,
            candidates = session.spans.len(),
            tagged,
            filler,
            "tags_shown"
        );
        Ok(())
    }

    fn begin_editing<H: HostEditor + ?Sized>(
        &self,
        host: &mut H,
        session: &mut Session,
    ) -> Result<(), JumpError> {
        let range = session.range.clone();
        let original = host.read_range(range.start, range.end)?;
        let tx = Transaction::begin(
            TransactionBuffer::new(range.start, original),
            &mut session.spans,
            self.settings.replace.action,
            host.get_cursor(),
        );
        session.filter = None;
        session.begin_edit(host, tx);
        Ok(())
    }

    fn jump_to<H: HostEditor + ?Sized>(&mut self, host: &mut H, target: &CandidateSpan, previous: usize) {
        self.jump_origin = Some(previous);
        match self.settings.jump.after {
            AfterJump::Nothing => host.set_cursor(target.doc_start),
            AfterJump::SelectText => host.set_selection(target.doc_start, target.doc_end()),
            AfterJump::SelectToAnchor => host.set_selection(previous, target.doc_start),
            AfterJump::SelectLine => {
                let line = host.line_of(target.doc_start);
                let start = host.pos_of_line(line);
                host.set_selection(start, start + host.line_length(line));
            }
        }
        info!(target: "session", pos = target.doc_start, from = previous, "jumped");
    }

    // ---- shortcut tags -------------------------------------------------------------------

    /// Tag every word in `scope`.
    pub fn tag_words<H: HostEditor + ?Sized>(&mut self, host: &mut H, scope: Scope) -> Result<(), JumpError> {
        let result = self.start_tagging(host, Mode::TaggingWord, scope, Granularity::Word);
        self.report(result)
    }

    /// Tag every non-empty line in `scope`.
    pub fn tag_lines<H: HostEditor + ?Sized>(&mut self, host: &mut H, scope: Scope) -> Result<(), JumpError> {
        let result = self.start_tagging(host, Mode::TaggingLine, scope, Granularity::Line);
        self.report(result)
    }

    /// Wait for a character, then tag its occurrences in `scope`.
    pub fn tag_chars<H: HostEditor + ?Sized>(&mut self, host: &mut H, scope: Scope) -> Result<(), JumpError> {
        let result = self.open_awaiting(host, Mode::TaggingChar, scope);
        self.report(result)
    }

    fn start_tagging<H: HostEditor + ?Sized>(
        &mut self,
        host: &mut H,
        mode: Mode,
        scope: Scope,
        granularity: Granularity,
    ) -> Result<(), JumpError> {
        self.admit()?;
        let range = resolve_scope(host, &scope)?;
        let spans = self.candidates(host, &range, &granularity)?;
        let mut session = Session::open(host, mode, range);
        match self.render_into(host, &mut session, spans) {
            Ok(()) => {
                self.session = Some(session);
                Ok(())
            }
            Err(err) => {
                discard(host, session);
                Err(err)
            }
        }
    }

    fn open_awaiting<H: HostEditor + ?Sized>(
        &mut self,
        host: &mut H,
        mode: Mode,
        scope: Scope,
    ) -> Result<(), JumpError> {
        self.admit()?;
        let range = resolve_scope(host, &scope)?;
        let mut session = Session::open(host, mode, range);
        session.awaiting_char = true;
        self.session = Some(session);
        Ok(())
    }

    fn pick_char_target<H: HostEditor + ?Sized>(&mut self, host: &mut H, ch: char) -> Result<(), JumpError> {
        self.with_session(host, |this, host, session| {
            session.awaiting_char = false;
            let mut spans = this.candidates(host, &session.range, &Granularity::Char(ch))?;
            if let Mode::Replacing(_) = session.mode {
                for span in &mut spans {
                    span.matches_filter = true;
                }
                session.spans = spans;
                this.begin_editing(host, session)
            } else {
                this.render_into(host, session, spans)
            }
        })
    }

    fn resolve_tag<H: HostEditor + ?Sized>(&mut self, host: &mut H, idx: usize) -> Result<(), JumpError> {
        let Some(mut session) = self.session.take() else {
            return Err(JumpError::NoSession);
        };
        let Some(target) = session.spans.get(idx).cloned() else {
            self.session = Some(session);
            return Ok(());
        };
        info!(target: "session", tag = %target.tag, pos = target.doc_start, "tag_resolved");

        if session.resume_multicursor {
            if let Err(err) = session.take_down_overlay(host) {
                discard(host, session);
                return Err(err);
            }
            session.mode = Mode::MulticursorAccepting;
            session.resume_multicursor = false;
            session.spans.clear();
            let outcome = session
                .multipoint
                .add(CandidateSpan::new(target.text, target.doc_start));
            debug!(target: "multicursor", outcome = ?outcome, "member_picked");
            session.mark_members(host);
            self.session = Some(session);
            return Ok(());
        }

        let previous = session.cursor_restore;
        session.close(host, Outcome::Commit)?;
        self.jump_to(host, &target, previous);
        Ok(())
    }

    fn tagging_key<H: HostEditor + ?Sized>(&mut self, host: &mut H, key: Key) -> Result<KeyResponse, JumpError> {
        let Some(session) = self.session.as_mut() else {
            return Ok(KeyResponse::Ignored);
        };
        if session.awaiting_char {
            match key {
                Key::Char(ch) => self.pick_char_target(host, ch)?,
                Key::Escape | Key::Backspace => self.abort(host)?,
                _ => {}
            }
            return Ok(KeyResponse::Handled);
        }

        match key {
            Key::Char(ch) if ch.is_ascii_alphabetic() => {
                session.tag_query.push(ch);
                match narrow_tags(&session.spans, &session.tag_query) {
                    TagInputOutcome::Resolved(idx) => self.resolve_tag(host, idx)?,
                    TagInputOutcome::Narrowed { remaining } => {
                        debug!(target: "session", query = %session.tag_query, remaining, "tag_narrowed");
                    }
                    TagInputOutcome::Rejected => {
                        session.tag_query.pop();
                        debug!(target: "session", key = %ch, "tag_rejected");
                    }
                }
            }
            Key::Enter => {
                if let Some(idx) = exact_tag(&session.spans, &session.tag_query) {
                    self.resolve_tag(host, idx)?;
                }
            }
            Key::Backspace => {
                if session.tag_query.pop().is_none() {
                    self.abort(host)?;
                }
            }
            Key::Escape => self.abort(host)?,
            Key::Char(_) => {}
            Key::Left | Key::Right | Key::Other => return Ok(KeyResponse::Ignored),
        }
        Ok(KeyResponse::Handled)
    }

    // ---- search --------------------------------------------------------------------------

    /// Start an incremental search in `scope`.
    pub fn search<H: HostEditor + ?Sized>(
        &mut self,
        host: &mut H,
        kind: SearchKind,
        scope: Scope,
    ) -> Result<(), JumpError> {
        let result = self.open_filtered(host, Mode::Searching(kind), scope);
        self.report(result)
    }

    fn open_filtered<H: HostEditor + ?Sized>(
        &mut self,
        host: &mut H,
        mode: Mode,
        scope: Scope,
    ) -> Result<(), JumpError> {
        self.admit()?;
        let range = resolve_scope(host, &scope)?;
        let spans = match mode {
            Mode::Searching(SearchKind::Word) | Mode::Replacing(ReplaceKind::Word) => {
                self.candidates(host, &range, &Granularity::Word)?
            }
            _ => Vec::new(),
        };
        let mut session = Session::open(host, mode, range);
        session.spans = spans;
        session.filter = Some(FilterState::new(&self.settings.search, Some(host.get_cursor())));
        self.session = Some(session);
        Ok(())
    }

    fn filter_step<H: HostEditor + ?Sized>(
        &mut self,
        host: &mut H,
        substring: bool,
        input: FilterInput,
    ) -> Result<FilterOutcome, JumpError> {
        let mut options = self.scan_options();
        let Some(session) = self.session.as_mut() else {
            return Err(JumpError::NoSession);
        };
        let Some(filter) = session.filter.as_mut() else {
            return Err(JumpError::NoSession);
        };

        let outcome = if substring {
            match input {
                FilterInput::Push(ch) => filter.push(ch),
                FilterInput::Pop => {
                    if !filter.pop() {
                        return Ok(FilterOutcome::Cancelled);
                    }
                }
            }
            options.case_rule = filter.case_rule();
            session.spans = if filter.query().is_empty() {
                Vec::new()
            } else {
                let granularity = Granularity::Substring(filter.query().to_string());
                scan_range(host, session.range.clone(), &granularity, &options)?
            };
            filter.recompute(&mut session.spans)
        } else {
            match input {
                FilterInput::Push(ch) => filter.push_char(ch, &mut session.spans),
                FilterInput::Pop => filter.backspace(&mut session.spans),
            }
        };
        debug!(target: "filter", query = %filter.query(), outcome = ?outcome, "filter_step");
        session.mark_filter(host);
        Ok(outcome)
    }

    fn navigate<H: HostEditor + ?Sized>(&mut self, host: &mut H, forward: bool) {
        if let Some(session) = self.session.as_mut()
            && let Some(filter) = session.filter.as_mut()
        {
            if forward {
                filter.select_next(&mut session.spans);
            } else {
                filter.select_prev(&mut session.spans);
            }
            session.mark_filter(host);
        }
    }

    fn active_match(&self) -> Option<usize> {
        self.session.as_ref()?.filter.as_ref()?.active()
    }

    fn resolve_search<H: HostEditor + ?Sized>(&mut self, host: &mut H, idx: usize) -> Result<(), JumpError> {
        let Some(session) = self.session.take() else {
            return Err(JumpError::NoSession);
        };
        let target = session.spans.get(idx).cloned();
        let previous = session.cursor_restore;
        session.close(host, Outcome::Commit)?;
        if let Some(target) = target {
            self.jump_to(host, &target, previous);
        }
        Ok(())
    }

    fn search_key<H: HostEditor + ?Sized>(
        &mut self,
        host: &mut H,
        kind: SearchKind,
        key: Key,
    ) -> Result<KeyResponse, JumpError> {
        let substring = kind == SearchKind::Substring;
        let outcome = match key {
            Key::Char(ch) => self.filter_step(host, substring, FilterInput::Push(ch))?,
            Key::Backspace => self.filter_step(host, substring, FilterInput::Pop)?,
            Key::Left | Key::Right => {
                self.navigate(host, key == Key::Right);
                return Ok(KeyResponse::Handled);
            }
            Key::Enter => {
                match self.active_match() {
                    Some(idx) => self.resolve_search(host, idx)?,
                    None => self.abort(host)?,
                }
                return Ok(KeyResponse::Handled);
            }
            Key::Escape => {
                self.abort(host)?;
                return Ok(KeyResponse::Handled);
            }
            Key::Other => return Ok(KeyResponse::Ignored),
        };
        match outcome {
            FilterOutcome::Resolved(idx) => self.resolve_search(host, idx)?,
            FilterOutcome::Cancelled => self.abort(host)?,
            FilterOutcome::Pending { .. } | FilterOutcome::NoMatches => {}
        }
        Ok(KeyResponse::Handled)
    }

    // ---- replace -------------------------------------------------------------------------

    /// Start a replace session of `kind` in `scope`.
    ///
    /// `Word` and `Substring` first filter by a typed query (Enter starts editing every
    /// match); `Char` waits for the character to replace; `Multi` edits every occurrence of
    /// the host's current selection right away.
    pub fn replace<H: HostEditor + ?Sized>(
        &mut self,
        host: &mut H,
        kind: ReplaceKind,
        scope: Scope,
    ) -> Result<(), JumpError> {
        let result = match kind {
            ReplaceKind::Word | ReplaceKind::Substring => {
                self.open_filtered(host, Mode::Replacing(kind), scope)
            }
            ReplaceKind::Char => self.open_awaiting(host, Mode::Replacing(kind), scope),
            ReplaceKind::Multi => self.replace_selection(host, scope),
        };
        self.report(result)
    }

    fn replace_selection<H: HostEditor + ?Sized>(&mut self, host: &mut H, scope: Scope) -> Result<(), JumpError> {
        self.admit()?;
        let range = resolve_scope(host, &scope)?;
        let selection = host
            .get_selection()
            .filter(|s| !s.is_empty())
            .ok_or(JumpError::NoCandidates)?;
        let needle = host.read_range(selection.start, selection.end)?;
        let options = ScanOptions {
            limit: self.scheme().capacity(),
            case_rule: CaseRule {
                case_sensitive: true,
                smart_case: false,
            },
        };
        let mut spans = scan_range(host, range.clone(), &Granularity::Substring(needle), &options)?;
        if spans.is_empty() {
            return Err(JumpError::NoCandidates);
        }
        for span in &mut spans {
            span.matches_filter = true;
        }

        let mut session = Session::open(host, Mode::Replacing(ReplaceKind::Multi), range);
        session.spans = spans;
        match self.begin_editing(host, &mut session) {
            Ok(()) => {
                self.session = Some(session);
                Ok(())
            }
            Err(err) => {
                discard(host, session);
                Err(err)
            }
        }
    }

    fn start_editing<H: HostEditor + ?Sized>(&mut self, host: &mut H) -> Result<(), JumpError> {
        self.with_session(host, |this, host, session| {
            if !session.spans.iter().any(|s| s.matches_filter) {
                return Err(JumpError::NoCandidates);
            }
            this.begin_editing(host, session)
        })
    }

    fn replace_key<H: HostEditor + ?Sized>(
        &mut self,
        host: &mut H,
        kind: ReplaceKind,
        key: Key,
    ) -> Result<KeyResponse, JumpError> {
        let (editing, awaiting) = match self.session.as_ref() {
            Some(session) => (session.is_editing(), session.awaiting_char),
            None => return Ok(KeyResponse::Ignored),
        };
        if awaiting {
            return self.tagging_key(host, key);
        }
        if editing {
            return self.editing_key(host, key);
        }

        let substring = kind == ReplaceKind::Substring;
        let outcome = match key {
            Key::Char(ch) => self.filter_step(host, substring, FilterInput::Push(ch))?,
            Key::Backspace => self.filter_step(host, substring, FilterInput::Pop)?,
            Key::Left | Key::Right => {
                self.navigate(host, key == Key::Right);
                return Ok(KeyResponse::Handled);
            }
            Key::Enter => {
                let any = self.spans().iter().any(|s| s.matches_filter);
                if any && self.query().is_some_and(|q| !q.is_empty()) {
                    self.start_editing(host)?;
                }
                return Ok(KeyResponse::Handled);
            }
            Key::Escape => {
                self.abort(host)?;
                return Ok(KeyResponse::Handled);
            }
            Key::Other => return Ok(KeyResponse::Ignored),
        };
        match outcome {
            FilterOutcome::Resolved(_) => self.start_editing(host)?,
            FilterOutcome::Cancelled => self.abort(host)?,
            FilterOutcome::Pending { .. } | FilterOutcome::NoMatches => {}
        }
        Ok(KeyResponse::Handled)
    }

    fn edit<H, T>(
        &mut self,
        host: &mut H,
        edit: impl FnOnce(&mut Transaction, &mut Vec<CandidateSpan>) -> Result<T, JumpError>,
    ) -> Result<T, JumpError>
    where
        H: HostEditor + ?Sized,
    {
        let Some(session) = self.session.as_mut() else {
            return Err(JumpError::NoSession);
        };
        match session.apply_edit(host, edit) {
            Err(err @ JumpError::TransactionIntegrityViolation { .. }) => {
                warn!(target: "transaction", error = %err, "forced_rollback");
                if let Some(session) = self.session.take() {
                    discard(host, session);
                }
                Err(err)
            }
            other => other,
        }
    }

    fn commit<H: HostEditor + ?Sized>(&mut self, host: &mut H) -> Result<(), JumpError> {
        self.finish(host, Outcome::Commit)
    }

    fn editing_key<H: HostEditor + ?Sized>(&mut self, host: &mut H, key: Key) -> Result<KeyResponse, JumpError> {
        match key {
            Key::Char(ch) => {
                self.edit(host, |tx, spans| tx.insert_char(ch, spans))?;
            }
            Key::Backspace => {
                let outcome = self.edit(host, |tx, spans| tx.backspace(spans))?;
                if outcome == BackspaceOutcome::Exhausted {
                    let edited = self.transaction().is_some_and(Transaction::has_edits);
                    if edited {
                        self.commit(host)?;
                    } else {
                        self.abort(host)?;
                    }
                }
            }
            Key::Enter => self.commit(host)?,
            Key::Escape => self.abort(host)?,
            Key::Left | Key::Right => {}
            Key::Other => return Ok(KeyResponse::Ignored),
        }
        Ok(KeyResponse::Handled)
    }

    fn editing_session(&self) -> Result<(), JumpError> {
        match &self.session {
            Some(session) if session.is_editing() => Ok(()),
            _ => Err(JumpError::NoSession),
        }
    }

    /// Insert `text` (a paste) at every edited span of the live transaction.
    pub fn insert_literal<H: HostEditor + ?Sized>(&mut self, host: &mut H, text: &str) -> Result<(), JumpError> {
        let result = self
            .editing_session()
            .and_then(|()| self.edit(host, |tx, spans| tx.insert_str(text, spans)));
        self.report(result)
    }

    /// Apply the last committed replacement to every edited span and commit.
    pub fn repeat_last_replacement<H: HostEditor + ?Sized>(&mut self, host: &mut H) -> Result<(), JumpError> {
        let result = self.editing_session().and_then(|()| {
            let text = self
                .last_replacement
                .clone()
                .ok_or(JumpError::NothingToRepeat)?;
            self.edit(host, |tx, spans| tx.insert_str(&text, spans))?;
            self.commit(host)
        });
        self.report(result)
    }

    // ---- multicursor ---------------------------------------------------------------------

    /// Start collecting multicursor members.
    pub fn multicursor_start<H: HostEditor + ?Sized>(&mut self, host: &mut H) -> Result<(), JumpError> {
        let result = self.admit().map(|()| {
            let range = 0..host.document_len();
            self.session = Some(Session::open(host, Mode::MulticursorAccepting, range));
        });
        self.report(result)
    }

    fn accepting(&self) -> Result<&Session, JumpError> {
        match &self.session {
            Some(session) if session.mode == Mode::MulticursorAccepting => Ok(session),
            _ => Err(JumpError::NoSession),
        }
    }

    fn has_members(&self) -> Result<(), JumpError> {
        if self.accepting()?.multipoint.is_empty() {
            return Err(JumpError::NoCandidates);
        }
        Ok(())
    }

    /// Add a point (`start == end`) or a range to the multicursor set.
    pub fn multicursor_add<H: HostEditor + ?Sized>(
        &mut self,
        host: &mut H,
        range: Range<usize>,
    ) -> Result<AddOutcome, JumpError> {
        let result = self.add_member(host, range);
        self.report(result)
    }

    fn add_member<H: HostEditor + ?Sized>(&mut self, host: &mut H, range: Range<usize>) -> Result<AddOutcome, JumpError> {
        self.accepting()?;
        if range.start > range.end || range.end > host.document_len() {
            return Err(JumpError::InvalidRange {
                start: range.start,
                end: range.end,
            });
        }
        let text = host.read_range(range.start, range.end)?;
        let Some(session) = self.session.as_mut() else {
            return Err(JumpError::NoSession);
        };
        let outcome = session.multipoint.add(CandidateSpan::new(text, range.start));
        debug!(
            target: "multicursor",
            start = range.start,
            end = range.end,
            outcome = ?outcome,
            members = session.multipoint.len(),
            "member_added"
        );
        session.mark_members(host);
        Ok(outcome)
    }

    /// Show word tags; the picked word joins the multicursor set.
    pub fn multicursor_pick_words<H: HostEditor + ?Sized>(&mut self, host: &mut H, scope: Scope) -> Result<(), JumpError> {
        let result = self.pick_words(host, scope);
        self.report(result)
    }

    fn pick_words<H: HostEditor + ?Sized>(&mut self, host: &mut H, scope: Scope) -> Result<(), JumpError> {
        self.accepting()?;
        let range = resolve_scope(host, &scope)?;
        let spans = self.candidates(host, &range, &Granularity::Word)?;
        let Some(mut session) = self.session.take() else {
            return Err(JumpError::NoSession);
        };
        session.mode = Mode::TaggingWord;
        session.resume_multicursor = true;
        session.range = range;
        let shown = self.render_into(host, &mut session, spans);
        if shown.is_err() {
            session.mode = Mode::MulticursorAccepting;
            session.resume_multicursor = false;
            session.spans.clear();
            session.mark_members(host);
        }
        self.session = Some(session);
        shown
    }

    fn start_multicursor_edit<H: HostEditor + ?Sized>(&mut self, host: &mut H) -> Result<(), JumpError> {
        self.has_members()?;
        self.with_session(host, |this, host, session| {
            let range = member_lines(host, &session.multipoint).ok_or(JumpError::NoCandidates)?;
            let mut spans = session.multipoint.take_spans();
            for span in &mut spans {
                span.matches_filter = true;
            }
            session.range = range;
            session.spans = spans;
            session.mode = Mode::MulticursorReplacing;
            this.begin_editing(host, session)
        })
    }

    /// Start typing at every member.
    pub fn multicursor_replace<H: HostEditor + ?Sized>(&mut self, host: &mut H) -> Result<(), JumpError> {
        let result = self.start_multicursor_edit(host);
        self.report(result)
    }

    fn run_batch<H, T>(
        &mut self,
        host: &mut H,
        commit: bool,
        op: impl FnOnce(&mut Transaction, &mut Vec<CandidateSpan>) -> Result<T, JumpError>,
    ) -> Result<T, JumpError>
    where
        H: HostEditor + ?Sized,
    {
        self.start_multicursor_edit(host)?;
        let value = match self.edit(host, op) {
            Ok(value) => value,
            Err(err) => {
                self.finish(host, Outcome::Cancel)?;
                return Err(err);
            }
        };
        if commit {
            self.commit(host)?;
        }
        Ok(value)
    }

    /// Duplicate every member (ranges after themselves, points as their line) and commit.
    pub fn multicursor_duplicate<H: HostEditor + ?Sized>(&mut self, host: &mut H) -> Result<usize, JumpError> {
        let result = self.run_batch(host, true, |tx, spans| multicursor::duplicate(tx, spans));
        self.report(result)
    }

    /// Open an indented line after each member's line and keep typing there.
    pub fn multicursor_insert_line<H: HostEditor + ?Sized>(&mut self, host: &mut H) -> Result<(), JumpError> {
        let result = self.run_batch(host, false, |tx, spans| {
            *spans = multicursor::insert_line(tx, spans)?;
            Ok(())
        });
        self.report(result)
    }

    /// Rotate member texts (swap for two members) and commit.
    pub fn multicursor_transpose<H: HostEditor + ?Sized>(&mut self, host: &mut H) -> Result<(), JumpError> {
        let result = self.run_batch(host, true, |tx, spans| multicursor::transpose(tx, spans));
        self.report(result)
    }

    fn accepting_key<H: HostEditor + ?Sized>(&mut self, host: &mut H, key: Key) -> Result<KeyResponse, JumpError> {
        match key {
            Key::Char(ch) => {
                if self.has_members().is_err() {
                    return Ok(KeyResponse::Ignored);
                }
                let snapshot = self
                    .session
                    .as_ref()
                    .map(|s| (s.multipoint.clone(), s.range.clone()));
                self.start_multicursor_edit(host)?;
                if let Err(err) = self.edit(host, |tx, spans| tx.insert_char(ch, spans)) {
                    // A rejected first key leaves the collected set as it was.
                    if let (Some(session), Some((members, range))) = (self.session.as_mut(), snapshot) {
                        session.resume_collecting(host, members, range);
                    }
                    return Err(err);
                }
                Ok(KeyResponse::Handled)
            }
            Key::Enter | Key::Escape => {
                self.abort(host)?;
                Ok(KeyResponse::Handled)
            }
            Key::Backspace | Key::Left | Key::Right | Key::Other => Ok(KeyResponse::Ignored),
        }
    }

    // ---- other commands ------------------------------------------------------------------

    /// Return to where the caret was before the last jump (calling it again jumps back).
    pub fn jump_back<H: HostEditor + ?Sized>(&mut self, host: &mut H) -> Result<(), JumpError> {
        let result = self.admit().map(|()| {
            if let Some(pos) = self.jump_origin {
                let here = host.get_cursor();
                host.set_cursor(pos);
                self.jump_origin = Some(here);
            }
        });
        self.report(result)
    }

    /// End any live session without committing.
    pub fn cancel<H: HostEditor + ?Sized>(&mut self, host: &mut H) -> Result<(), JumpError> {
        let result = self.finish(host, Outcome::Cancel);
        self.report(result)
    }

    // ---- events --------------------------------------------------------------------------

    /// Route a key press to the live session.
    pub fn on_key<H: HostEditor + ?Sized>(&mut self, host: &mut H, key: Key) -> KeyResponse {
        let mode = self.mode();
        let result = match mode {
            Mode::Idle => Ok(KeyResponse::Ignored),
            Mode::TaggingWord | Mode::TaggingChar | Mode::TaggingLine => self.tagging_key(host, key),
            Mode::Searching(kind) => self.search_key(host, kind, key),
            Mode::Replacing(kind) => self.replace_key(host, kind, key),
            Mode::MulticursorAccepting => self.accepting_key(host, key),
            Mode::MulticursorReplacing => self.editing_key(host, key),
        };
        self.report(result).unwrap_or(KeyResponse::Handled)
    }

    /// Route a pointer event. Outside multicursor collecting, any pointer event cancels the
    /// session; a click on a shown overlay lands on the matching document position.
    pub fn on_pointer<H: HostEditor + ?Sized>(&mut self, host: &mut H, event: PointerEvent) -> KeyResponse {
        let Some(session) = self.session.as_ref() else {
            return KeyResponse::Ignored;
        };

        if session.mode == Mode::MulticursorAccepting {
            let range = match event {
                PointerEvent::Click(pos) => pos..pos,
                PointerEvent::Drag(range) => range,
                PointerEvent::Scroll => return KeyResponse::Ignored,
            };
            let result = self.add_member(host, range);
            let _ = self.report(result);
            return KeyResponse::Handled;
        }

        let landing = match (&event, &session.overlay) {
            (PointerEvent::Click(pos), Some(overlay)) if overlay.overlay_range().contains(pos) => {
                Some(overlay.overlay_to_document(*pos))
            }
            _ => None,
        };
        debug!(target: "dispatcher", event = ?event, "pointer_cancel");
        let result = self.abort(host);
        let _ = self.report(result);
        match landing {
            Some(pos) if self.session.is_none() => {
                host.set_cursor(pos);
                KeyResponse::Handled
            }
            _ => KeyResponse::Ignored,
        }
    }

    /// React to a host lifecycle event: flush a transaction that has edits, cancel anything
    /// else.
    pub fn on_lifecycle<H: HostEditor + ?Sized>(&mut self, host: &mut H, event: LifecycleEvent) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        let flush = session.transaction.as_ref().is_some_and(Transaction::has_edits);
        info!(target: "dispatcher", event = ?event, mode = ?session.mode, flush, "forced_session_end");
        let result = if flush {
            self.commit(host)
        } else {
            self.finish(host, Outcome::Cancel)
        };
        let _ = self.report(result);
    }
}
