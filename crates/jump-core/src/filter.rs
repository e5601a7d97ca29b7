//! Query matching and the incremental filter state machine.
//!
//! A filter session walks `Idle -> Collecting(query) -> Resolved | Cancelled`. Every accepted
//! character re-evaluates `matches_filter` on all spans, picks the active match closest to the
//! last known position, and caches the first/last matching indices for wrap-around
//! navigation.
//!
//! Matching is configured by a [`MatchPolicy`] (exact / prefix / contains) and a
//! [`CaseRule`]:
//!
//! - case insensitive: both strings are lower-cased, then compared exactly;
//! - case sensitive: characters must be identical;
//! - case sensitive + smart case: [`valid_smart_case`] decides per character.

use crate::error::JumpError;
use crate::span::CandidateSpan;
use jump_core_config::{MatchPolicy, SearchSettings};
use regex::{Regex, RegexBuilder};

/// Smart-case comparison of one haystack character against one query character.
///
/// A lower-case query character matches either case; an upper-case one matches only itself.
pub fn valid_smart_case(haystack: char, query: char) -> bool {
    if haystack == query {
        return true;
    }
    haystack.is_uppercase() && query.is_lowercase() && haystack.to_lowercase().eq(query.to_lowercase())
}

/// Case handling for query comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaseRule {
    /// Compare case sensitively.
    pub case_sensitive: bool,
    /// Apply [`valid_smart_case`] (only meaningful when case sensitive).
    pub smart_case: bool,
}

impl CaseRule {
    /// Build the rule from the `[search]` settings.
    pub fn from_settings(settings: &SearchSettings) -> Self {
        Self {
            case_sensitive: settings.case_sensitive,
            smart_case: settings.smart_case,
        }
    }

    /// Compare one haystack character with one query character.
    pub fn chars_match(self, haystack: char, query: char) -> bool {
        if !self.case_sensitive {
            haystack.to_lowercase().eq(query.to_lowercase())
        } else if self.smart_case {
            valid_smart_case(haystack, query)
        } else {
            haystack == query
        }
    }
}

/// Whether `text` satisfies `query` under `policy` and `rule`. An empty query matches
/// everything.
pub fn text_matches(text: &str, query: &str, policy: MatchPolicy, rule: CaseRule) -> bool {
    if query.is_empty() {
        return true;
    }

    if !rule.case_sensitive {
        let text = text.to_lowercase();
        let query = query.to_lowercase();
        return plain_match(&text, &query, policy);
    }
    if !rule.smart_case {
        return plain_match(text, query, policy);
    }

    let text: Vec<char> = text.chars().collect();
    let query: Vec<char> = query.chars().collect();
    if text.len() < query.len() {
        return false;
    }
    let matches_at = |start: usize| {
        query
            .iter()
            .zip(&text[start..])
            .all(|(q, h)| valid_smart_case(*h, *q))
    };
    match policy {
        MatchPolicy::Exact => text.len() == query.len() && matches_at(0),
        MatchPolicy::Prefix => matches_at(0),
        MatchPolicy::Contains => (0..=text.len() - query.len()).any(matches_at),
    }
}

fn plain_match(text: &str, query: &str, policy: MatchPolicy) -> bool {
    match policy {
        MatchPolicy::Exact => text == query,
        MatchPolicy::Prefix => text.starts_with(query),
        MatchPolicy::Contains => text.contains(query),
    }
}

/// Compile `query` into a literal regex honoring `rule`.
///
/// Smart case is expressed in the pattern: each lower-case character with a distinct
/// upper-case form becomes an alternation of both.
pub fn compile_query_regex(query: &str, rule: CaseRule) -> Result<Regex, JumpError> {
    let pattern = if rule.case_sensitive && rule.smart_case {
        let mut pattern = String::with_capacity(query.len() * 2);
        for ch in query.chars() {
            let lower = ch.to_string();
            let upper: String = ch.to_uppercase().collect();
            if ch.is_lowercase() && upper != lower {
                pattern.push_str(&format!(
                    "(?:{}|{})",
                    regex::escape(&lower),
                    regex::escape(&upper)
                ));
            } else {
                pattern.push_str(&regex::escape(&lower));
            }
        }
        pattern
    } else {
        regex::escape(query)
    };

    RegexBuilder::new(&pattern)
        .case_insensitive(!rule.case_sensitive)
        .build()
        .map_err(|err| JumpError::InvalidQuery(err.to_string()))
}

/// What a filter step produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOutcome {
    /// Still collecting; `matches` spans pass the filter.
    Pending {
        /// Number of matching spans.
        matches: usize,
    },
    /// Nothing passes the filter.
    NoMatches,
    /// A single match remained and auto-resolved.
    Resolved(usize),
    /// Backspace on an empty query.
    Cancelled,
}

/// Incremental filter over a span set.
#[derive(Debug, Clone)]
pub struct FilterState {
    query: String,
    policy: MatchPolicy,
    rule: CaseRule,
    wait_for_enter: bool,
    wrap_around: bool,
    anchor: Option<usize>,
    active: Option<usize>,
    first_match: Option<usize>,
    last_match: Option<usize>,
}

impl FilterState {
    /// Create a filter from the `[search]` settings; `cursor` seeds the nearest-match anchor.
    pub fn new(settings: &SearchSettings, cursor: Option<usize>) -> Self {
        Self {
            query: String::new(),
            policy: settings.policy,
            rule: CaseRule::from_settings(settings),
            wait_for_enter: settings.wait_for_enter,
            wrap_around: settings.wrap_around,
            anchor: cursor,
            active: None,
            first_match: None,
            last_match: None,
        }
    }

    /// Current query.
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Case rule in effect.
    pub fn case_rule(&self) -> CaseRule {
        self.rule
    }

    /// Index of the active match.
    pub fn active(&self) -> Option<usize> {
        self.active
    }

    /// Index of the first matching span.
    pub fn first_match(&self) -> Option<usize> {
        self.first_match
    }

    /// Index of the last matching span.
    pub fn last_match(&self) -> Option<usize> {
        self.last_match
    }

    /// Append `ch` to the query without recomputing.
    pub fn push(&mut self, ch: char) {
        self.query.push(ch);
    }

    /// Drop the last query character without recomputing. Returns `false` if the query was
    /// already empty.
    pub fn pop(&mut self) -> bool {
        self.query.pop().is_some()
    }

    /// Append `ch` and recompute.
    pub fn push_char(&mut self, ch: char, spans: &mut [CandidateSpan]) -> FilterOutcome {
        self.push(ch);
        self.recompute(spans)
    }

    /// Backspace: cancel on an empty query, otherwise truncate and recompute.
    pub fn backspace(&mut self, spans: &mut [CandidateSpan]) -> FilterOutcome {
        if !self.pop() {
            return FilterOutcome::Cancelled;
        }
        self.recompute(spans)
    }

    /// Re-evaluate `matches_filter` and the active match on every span.
    pub fn recompute(&mut self, spans: &mut [CandidateSpan]) -> FilterOutcome {
        let mut count = 0;
        self.first_match = None;
        self.last_match = None;
        for (idx, span) in spans.iter_mut().enumerate() {
            span.matches_filter = text_matches(&span.text, &self.query, self.policy, self.rule);
            span.is_active_match = false;
            if span.matches_filter {
                count += 1;
                self.first_match.get_or_insert(idx);
                self.last_match = Some(idx);
            }
        }

        if count == 0 {
            self.active = None;
            return FilterOutcome::NoMatches;
        }

        let active = match self.anchor {
            Some(pos) => nearest_match(spans, pos),
            None => self.first_match,
        };
        let Some(active) = active else {
            self.active = None;
            return FilterOutcome::NoMatches;
        };
        self.set_active(spans, active);

        if count == 1 && !self.wait_for_enter {
            FilterOutcome::Resolved(active)
        } else {
            FilterOutcome::Pending { matches: count }
        }
    }

    /// Move the active match to the next matching span (Right).
    pub fn select_next(&mut self, spans: &mut [CandidateSpan]) -> Option<usize> {
        let current = self.active?;
        let next = spans
            .iter()
            .enumerate()
            .skip(current + 1)
            .find(|(_, s)| s.matches_filter)
            .map(|(idx, _)| idx);
        let target = match next {
            Some(idx) => idx,
            None if self.wrap_around => self.first_match?,
            None => current,
        };
        self.set_active(spans, target);
        Some(target)
    }

    /// Move the active match to the previous matching span (Left).
    pub fn select_prev(&mut self, spans: &mut [CandidateSpan]) -> Option<usize> {
        let current = self.active?;
        let prev = spans[..current]
            .iter()
            .rposition(|s| s.matches_filter);
        let target = match prev {
            Some(idx) => idx,
            None if self.wrap_around => self.last_match?,
            None => current,
        };
        self.set_active(spans, target);
        Some(target)
    }

    fn set_active(&mut self, spans: &mut [CandidateSpan], idx: usize) {
        if let Some(old) = self.active.and_then(|old| spans.get_mut(old)) {
            old.is_active_match = false;
        }
        if let Some(span) = spans.get_mut(idx) {
            span.is_active_match = true;
            self.anchor = Some(span.doc_start);
        }
        self.active = Some(idx);
    }
}

/// Matching span nearest to `pos`, comparing the closest one on each side (ties go to the
/// span at or after `pos`).
fn nearest_match(spans: &[CandidateSpan], pos: usize) -> Option<usize> {
    let after = spans
        .iter()
        .position(|s| s.matches_filter && s.doc_start >= pos);
    let before = spans
        .iter()
        .rposition(|s| s.matches_filter && s.doc_start < pos);
    match (before, after) {
        (Some(b), Some(a)) => {
            let before_dist = pos - spans[b].doc_start;
            let after_dist = spans[a].doc_start - pos;
            Some(if before_dist < after_dist { b } else { a })
        }
        (b, a) => a.or(b),
    }
}
