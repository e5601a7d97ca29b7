//! Match Index: enumerate candidate spans inside a document range.
//!
//! Results are ordered by `doc_start`, never overlap, and stop at the tag capacity.

use crate::error::JumpError;
use crate::filter::{CaseRule, compile_query_regex};
use crate::host::HostEditor;
use crate::span::{CandidateSpan, Granularity};
use std::ops::Range;
use tracing::debug;
use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthChar;

/// Knobs for one scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOptions {
    /// Stop after this many spans.
    pub limit: usize,
    /// Case rule for [`Granularity::Char`] and [`Granularity::Substring`].
    pub case_rule: CaseRule,
}

/// Whether `ch` belongs to a word: `_` or any alphanumeric character.
pub fn is_word_char(ch: char) -> bool {
    ch == '_' || ch.is_alphanumeric()
}

/// Scan `text`, which starts at document offset `base`.
pub fn scan(
    text: &str,
    base: usize,
    granularity: &Granularity,
    options: &ScanOptions,
) -> Result<Vec<CandidateSpan>, JumpError> {
    let mut spans = Vec::new();
    if options.limit == 0 {
        return Ok(spans);
    }

    match granularity {
        Granularity::Word => scan_words(text, base, options.limit, &mut spans),
        Granularity::Char(target) => {
            scan_chars(text, base, *target, options, &mut spans);
        }
        Granularity::Line => scan_lines(text, base, options.limit, &mut spans),
        Granularity::Substring(query) => {
            if query.is_empty() {
                return Ok(spans);
            }
            let regex = compile_query_regex(query, options.case_rule)?;
            for found in regex.find_iter(text) {
                if found.as_str().is_empty() {
                    continue;
                }
                spans.push(CandidateSpan::new(found.as_str(), base + found.start()));
                if spans.len() >= options.limit {
                    break;
                }
            }
        }
    }

    Ok(spans)
}

fn scan_words(text: &str, base: usize, limit: usize, spans: &mut Vec<CandidateSpan>) {
    let mut start: Option<usize> = None;
    for (idx, ch) in text.char_indices() {
        match (is_word_char(ch), start) {
            (true, None) => start = Some(idx),
            (false, Some(s)) => {
                spans.push(CandidateSpan::new(&text[s..idx], base + s));
                start = None;
                if spans.len() >= limit {
                    return;
                }
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        spans.push(CandidateSpan::new(&text[s..], base + s));
    }
}

fn scan_chars(
    text: &str,
    base: usize,
    target: char,
    options: &ScanOptions,
    spans: &mut Vec<CandidateSpan>,
) {
    // Zero-width and control characters cannot carry a visible tag.
    if matches!(target.width(), None | Some(0)) {
        return;
    }
    for (idx, grapheme) in text.grapheme_indices(true) {
        let Some(first) = grapheme.chars().next() else {
            continue;
        };
        if options.case_rule.chars_match(first, target) {
            spans.push(CandidateSpan::new(grapheme, base + idx));
            if spans.len() >= options.limit {
                return;
            }
        }
    }
}

fn scan_lines(text: &str, base: usize, limit: usize, spans: &mut Vec<CandidateSpan>) {
    let mut offset = 0;
    for raw in text.split_inclusive('\n') {
        let content = raw
            .strip_suffix('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line))
            .unwrap_or(raw);
        if !content.is_empty() {
            spans.push(CandidateSpan::new(content, base + offset));
            if spans.len() >= limit {
                return;
            }
        }
        offset += raw.len();
    }
}

/// Validate `range` against the document.
pub fn check_range<H: HostEditor + ?Sized>(host: &H, range: &Range<usize>) -> Result<(), JumpError> {
    if range.start >= range.end || range.end > host.document_len() {
        return Err(JumpError::InvalidRange {
            start: range.start,
            end: range.end,
        });
    }
    Ok(())
}

/// Read `range` from `host` and scan it. An empty or inverted range yields no spans.
pub fn scan_range<H: HostEditor + ?Sized>(
    host: &H,
    range: Range<usize>,
    granularity: &Granularity,
    options: &ScanOptions,
) -> Result<Vec<CandidateSpan>, JumpError> {
    if range.start >= range.end {
        debug!(target: "index", start = range.start, end = range.end, "empty_scan_range");
        return Ok(Vec::new());
    }
    let text = host.read_range(range.start, range.end)?;
    let spans = scan(&text, range.start, granularity, options)?;
    debug!(
        target: "index",
        start = range.start,
        end = range.end,
        granularity = ?granularity,
        found = spans.len(),
        "scan_complete"
    );
    Ok(spans)
}
