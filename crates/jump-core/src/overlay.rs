//! Overlay rendering for the shortcut modes.
//!
//! The overlay is a stand-in for a document range: every tagged span is masked with
//! [`MASK_CHAR`] (one per byte, so byte offsets are preserved) and its tag is written over the
//! mask. A tag that is longer than the room it has runs into the bytes after the span; the
//! run stops at a line end, a tab, a non-ASCII byte or the end of the range, and whatever
//! does not fit is *inserted* there. Each insertion is recorded in the [`LineFeedLedger`],
//! which is all that is needed to translate positions between the overlay and the document.
//!
//! Ledger precedence: a tag overflow stops at whichever of `\n`, `\r`, `\t` comes first after
//! the span; fillers from several tags on one line add up in that line's count.
//!
//! ```text
//! original:  "ab\tcd"      spans: "ab" (tag "a"), "cd" (tag "b")
//! overlay:   "a \tb "      ledger: empty
//! ```

use crate::span::CandidateSpan;
use crate::tags::TagScheme;
use jump_core_config::TagSettings;
use std::ops::Range;

/// Fill character for masked span bytes.
pub const MASK_CHAR: char = ' ';

/// Rendering knobs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OverlayOptions {
    /// Center the tag inside words of three or more characters.
    pub center: bool,
    /// Blank masked neighbors instead of leaving their text visible.
    pub hide_matched_text: bool,
}

impl OverlayOptions {
    /// Build the options from the `[tags]` settings.
    pub fn from_settings(settings: &TagSettings) -> Self {
        Self {
            center: settings.center,
            hide_matched_text: settings.hide_matched_text,
        }
    }
}

/// One filler insertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerEntry {
    /// Line index inside the rendered range (0 is the range's first line).
    pub line: usize,
    /// Document offset the filler is inserted before.
    pub doc_pos: usize,
    /// Overlay offset of the first filler byte.
    pub overlay_pos: usize,
    /// Number of filler bytes.
    pub count: usize,
}

/// Filler insertions of one overlay, ordered by position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineFeedLedger {
    entries: Vec<LedgerEntry>,
}

impl LineFeedLedger {
    /// All insertions.
    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    /// Total filler bytes on `line`.
    pub fn filler_on_line(&self, line: usize) -> usize {
        self.entries
            .iter()
            .filter(|e| e.line == line)
            .map(|e| e.count)
            .sum()
    }

    /// Total filler bytes in the overlay.
    pub fn total(&self) -> usize {
        self.entries.iter().map(|e| e.count).sum()
    }

    /// Whether nothing was inserted.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Map an overlay offset to the document. Offsets inside a filler map to the position it
    /// was inserted before.
    pub fn overlay_to_document(&self, overlay_pos: usize) -> usize {
        let mut shift = 0;
        for entry in &self.entries {
            if overlay_pos >= entry.overlay_pos + entry.count {
                shift += entry.count;
            } else if overlay_pos >= entry.overlay_pos {
                return entry.doc_pos;
            } else {
                break;
            }
        }
        overlay_pos - shift
    }

    /// Map a document offset into the overlay.
    pub fn document_to_overlay(&self, doc_pos: usize) -> usize {
        doc_pos
            + self
                .entries
                .iter()
                .take_while(|e| e.doc_pos <= doc_pos)
                .map(|e| e.count)
                .sum::<usize>()
    }

    fn record(&mut self, entry: LedgerEntry) {
        self.entries.push(entry);
    }
}

/// Where a tag ended up in the overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagPlacement {
    /// Index of the span in the session's span vector.
    pub span: usize,
    /// Overlay offset of the first tag character.
    pub overlay_pos: usize,
    /// Tag length in bytes.
    pub len: usize,
}

/// A rendered overlay and everything needed to take it down again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayBuffer {
    range_start: usize,
    original: String,
    text: String,
    ledger: LineFeedLedger,
    placements: Vec<TagPlacement>,
}

impl OverlayBuffer {
    /// Document offset the overlay replaces from.
    pub fn range_start(&self) -> usize {
        self.range_start
    }

    /// Snapshot of the document range.
    pub fn original(&self) -> &str {
        &self.original
    }

    /// Rendered text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Range occupied by the original text.
    pub fn original_range(&self) -> Range<usize> {
        self.range_start..self.range_start + self.original.len()
    }

    /// Range occupied by the overlay while it is shown.
    pub fn overlay_range(&self) -> Range<usize> {
        self.range_start..self.range_start + self.text.len()
    }

    /// Filler insertions.
    pub fn ledger(&self) -> &LineFeedLedger {
        &self.ledger
    }

    /// Tag positions in overlay order.
    pub fn placements(&self) -> &[TagPlacement] {
        &self.placements
    }

    /// See [`LineFeedLedger::overlay_to_document`].
    pub fn overlay_to_document(&self, overlay_pos: usize) -> usize {
        self.ledger.overlay_to_document(overlay_pos)
    }

    /// See [`LineFeedLedger::document_to_overlay`].
    pub fn document_to_overlay(&self, doc_pos: usize) -> usize {
        self.ledger.document_to_overlay(doc_pos)
    }
}

/// Padding before the tag inside `span`.
pub fn center_pad(span: &CandidateSpan, tag_len: usize, center: bool) -> usize {
    if !center || span.text.chars().count() < 3 {
        return 0;
    }
    (span.doc_len / 2).min(span.doc_len.saturating_sub(tag_len))
}

/// Bytes of a tag starting at relative offset `from` that can overwrite existing text.
fn tag_room(original: &[u8], span_end: usize, from: usize, tag_len: usize) -> usize {
    let mut room = 0;
    while room < tag_len {
        let pos = from + room;
        let Some(&byte) = original.get(pos) else {
            break;
        };
        if pos >= span_end && (!byte.is_ascii() || matches!(byte, b'\n' | b'\r' | b'\t')) {
            break;
        }
        room += 1;
    }
    room
}

/// Decide which spans are masked neighbors and assign tags to the rest.
///
/// A span is a masked neighbor when it starts under the previous tag. Returns the number of
/// tagged spans.
pub fn layout_tags(
    original: &str,
    range_start: usize,
    spans: &mut [CandidateSpan],
    scheme: &TagScheme,
    center: bool,
) -> usize {
    let bytes = original.as_bytes();
    let mut next = 0;
    let mut covered_until = range_start;

    for span in spans.iter_mut() {
        if next >= scheme.capacity() || span.doc_start < covered_until {
            span.is_masked_neighbor = next < scheme.capacity();
            span.tag.clear();
            continue;
        }
        span.is_masked_neighbor = false;
        span.tag = scheme.generate(next);
        next += 1;

        let rel = span.doc_start - range_start;
        let from = rel + center_pad(span, span.tag.len(), center);
        let room = tag_room(bytes, rel + span.doc_len, from, span.tag.len());
        covered_until = range_start + from + room;
    }
    next
}

/// Render `original` (the document text starting at `range_start`) with the tags already
/// assigned to `spans`. Sets each span's `overlay_start`.
pub fn render(
    original: &str,
    range_start: usize,
    spans: &mut [CandidateSpan],
    options: OverlayOptions,
) -> OverlayBuffer {
    let bytes = original.as_bytes();
    let mut work = bytes.to_vec();
    let mask = MASK_CHAR as u8;

    for span in spans.iter() {
        let blank = span.has_visible_tag() || (span.is_masked_neighbor && options.hide_matched_text);
        if blank {
            let rel = span.doc_start - range_start;
            work[rel..rel + span.doc_len].fill(mask);
        }
    }

    // (relative position, span index, inserted tag tail)
    let mut inserts: Vec<(usize, usize, &str)> = Vec::new();
    let mut tag_starts: Vec<(usize, usize)> = Vec::new();
    for (idx, span) in spans.iter().enumerate() {
        if !span.has_visible_tag() {
            continue;
        }
        let rel = span.doc_start - range_start;
        let from = rel + center_pad(span, span.tag.len(), options.center);
        let room = tag_room(bytes, rel + span.doc_len, from, span.tag.len());
        work[from..from + room].copy_from_slice(&span.tag.as_bytes()[..room]);
        tag_starts.push((idx, from));
        if room < span.tag.len() {
            inserts.push((from + room, idx, &span.tag[room..]));
        }
    }

    let mut ledger = LineFeedLedger::default();
    let mut out = Vec::with_capacity(work.len() + inserts.len() * 2);
    let mut copied = 0;
    let mut line = 0;
    for (rel, _, tail) in &inserts {
        line += bytes[copied..*rel].iter().filter(|b| **b == b'\n').count();
        out.extend_from_slice(&work[copied..*rel]);
        ledger.record(LedgerEntry {
            line,
            doc_pos: range_start + rel,
            overlay_pos: range_start + out.len(),
            count: tail.len(),
        });
        out.extend_from_slice(tail.as_bytes());
        copied = *rel;
    }
    out.extend_from_slice(&work[copied..]);

    // Every replaced byte is ASCII and every masked region covers whole characters.
    let text = String::from_utf8_lossy(&out).into_owned();

    for span in spans.iter_mut() {
        span.overlay_start = ledger.document_to_overlay(span.doc_start);
    }
    let placements = tag_starts
        .into_iter()
        .map(|(idx, rel)| TagPlacement {
            span: idx,
            overlay_pos: ledger.document_to_overlay(range_start + rel),
            len: spans[idx].tag.len(),
        })
        .collect();

    OverlayBuffer {
        range_start,
        original: original.to_string(),
        text,
        ledger,
        placements,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::CaseRule;
    use crate::index::{ScanOptions, scan};
    use crate::span::Granularity;
    use pretty_assertions::assert_eq;

    fn tagged(
        text: &str,
        base: usize,
        granularity: Granularity,
        scheme: TagScheme,
        options: OverlayOptions,
    ) -> (Vec<CandidateSpan>, OverlayBuffer) {
        let scan_options = ScanOptions {
            limit: scheme.capacity(),
            case_rule: CaseRule {
                case_sensitive: true,
                smart_case: false,
            },
        };
        let mut spans = scan(text, base, &granularity, &scan_options).unwrap();
        layout_tags(text, base, &mut spans, &scheme, options.center);
        let overlay = render(text, base, &mut spans, options);
        (spans, overlay)
    }

    #[test]
    fn words_are_masked_and_tagged() {
        let (_, overlay) = tagged(
            "foo bar\tbaz",
            0,
            Granularity::Word,
            TagScheme::default(),
            OverlayOptions::default(),
        );
        assert_eq!(overlay.text(), "a   b  \tc  ");
        assert!(overlay.ledger().is_empty());
    }

    #[test]
    fn mask_counts_bytes_not_chars() {
        let (_, overlay) = tagged(
            "é ü",
            0,
            Granularity::Word,
            TagScheme::default(),
            OverlayOptions::default(),
        );
        assert_eq!(overlay.text(), "a  b ");
        assert_eq!(overlay.text().len(), "é ü".len());
    }

    #[test]
    fn centering_pads_long_words_only() {
        let (_, overlay) = tagged(
            "hello ab",
            0,
            Granularity::Word,
            TagScheme::default(),
            OverlayOptions {
                center: true,
                hide_matched_text: false,
            },
        );
        assert_eq!(overlay.text(), "  a   b ");
    }

    #[test]
    fn overflow_at_line_end_is_inserted_and_recorded() {
        let scheme = TagScheme {
            include_single_char: false,
            uppercase: false,
        };
        let (spans, overlay) = tagged(
            "x\ny x",
            10,
            Granularity::Word,
            scheme,
            OverlayOptions::default(),
        );
        // "x" gets "aa": one byte fits, one is inserted before the newline. "y" has the
        // following space as room; the last "x" overflows at the range end.
        assert_eq!(overlay.text(), "aa\nabac");
        assert_eq!(
            overlay.ledger().entries(),
            &[
                LedgerEntry {
                    line: 0,
                    doc_pos: 11,
                    overlay_pos: 11,
                    count: 1
                },
                LedgerEntry {
                    line: 1,
                    doc_pos: 15,
                    overlay_pos: 16,
                    count: 1
                },
            ]
        );
        assert_eq!(spans[1].overlay_start, 13);
        assert_eq!(overlay.overlay_to_document(13), 12);
        assert_eq!(overlay.overlay_to_document(11), 11);
        assert_eq!(overlay.document_to_overlay(11), 12);
        assert_eq!(overlay.ledger().filler_on_line(1), 1);
    }

    #[test]
    fn adjacent_chars_become_masked_neighbors() {
        let scheme = TagScheme {
            include_single_char: false,
            uppercase: false,
        };
        let (spans, overlay) = tagged(
            "aab a",
            0,
            Granularity::Char('a'),
            scheme,
            OverlayOptions::default(),
        );
        assert!(!spans[0].is_masked_neighbor);
        assert!(spans[1].is_masked_neighbor);
        assert!(!spans[2].is_masked_neighbor);
        assert_eq!(spans[2].tag, "ab");
        assert_eq!(overlay.text(), "aab ab");
        assert_eq!(overlay.placements().len(), 2);
    }

    #[test]
    fn hidden_neighbors_are_blanked() {
        let scheme = TagScheme {
            include_single_char: false,
            uppercase: false,
        };
        let (_, overlay) = tagged(
            "aaa",
            0,
            Granularity::Char('a'),
            scheme,
            OverlayOptions {
                center: false,
                hide_matched_text: true,
            },
        );
        // Span 0 is tagged "aa" over bytes 0..2; span 1 is hidden under it; span 2 is
        // tagged "ab", which overflows at the range end.
        assert_eq!(overlay.text(), "aaab");
    }

    #[test]
    fn tag_overflow_stops_at_tab() {
        let scheme = TagScheme {
            include_single_char: false,
            uppercase: false,
        };
        let (_, overlay) = tagged("x\ty", 0, Granularity::Word, scheme, OverlayOptions::default());
        assert_eq!(overlay.text(), "aa\tab");
        assert_eq!(overlay.ledger().total(), 2);
        assert_eq!(overlay.ledger().filler_on_line(0), 2);
    }
}
