//! Shortcut tag generation.
//!
//! Tags are bijective base-26 numerals over `a..z` (the spreadsheet column scheme):
//! `a, b, …, z, aa, ab, …, zz, aaa, …`. When single letter tags are disabled the numbering is
//! shifted by 26 so the first tag is `aa`. Tag length never decreases as the index grows, and
//! distinct indices always produce distinct tags.

use crate::span::CandidateSpan;
use jump_core_config::TagSettings;

/// Letters in the tag alphabet.
pub const ALPHABET_LEN: usize = 26;
/// Candidate cap when single letter tags are used.
pub const MAX_TAGS_WITH_SINGLE: usize = 720;
/// Candidate cap with two letter tags only.
pub const MAX_TAGS_DOUBLE_ONLY: usize = 676;

/// Tag numbering and casing for one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagScheme {
    /// Start numbering at single letters.
    pub include_single_char: bool,
    /// Emit upper-case tags.
    pub uppercase: bool,
}

impl Default for TagScheme {
    fn default() -> Self {
        Self {
            include_single_char: true,
            uppercase: false,
        }
    }
}

/// Result of feeding one more typed character to the tag prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagInputOutcome {
    /// Several tags still start with the typed text.
    Narrowed {
        /// Number of visible tags still reachable.
        remaining: usize,
    },
    /// Exactly one tag is reachable and equals the typed text.
    Resolved(usize),
    /// No tag starts with the typed text.
    Rejected,
}

impl TagScheme {
    /// Build the scheme from the `[tags]` settings.
    pub fn from_settings(settings: &TagSettings) -> Self {
        Self {
            include_single_char: settings.include_single_char,
            uppercase: settings.uppercase,
        }
    }

    /// Maximum number of candidates a session may tag.
    pub fn capacity(&self) -> usize {
        if self.include_single_char {
            MAX_TAGS_WITH_SINGLE
        } else {
            MAX_TAGS_DOUBLE_ONLY
        }
    }

    fn offset(&self) -> usize {
        if self.include_single_char {
            0
        } else {
            ALPHABET_LEN
        }
    }

    /// Tag for candidate `index`.
    pub fn generate(&self, index: usize) -> String {
        let base = if self.uppercase { b'A' } else { b'a' };
        let mut n = index + self.offset() + 1;
        let mut letters = Vec::new();
        while n > 0 {
            n -= 1;
            letters.push(base + (n % ALPHABET_LEN) as u8);
            n /= ALPHABET_LEN;
        }
        letters.reverse();
        letters.into_iter().map(char::from).collect()
    }

    /// Candidate index for `tag`, accepting either case.
    ///
    /// Returns `None` for text that is not a tag of this scheme (empty, non-letters, or a
    /// numeral outside the scheme's range).
    pub fn decode(&self, tag: &str) -> Option<usize> {
        if tag.is_empty() {
            return None;
        }
        let mut n: usize = 0;
        for ch in tag.chars() {
            let lower = ch.to_ascii_lowercase();
            if !lower.is_ascii_lowercase() {
                return None;
            }
            let digit = (lower as u8 - b'a') as usize + 1;
            n = n.checked_mul(ALPHABET_LEN)?.checked_add(digit)?;
        }
        let index = (n - 1).checked_sub(self.offset())?;
        (index < self.capacity()).then_some(index)
    }

    /// Length of the tag for candidate `index`.
    pub fn tag_len(&self, index: usize) -> usize {
        self.generate(index).len()
    }

    /// Longest tag needed to label `count` candidates.
    pub fn max_tag_len(&self, count: usize) -> usize {
        if count == 0 {
            0
        } else {
            self.tag_len(count - 1)
        }
    }
}

/// Feed the full typed text `typed` to the tag prompt.
///
/// Comparison is case insensitive. A tag that equals `typed` only resolves when no longer
/// tag extends it; otherwise the prompt keeps waiting (Enter picks the exact one, see
/// [`exact_tag`]).
pub fn narrow_tags(spans: &[CandidateSpan], typed: &str) -> TagInputOutcome {
    let typed = typed.to_ascii_lowercase();
    let mut remaining = 0;
    let mut exact = None;
    for (idx, span) in spans.iter().enumerate() {
        if !span.has_visible_tag() {
            continue;
        }
        let tag = span.tag.to_ascii_lowercase();
        if tag.starts_with(&typed) {
            remaining += 1;
            if tag == typed {
                exact = Some(idx);
            }
        }
    }
    match (remaining, exact) {
        (0, _) => TagInputOutcome::Rejected,
        (1, Some(idx)) => TagInputOutcome::Resolved(idx),
        _ => TagInputOutcome::Narrowed { remaining },
    }
}

/// Index of the span whose visible tag equals `typed` (case insensitive).
pub fn exact_tag(spans: &[CandidateSpan], typed: &str) -> Option<usize> {
    spans
        .iter()
        .position(|s| s.has_visible_tag() && s.tag.eq_ignore_ascii_case(typed))
}
