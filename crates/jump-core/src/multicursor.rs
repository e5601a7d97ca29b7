//! Batch operations over the multi-point set.
//!
//! Each operation plans its edits against the transaction buffer as it is, then applies them
//! from the highest offset down so planned offsets stay valid. Positions computed for the
//! caller (the new points of [`insert_line`]) use the ascending delta of the edits before
//! them.

use crate::error::JumpError;
use crate::span::CandidateSpan;
use crate::transaction::Transaction;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
struct PlannedEdit {
    start: usize,
    end: usize,
    text: String,
}

fn apply_plan(tx: &mut Transaction, mut plan: Vec<PlannedEdit>) -> Result<(), JumpError> {
    plan.sort_by_key(|edit| edit.start);
    for edit in plan.iter().rev() {
        tx.splice(edit.start, edit.end, &edit.text)?;
    }
    Ok(())
}

/// Bounds of the line containing `pos`, without its line ending.
fn line_bounds(text: &str, pos: usize) -> (usize, usize) {
    let start = text[..pos].rfind('\n').map_or(0, |idx| idx + 1);
    let end = text[pos..].find('\n').map_or(text.len(), |idx| pos + idx);
    let end = if end > start && text.as_bytes()[end - 1] == b'\r' && end < text.len() {
        end - 1
    } else {
        end
    };
    (start, end)
}

fn indentation(line: &str) -> &str {
    let len = line.len() - line.trim_start_matches([' ', '\t']).len();
    &line[..len]
}

fn region<'a>(tx: &'a Transaction, span: &CandidateSpan) -> Result<&'a str, JumpError> {
    let start = span.replace_offset;
    tx.buffer()
        .text()
        .get(start..start + span.doc_len)
        .ok_or(JumpError::InvalidRange {
            start: tx.buffer().origin() + start,
            end: tx.buffer().origin() + start + span.doc_len,
        })
}

/// Duplicate every member: a range is repeated right after itself, a point duplicates its
/// line below. Returns the number of copies made.
pub fn duplicate(tx: &mut Transaction, spans: &[CandidateSpan]) -> Result<usize, JumpError> {
    let mut plan = Vec::new();
    let mut last_line = None;
    for span in spans {
        if span.doc_len > 0 {
            let text = region(tx, span)?.to_string();
            let end = span.replace_offset + span.doc_len;
            plan.push(PlannedEdit {
                start: end,
                end,
                text,
            });
            continue;
        }
        let (start, end) = line_bounds(tx.buffer().text(), span.replace_offset);
        if last_line == Some(start) {
            continue;
        }
        last_line = Some(start);
        let line = &tx.buffer().text()[start..end];
        plan.push(PlannedEdit {
            start: end,
            end,
            text: format!("\n{line}"),
        });
    }
    let copies = plan.len();
    apply_plan(tx, plan)?;
    debug!(target: "multicursor", copies, "duplicate");
    Ok(copies)
}

/// Open a new line after each distinct line that holds a member (the line holding the
/// member's end), indented like that line. Returns one point per new line, ready for typing.
pub fn insert_line(
    tx: &mut Transaction,
    spans: &[CandidateSpan],
) -> Result<Vec<CandidateSpan>, JumpError> {
    let mut plan: Vec<PlannedEdit> = Vec::new();
    for span in spans {
        let text = tx.buffer().text();
        let (start, end) = line_bounds(text, span.replace_offset + span.doc_len);
        if plan.iter().any(|edit| edit.start == end) {
            continue;
        }
        plan.push(PlannedEdit {
            start: end,
            end,
            text: format!("\n{}", indentation(&text[start..end])),
        });
    }
    plan.sort_by_key(|edit| edit.start);

    let origin = tx.buffer().origin();
    let mut delta = 0;
    let mut points = Vec::with_capacity(plan.len());
    for edit in &plan {
        let pos = edit.start + delta + edit.text.len();
        delta += edit.text.len();
        let mut point = CandidateSpan::new("", origin + pos);
        point.replace_offset = pos;
        point.matches_filter = true;
        points.push(point);
    }

    apply_plan(tx, plan)?;
    debug!(target: "multicursor", lines = points.len(), "insert_line");
    Ok(points)
}

/// Rotate member texts one step forward (the last text moves to the first member). With two
/// members this swaps them.
pub fn transpose(tx: &mut Transaction, spans: &[CandidateSpan]) -> Result<(), JumpError> {
    if spans.len() < 2 {
        return Err(JumpError::NoCandidates);
    }
    let texts = spans
        .iter()
        .map(|span| region(tx, span).map(str::to_string))
        .collect::<Result<Vec<_>, _>>()?;

    let plan = spans
        .iter()
        .enumerate()
        .map(|(idx, span)| PlannedEdit {
            start: span.replace_offset,
            end: span.replace_offset + span.doc_len,
            text: texts[(idx + texts.len() - 1) % texts.len()].clone(),
        })
        .collect();
    apply_plan(tx, plan)?;
    debug!(target: "multicursor", members = spans.len(), "transpose");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::TransactionBuffer;
    use jump_core_config::ReplaceAction;
    use pretty_assertions::assert_eq;

    fn begin(text: &str, members: &[(usize, usize)]) -> (Transaction, Vec<CandidateSpan>) {
        let mut spans: Vec<CandidateSpan> = members
            .iter()
            .map(|(start, len)| {
                let mut span = CandidateSpan::new(&text[*start..start + len], *start);
                span.matches_filter = true;
                span
            })
            .collect();
        let tx = Transaction::begin(
            TransactionBuffer::new(0, text),
            &mut spans,
            ReplaceAction::Replace,
            0,
        );
        (tx, spans)
    }

    #[test]
    fn duplicate_ranges_and_point_lines() {
        let (mut tx, spans) = begin("ab cd\nxy\n", &[(0, 2), (6, 0), (7, 0)]);
        assert_eq!(duplicate(&mut tx, &spans).unwrap(), 2);
        assert_eq!(tx.buffer().text(), "abab cd\nxy\nxy\n");
        tx.verify().unwrap();
    }

    #[test]
    fn insert_line_keeps_indentation() {
        let text = "fn a() {\n    one;\n    two;\n}";
        let (mut tx, spans) = begin(text, &[(13, 0), (15, 1), (26, 0)]);
        let points = insert_line(&mut tx, &spans).unwrap();
        assert_eq!(
            tx.buffer().text(),
            "fn a() {\n    one;\n    \n    two;\n    \n}"
        );
        let offsets: Vec<usize> = points.iter().map(|p| p.replace_offset).collect();
        assert_eq!(offsets, vec![22, 36]);

        let mut points = points;
        tx.insert_char('x', &mut points).unwrap();
        assert_eq!(
            tx.buffer().text(),
            "fn a() {\n    one;\n    x\n    two;\n    x\n}"
        );
    }

    #[test]
    fn transpose_swaps_two_and_rotates_three() {
        let (mut tx, spans) = begin("one two", &[(0, 3), (4, 3)]);
        transpose(&mut tx, &spans).unwrap();
        assert_eq!(tx.buffer().text(), "two one");

        let (mut tx, spans) = begin("a bb ccc", &[(0, 1), (2, 2), (5, 3)]);
        transpose(&mut tx, &spans).unwrap();
        assert_eq!(tx.buffer().text(), "ccc a bb");
    }

    #[test]
    fn transpose_needs_two_members() {
        let (mut tx, spans) = begin("one", &[(0, 3)]);
        assert_eq!(transpose(&mut tx, &spans), Err(JumpError::NoCandidates));
    }
}
