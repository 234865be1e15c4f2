//! Per-line pattern scanning: the low-latency overlay path.
//!
//! Runs synchronously on every state change, one line at a time, straight
//! against the line text. No tree is built; latency matters more here than
//! exhaustive correctness, which is what the tree-based [`super::marks`]
//! path is for.
//!
//! Rule order is part of the contract: the heading and list rules anchor at
//! line start and run once (mutually exclusive), then the inline rules
//! (strong, emphasis, strikethrough) run as repeated scans over the rest of
//! the line and may co-occur and nest. Overlapping style ranges from
//! different passes are allowed and compose.
//!
//! The `regex` crate has no lookaround, so "a single `*` that is not part
//! of `**`" cannot be written as one pattern: instead the strong pass
//! blanks the delimiter bytes it consumed in a scratch copy of the line,
//! and the emphasis pass runs over that scratch. A consumed byte can never
//! act as an emphasis delimiter again (so `***text***` never double-hides),
//! but it stays transparent to emphasis content, which keeps the combined
//! bold+italic case rendering with every delimiter hidden exactly once.

use std::sync::LazyLock;

use regex::Regex;

use super::widget::InlineWidget;
use super::{LineClass, Overlay, OverlayEffect, StyleClass};
use crate::editing::Span;

static HEADING_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(#{1,6})\s+").unwrap());
static MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([-*+]|\d+\.)\s+(\[[ xX]\]\s+)?").unwrap());
static BOLD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*\*(.+?)\*\*").unwrap());
static ITALIC_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*([^*]+)\*").unwrap());
static STRIKE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"~~(.+?)~~").unwrap());

/// Scan one line and emit its preview-mode overlays.
///
/// `line_text` must not contain the trailing newline; `line_offset` is the
/// byte offset of the line start in the buffer, added to every emitted span.
/// Pure function: no state survives between lines or between passes.
#[must_use]
pub fn scan_line(line_text: &str, line_offset: usize) -> Vec<Overlay> {
    if line_text.trim().is_empty() {
        return Vec::new();
    }

    let mut overlays = Vec::new();
    let at = |start: usize, end: usize| Span::new(line_offset + start, line_offset + end);

    // Line-start rules, mutually exclusive: a line is a heading or a list
    // item, never both.
    let mut rest_start = 0;
    if let Some(caps) = HEADING_RE.captures(line_text) {
        let level = caps[1].len() as u8;
        let prefix_end = caps.get(0).unwrap().end();
        overlays.push(Overlay::hide(at(0, prefix_end)));
        overlays.push(Overlay::new(
            at(0, line_text.len()),
            OverlayEffect::LineStyle(LineClass::Heading(level)),
        ));
        overlays.push(Overlay::style(
            at(prefix_end, line_text.len()),
            StyleClass::Bold,
        ));
        rest_start = prefix_end;
    } else if let Some(caps) = MARKER_RE.captures(line_text) {
        let marker = caps.get(1).unwrap();
        let whole = caps.get(0).unwrap();
        let widget = match caps.get(2) {
            Some(checkbox) => InlineWidget::Checkbox {
                checked: checkbox.as_str().contains(['x', 'X']),
            },
            None if marker.as_str().ends_with('.') => InlineWidget::Ordinal {
                text: marker.as_str().to_string(),
            },
            None => InlineWidget::Bullet,
        };
        overlays.push(Overlay::hide(at(0, whole.end())));
        overlays.push(Overlay::new(
            at(0, whole.end()),
            OverlayEffect::Replace(widget),
        ));
        overlays.push(Overlay::new(
            at(0, line_text.len()),
            OverlayEffect::LineStyle(LineClass::ListItem),
        ));
        rest_start = whole.end();
    }

    // Inline rules over the remainder of the line.
    let rest = &line_text[rest_start..];
    let base = line_offset + rest_start;
    overlays.extend(scan_inline(rest, base));

    overlays
}

/// The repeatable inline passes: strong, then emphasis over a scratch with
/// strong's delimiters blanked, then strikethrough.
fn scan_inline(text: &str, base: usize) -> Vec<Overlay> {
    let mut overlays = Vec::new();
    let at = |start: usize, end: usize| Span::new(base + start, base + end);
    let mut scratch = text.as_bytes().to_vec();

    for m in BOLD_RE.find_iter(text) {
        let (s, e) = (m.start(), m.end());
        overlays.push(Overlay::hide(at(s, s + 2)));
        overlays.push(Overlay::hide(at(e - 2, e)));
        overlays.push(Overlay::style(at(s + 2, e - 2), StyleClass::Bold));
        for i in [s, s + 1, e - 2, e - 1] {
            scratch[i] = 0;
        }
    }

    // NUL never appears in line text, so the scratch stays valid UTF-8.
    let masked = String::from_utf8(scratch).unwrap_or_else(|_| text.to_string());

    for m in ITALIC_RE.find_iter(&masked) {
        let (s, e) = (m.start(), m.end());
        overlays.push(Overlay::hide(at(s, s + 1)));
        overlays.push(Overlay::hide(at(e - 1, e)));
        overlays.push(Overlay::style(at(s + 1, e - 1), StyleClass::Italic));
    }

    for m in STRIKE_RE.find_iter(&masked) {
        let (s, e) = (m.start(), m.end());
        overlays.push(Overlay::hide(at(s, s + 2)));
        overlays.push(Overlay::hide(at(e - 2, e)));
        overlays.push(Overlay::style(at(s + 2, e - 2), StyleClass::Strikethrough));
    }

    overlays
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn hides(overlays: &[Overlay]) -> Vec<Span> {
        overlays
            .iter()
            .filter(|o| matches!(o.effect, OverlayEffect::Hide))
            .map(|o| o.span)
            .collect()
    }

    fn styles(overlays: &[Overlay], class: StyleClass) -> Vec<Span> {
        overlays
            .iter()
            .filter(|o| o.effect == OverlayEffect::Style(class))
            .map(|o| o.span)
            .collect()
    }

    #[rstest]
    #[case("# Heading", 1)]
    #[case("## Heading", 2)]
    #[case("### Heading", 3)]
    #[case("###### Heading", 6)]
    fn heading_prefix_is_hidden_and_tagged(#[case] line: &str, #[case] level: u8) {
        let overlays = scan_line(line, 0);
        let n = level as usize;
        assert_eq!(hides(&overlays), vec![Span::new(0, n + 1)]);
        assert!(overlays.iter().any(|o| o.effect
            == OverlayEffect::LineStyle(LineClass::Heading(level))
            && o.span == Span::new(0, line.len())));
        assert_eq!(
            styles(&overlays, StyleClass::Bold),
            vec![Span::new(n + 1, line.len())]
        );
    }

    #[test]
    fn seven_hashes_is_not_a_heading() {
        let overlays = scan_line("####### nope", 0);
        assert!(hides(&overlays).is_empty());
    }

    #[test]
    fn blank_line_emits_nothing() {
        assert!(scan_line("", 5).is_empty());
        assert!(scan_line("   ", 5).is_empty());
    }

    #[test]
    fn bullet_marker_hidden_and_replaced() {
        let overlays = scan_line("- Item 1", 0);
        assert_eq!(hides(&overlays), vec![Span::new(0, 2)]);
        assert!(overlays.iter().any(|o| matches!(
            &o.effect,
            OverlayEffect::Replace(InlineWidget::Bullet)
        )));
    }

    #[test]
    fn ordered_marker_keeps_ordinal_text() {
        let overlays = scan_line("12. twelfth", 0);
        assert_eq!(hides(&overlays), vec![Span::new(0, 4)]);
        let widget = overlays
            .iter()
            .find_map(|o| match &o.effect {
                OverlayEffect::Replace(w) => Some(w.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(
            widget,
            InlineWidget::Ordinal {
                text: "12.".to_string()
            }
        );
    }

    #[rstest]
    #[case("- [ ] Todo", false)]
    #[case("- [x] Done", true)]
    fn task_marker_covers_checkbox(#[case] line: &str, #[case] checked: bool) {
        let overlays = scan_line(line, 0);
        assert_eq!(hides(&overlays), vec![Span::new(0, 6)]);
        assert!(overlays.iter().any(|o| o.effect
            == OverlayEffect::Replace(InlineWidget::Checkbox { checked })));
    }

    #[test]
    fn bold_delimiters_hidden_at_literal_positions() {
        // "This is **bold** text": delimiters at 8..10 and 14..16.
        let overlays = scan_line("This is **bold** text", 0);
        assert_eq!(hides(&overlays), vec![Span::new(8, 10), Span::new(14, 16)]);
        assert_eq!(
            styles(&overlays, StyleClass::Bold),
            vec![Span::new(10, 14)]
        );
    }

    #[test]
    fn italic_excludes_strong_delimiters() {
        let overlays = scan_line("**b** *i*", 0);
        assert_eq!(
            styles(&overlays, StyleClass::Italic),
            vec![Span::new(7, 8)]
        );
        assert_eq!(styles(&overlays, StyleClass::Bold), vec![Span::new(2, 3)]);
    }

    #[test]
    fn strikethrough_pairs_hidden() {
        let overlays = scan_line("a ~~gone~~ b", 0);
        assert_eq!(hides(&overlays), vec![Span::new(2, 4), Span::new(8, 10)]);
        assert_eq!(
            styles(&overlays, StyleClass::Strikethrough),
            vec![Span::new(4, 8)]
        );
    }

    #[test]
    fn repeated_bold_spans_each_match() {
        let overlays = scan_line("**a** mid **b**", 0);
        assert_eq!(styles(&overlays, StyleClass::Bold).len(), 2);
        assert_eq!(hides(&overlays).len(), 4);
    }

    #[test]
    fn inline_rules_run_on_heading_remainder() {
        let overlays = scan_line("# Big **deal**", 0);
        // Heading prefix hide plus the two bold delimiter hides.
        assert_eq!(hides(&overlays).len(), 3);
        assert_eq!(
            styles(&overlays, StyleClass::Bold).len(),
            2 // heading remainder + inner bold span
        );
    }

    #[test]
    fn triple_star_hides_each_delimiter_byte_once() {
        let overlays = scan_line("***text***", 0);
        let mut hidden = vec![false; 10];
        for sp in hides(&overlays) {
            for i in sp.start..sp.end {
                assert!(!hidden[i], "byte {i} hidden twice");
                hidden[i] = true;
            }
        }
        // All six delimiter bytes hidden, text bytes untouched.
        assert_eq!(&hidden[0..3], &[true, true, true]);
        assert_eq!(&hidden[7..10], &[true, true, true]);
        assert!(hidden[3..7].iter().all(|h| !h));
        assert!(!styles(&overlays, StyleClass::Bold).is_empty());
        assert!(!styles(&overlays, StyleClass::Italic).is_empty());
    }

    #[test]
    fn offsets_shift_by_line_offset() {
        let overlays = scan_line("# H", 100);
        assert_eq!(hides(&overlays), vec![Span::new(100, 102)]);
    }

    #[test]
    fn nested_bold_and_italic_compose() {
        let overlays = scan_line("**bold *it* bold**", 0);
        assert_eq!(styles(&overlays, StyleClass::Bold), vec![Span::new(2, 16)]);
        assert_eq!(
            styles(&overlays, StyleClass::Italic),
            vec![Span::new(8, 10)]
        );
    }
}
