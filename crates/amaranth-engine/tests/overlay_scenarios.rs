//! End-to-end overlay behavior, driven the way a host text surface drives
//! the engine: build a document, move selection and focus around, recompute,
//! and check the published instructions.

use pretty_assertions::assert_eq;
use rstest::rstest;

use amaranth_engine::editing::{Document, Selection, SelectionSet, Span};
use amaranth_engine::overlay::marks::{self, MarkKind};
use amaranth_engine::overlay::{
    ExtractionStrategy, OverlayEngine, OverlaySet, StyleClass,
};

const SCENARIO: &str = "# Heading\n\nThis is **bold** and *italic*.\n\n- List item";

fn doc(src: &str) -> Document {
    Document::from_bytes(src.as_bytes()).unwrap()
}

fn hide_spans(set: &OverlaySet) -> Vec<Span> {
    set.hides().map(|o| o.span).collect()
}

fn style_spans(set: &OverlaySet, class: StyleClass) -> Vec<Span> {
    set.styles_of(class).map(|o| o.span).collect()
}

#[rstest]
#[case(ExtractionStrategy::LineScan)]
#[case(ExtractionStrategy::Tree)]
fn recompute_twice_yields_identical_sets(#[case] strategy: ExtractionStrategy) {
    let mut d = doc(SCENARIO);
    d.set_focus(false);
    let mut engine = OverlayEngine::new(strategy);
    let first = engine.recompute(&d).clone();
    let second = engine.recompute(&d).clone();
    assert_eq!(first, second);
}

#[rstest]
#[case(1)]
#[case(2)]
#[case(3)]
#[case(4)]
#[case(5)]
#[case(6)]
fn heading_mark_covers_prefix_exactly(#[case] n: usize) {
    let src = format!("{} {}", "#".repeat(n), "text");
    let d = doc(&src);
    let heading_marks: Vec<_> = marks::extract(&d)
        .into_iter()
        .filter(|m| m.kind == MarkKind::Heading)
        .collect();
    assert_eq!(heading_marks.len(), 1);
    assert_eq!(heading_marks[0].span, Span::new(0, n + 1));
}

#[test]
fn bold_marks_sit_on_literal_delimiters() {
    let d = doc("This is **bold** text");
    let bold: Vec<Span> = marks::extract(&d)
        .into_iter()
        .filter(|m| m.kind == MarkKind::Bold)
        .map(|m| m.span)
        .collect();
    assert_eq!(bold, vec![Span::new(8, 10), Span::new(14, 16)]);
}

#[test]
fn list_marks_cover_two_byte_markers() {
    let d = doc("- Item 1\n- Item 2");
    let list: Vec<Span> = marks::extract(&d)
        .into_iter()
        .filter(|m| m.kind == MarkKind::List)
        .map(|m| m.span)
        .collect();
    assert_eq!(list, vec![Span::new(0, 2), Span::new(9, 11)]);
}

#[test]
fn task_marks_cover_marker_and_checkbox() {
    let d = doc("- [ ] Todo\n- [x] Done");
    let tasks: Vec<Span> = marks::extract(&d)
        .into_iter()
        .filter(|m| m.kind == MarkKind::TaskList)
        .map(|m| m.span)
        .collect();
    assert_eq!(tasks, vec![Span::new(0, 6), Span::new(11, 17)]);
}

#[test]
fn unfocused_forces_preview_regardless_of_selection() {
    let mut d = doc(SCENARIO);
    // Selection parked on the heading line, which would reveal it when
    // focused.
    d.set_selection(SelectionSet::single(2));
    d.set_focus(false);
    let mut engine = OverlayEngine::default();
    let set = engine.recompute(&d).clone();
    assert!(hide_spans(&set).contains(&Span::new(0, 2)));
}

#[test]
fn cursor_reveals_whole_line_and_rehides_after_leaving() {
    let mut d = doc(SCENARIO);
    let mut engine = OverlayEngine::default();

    // Cursor at end of the heading text still reveals the heading's marks:
    // line granularity, not character granularity.
    d.set_selection(SelectionSet::single(9));
    let revealed = engine.recompute(&d).clone();
    assert!(!hide_spans(&revealed).contains(&Span::new(0, 2)));

    // Moving to another line re-hides them.
    d.set_selection(SelectionSet::single(45));
    let hidden = engine.recompute(&d).clone();
    assert!(hide_spans(&hidden).contains(&Span::new(0, 2)));
}

#[test]
fn preview_never_mutates_the_buffer() {
    let mut d = doc(SCENARIO);
    let before = d.text();
    let mut engine = OverlayEngine::default();

    for _ in 0..3 {
        for offset in [0, 7, 15, 33, 50] {
            d.set_selection(SelectionSet::single(offset));
            engine.recompute(&d);
        }
        d.set_focus(false);
        engine.recompute(&d);
        d.set_focus(true);
        engine.recompute(&d);
    }

    assert_eq!(d.text(), before);
}

#[test]
fn scenario_unfocused_has_exactly_the_expected_hides() {
    let mut d = doc(SCENARIO);
    d.set_focus(false);
    let mut engine = OverlayEngine::default();
    let set = engine.recompute(&d).clone();

    let hides = hide_spans(&set);
    // 1 heading + 2 bold + 2 italic + 1 list.
    assert_eq!(hides.len(), 6);
    assert!(hides.contains(&Span::new(0, 2)), "heading prefix");
    assert!(hides.contains(&Span::new(19, 21)), "bold open");
    assert!(hides.contains(&Span::new(25, 27)), "bold close");
    assert!(hides.contains(&Span::new(32, 33)), "italic open");
    assert!(hides.contains(&Span::new(39, 40)), "italic close");
    assert!(hides.contains(&Span::new(43, 45)), "list marker");

    // Corresponding style overlays exist alongside the hides.
    assert_eq!(style_spans(&set, StyleClass::Bold).len(), 2); // heading body + bold span
    assert_eq!(style_spans(&set, StyleClass::Italic), vec![Span::new(33, 39)]);
}

#[test]
fn scenario_focused_on_heading_drops_only_heading_hides() {
    let mut d = doc(SCENARIO);
    d.set_selection(SelectionSet::single(4));
    d.set_focus(true);
    let mut engine = OverlayEngine::default();
    let set = engine.recompute(&d).clone();

    let hides = hide_spans(&set);
    assert!(!hides.contains(&Span::new(0, 2)), "heading revealed");
    assert_eq!(hides.len(), 5);
    assert!(hides.contains(&Span::new(19, 21)));
    assert!(hides.contains(&Span::new(43, 45)));
}

#[test]
fn multi_line_selection_reveals_every_touched_line() {
    let mut d = doc(SCENARIO);
    // Selection from inside the heading down into the bold/italic line.
    d.set_selection(SelectionSet::from_ranges(vec![Selection::new(4, 20)]));
    let mut engine = OverlayEngine::default();
    let set = engine.recompute(&d).clone();

    // Only the list line still contributes a hide.
    assert_eq!(hide_spans(&set), vec![Span::new(43, 45)]);
}

#[test]
fn edits_shift_overlays_with_the_text() {
    use amaranth_engine::editing::Cmd;

    let mut d = doc("# Title\n\n**b**");
    d.set_focus(false);
    let mut engine = OverlayEngine::default();
    engine.recompute(&d);

    // Grow the heading; overlays on the later line must follow.
    d.apply(Cmd::InsertText {
        at: 7,
        text: " grows".to_string(),
    });
    let set = engine.recompute(&d).clone();
    assert!(hide_spans(&set).contains(&Span::new(15, 17)), "bold open moved");
}

#[test]
fn strategies_agree_on_the_basic_scenario_hides() {
    let mut d = doc(SCENARIO);
    d.set_focus(false);

    let mut scan_engine = OverlayEngine::new(ExtractionStrategy::LineScan);
    let scan_hides = hide_spans(&scan_engine.recompute(&d).clone());

    let mut tree_engine = OverlayEngine::new(ExtractionStrategy::Tree);
    let tree_hides = hide_spans(&tree_engine.recompute(&d).clone());

    assert_eq!(scan_hides, tree_hides);
}
