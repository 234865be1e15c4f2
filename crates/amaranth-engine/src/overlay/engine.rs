//! Overlay recompute orchestration.
//!
//! The engine owns everything per-document that the overlay computation
//! needs across passes: the extraction strategy, the debounce scheduler for
//! tree reparses, and the last published overlay set. It is driven by the
//! host on every document change, selection change and focus change, and
//! publishes a freshly built overlay set each time; nothing is patched
//! incrementally. A full rebuild is O(document length) per pass and is the
//! dominant but bounded cost of a keystroke.

use std::time::Instant;

use crate::editing::{Document, LineRef, lines_with_spans};

use super::marks::{self, FormatMark, MarkKind};
use super::scan;
use super::scheduler::DebounceScheduler;
use super::visibility::{SourceLines, mark_is_source};
use super::widget::InlineWidget;
use super::{LineClass, Overlay, OverlayEffect, OverlaySet, StyleClass};

/// Which extraction path feeds the overlay set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExtractionStrategy {
    /// Per-line pattern rules, synchronous on every change. The default:
    /// lowest latency, simplest offset invariants.
    #[default]
    LineScan,
    /// Tree-sitter format marks. Higher fidelity on nested or ambiguous
    /// constructs; depends on the debounced parse tree being fresh.
    Tree,
}

pub struct OverlayEngine {
    strategy: ExtractionStrategy,
    scheduler: DebounceScheduler,
    /// The last successfully computed set, retained as the published state
    /// until the next successful recompute.
    current: OverlaySet,
}

impl OverlayEngine {
    #[must_use]
    pub fn new(strategy: ExtractionStrategy) -> Self {
        Self {
            strategy,
            scheduler: DebounceScheduler::default(),
            current: OverlaySet::default(),
        }
    }

    #[must_use]
    pub fn with_scheduler(strategy: ExtractionStrategy, scheduler: DebounceScheduler) -> Self {
        Self {
            strategy,
            scheduler,
            current: OverlaySet::default(),
        }
    }

    #[must_use]
    pub fn strategy(&self) -> ExtractionStrategy {
        self.strategy
    }

    /// The currently published overlay set.
    #[must_use]
    pub fn current(&self) -> &OverlaySet {
        &self.current
    }

    /// Notify the engine of a buffer edit; schedules a debounced reparse.
    pub fn note_edit(&mut self, now: Instant) {
        self.scheduler.schedule(now);
    }

    /// Poll the debounce timer. True when the host should call
    /// [`Document::reparse`] before the next recompute.
    pub fn needs_reparse(&mut self, now: Instant, text: &str) -> bool {
        self.scheduler.poll(now, text)
    }

    /// Cancel pending work on teardown.
    pub fn shutdown(&mut self) {
        self.scheduler.cancel();
    }

    /// Rebuild and publish the overlay set for the document's current
    /// (buffer, selection, focus) state.
    ///
    /// Idempotent: identical inputs produce structurally identical sets.
    /// If the tree strategy has no tree to work from, the prior valid set
    /// stays published until a successful pass.
    pub fn recompute(&mut self, doc: &Document) -> &OverlaySet {
        let source = SourceLines::compute(doc.buffer(), doc.selection(), doc.focus());

        let overlays = match self.strategy {
            ExtractionStrategy::LineScan => line_scan_overlays(doc, &source),
            ExtractionStrategy::Tree => {
                if doc.tree().is_none() {
                    tracing::debug!("no parse tree yet; retaining previous overlay set");
                    return &self.current;
                }
                tree_overlays(doc, &source)
            }
        };

        self.current = OverlaySet::from_overlays(overlays);
        tracing::debug!(
            version = doc.version(),
            overlays = self.current.len(),
            focus = doc.focus(),
            "recomputed overlay set"
        );
        &self.current
    }
}

impl Default for OverlayEngine {
    fn default() -> Self {
        Self::new(ExtractionStrategy::default())
    }
}

/// The steady-state path: scan every non-blank preview-mode line.
fn line_scan_overlays(doc: &Document, source: &SourceLines) -> Vec<Overlay> {
    let mut overlays = Vec::new();
    for line in lines_with_spans(doc.buffer()) {
        if line.is_blank() || source.contains(line.number) {
            continue;
        }
        overlays.extend(scan::scan_line(&line.text, line.span.start));
    }
    overlays
}

/// The record-based path: convert extracted format marks into overlays,
/// applying mark-granularity visibility.
fn tree_overlays(doc: &Document, source: &SourceLines) -> Vec<Overlay> {
    let lines: Vec<LineRef> = lines_with_spans(doc.buffer()).collect();
    let marks = marks::extract(doc);

    let mut overlays = Vec::new();
    // Pending open delimiter per symmetric kind, paired with its closer to
    // recover the styled content span between them.
    let mut pending: [Option<FormatMark>; 3] = [None, None, None];
    let pending_slot = |kind: MarkKind| match kind {
        MarkKind::Bold => Some(0),
        MarkKind::Italic => Some(1),
        MarkKind::Strikethrough => Some(2),
        _ => None,
    };

    for mark in marks {
        let line_idx = owning_line(&lines, mark.span.start);
        let Some(line) = lines.get(line_idx) else {
            continue;
        };
        if mark_is_source(mark.span, line.number, doc.selection(), source) {
            if let Some(slot) = pending_slot(mark.kind) {
                pending[slot] = None;
            }
            continue;
        }

        overlays.push(Overlay::hide(mark.span));

        match mark.kind {
            MarkKind::Heading => {
                let level = mark.level.unwrap_or(1);
                overlays.push(Overlay::new(
                    line.span,
                    OverlayEffect::LineStyle(LineClass::Heading(level)),
                ));
                overlays.push(Overlay::style(
                    crate::editing::Span::new(mark.span.end, line.span.end),
                    StyleClass::Bold,
                ));
            }
            MarkKind::List | MarkKind::TaskList => {
                let widget = marker_widget(doc, &mark);
                overlays.push(Overlay::new(mark.span, OverlayEffect::Replace(widget)));
                overlays.push(Overlay::new(
                    line.span,
                    OverlayEffect::LineStyle(LineClass::ListItem),
                ));
            }
            MarkKind::Bold | MarkKind::Italic | MarkKind::Strikethrough => {
                let slot = pending_slot(mark.kind).expect("symmetric kind");
                match pending[slot].take() {
                    Some(open) if open.span.end <= mark.span.start => {
                        let class = match mark.kind {
                            MarkKind::Bold => StyleClass::Bold,
                            MarkKind::Italic => StyleClass::Italic,
                            _ => StyleClass::Strikethrough,
                        };
                        overlays.push(Overlay::style(
                            crate::editing::Span::new(open.span.end, mark.span.start),
                            class,
                        ));
                    }
                    _ => pending[slot] = Some(mark),
                }
            }
        }
    }

    overlays
}

/// Index of the line containing `offset` (last line whose start is <= it).
fn owning_line(lines: &[LineRef], offset: usize) -> usize {
    lines
        .partition_point(|l| l.span.start <= offset)
        .saturating_sub(1)
}

/// Synthesized replacement for a list/task marker mark.
fn marker_widget(doc: &Document, mark: &FormatMark) -> InlineWidget {
    let text = doc.slice(mark.span);
    if mark.kind == MarkKind::TaskList {
        InlineWidget::Checkbox {
            checked: text.contains(['x', 'X']),
        }
    } else if text.trim_end().ends_with('.') {
        InlineWidget::Ordinal {
            text: text.trim_end().to_string(),
        }
    } else {
        InlineWidget::Bullet
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editing::{Selection, SelectionSet, Span};
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = "# Heading\n\nThis is **bold** and *italic*.\n\n- List item";

    fn doc(src: &str) -> Document {
        Document::from_bytes(src.as_bytes()).unwrap()
    }

    #[test]
    fn recompute_is_idempotent() {
        let mut d = doc(SAMPLE);
        d.set_focus(false);
        let mut engine = OverlayEngine::default();
        let first = engine.recompute(&d).clone();
        let second = engine.recompute(&d).clone();
        assert_eq!(first, second);
    }

    #[test]
    fn unfocused_document_hides_all_syntax() {
        let mut d = doc(SAMPLE);
        d.set_focus(false);
        let mut engine = OverlayEngine::default();
        let set = engine.recompute(&d).clone();

        // 1 heading + 2 bold + 2 italic + 1 list hide-range.
        assert_eq!(set.hides().count(), 6);
    }

    #[test]
    fn cursor_on_heading_line_reveals_it() {
        let mut d = doc(SAMPLE);
        d.set_selection(SelectionSet::single(3));
        d.set_focus(true);
        let mut engine = OverlayEngine::default();
        let set = engine.recompute(&d).clone();

        // Heading hide-range absent; bold, italic and list hides remain.
        assert!(set.hides().all(|o| o.span != Span::new(0, 2)));
        assert_eq!(set.hides().count(), 5);
    }

    #[test]
    fn blank_lines_emit_no_overlays() {
        let mut d = doc("one\n\n\ntwo");
        d.set_focus(false);
        let mut engine = OverlayEngine::default();
        let set = engine.recompute(&d).clone();
        assert!(set.is_empty());
    }

    #[test]
    fn selection_and_focus_changes_leave_buffer_untouched() {
        let mut d = doc(SAMPLE);
        let before = d.text();
        let mut engine = OverlayEngine::default();
        for offset in [0, 5, 12, 30] {
            d.set_selection(SelectionSet::single(offset));
            engine.recompute(&d);
            d.set_focus(false);
            engine.recompute(&d);
            d.set_focus(true);
            engine.recompute(&d);
        }
        assert_eq!(d.text(), before);
    }

    #[test]
    fn moving_cursor_off_line_rehides_marks() {
        let mut d = doc(SAMPLE);
        let mut engine = OverlayEngine::default();

        d.set_selection(SelectionSet::single(3));
        let on = engine.recompute(&d).clone();
        assert!(on.hides().all(|o| o.span != Span::new(0, 2)));

        // Cursor down to the bold/italic line (line 3 starts at offset 11).
        d.set_selection(SelectionSet::single(12));
        let off = engine.recompute(&d).clone();
        assert!(off.hides().any(|o| o.span == Span::new(0, 2)));
    }

    #[test]
    fn multi_cursor_reveals_every_cursor_line() {
        let mut d = doc(SAMPLE);
        // Cursors on the heading line and the list line.
        d.set_selection(SelectionSet::from_ranges(vec![
            Selection::cursor(1),
            Selection::cursor(SAMPLE.len() - 2),
        ]));
        let mut engine = OverlayEngine::default();
        let set = engine.recompute(&d).clone();
        // Only the bold/italic line still contributes hides: 2 + 2.
        assert_eq!(set.hides().count(), 4);
    }

    #[test]
    fn tree_strategy_produces_marks_based_hides() {
        let mut d = doc(SAMPLE);
        d.set_focus(false);
        let mut engine = OverlayEngine::new(ExtractionStrategy::Tree);
        let set = engine.recompute(&d).clone();
        assert!(set.hides().any(|o| o.span == Span::new(0, 2)));
        assert!(set.hides().any(|o| o.span == Span::new(19, 21)));
        assert!(
            set.styles_of(StyleClass::Bold)
                .any(|o| o.span == Span::new(21, 25))
        );
    }

    #[test]
    fn engine_polls_scheduler_for_reparse() {
        use std::time::{Duration, Instant};
        let mut engine = OverlayEngine::default();
        let t0 = Instant::now();
        engine.note_edit(t0);
        assert!(!engine.needs_reparse(t0, "text"));
        assert!(engine.needs_reparse(t0 + Duration::from_millis(150), "text"));
    }
}
