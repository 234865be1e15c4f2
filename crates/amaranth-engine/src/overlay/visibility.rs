//! Source/preview visibility policy.
//!
//! Visibility is decided at line granularity: a cursor anywhere on a line
//! reveals that whole line's syntax, and moving off re-hides it. Character-
//! precise toggling inside a wrapped line is visually unstable, so the
//! entire line is either in source mode or in preview mode, never partially.
//!
//! When the surface is unfocused the whole document is preview, regardless
//! of where the selections sit.

use xi_rope::Rope;

use crate::editing::{SelectionSet, Span};

/// The set of 1-based line numbers currently in source mode.
///
/// Derived once per recompute pass from (selection, focus) and consulted per
/// line; ranges stay inclusive so multi-line selections reveal every line
/// they touch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLines {
    focused: bool,
    ranges: Vec<(usize, usize)>,
}

impl SourceLines {
    /// Compute the revealed lines for the current selection and focus state.
    pub fn compute(rope: &Rope, selection: &SelectionSet, focus: bool) -> Self {
        if !focus {
            return Self {
                focused: false,
                ranges: Vec::new(),
            };
        }
        let mut ranges: Vec<(usize, usize)> = selection
            .iter()
            .map(|sel| sel.line_span(rope))
            .collect();
        ranges.sort_unstable();
        Self {
            focused: true,
            ranges,
        }
    }

    /// Whether the surface had focus when this was computed.
    #[must_use]
    pub fn focused(&self) -> bool {
        self.focused
    }

    /// True if line `number` (1-based) is in source mode.
    #[must_use]
    pub fn contains(&self, number: usize) -> bool {
        self.ranges
            .iter()
            .any(|&(first, last)| first <= number && number <= last)
    }

    /// True if nothing is revealed (unfocused, or no selections).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

/// Mark-granularity check used by the record-based (tree) path: a mark is in
/// source mode when any selection intersects its own span or its owning
/// line is revealed.
#[must_use]
pub fn mark_is_source(
    mark_span: Span,
    owning_line: usize,
    selection: &SelectionSet,
    source_lines: &SourceLines,
) -> bool {
    if !source_lines.focused() {
        return false;
    }
    if source_lines.contains(owning_line) {
        return true;
    }
    selection.iter().any(|sel| sel.span().intersects(mark_span))
}
