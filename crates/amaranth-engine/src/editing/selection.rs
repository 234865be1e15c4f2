use serde::{Deserialize, Serialize};
use xi_rope::Rope;

use super::lines::line_of_offset;
use super::span::Span;

/// A single selection range with anchor and head byte offsets.
///
/// The anchor is where the selection started, the head is where the cursor is
/// now. They may be in either order; use [`Selection::min`] / [`Selection::max`]
/// for ordered bounds. A "cursor" is a selection where anchor == head.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    /// Where the selection started.
    pub anchor: usize,
    /// Where the cursor is now.
    pub head: usize,
}

impl Selection {
    #[must_use]
    pub fn new(anchor: usize, head: usize) -> Self {
        Self { anchor, head }
    }

    /// A zero-width selection at `offset`.
    #[must_use]
    pub fn cursor(offset: usize) -> Self {
        Self {
            anchor: offset,
            head: offset,
        }
    }

    #[must_use]
    pub fn is_cursor(&self) -> bool {
        self.anchor == self.head
    }

    #[must_use]
    pub fn min(&self) -> usize {
        self.anchor.min(self.head)
    }

    #[must_use]
    pub fn max(&self) -> usize {
        self.anchor.max(self.head)
    }

    /// The selection as an ordered byte span.
    #[must_use]
    pub fn span(&self) -> Span {
        Span::new(self.min(), self.max())
    }

    /// Inclusive range of 1-based line numbers this selection touches.
    pub fn line_span(&self, rope: &Rope) -> (usize, usize) {
        (
            line_of_offset(rope, self.min()),
            line_of_offset(rope, self.max()),
        )
    }
}

/// An ordered set of selection ranges (multi-cursor).
///
/// Ranges are kept sorted by their minimum offset and merged when they
/// overlap, so downstream consumers can assume a normalized set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionSet {
    ranges: Vec<Selection>,
}

impl SelectionSet {
    /// A single cursor at `offset`.
    #[must_use]
    pub fn single(offset: usize) -> Self {
        Self {
            ranges: vec![Selection::cursor(offset)],
        }
    }

    /// Build a normalized set from arbitrary ranges.
    ///
    /// Ranges are sorted by ordered bounds and overlapping ranges are merged.
    /// Touching ranges (one ending exactly where the next starts) are kept
    /// separate, matching how distinct cursors behave side by side.
    #[must_use]
    pub fn from_ranges(mut ranges: Vec<Selection>) -> Self {
        if ranges.is_empty() {
            return Self::single(0);
        }
        ranges.sort_by_key(|s| (s.min(), s.max()));

        let mut merged: Vec<Selection> = Vec::with_capacity(ranges.len());
        for sel in ranges {
            match merged.last_mut() {
                Some(last) if !last.is_cursor() && !sel.is_cursor() && sel.min() < last.max() => {
                    let (anchor, head) = if last.head >= last.anchor {
                        (last.min().min(sel.min()), last.max().max(sel.max()))
                    } else {
                        (last.max().max(sel.max()), last.min().min(sel.min()))
                    };
                    last.anchor = anchor;
                    last.head = head;
                }
                Some(last) if *last == sel => {}
                _ => merged.push(sel),
            }
        }
        Self { ranges: merged }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Selection> {
        self.ranges.iter()
    }

    #[must_use]
    pub fn primary(&self) -> Selection {
        self.ranges[0]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Clamp every range to `max_len`, preserving order and normalization.
    #[must_use]
    pub fn clamped(&self, max_len: usize) -> Self {
        Self::from_ranges(
            self.ranges
                .iter()
                .map(|s| Selection::new(s.anchor.min(max_len), s.head.min(max_len)))
                .collect(),
        )
    }
}

impl Default for SelectionSet {
    fn default() -> Self {
        Self::single(0)
    }
}
