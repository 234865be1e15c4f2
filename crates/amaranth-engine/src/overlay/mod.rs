/*!
 * Live-preview overlay computation.
 *
 * An overlay is a derived, non-persistent instruction telling the host text
 * surface how to alter the rendering of a byte range without changing its
 * content: hide it, style it, style its whole line, or draw a synthesized
 * widget in its place. The engine recomputes the full overlay set from
 * (buffer, selection, focus) on every relevant change and publishes it; the
 * host applies it during its own render pass.
 *
 * Two extraction paths feed the same data model:
 *
 * - [`scan`] - per-line pattern rules, synchronous, the steady-state
 *   interactive path;
 * - [`marks`] - tree-sitter based format-mark extraction, higher fidelity,
 *   gated behind the debounce [`scheduler`] because it reparses.
 *
 * [`visibility`] decides per line whether syntax stays visible (source mode)
 * or gets hidden and styled (preview mode); [`engine`] orchestrates the
 * whole recompute; [`widget`] renders the inline replacements.
 */

pub mod engine;
pub mod marks;
pub mod scan;
pub mod scheduler;
pub mod visibility;
pub mod widget;

pub use engine::{ExtractionStrategy, OverlayEngine};
pub use marks::{FormatMark, MarkKind};
pub use scheduler::DebounceScheduler;
pub use widget::InlineWidget;

use serde::{Deserialize, Serialize};

use crate::editing::Span;

/// Inline style tags the host maps to its own visual styles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StyleClass {
    Bold,
    Italic,
    Strikethrough,
    Code,
    Link,
}

/// Whole-line style tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LineClass {
    /// Heading line, tagged with its level (1-6).
    Heading(u8),
    /// List-item line (bullet, ordered or task).
    ListItem,
}

/// What to do with the covered range.
///
/// A tagged union consumed by a single render `match` on the host side;
/// effect kinds deliberately carry data instead of behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "effect")]
pub enum OverlayEffect {
    /// Do not draw the covered bytes.
    Hide,
    /// Apply an inline style to the covered bytes.
    Style(StyleClass),
    /// Apply a style to the whole line containing the range.
    LineStyle(LineClass),
    /// Draw a synthesized inline widget in place of the covered bytes.
    Replace(InlineWidget),
}

impl OverlayEffect {
    /// Stable ordering rank so overlay sets sort deterministically when
    /// several effects cover the same span.
    fn rank(&self) -> u8 {
        match self {
            OverlayEffect::LineStyle(_) => 0,
            OverlayEffect::Hide => 1,
            OverlayEffect::Replace(_) => 2,
            OverlayEffect::Style(_) => 3,
        }
    }
}

/// One rendering instruction for one byte range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Overlay {
    pub span: Span,
    pub effect: OverlayEffect,
}

impl Overlay {
    #[must_use]
    pub fn new(span: Span, effect: OverlayEffect) -> Self {
        Self { span, effect }
    }

    #[must_use]
    pub fn hide(span: Span) -> Self {
        Self::new(span, OverlayEffect::Hide)
    }

    #[must_use]
    pub fn style(span: Span, class: StyleClass) -> Self {
        Self::new(span, OverlayEffect::Style(class))
    }
}

/// The full derived overlay set for one document state.
///
/// Purely ephemeral: rebuilt from scratch per recompute pass and compared by
/// structural equality (idempotence is a tested contract). Overlays are kept
/// sorted by span, then by effect rank, so equal inputs yield byte-equal
/// sets regardless of emission order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OverlaySet {
    overlays: Vec<Overlay>,
}

impl OverlaySet {
    #[must_use]
    pub fn from_overlays(mut overlays: Vec<Overlay>) -> Self {
        overlays.sort_by(|a, b| {
            (a.span.start, a.span.end, a.effect.rank()).cmp(&(
                b.span.start,
                b.span.end,
                b.effect.rank(),
            ))
        });
        Self { overlays }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Overlay> {
        self.overlays.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.overlays.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.overlays.is_empty()
    }

    /// All hide instructions, in span order.
    pub fn hides(&self) -> impl Iterator<Item = &Overlay> {
        self.overlays
            .iter()
            .filter(|o| matches!(o.effect, OverlayEffect::Hide))
    }

    /// All inline-style instructions carrying `class`.
    pub fn styles_of(&self, class: StyleClass) -> impl Iterator<Item = &Overlay> {
        self.overlays
            .iter()
            .filter(move |o| o.effect == OverlayEffect::Style(class))
    }

    /// True if any hide or replace effect covers `offset`.
    #[must_use]
    pub fn is_concealed(&self, offset: usize) -> bool {
        self.overlays.iter().any(|o| {
            matches!(
                o.effect,
                OverlayEffect::Hide | OverlayEffect::Replace(_)
            ) && o.span.contains(offset)
        })
    }
}
