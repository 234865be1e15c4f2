/*!
 * Document model shared with the host text surface.
 *
 * The buffer is a single `xi_rope::Rope` holding the document as UTF-8
 * bytes, addressed by byte offsets end to end. Every derived entity in this
 * crate (lines, format marks, overlays) is expressed in the same byte
 * offsets, which is what keeps rendering and caret placement from ever
 * desynchronizing: there is exactly one addressing scheme and exactly one
 * owner of the text.
 *
 * Lines, selections and focus are the three inputs the overlay engine
 * consumes. All of them are cheap to produce:
 *
 * - lines are re-derived per pass via [`lines::lines_with_spans`], never
 *   cached across edits;
 * - selections are a normalized multi-cursor [`SelectionSet`];
 * - focus is a plain flag on [`Document`].
 *
 * Mutation flows through [`Cmd`] only. The overlay engine never edits the
 * buffer; the two write paths that live in this module ([`images`] paste
 * materialization and image-line deletion) belong to the host-surface side
 * of the boundary.
 */

pub mod document;
pub mod images;
pub mod lines;
pub mod selection;
pub mod span;

pub use document::{Cmd, Document, Patch};
pub use images::{ImageRef, ResourceError, ResourceMaterializer, ResourceResolver};
pub use lines::{LineRef, line_of_offset, lines_with_spans};
pub use selection::{Selection, SelectionSet};
pub use span::Span;
