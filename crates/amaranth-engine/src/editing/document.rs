use std::borrow::Cow;

use tree_sitter::{Parser, Tree};
use xi_rope::Rope;

use super::selection::SelectionSet;
use super::span::Span;
use tree_sitter_md::LANGUAGE;

/// An edit command against the document buffer.
///
/// All mutations flow through here. The overlay engine itself never issues
/// commands; they come from the host text surface (keystrokes, paste
/// handling, image-line deletion).
#[derive(Debug, Clone, PartialEq)]
pub enum Cmd {
    InsertText { at: usize, text: String },
    DeleteRange { span: Span },
}

/// Result of applying a command.
#[derive(Debug, Clone)]
pub struct Patch {
    /// Byte spans touched by the edit, in post-edit coordinates.
    pub changed: Vec<Span>,
    /// Selection after transformation through the edit.
    pub new_selection: SelectionSet,
    /// Document version after the edit.
    pub version: u64,
}

/// The host text surface's document model.
///
/// Holds the authoritative text in a single `xi_rope::Rope` buffer (lossless
/// round-trip: [`Document::text`] returns byte-identical content), the current
/// selection set and focus flag, and the tree-sitter markdown parse used by
/// the higher-fidelity mark-extraction path.
///
/// The overlay engine only ever reads this struct during a recompute pass and
/// holds no offsets across passes, since any edit invalidates them.
pub struct Document {
    /// Rope buffer containing the entire document as UTF-8 bytes.
    buffer: Rope,
    /// Current selection ranges (multi-cursor) as byte offsets.
    selection: SelectionSet,
    /// Whether the text surface has input focus. When false the whole
    /// document is forced into preview mode.
    focus: bool,
    /// Version counter incremented on each edit.
    version: u64,
    /// Tree-sitter parser for the markdown block grammar.
    parser: Parser,
    /// Current parse tree. None until the first parse succeeds; refreshed by
    /// [`Document::reparse`], which the debounce scheduler gates.
    tree: Option<Tree>,
}

impl Document {
    /// Create a new document from raw bytes, validating UTF-8 and running an
    /// initial parse.
    pub fn from_bytes(bytes: &[u8]) -> anyhow::Result<Self> {
        let text = std::str::from_utf8(bytes)?;
        let buffer = Rope::from(text);

        let mut parser = Parser::new();
        parser.set_language(&LANGUAGE.into())?;
        let tree = parser.parse(buffer.to_string(), None);

        Ok(Self {
            buffer,
            selection: SelectionSet::single(0),
            focus: true,
            version: 0,
            parser,
            tree,
        })
    }

    /// The buffer content as a string. Exact round-trip of the input bytes.
    pub fn text(&self) -> String {
        self.buffer.to_string()
    }

    pub fn buffer(&self) -> &Rope {
        &self.buffer
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.len() == 0
    }

    /// Slice the buffer for a span. Zero-copy when the span lies within one
    /// rope leaf.
    pub fn slice(&self, span: Span) -> Cow<'_, str> {
        self.buffer.slice_to_cow(span.start..span.end)
    }

    pub fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    pub fn set_selection(&mut self, selection: SelectionSet) {
        self.selection = selection.clamped(self.buffer.len());
    }

    pub fn focus(&self) -> bool {
        self.focus
    }

    pub fn set_focus(&mut self, focus: bool) {
        self.focus = focus;
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn tree(&self) -> Option<&Tree> {
        self.tree.as_ref()
    }

    /// Apply an edit command to the buffer.
    ///
    /// Bumps the version and transforms the selection through the edit, but
    /// deliberately does not reparse: tree refresh is debounced by the
    /// overlay engine's scheduler, while the line-scan overlay path works
    /// straight off the buffer and needs no tree at all.
    ///
    /// Offsets are clamped to the buffer length and rounded down to the
    /// nearest codepoint boundary, so a host handing over an offset that
    /// lands inside a multibyte character gets a degraded edit instead of a
    /// corrupted rope.
    pub fn apply(&mut self, cmd: Cmd) -> Patch {
        let changed = match &cmd {
            Cmd::InsertText { at, text } => {
                let at = self.aligned(*at);
                self.buffer.edit(at..at, text.as_str());
                self.selection = transform_through_insert(&self.selection, at, text.len());
                vec![Span::new(at, at + text.len())]
            }
            Cmd::DeleteRange { span } => {
                let start = self.aligned(span.start);
                let end = self.aligned(span.end);
                if start < end {
                    self.buffer.edit(start..end, "");
                    self.selection = transform_through_delete(&self.selection, start, end);
                }
                vec![Span::new(start, start)]
            }
        };

        self.version += 1;
        Patch {
            changed,
            new_selection: self.selection.clone(),
            version: self.version,
        }
    }

    /// Rebuild the parse tree from the current buffer.
    ///
    /// Full reparse, no incremental tree edits: the overlay set is always
    /// rebuilt from scratch per pass, and reparses are coalesced by the
    /// debounce scheduler, so the simpler invariant wins. A failed parse
    /// leaves the previous tree in place.
    pub fn reparse(&mut self) {
        if let Some(tree) = self.parser.parse(self.buffer.to_string(), None) {
            self.tree = Some(tree);
        }
    }

    /// Clamp `offset` to the buffer and round it down to a codepoint
    /// boundary.
    fn aligned(&self, offset: usize) -> usize {
        self.buffer
            .at_or_prev_codepoint_boundary(offset.min(self.buffer.len()))
            .unwrap_or(0)
    }
}

fn transform_through_insert(selection: &SelectionSet, at: usize, len: usize) -> SelectionSet {
    let shift = |offset: usize| if offset >= at { offset + len } else { offset };
    SelectionSet::from_ranges(
        selection
            .iter()
            .map(|s| super::Selection::new(shift(s.anchor), shift(s.head)))
            .collect(),
    )
}

fn transform_through_delete(selection: &SelectionSet, start: usize, end: usize) -> SelectionSet {
    let removed = end - start;
    let shift = |offset: usize| {
        if offset >= end {
            offset - removed
        } else if offset > start {
            start
        } else {
            offset
        }
    };
    SelectionSet::from_ranges(
        selection
            .iter()
            .map(|s| super::Selection::new(shift(s.anchor), shift(s.head)))
            .collect(),
    )
}
