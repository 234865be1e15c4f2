//! Tree-based format-mark extraction: the higher-fidelity overlay path.
//!
//! Walks the tree-sitter markdown parse (blocks) plus an inline-grammar
//! parse of each inline node, and emits a flat list of format marks: byte
//! ranges covering only the literal *syntax tokens* (the `#` run of a
//! heading, each `**` of a strong span, a list marker), never their content.
//! Symmetric constructs emit two marks, one per delimiter.
//!
//! Extraction is deterministic and total. Malformed markdown degrades to
//! paragraphs in the grammar, and any node with a degenerate byte range is
//! skipped silently rather than failing the pass.

use serde::{Deserialize, Serialize};
use tree_sitter::{Node, Parser};
use tree_sitter_md::INLINE_LANGUAGE;

use crate::editing::{Document, Span};

/// Semantic kind of a syntax token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MarkKind {
    Heading,
    Bold,
    Italic,
    Strikethrough,
    List,
    TaskList,
}

/// A range of literal syntax to hide in preview mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatMark {
    pub span: Span,
    pub kind: MarkKind,
    /// Heading level (1-6); set only for `MarkKind::Heading`.
    pub level: Option<u8>,
}

impl FormatMark {
    fn new(span: Span, kind: MarkKind) -> Self {
        Self {
            span,
            kind,
            level: None,
        }
    }
}

/// Extract format marks from the document's current parse tree.
///
/// Returns marks in document order. An unparsed document (no tree yet)
/// yields no marks; the line-scan path covers that window.
pub fn extract(doc: &Document) -> Vec<FormatMark> {
    let Some(tree) = doc.tree() else {
        return Vec::new();
    };

    // The block grammar leaves inline content unparsed; span-level
    // constructs need their own parser instance.
    let mut inline_parser = Parser::new();
    if inline_parser.set_language(&INLINE_LANGUAGE.into()).is_err() {
        return Vec::new();
    }

    let mut marks = Vec::new();
    collect_block_marks(doc, tree.root_node(), &mut inline_parser, &mut marks);
    marks.sort_by_key(|m| (m.span.start, m.span.end));
    marks
}

fn collect_block_marks(
    doc: &Document,
    node: Node,
    inline_parser: &mut Parser,
    marks: &mut Vec<FormatMark>,
) {
    let byte_range = node.byte_range();
    if byte_range.is_empty() {
        return;
    }

    match node.kind() {
        "atx_heading" => {
            let level = heading_level(doc, &node);
            let end = byte_range.start + level as usize + 1;
            if end <= byte_range.end {
                marks.push(FormatMark {
                    span: Span::new(byte_range.start, end),
                    kind: MarkKind::Heading,
                    level: Some(level),
                });
            }
            visit_children(doc, node, inline_parser, marks);
        }
        "list_item" => {
            if let Some(mark) = list_item_mark(&node) {
                marks.push(mark);
            }
            visit_children(doc, node, inline_parser, marks);
        }
        "inline" => {
            collect_inline_marks(doc, &node, inline_parser, marks);
        }
        _ => visit_children(doc, node, inline_parser, marks),
    }
}

fn visit_children(
    doc: &Document,
    node: Node,
    inline_parser: &mut Parser,
    marks: &mut Vec<FormatMark>,
) {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_block_marks(doc, child, inline_parser, marks);
    }
}

/// Heading level from the hash run, clamped to the ATX range.
fn heading_level(doc: &Document, node: &Node) -> u8 {
    let text = doc.slice(node.byte_range().into());
    let level = text.chars().take_while(|&c| c == '#').count() as u8;
    level.clamp(1, 6)
}

/// The single mark covering a list item's marker (plus checkbox for tasks).
///
/// - unordered: fixed 2-byte `"- "` width;
/// - ordered: everything up to the first content child, so `"12. "` is
///   fully covered;
/// - task items: marker plus checkbox plus trailing space.
fn list_item_mark(node: &Node) -> Option<FormatMark> {
    let start = node.start_byte();
    let mut ordered = false;
    let mut task = false;
    let mut content_start = None;

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "list_marker_dot" | "list_marker_parenthesis" => ordered = true,
            "list_marker_minus" | "list_marker_star" | "list_marker_plus" => {}
            "task_list_marker_checked" | "task_list_marker_unchecked" => task = true,
            _ => {
                if content_start.is_none() {
                    content_start = Some(child.start_byte());
                }
            }
        }
    }

    let width = if task {
        (if ordered { 3 } else { 2 }) + 4
    } else if ordered {
        content_start?.checked_sub(start)?
    } else {
        2
    };

    if width == 0 || start + width > node.end_byte() {
        return None;
    }
    let kind = if task { MarkKind::TaskList } else { MarkKind::List };
    Some(FormatMark::new(Span::new(start, start + width), kind))
}

/// Parse an inline node's text with the inline grammar and emit delimiter
/// marks for emphasis, strong emphasis and strikethrough.
fn collect_inline_marks(
    doc: &Document,
    node: &Node,
    inline_parser: &mut Parser,
    marks: &mut Vec<FormatMark>,
) {
    let base = node.start_byte();
    let text = doc.slice(node.byte_range().into()).into_owned();
    let Some(tree) = inline_parser.parse(&text, None) else {
        return;
    };
    collect_span_marks(tree.root_node(), base, marks);
}

fn collect_span_marks(node: Node, base: usize, marks: &mut Vec<FormatMark>) {
    let (kind, delim) = match node.kind() {
        "strong_emphasis" => (Some(MarkKind::Bold), 2),
        "emphasis" => (Some(MarkKind::Italic), 1),
        "strikethrough" => (Some(MarkKind::Strikethrough), 2),
        _ => (None, 0),
    };

    if let Some(kind) = kind {
        let start = base + node.start_byte();
        let end = base + node.end_byte();
        // Degenerate spans (missing delimiters) are skipped, never an error.
        if end - start > 2 * delim {
            marks.push(FormatMark::new(Span::new(start, start + delim), kind));
            marks.push(FormatMark::new(Span::new(end - delim, end), kind));
        }
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_span_marks(child, base, marks);
    }
}
