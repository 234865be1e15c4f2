//! Image-reference boundary behaviors.
//!
//! The engine recognizes single-line image references (`![alt](target)`) but
//! never resolves paths or fetches anything itself; resolution and remote
//! materialization are delegated to host-provided collaborators behind the
//! traits below. What lives here is the text-level behavior: paste of an
//! image URL, and whole-line deletion of an image reference.

use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;
use relative_path::{RelativePath, RelativePathBuf};
use thiserror::Error;

use super::document::{Cmd, Document, Patch};
use super::lines::{LineRef, lines_with_spans};
use super::span::Span;

/// A line of the form `![alt](target)` with nothing else on it.
static IMAGE_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^!\[([^\]]*)\]\(([^)]+)\)\s*$").unwrap());

/// A pasted URL that points at an image resource.
static IMAGE_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^https?://\S+\.(png|jpe?g|gif|webp|svg)(\?\S*)?$").unwrap()
});

#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("failed to download {url}: {reason}")]
    Download { url: String, reason: String },
    #[error("unresolvable image target {0}")]
    Unresolvable(RelativePathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Resolves a note-relative image target to an absolute path.
///
/// Owned by the host: the engine only recognizes that a reference exists and
/// asks for resolution when a renderer needs it.
pub trait ResourceResolver {
    fn resolve(&self, target: &RelativePath) -> Result<PathBuf, ResourceError>;
}

/// Downloads a remote image and stores it next to the active note, returning
/// the note-relative path to reference instead.
pub trait ResourceMaterializer {
    fn materialize(&self, url: &str) -> Result<RelativePathBuf, ResourceError>;
}

/// An image reference parsed out of a single line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    pub alt: String,
    pub target: RelativePathBuf,
}

/// Parse `text` as a single-line image reference.
#[must_use]
pub fn parse_image_reference(text: &str) -> Option<ImageRef> {
    let caps = IMAGE_LINE_RE.captures(text)?;
    Some(ImageRef {
        alt: caps[1].to_string(),
        target: RelativePathBuf::from(&caps[2]),
    })
}

#[must_use]
pub fn is_image_reference_line(text: &str) -> bool {
    IMAGE_LINE_RE.is_match(text)
}

#[must_use]
pub fn is_image_url(text: &str) -> bool {
    IMAGE_URL_RE.is_match(text.trim())
}

/// Every image-reference line in the document, with its line info.
///
/// Hosts use this to request resolution for each target; the engine itself
/// stops at recognition.
pub fn image_reference_lines(doc: &Document) -> Vec<(LineRef, ImageRef)> {
    lines_with_spans(doc.buffer())
        .filter_map(|line| {
            let image = parse_image_reference(&line.text)?;
            Some((line, image))
        })
        .collect()
}

/// Insert pasted text, materializing image URLs.
///
/// If the pasted text is an image URL, the materializer is asked to download
/// it; on success the returned note-relative reference is inserted instead of
/// the URL. Failure is non-fatal: it is logged and the raw text is inserted
/// unchanged.
pub fn handle_paste(
    doc: &mut Document,
    at: usize,
    pasted: &str,
    materializer: &dyn ResourceMaterializer,
) -> Patch {
    let text = if is_image_url(pasted) {
        match materializer.materialize(pasted.trim()) {
            Ok(local) => format!("![]({local})"),
            Err(err) => {
                tracing::warn!(url = pasted.trim(), %err, "image paste materialization failed");
                pasted.to_string()
            }
        }
    } else {
        pasted.to_string()
    };

    doc.apply(Cmd::InsertText { at, text })
}

/// Delete one step backward from `at`, treating image-reference lines as
/// atomic.
///
/// When `at` sits on an image-reference line, or at the start of the line
/// immediately below one, the entire reference line is deleted (including its
/// newline). Otherwise a plain single-character backward delete is applied.
/// Returns None when there is nothing before `at` to delete.
pub fn delete_backward(doc: &mut Document, at: usize) -> Option<Patch> {
    if at == 0 {
        return None;
    }
    let at = at.min(doc.len());

    let lines: Vec<LineRef> = lines_with_spans(doc.buffer()).collect();

    // Line the cursor sits on (span excludes the newline, so a cursor at the
    // start of the next line belongs to that next line).
    let current = lines
        .iter()
        .position(|l| l.span.start <= at && at <= l.span.end);

    // Past a trailing newline the cursor sits on a virtual empty last line;
    // deleting backward from there joins with the final real line.
    let Some(current) = current else {
        if let Some(last) = lines.last()
            && is_image_reference_line(&last.text)
        {
            return Some(delete_whole_line(doc, &lines, lines.len() - 1));
        }
        let prev = prev_char_boundary(doc, at);
        return Some(doc.apply(Cmd::DeleteRange {
            span: Span::new(prev, at),
        }));
    };

    if is_image_reference_line(&lines[current].text) {
        return Some(delete_whole_line(doc, &lines, current));
    }

    // Backward delete from the very start of a line joins it with the line
    // above; if that line is an image reference, remove it whole.
    if at == lines[current].span.start
        && current > 0
        && is_image_reference_line(&lines[current - 1].text)
    {
        return Some(delete_whole_line(doc, &lines, current - 1));
    }

    let prev = prev_char_boundary(doc, at);
    Some(doc.apply(Cmd::DeleteRange {
        span: Span::new(prev, at),
    }))
}

fn delete_whole_line(doc: &mut Document, lines: &[LineRef], index: usize) -> Patch {
    let line = &lines[index];
    // Include the trailing newline when there is one.
    let end = match lines.get(index + 1) {
        Some(next) => next.span.start,
        None => doc.len(),
    };
    doc.apply(Cmd::DeleteRange {
        span: Span::new(line.span.start, end),
    })
}

fn prev_char_boundary(doc: &Document, at: usize) -> usize {
    let text = doc.text();
    let mut prev = at - 1;
    while prev > 0 && !text.is_char_boundary(prev) {
        prev -= 1;
    }
    prev
}
